use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::{pos, Pos};

/// `#` is a live cell, any other char a dead one, each line a row.
pub fn deserialize(str: &str) -> Vec<Pos> {
    let mut result = vec![];
    let mut pos = pos!(0, 0);
    for c in str.chars() {
        match c {
            '#' => {
                result.push(pos);
                pos.x += 1
            }
            '\n' => pos = pos!(0, pos.y + 1),
            '\r' => (),
            _ => pos.x += 1,
        }
    }
    result
}

pub fn load(path: &Path) -> Result<Vec<Pos>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading pattern file {}", path.display()))?;
    Ok(deserialize(&content))
}

#[test]
fn test_deserialize() {
    let glider = ".#.\n..#\n###\n";
    assert_eq!(
        deserialize(glider),
        vec![pos!(1, 0), pos!(2, 1), pos!(0, 2), pos!(1, 2), pos!(2, 2)]
    );
    assert_eq!(deserialize("#\r\n #\r\n"), vec![pos!(0, 0), pos!(1, 1)]);
    assert!(deserialize("...\n\n").is_empty());
}
