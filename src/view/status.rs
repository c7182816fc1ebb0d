use std::time::Duration;

use unicode_width::UnicodeWidthChar;

use crate::{pos, view::Surface, Cell, Pos, Torus};

/// columns reserved on the left of the screen for the status panel.
pub const MARGIN: usize = 10;

pub const ALIVE: char = 'X';
pub const DEAD: char = ' ';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub width: usize,
    pub height: usize,
    pub running: bool,
    pub generation: u64,
    pub tick_interval: Duration,
}

impl Status {
    pub fn lines(&self) -> [String; 4] {
        let mode = if self.running { "Play" } else { "Pause" };
        [
            format!("{}x{}", self.width, self.height),
            mode.to_string(),
            format!("Gen: {}", self.generation),
            format!("{}ms", self.tick_interval.as_millis()),
        ]
    }
}

/// grid dimensions for a terminal of `columns` x `rows`, if any cell fits.
pub fn grid_size(columns: usize, rows: usize) -> Option<(usize, usize)> {
    (columns > MARGIN && rows > 0).then(|| (columns - MARGIN, rows))
}

/// maps a 0-based screen position onto the grid, `None` inside the margin
/// or past the grid's edge.
pub fn screen_to_grid(Pos { x, y }: Pos, torus: &Torus) -> Option<Pos> {
    let pos = pos!(x.checked_sub(MARGIN)?, y);
    torus.contains(pos).then_some(pos)
}

pub fn draw_cell<S>(surface: &mut S, pos: Pos, cell: Cell)
where
    S: Surface,
{
    let glyph = if cell.is_active() { ALIVE } else { DEAD };
    surface.set_cell(pos.x + MARGIN, pos.y, glyph);
}

pub fn draw_status<S>(surface: &mut S, status: &Status)
where
    S: Surface,
{
    for (y, line) in status.lines().iter().enumerate() {
        for x in 0..MARGIN {
            surface.set_cell(x, y, ' ');
        }
        emit_str(surface, 0, y, MARGIN, line);
    }
}

/// writes `text` from column `x`, advancing by each char's display width and
/// stopping before anything would spill past `x + max_width`.
/// zero-width chars are drawn as blanks.
pub fn emit_str<S>(surface: &mut S, x: usize, y: usize, max_width: usize, text: &str)
where
    S: Surface,
{
    let mut column = x;
    for c in text.chars() {
        let (glyph, width) = match c.width() {
            Some(0) | None => (' ', 1),
            Some(width) => (c, width),
        };
        if column + width > x + max_width {
            break;
        }
        surface.set_cell(column, y, glyph);
        column += width;
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, io};

    use super::*;

    #[derive(Default)]
    struct Line(BTreeMap<(usize, usize), char>);

    impl Surface for Line {
        fn set_cell(&mut self, x: usize, y: usize, glyph: char) {
            self.0.insert((x, y), glyph);
        }
        fn clear(&mut self) {
            self.0.clear();
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_grid_size() {
        assert_eq!(grid_size(80, 24), Some((70, 24)));
        assert_eq!(grid_size(MARGIN + 1, 1), Some((1, 1)));
        assert_eq!(grid_size(MARGIN, 24), None);
        assert_eq!(grid_size(80, 0), None);
    }

    #[test]
    fn test_screen_to_grid() {
        let torus = Torus::new(5, 3);
        assert_eq!(screen_to_grid(pos!(MARGIN, 0), &torus), Some(pos!(0, 0)));
        assert_eq!(screen_to_grid(pos!(MARGIN + 4, 2), &torus), Some(pos!(4, 2)));
        assert_eq!(screen_to_grid(pos!(MARGIN - 1, 0), &torus), None);
        assert_eq!(screen_to_grid(pos!(MARGIN + 5, 0), &torus), None);
        assert_eq!(screen_to_grid(pos!(MARGIN, 3), &torus), None);
    }

    #[test]
    fn test_emit_str_truncates_wide_text() {
        let mut line = Line::default();
        emit_str(&mut line, 0, 0, 4, "Gen: 12345");
        let text: String = line.0.values().collect();
        assert_eq!(text, "Gen:");

        let mut line = Line::default();
        emit_str(&mut line, 0, 0, 5, "世界!");
        assert_eq!(line.0.get(&(0, 0)), Some(&'世'));
        assert_eq!(line.0.get(&(2, 0)), Some(&'界'));
        assert_eq!(line.0.get(&(4, 0)), Some(&'!'));
        assert_eq!(line.0.len(), 3);

        let mut line = Line::default();
        emit_str(&mut line, 0, 0, 3, "世界");
        assert_eq!(line.0.len(), 1);
    }

    #[test]
    fn test_draw_cell() {
        let mut line = Line::default();
        draw_cell(&mut line, pos!(2, 1), Cell::active());
        assert_eq!(line.0.get(&(MARGIN + 2, 1)), Some(&'X'));
        draw_cell(&mut line, pos!(2, 1), Cell::inactive());
        assert_eq!(line.0.get(&(MARGIN + 2, 1)), Some(&' '));
    }

    #[test]
    fn test_status_lines() {
        let status = Status {
            width: 70,
            height: 24,
            running: false,
            generation: 12,
            tick_interval: Duration::from_millis(450),
        };
        assert_eq!(status.lines(), ["70x24", "Pause", "Gen: 12", "450ms"].map(String::from));

        let mut line = Line::default();
        draw_status(&mut line, &status);
        assert_eq!(line.0.len(), MARGIN * 4);
        assert_eq!(line.0.get(&(0, 1)), Some(&'P'));
        assert_eq!(line.0.get(&(5, 1)), Some(&' '));
    }
}
