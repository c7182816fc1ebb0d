use std::{
    collections::{HashMap, HashSet},
    io::{self, stdout, Stdout, Write},
};

use metrohash::MetroBuildHasher;
use termion::{
    input::MouseTerminal,
    raw::{IntoRawMode, RawTerminal},
    screen::AlternateScreen,
};

use crate::{pos, view::Surface, Pos};

pub type Terminal = MouseTerminal<AlternateScreen<RawTerminal<Stdout>>>;

/// A [`Surface`] that keeps a model of the screen and only sends the cells
/// written since the last flush. Writes to the same cell between flushes
/// collapse into one.
pub struct Canvas<W>
where
    W: Write,
{
    out: W,
    cells: HashMap<Pos, char, MetroBuildHasher>,
    dirty: HashSet<Pos, MetroBuildHasher>,
    cleared: bool,
}

impl Canvas<Terminal> {
    /// switches the terminal to raw mode on the alternate screen with mouse
    /// reporting on. everything is restored when the canvas is dropped.
    pub fn from_terminal() -> io::Result<Self> {
        let raw = stdout().into_raw_mode()?;
        let out = MouseTerminal::from(AlternateScreen::from(raw));
        let mut canvas = Self::new(out);
        write!(canvas.out, "{}", termion::cursor::Hide)?;
        Ok(canvas)
    }
}

impl<W> Canvas<W>
where
    W: Write,
{
    pub fn new(out: W) -> Self {
        Self {
            out,
            cells: HashMap::default(),
            dirty: HashSet::default(),
            cleared: false,
        }
    }

    #[cfg(test)]
    pub fn glyph(&self, x: usize, y: usize) -> char {
        self.cells.get(&pos!(x, y)).copied().unwrap_or(' ')
    }

    fn write_cell(&mut self, pos: Pos) -> io::Result<()> {
        let goto = termion::cursor::Goto(pos.x as u16 + 1, pos.y as u16 + 1);
        let glyph = self.cells.get(&pos).copied().unwrap_or(' ');
        write!(self.out, "{goto}{glyph}")
    }
}

impl<W> Surface for Canvas<W>
where
    W: Write,
{
    fn set_cell(&mut self, x: usize, y: usize, glyph: char) {
        let pos = pos!(x, y);
        if glyph == ' ' {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, glyph);
        }
        self.dirty.insert(pos);
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.dirty.clear();
        self.cleared = true;
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.cleared {
            write!(self.out, "{}", termion::clear::All)?;
            self.cleared = false;
        }
        let mut dirty: Vec<Pos> = self.dirty.drain().collect();
        dirty.sort_by_key(|pos| (pos.y, pos.x));
        for pos in dirty {
            self.write_cell(pos)?;
        }
        self.out.flush()
    }

    fn sync(&mut self) -> io::Result<()> {
        write!(self.out, "{}", termion::clear::All)?;
        self.cleared = false;
        self.dirty.clear();
        let mut cells: Vec<Pos> = self.cells.keys().copied().collect();
        cells.sort_by_key(|pos| (pos.y, pos.x));
        for pos in cells {
            self.write_cell(pos)?;
        }
        self.out.flush()
    }
}

impl<W> Drop for Canvas<W>
where
    W: Write,
{
    fn drop(&mut self) {
        let show = termion::cursor::Show;
        let _ = write!(self.out, "{show}");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
fn output(canvas: &mut Canvas<Vec<u8>>) -> String {
    String::from_utf8(std::mem::take(&mut canvas.out)).unwrap()
}

#[test]
fn test_flush_sends_only_dirty_cells() {
    let mut canvas = Canvas::new(Vec::new());
    canvas.set_cell(3, 1, '#');
    canvas.set_cell(0, 0, 'P');
    canvas.flush().unwrap();
    assert_eq!(output(&mut canvas), "\x1b[1;1HP\x1b[2;4H#");

    canvas.flush().unwrap();
    assert_eq!(output(&mut canvas), "");
}

#[test]
fn test_writes_collapse_between_flushes() {
    let mut canvas = Canvas::new(Vec::new());
    canvas.set_cell(2, 2, '#');
    canvas.set_cell(2, 2, ' ');
    canvas.flush().unwrap();
    assert_eq!(output(&mut canvas), "\x1b[3;3H ");
    assert_eq!(canvas.glyph(2, 2), ' ');
}

#[test]
fn test_clear_and_sync() {
    let mut canvas = Canvas::new(Vec::new());
    canvas.set_cell(1, 0, '#');
    canvas.flush().unwrap();
    output(&mut canvas);

    canvas.clear();
    canvas.set_cell(4, 0, '#');
    canvas.flush().unwrap();
    assert_eq!(output(&mut canvas), "\x1b[2J\x1b[1;5H#");
    assert_eq!(canvas.glyph(1, 0), ' ');

    canvas.set_cell(0, 1, 'G');
    canvas.sync().unwrap();
    assert_eq!(output(&mut canvas), "\x1b[2J\x1b[1;5H#\x1b[2;1HG");
}
