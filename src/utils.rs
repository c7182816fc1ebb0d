#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[macro_export]
macro_rules! pos {
    ($x:expr, $y:expr) => {
        Pos { x: $x, y: $y }
    };
}

impl Pos {
    /// moves by (dx, dy), wrapping around a `width` x `height` torus.
    pub fn wrapping_offset(self, dx: isize, dy: isize, width: usize, height: usize) -> Self {
        let x = wrap(self.x as isize + dx, width);
        let y = wrap(self.y as isize + dy, height);
        pos!(x, y)
    }
}

pub fn wrap(n: isize, len: usize) -> usize {
    n.rem_euclid(len as isize) as usize
}

#[test]
fn test_wrap() {
    assert_eq!(wrap(-1, 10), 9);
    assert_eq!(wrap(0, 10), 0);
    assert_eq!(wrap(10, 10), 0);
    assert_eq!(wrap(11, 10), 1);
    assert_eq!(wrap(-1, 1), 0);
}

#[test]
fn test_wrapping_offset() {
    assert_eq!(pos!(0, 0).wrapping_offset(-1, -1, 4, 3), pos!(3, 2));
    assert_eq!(pos!(3, 2).wrapping_offset(1, 1, 4, 3), pos!(0, 0));
    assert_eq!(pos!(1, 1).wrapping_offset(1, 0, 4, 3), pos!(2, 1));
}
