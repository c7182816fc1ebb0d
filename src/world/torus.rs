use crate::{pos, Cell, Pos};

/// A fixed-size grid whose edges wrap around.
///
/// Cells are stored row-major in a flat buffer, `y * width + x`.
/// Dimensions are always at least 1x1; callers reject degenerate sizes
/// before they reach the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Torus {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    generation: u64,
}

impl Torus {
    pub fn new(width: usize, height: usize) -> Self {
        debug_assert!(width > 0 && height > 0);
        Self {
            width,
            height,
            cells: vec![Cell::inactive(); width * height],
            generation: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, Pos { x, y }: Pos) -> usize {
        y * self.width + x
    }

    pub fn get(&self, pos: Pos) -> Cell {
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, pos: Pos, cell: Cell) {
        let index = self.index(pos);
        self.cells[index] = cell;
    }

    /// marks every in-range position alive, out-of-range ones are dropped.
    pub fn seed(&mut self, actives: impl IntoIterator<Item = Pos>) {
        for pos in actives {
            if self.contains(pos) {
                self.set(pos, Cell::active());
            }
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| pos!(x, y)))
    }

    /// live cells, row-major.
    pub fn actives(&self) -> Vec<Pos> {
        self.positions()
            .filter(|&pos| self.get(pos).is_active())
            .collect()
    }

    pub fn population(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_active()).count()
    }

    fn window(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
            .map(move |(dx, dy)| pos.wrapping_offset(dx, dy, self.width, self.height))
    }

    /// live cells in the whole 3x3 window around `pos`, the cell itself included.
    pub fn window_count(&self, pos: Pos) -> usize {
        self.window(pos).map(|p| self.get(p).weight()).sum()
    }

    /// live cells among the eight wrapped neighbors of `pos`.
    pub fn neighbor_count(&self, pos: Pos) -> usize {
        self.window_count(pos) - self.get(pos).weight()
    }

    /// 3 in the window births, 4 keeps the current state, anything else kills.
    ///
    /// The window includes the cell itself, so this is not the textbook
    /// neighbor-only reading of the rule.
    pub fn next_state(&self, pos: Pos) -> Cell {
        match self.window_count(pos) {
            3 => Cell::active(),
            4 => self.get(pos),
            _ => Cell::inactive(),
        }
    }

    /// advances one generation and returns the positions that changed, row-major.
    pub fn step(&mut self) -> Vec<Pos> {
        let next: Vec<Cell> = self.positions().map(|pos| self.next_state(pos)).collect();
        let changed = self
            .positions()
            .zip(self.cells.iter().zip(next.iter()))
            .filter(|(_, (old, new))| old != new)
            .map(|(pos, _)| pos)
            .collect();
        self.cells = next;
        self.generation += 1;
        changed
    }

    /// flips one cell in place and returns its new state.
    pub fn toggle(&mut self, pos: Pos) -> Cell {
        let cell = self.get(pos).toggled();
        self.set(pos, cell);
        cell
    }

    /// reallocates to the new size, keeping the overlapping region.
    /// returns the live cells that survived so they can be repainted.
    pub fn resize(&mut self, width: usize, height: usize) -> Vec<Pos> {
        let mut resized = Torus::new(width, height);
        resized.generation = self.generation;
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                resized.set(pos!(x, y), self.get(pos!(x, y)));
            }
        }
        *self = resized;
        self.actives()
    }
}

#[cfg(test)]
fn torus_with(width: usize, height: usize, actives: &[(usize, usize)]) -> Torus {
    let mut torus = Torus::new(width, height);
    torus.seed(actives.iter().map(|&(x, y)| pos!(x, y)));
    torus
}

#[test]
fn test_neighbor_count_wraps_corners() {
    let torus = torus_with(5, 4, &[(0, 0)]);
    assert_eq!(torus.neighbor_count(pos!(4, 3)), 1);
    assert_eq!(torus.neighbor_count(pos!(4, 0)), 1);
    assert_eq!(torus.neighbor_count(pos!(0, 3)), 1);
    assert_eq!(torus.neighbor_count(pos!(2, 2)), 0);
    assert_eq!(torus.neighbor_count(pos!(0, 0)), 0);
}

#[test]
fn test_single_cell_on_three_by_three() {
    let mut torus = torus_with(3, 3, &[(1, 1)]);
    for pos in torus.positions() {
        assert_eq!(torus.window_count(pos), 1);
    }
    assert_eq!(torus.neighbor_count(pos!(1, 1)), 0);
    assert_eq!(torus.neighbor_count(pos!(0, 0)), 1);

    let changed = torus.step();
    assert_eq!(changed, vec![pos!(1, 1)]);
    assert_eq!(torus.population(), 0);
}

#[test]
fn test_rule() {
    // a dead cell with three live neighbors is born
    let torus = torus_with(6, 6, &[(1, 1), (2, 1), (3, 1)]);
    assert_eq!(torus.window_count(pos!(2, 2)), 3);
    assert!(torus.next_state(pos!(2, 2)).is_active());
    assert_eq!(torus.window_count(pos!(2, 1)), 3);
    // a window of four keeps the current state
    let torus = torus_with(6, 6, &[(1, 1), (2, 1), (3, 1), (2, 0)]);
    assert_eq!(torus.window_count(pos!(2, 1)), 4);
    assert!(torus.next_state(pos!(2, 1)).is_active());
    let torus = torus_with(6, 6, &[(0, 0), (2, 0), (0, 2), (2, 2)]);
    assert_eq!(torus.window_count(pos!(1, 1)), 4);
    assert!(!torus.next_state(pos!(1, 1)).is_active());
    // crowded cells die
    let torus = torus_with(6, 6, &[(1, 1), (2, 1), (3, 1), (2, 0), (2, 2)]);
    assert_eq!(torus.window_count(pos!(2, 1)), 5);
    assert!(!torus.next_state(pos!(2, 1)).is_active());
}

#[test]
fn test_blinker_across_the_edge() {
    let mut torus = torus_with(5, 5, &[(4, 2), (0, 2), (1, 2)]);
    let changed = torus.step();
    assert_eq!(torus.actives(), vec![pos!(0, 1), pos!(0, 2), pos!(0, 3)]);
    assert_eq!(changed, vec![pos!(0, 1), pos!(1, 2), pos!(4, 2), pos!(0, 3)]);
    torus.step();
    assert_eq!(torus.actives(), vec![pos!(0, 2), pos!(1, 2), pos!(4, 2)]);
}

#[test]
fn test_step_is_deterministic() {
    let original = torus_with(8, 6, &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2), (7, 5)]);
    let mut a = original.clone();
    let mut b = original.clone();
    assert_eq!(a.step(), b.step());
    assert_eq!(a, b);
}

#[test]
fn test_dead_grid_stays_dead() {
    let mut torus = Torus::new(7, 3);
    assert!(torus.step().is_empty());
    assert_eq!(torus.population(), 0);
}

#[test]
fn test_toggle_twice_is_a_no_op() {
    let mut torus = torus_with(4, 4, &[(2, 3)]);
    let before = torus.clone();
    assert!(torus.toggle(pos!(1, 1)).is_active());
    assert!(!torus.toggle(pos!(1, 1)).is_active());
    assert!(!torus.toggle(pos!(2, 3)).is_active());
    assert!(torus.toggle(pos!(2, 3)).is_active());
    assert_eq!(torus, before);
}

#[test]
fn test_resize_keeps_overlap() {
    let mut torus = torus_with(4, 4, &[(3, 3)]);
    let repaint = torus.resize(6, 6);
    assert_eq!(repaint, vec![pos!(3, 3)]);
    assert_eq!((torus.width(), torus.height()), (6, 6));
    assert_eq!(torus.population(), 1);

    let mut torus = torus_with(4, 4, &[(3, 3)]);
    let repaint = torus.resize(2, 2);
    assert!(repaint.is_empty());
    assert_eq!(torus.population(), 0);
    assert_eq!((torus.width(), torus.height()), (2, 2));
}

#[test]
fn test_resize_uneven() {
    let mut torus = torus_with(4, 3, &[(0, 0), (3, 0), (1, 2)]);
    let repaint = torus.resize(2, 5);
    assert_eq!(repaint, vec![pos!(0, 0), pos!(1, 2)]);
    for y in 3..5 {
        for x in 0..2 {
            assert!(!torus.get(pos!(x, y)).is_active());
        }
    }
}

#[test]
fn test_generation_counts_steps_only() {
    let mut torus = torus_with(4, 4, &[(1, 1)]);
    torus.toggle(pos!(0, 0));
    torus.resize(5, 5);
    assert_eq!(torus.generation(), 0);
    torus.step();
    torus.step();
    assert_eq!(torus.generation(), 2);
    torus.resize(3, 3);
    torus.toggle(pos!(2, 2));
    assert_eq!(torus.generation(), 2);
}
