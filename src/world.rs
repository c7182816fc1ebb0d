#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    active: bool,
}

impl Cell {
    pub fn active() -> Self {
        Self { active: true }
    }

    pub fn inactive() -> Self {
        Self { active: false }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggled(self) -> Self {
        Self {
            active: !self.active,
        }
    }

    /// the cell's contribution to a neighborhood sum.
    pub fn weight(&self) -> usize {
        self.active as usize
    }
}

pub use torus::Torus;
mod torus;
