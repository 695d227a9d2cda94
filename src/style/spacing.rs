//! Four-sided spacing resolved from shorthand arrays.

/// Resolved top/right/bottom/left offsets in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spacing {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Spacing {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Resolve a margin or padding array.
    ///
    /// | len | result                                  |
    /// |-----|-----------------------------------------|
    /// | 0   | all zero                                |
    /// | 1   | all sides `v[0]`                        |
    /// | 2   | vertical `v[0]`, horizontal `v[1]`      |
    /// | 3   | top `v[0]`, horizontal `v[1]`, bottom `v[2]` |
    /// | 4+  | top, right, bottom, left; extras ignored |
    pub fn from_values(values: &[f64]) -> Self {
        match *values {
            [] => Self::default(),
            [all] => Self::new(all, all, all, all),
            [vertical, horizontal] => Self::new(vertical, horizontal, vertical, horizontal),
            [top, horizontal, bottom] => Self::new(top, horizontal, bottom, horizontal),
            [top, right, bottom, left, ..] => Self::new(top, right, bottom, left),
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}
