//! Ordered cut list fed to the "Next" button.

#[derive(Debug, Clone, PartialEq)]
pub struct Cut {
    pub label: String,
    pub inches: f64,
}

/// Cuts in file order with a forward-only cursor.
#[derive(Debug, Clone, Default)]
pub struct CutList {
    cuts: Vec<Cut>,
    cursor: usize,
}

impl CutList {
    pub fn new(cuts: Vec<Cut>) -> Self {
        Self { cuts, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Index the next call to `next_cut` will return.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Advance to the next cut; `None` once the list is exhausted (no wrap).
    pub fn next_cut(&mut self) -> Option<&Cut> {
        let cut = self.cuts.get(self.cursor)?;
        self.cursor += 1;
        Some(cut)
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}
