//! Cursor state over a significance matrix.

use crate::evaluation::SignificanceMatrix;

/// Significance level used to highlight cells and dominant models.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Heatmap state: the matrix, the selected cell and the quit flag.
pub struct MatrixView<'a> {
    pub matrix: &'a SignificanceMatrix,
    /// Selected `(row, column)`.
    pub selected: (usize, usize),
    pub alpha: f64,
    pub quit: bool,
}

impl<'a> MatrixView<'a> {
    pub fn new(matrix: &'a SignificanceMatrix) -> Self {
        let selected = if matrix.models.len() > 1 { (0, 1) } else { (0, 0) };
        Self {
            matrix,
            selected,
            alpha: DEFAULT_ALPHA,
            quit: false,
        }
    }

    fn last(&self) -> usize {
        self.matrix.models.len().saturating_sub(1)
    }

    pub fn move_up(&mut self) {
        self.selected.0 = self.selected.0.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        self.selected.0 = (self.selected.0 + 1).min(self.last());
    }

    pub fn move_left(&mut self) {
        self.selected.1 = self.selected.1.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.selected.1 = (self.selected.1 + 1).min(self.last());
    }

    /// Names of the selected row and column models.
    pub fn selected_pair(&self) -> Option<(&str, &str)> {
        let (row, column) = self.selected;
        let models = &self.matrix.models;
        Some((models.get(row)?.as_str(), models.get(column)?.as_str()))
    }

    pub fn selected_p_value(&self) -> Option<f64> {
        self.matrix.get(self.selected.0, self.selected.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::SignificanceTest;

    fn matrix() -> SignificanceMatrix {
        SignificanceMatrix {
            test: SignificanceTest::DieboldMariano,
            models: vec!["naive".into(), "profile".into(), "lear".into()],
            p_values: vec![
                vec![None, Some(0.01), Some(0.2)],
                vec![Some(0.99), None, Some(0.5)],
                vec![Some(0.8), Some(0.5), None],
            ],
        }
    }

    #[test]
    fn starts_off_the_diagonal() {
        let m = matrix();
        let view = MatrixView::new(&m);
        assert_eq!(view.selected, (0, 1));
        assert_eq!(view.selected_p_value(), Some(0.01));
        assert_eq!(view.selected_pair(), Some(("naive", "profile")));
    }

    #[test]
    fn cursor_is_clamped() {
        let m = matrix();
        let mut view = MatrixView::new(&m);
        view.move_up();
        view.move_left();
        view.move_left();
        assert_eq!(view.selected, (0, 0));
        for _ in 0..5 {
            view.move_down();
            view.move_right();
        }
        assert_eq!(view.selected, (2, 2));
        assert_eq!(view.selected_p_value(), None);
    }
}
