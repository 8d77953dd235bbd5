//! Color constants and p-value shading for the heatmap.

use ratatui::style::Color;

/// p-value below 1%.
pub const P_STRONG: Color = Color::Green;
/// p-value below 5%.
pub const P_SIGNIFICANT: Color = Color::LightGreen;
/// p-value below 10%.
pub const P_WEAK: Color = Color::Yellow;
/// Not significant.
pub const P_NONE: Color = Color::Red;
/// Diagonal and missing cells.
pub const EMPTY_CELL: Color = Color::DarkGray;
/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// Selected cell background.
pub const SELECTED_BG: Color = Color::Blue;

/// Returns the heatmap color for a p-value.
pub fn p_value_color(p: Option<f64>) -> Color {
    match p {
        Some(p) if p < 0.01 => P_STRONG,
        Some(p) if p < 0.05 => P_SIGNIFICANT,
        Some(p) if p < 0.10 => P_WEAK,
        Some(_) => P_NONE,
        None => EMPTY_CELL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shades_by_threshold() {
        assert_eq!(p_value_color(Some(0.001)), P_STRONG);
        assert_eq!(p_value_color(Some(0.03)), P_SIGNIFICANT);
        assert_eq!(p_value_color(Some(0.07)), P_WEAK);
        assert_eq!(p_value_color(Some(0.5)), P_NONE);
        assert_eq!(p_value_color(None), EMPTY_CELL);
    }
}
