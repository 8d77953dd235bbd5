//! TUI layout and widget rendering.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use super::style;
use super::view::MatrixView;

/// Renders the full TUI frame.
pub fn render(frame: &mut Frame, view: &MatrixView<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(4),    // heatmap
            Constraint::Length(4), // status panel
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    render_header(frame, view, chunks[0]);
    render_heatmap(frame, view, chunks[1]);
    render_status(frame, view, chunks[2]);
    render_footer(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, view: &MatrixView<'_>, area: Rect) {
    let header = Line::from(vec![
        Span::styled(
            " FORECAST-BENCH ",
            Style::default()
                .fg(style::HEADER_FG)
                .bg(style::HEADER_BG)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " {} test │ {} models │ α={} ",
            view.matrix.test.name(),
            view.matrix.models.len(),
            view.alpha,
        )),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

/// p-value heatmap: rows are the baseline model, columns the challenger.
fn render_heatmap(frame: &mut Frame, view: &MatrixView<'_>, area: Rect) {
    let models = &view.matrix.models;
    let width = models.iter().map(String::len).max().unwrap_or(0).max(8) as u16;

    let header = Row::new(
        std::iter::once(Cell::from(""))
            .chain(models.iter().map(|m| Cell::from(m.as_str())))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = models.iter().enumerate().map(|(row, model)| {
        let cells = std::iter::once(Cell::from(model.as_str()).style(Style::default().add_modifier(Modifier::BOLD)))
            .chain((0..models.len()).map(|column| {
                let p = view.matrix.get(row, column);
                let text = p.map_or_else(|| "-".to_string(), |p| format!("{p:.4}"));
                let mut cell_style = Style::default().fg(style::p_value_color(p));
                if (row, column) == view.selected {
                    cell_style = cell_style.bg(style::SELECTED_BG).add_modifier(Modifier::BOLD);
                }
                Cell::from(text).style(cell_style)
            }));
        Row::new(cells.collect::<Vec<_>>())
    });

    let widths = std::iter::repeat_n(Constraint::Length(width), models.len() + 1);
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(" p-values (row vs better column) ")
            .borders(Borders::ALL),
    );
    frame.render_widget(table, area);
}

fn render_status(frame: &mut Frame, view: &MatrixView<'_>, area: Rect) {
    let selection = match (view.selected_pair(), view.selected_p_value()) {
        (Some((row, column)), Some(p)) => {
            let verdict = if p < view.alpha {
                "significantly more accurate than"
            } else {
                "not significantly better than"
            };
            format!("  {column} is {verdict} {row} (p={p:.4})")
        }
        (Some((row, _)), None) => format!("  {row} on the diagonal"),
        _ => "  no models".to_string(),
    };

    let dominant = view.matrix.dominant_models(view.alpha);
    let dominant = if dominant.is_empty() {
        "  no model beats all others".to_string()
    } else {
        format!("  beats all others: {}", dominant.join(", "))
    };

    let block = Block::default().title(" Selection ").borders(Borders::ALL);
    let paragraph = Paragraph::new(vec![Line::from(selection), Line::from(dominant)]).block(block);
    frame.render_widget(paragraph, area);
}

/// Footer with keybinding hints.
fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(Line::from(Span::styled(
        " q:Quit  ←↑↓→/hjkl:Move",
        Style::default().fg(style::FOOTER_FG),
    )));
    frame.render_widget(footer, area);
}
