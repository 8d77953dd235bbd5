//! Interactive heatmap of a significance matrix.
//!
//! Feature-gated behind `tui`. Launch with `compare --tui` on the CLI.

mod controls;
mod layout;
mod style;
mod view;

pub use view::{DEFAULT_ALPHA, MatrixView};

use std::io;

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::evaluation::SignificanceMatrix;

/// Shows `matrix` until the user quits.
///
/// Sets up the terminal (raw mode, alternate screen), runs the event loop,
/// and restores the terminal on exit.
///
/// # Errors
///
/// Returns any terminal I/O error; the terminal is restored first.
pub fn run(matrix: &SignificanceMatrix) -> io::Result<()> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e);
    }

    let mut terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => terminal,
        Err(e) => {
            let _ = disable_raw_mode();
            return Err(e);
        }
    };

    let mut view = MatrixView::new(matrix);
    let result = event_loop(&mut terminal, &mut view);

    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    view: &mut MatrixView<'_>,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| layout::render(frame, view))?;

        if view.quit {
            return Ok(());
        }

        if let Event::Key(key) = event::read()? {
            controls::handle_key(view, key);
        }
    }
}
