//! Keyboard input handling for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::view::MatrixView;

/// Maps a key event to a view action.
///
/// Guards on [`KeyEventKind::Press`] to avoid double-fire on some terminals.
pub fn handle_key(view: &mut MatrixView<'_>, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => view.quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => view.quit = true,
        KeyCode::Up | KeyCode::Char('k') => view.move_up(),
        KeyCode::Down | KeyCode::Char('j') => view.move_down(),
        KeyCode::Left | KeyCode::Char('h') => view.move_left(),
        KeyCode::Right | KeyCode::Char('l') => view.move_right(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;
    use crate::evaluation::{SignificanceMatrix, SignificanceTest};

    fn matrix() -> SignificanceMatrix {
        SignificanceMatrix {
            test: SignificanceTest::GiacominiWhite,
            models: vec!["a".into(), "b".into()],
            p_values: vec![vec![None, Some(0.2)], vec![Some(0.8), None]],
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_move_the_cursor() {
        let m = matrix();
        let mut view = MatrixView::new(&m);
        handle_key(&mut view, press(KeyCode::Down));
        handle_key(&mut view, press(KeyCode::Left));
        assert_eq!(view.selected, (1, 0));
        assert_eq!(view.selected_p_value(), Some(0.8));
    }

    #[test]
    fn ctrl_c_quits() {
        let m = matrix();
        let mut view = MatrixView::new(&m);
        handle_key(&mut view, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(view.quit);
    }

    #[test]
    fn releases_are_ignored() {
        let m = matrix();
        let mut view = MatrixView::new(&m);
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        handle_key(&mut view, release);
        assert!(!view.quit);
    }
}
