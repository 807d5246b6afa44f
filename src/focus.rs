use thiserror::Error;

use crate::ui::widget::{WidgetBase, WidgetId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FocusError {
    #[error("widget '{0}' cannot receive input")]
    NotFocusable(String),
}

/// Owns the single focused-widget reference.
///
/// Exactly one widget is eligible to receive key input at a time; modal
/// popups bypass focus entirely (the dispatcher checks them first). The
/// previous holder is reported back from `move_focus` so the caller can
/// let it drop any editing affordance.
#[derive(Debug, Default)]
pub struct FocusController {
    focused: Option<WidgetId>,
}

impl FocusController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<WidgetId> {
        self.focused
    }

    pub fn is_focused(&self, id: WidgetId) -> bool {
        self.focused == Some(id)
    }

    /// Make `target` the sole focused widget. Fails if the widget does not
    /// support key input; on success returns the widget that lost focus.
    pub fn move_focus(&mut self, target: &WidgetBase) -> Result<Option<WidgetId>, FocusError> {
        if !target.is_focusable() {
            return Err(FocusError::NotFocusable(target.title.clone()));
        }
        Ok(self.focused.replace(target.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::layout::GridLayout;

    #[test]
    fn focus_moves_and_reports_previous_holder() {
        let mut grid = GridLayout::new(3, 3);
        let a = grid.place("Apps", 0, 0, 1, 1, true).unwrap();
        let b = grid.place("Models", 1, 0, 1, 1, true).unwrap();

        let mut focus = FocusController::new();
        assert_eq!(focus.move_focus(&a).unwrap(), None);
        assert!(focus.is_focused(a.id));

        assert_eq!(focus.move_focus(&b).unwrap(), Some(a.id));
        assert!(focus.is_focused(b.id));
        assert!(!focus.is_focused(a.id));
    }

    #[test]
    fn non_focusable_widget_is_rejected() {
        let mut grid = GridLayout::new(3, 3);
        let label = grid.place("Status label", 0, 0, 1, 1, false).unwrap();
        let menu = grid.place("Apps", 1, 0, 1, 1, true).unwrap();

        let mut focus = FocusController::new();
        focus.move_focus(&menu).unwrap();

        let err = focus.move_focus(&label).unwrap_err();
        assert!(matches!(err, FocusError::NotFocusable(_)));
        // Focus is unchanged after the failed move.
        assert!(focus.is_focused(menu.id));
    }
}
