use std::collections::HashSet;
use std::marker::PhantomData;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, StatefulWidget, Widget};

use crate::ui::theme::Theme;
use crate::ui::widget::WidgetBase;

use super::scroll_menu::{MenuEntry, ScrollMenu};

/// A menu row with a stable identity the checked set can be keyed by.
pub trait CheckEntry: MenuEntry {
    fn key(&self) -> &str;
}

/// Scroll menu augmented with a per-item checked flag.
///
/// Checked keys are tracked separately from the item list and survive a
/// `clear()` + refill cycle, so a search that narrows the visible rows does
/// not drop selections made earlier. `uncheck_all` is the explicit reset.
pub struct CheckboxMenu<T: CheckEntry> {
    menu: ScrollMenu<T>,
    checked: HashSet<String>,
    pub checked_char: char,
}

impl<T: CheckEntry> CheckboxMenu<T> {
    pub fn new(base: WidgetBase, checked_char: char) -> Self {
        Self {
            menu: ScrollMenu::new(base),
            checked: HashSet::new(),
            checked_char,
        }
    }

    pub fn base(&self) -> &WidgetBase {
        &self.menu.base
    }

    pub fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.menu.base
    }

    pub fn menu(&self) -> &ScrollMenu<T> {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut ScrollMenu<T> {
        &mut self.menu
    }

    /// Flip the checked state of the item with the given key. No-op when
    /// no present item carries that key.
    pub fn toggle(&mut self, key: &str) -> bool {
        if !self.menu.items().iter().any(|item| item.key() == key) {
            return false;
        }
        if !self.checked.remove(key) {
            self.checked.insert(key.to_string());
        }
        true
    }

    /// Flip the checked state of the highlighted item.
    pub fn toggle_current(&mut self) -> bool {
        let Some(key) = self.menu.get().map(|item| item.key().to_string()) else {
            return false;
        };
        self.toggle(&key)
    }

    pub fn is_checked(&self, key: &str) -> bool {
        self.checked.contains(key)
    }

    /// Number of checked entries, including ones whose backing item is not
    /// currently visible.
    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }

    pub fn checked_keys(&self) -> impl Iterator<Item = &str> {
        self.checked.iter().map(String::as_str)
    }

    pub fn uncheck_all(&mut self) {
        self.checked.clear();
    }
}

/// Draw adapter mirroring the scroll menu, with a checked marker column.
pub struct CheckboxMenuView<'a, T> {
    pub focused: bool,
    pub theme: &'a Theme,
    marker: PhantomData<T>,
}

impl<'a, T> CheckboxMenuView<'a, T> {
    pub fn new(focused: bool, theme: &'a Theme) -> Self {
        Self {
            focused,
            theme,
            marker: PhantomData,
        }
    }
}

impl<T: CheckEntry> StatefulWidget for CheckboxMenuView<'_, T> {
    type State = CheckboxMenu<T>;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut CheckboxMenu<T>) {
        let colors = &self.theme.colors;
        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };

        let block = Block::bordered()
            .title(format!(" {} ", state.menu.base.title))
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        state.menu.ensure_visible(inner.height as usize);

        let checked_char = state.checked_char;
        let selected = state.menu.selected_index();
        let top = state.menu.top();
        let mut lines = Vec::new();
        for (i, item) in state
            .menu
            .items()
            .iter()
            .enumerate()
            .skip(top)
            .take(inner.height as usize)
        {
            let is_selected = Some(i) == selected;
            let mark = if state.checked.contains(item.key()) {
                checked_char
            } else {
                ' '
            };
            let style = if is_selected && self.focused {
                Style::default()
                    .fg(colors.selected_fg())
                    .bg(colors.selected_bg())
                    .add_modifier(Modifier::BOLD)
            } else if is_selected {
                Style::default().fg(colors.accent())
            } else {
                Style::default().fg(colors.fg())
            };
            lines.push(Line::from(Span::styled(
                format!("[{mark}] {}", item.label()),
                style,
            )));
        }
        Paragraph::new(lines).render(inner, buf);
    }
}
