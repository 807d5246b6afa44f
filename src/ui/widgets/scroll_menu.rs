use std::marker::PhantomData;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, StatefulWidget, Widget};

use crate::ui::theme::Theme;
use crate::ui::widget::WidgetBase;

/// Something displayable as a menu row.
pub trait MenuEntry {
    fn label(&self) -> String;
}

impl MenuEntry for String {
    fn label(&self) -> String {
        self.clone()
    }
}

impl MenuEntry for &str {
    fn label(&self) -> String {
        (*self).to_string()
    }
}

/// Ordered list with one highlighted item and a scrolling viewport.
///
/// Insertion order is display order. The selected index, when present, is
/// always within `[0, len)`; clearing the items resets both the selection
/// and the viewport to the start.
pub struct ScrollMenu<T> {
    pub base: WidgetBase,
    items: Vec<T>,
    selected: Option<usize>,
    top: usize,
}

impl<T: MenuEntry> ScrollMenu<T> {
    pub fn new(base: WidgetBase) -> Self {
        Self {
            base,
            items: Vec::new(),
            selected: None,
            top: 0,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Currently highlighted item, if any.
    pub fn get(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }

    pub fn add_item(&mut self, item: T) {
        self.items.push(item);
        if self.selected.is_none() {
            self.selected = Some(0);
        }
    }

    /// Append items preserving call order.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.add_item(item);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
        self.top = 0;
    }

    /// Move the selection to `index`, clamping out-of-range values into
    /// range. Returns true only when the effective selection changed, so
    /// callers can keep dependent labels in sync without reacting to
    /// no-op clamps.
    pub fn set_selected(&mut self, index: usize) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let clamped = index.min(self.items.len() - 1);
        if self.selected == Some(clamped) {
            return false;
        }
        self.selected = Some(clamped);
        true
    }

    /// Move the selection up by one, clamped at the first item. Returns
    /// true when the selection actually moved.
    pub fn scroll_up(&mut self) -> bool {
        match self.selected {
            Some(i) if i > 0 => {
                self.selected = Some(i - 1);
                true
            }
            _ => false,
        }
    }

    /// Move the selection down by one, clamped at the last item.
    pub fn scroll_down(&mut self) -> bool {
        match self.selected {
            Some(i) if i + 1 < self.items.len() => {
                self.selected = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    /// Adjust the viewport top so the selection stays within a window of
    /// `height` rows. Called with the viewport height during the draw pass
    /// that follows every key event.
    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        let Some(selected) = self.selected else {
            self.top = 0;
            return;
        };
        if selected < self.top {
            self.top = selected;
        } else if selected >= self.top + height {
            self.top = selected + 1 - height;
        }
        // Avoid a dangling window after the item list shrank.
        let max_top = self.items.len().saturating_sub(height);
        self.top = self.top.min(max_top);
    }
}

/// Draw adapter: borders, title, viewport rows, selection highlight.
pub struct ScrollMenuView<'a, T> {
    pub focused: bool,
    pub theme: &'a Theme,
    marker: PhantomData<T>,
}

impl<'a, T> ScrollMenuView<'a, T> {
    pub fn new(focused: bool, theme: &'a Theme) -> Self {
        Self {
            focused,
            theme,
            marker: PhantomData,
        }
    }
}

impl<T: MenuEntry> StatefulWidget for ScrollMenuView<'_, T> {
    type State = ScrollMenu<T>;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut ScrollMenu<T>) {
        let colors = &self.theme.colors;
        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };

        let block = Block::bordered()
            .title(format!(" {} ", state.base.title))
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        state.ensure_visible(inner.height as usize);

        let mut lines = Vec::new();
        for (i, item) in state
            .items
            .iter()
            .enumerate()
            .skip(state.top)
            .take(inner.height as usize)
        {
            let is_selected = Some(i) == state.selected;
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
            let marker = if is_selected { ">" } else { " " };
            lines.push(Line::from(Span::styled(
                format!("{marker} {}", item.label()),
                style,
            )));
        }
        Paragraph::new(lines).render(inner, buf);
    }
}
