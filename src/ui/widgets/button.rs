use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::ui::theme::Theme;
use crate::ui::widget::WidgetBase;

/// Bordered push button; the title is the label.
pub struct Button {
    pub base: WidgetBase,
}

impl Button {
    pub fn new(base: WidgetBase) -> Self {
        Self { base }
    }
}

pub struct ButtonView<'a> {
    pub button: &'a Button,
    pub focused: bool,
    pub theme: &'a Theme,
}

impl Widget for ButtonView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };
        let block = Block::bordered()
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let style = if self.focused {
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        };
        let label = &self.button.base.title;
        let pad = (inner.width as usize).saturating_sub(label.chars().count()) / 2;
        Paragraph::new(Line::from(Span::styled(
            format!("{}{label}", " ".repeat(pad)),
            style,
        )))
        .render(inner, buf);
    }
}
