use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, StatefulWidget, Widget};
use thiserror::Error;

use crate::ui::theme::Theme;
use crate::ui::widget::WidgetBase;

use super::text_input::TextInput;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Required fields not set: {}", .fields.join(", "))]
    MissingRequired { fields: Vec<String> },
}

/// What a key press did to the form; the owning screen reacts to the
/// terminal variants (submit validation, popups, teardown).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormEvent {
    Consumed,
    Submit,
    Cancel,
    /// The selected field carries a choice set; open a picker for it.
    OpenChoices(usize),
}

/// One named entry field: text buffer, cursor, required/password flags and
/// an optional choice set filled through a menu popup instead of typing.
pub struct FormField {
    pub name: String,
    pub input: TextInput,
    pub required: bool,
    pub password: bool,
    pub choices: Option<Vec<String>>,
    selected: bool,
}

impl FormField {
    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Ordered sequence of entry fields with tab-order navigation and
/// required-field validation gating submission.
///
/// Sequence order is tab order. Exactly one field is selected whenever the
/// sequence is non-empty.
pub struct Form {
    pub base: WidgetBase,
    fields: Vec<FormField>,
    selected: usize,
    top: usize,
}

impl Form {
    pub fn new(base: WidgetBase) -> Self {
        Self {
            base,
            fields: Vec::new(),
            selected: 0,
            top: 0,
        }
    }

    /// Append a field at the next tab-order position.
    pub fn add_field(&mut self, name: &str, init_text: &str, required: bool, password: bool) {
        let selected = self.fields.is_empty();
        self.fields.push(FormField {
            name: name.to_string(),
            input: TextInput::new(init_text),
            required,
            password,
            choices: None,
            selected,
        });
    }

    /// Append a field whose value is picked from a fixed choice set.
    pub fn add_choice_field(
        &mut self,
        name: &str,
        init_text: &str,
        required: bool,
        choices: Vec<String>,
    ) {
        self.add_field(name, init_text, required, false);
        if let Some(field) = self.fields.last_mut() {
            field.choices = Some(choices);
        }
    }

    pub fn clear_fields(&mut self) {
        self.fields.clear();
        self.selected = 0;
        self.top = 0;
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_field(&self) -> Option<&FormField> {
        self.fields.get(self.selected)
    }

    pub fn set_field_value(&mut self, index: usize, value: &str) {
        if let Some(field) = self.fields.get_mut(index) {
            field.input.set_text(value);
        }
    }

    /// Advance the selection cyclically; the previous field is deselected
    /// before the next one is selected.
    pub fn next_field(&mut self) {
        if self.fields.is_empty() {
            return;
        }
        self.fields[self.selected].selected = false;
        self.selected = (self.selected + 1) % self.fields.len();
        self.fields[self.selected].selected = true;
    }

    /// Valid iff every required field has a non-empty buffer. The error
    /// enumerates the unmet fields by name.
    pub fn validate(&self) -> Result<(), FormError> {
        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.required && f.input.is_empty())
            .map(|f| f.name.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormError::MissingRequired { fields: missing })
        }
    }

    /// Accumulated (name, value) pairs in field order.
    pub fn values(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.input.value().to_string()))
            .collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormEvent {
        match key.code {
            KeyCode::Tab => {
                self.next_field();
                FormEvent::Consumed
            }
            KeyCode::Esc => FormEvent::Cancel,
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                FormEvent::Submit
            }
            KeyCode::Enter => {
                if self
                    .selected_field()
                    .is_some_and(|f| f.choices.is_some())
                {
                    FormEvent::OpenChoices(self.selected)
                } else {
                    FormEvent::Submit
                }
            }
            _ => {
                if let Some(field) = self.fields.get_mut(self.selected) {
                    field.input.handle(key);
                }
                FormEvent::Consumed
            }
        }
    }

    /// Keep the selected field inside a window of `visible` fields.
    fn ensure_visible(&mut self, visible: usize) {
        if visible == 0 {
            return;
        }
        if self.selected < self.top {
            self.top = self.selected;
        } else if self.selected >= self.top + visible {
            self.top = self.selected + 1 - visible;
        }
    }
}

const FIELD_ROWS: u16 = 2;

/// Draw adapter. Unselected fields are drawn first and the selected field
/// last, so its cursor affordance wins when regions overlap.
pub struct FormView<'a> {
    pub theme: &'a Theme,
}

impl StatefulWidget for FormView<'_> {
    type State = Form;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Form) {
        let colors = &self.theme.colors;
        let block = Block::bordered()
            .title(format!(" {} ", state.base.title))
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let visible = (inner.height / FIELD_ROWS) as usize;
        state.ensure_visible(visible);

        let window = state.top..(state.top + visible).min(state.fields.len());
        for i in window.clone() {
            if i != state.selected {
                let rect = field_rect(inner, i - state.top);
                draw_field(&state.fields[i], false, rect, buf, self.theme);
            }
        }
        if window.contains(&state.selected) {
            let rect = field_rect(inner, state.selected - state.top);
            draw_field(&state.fields[state.selected], true, rect, buf, self.theme);
        }
    }
}

fn field_rect(inner: Rect, slot: usize) -> Rect {
    Rect::new(
        inner.x,
        inner.y + slot as u16 * FIELD_ROWS,
        inner.width,
        FIELD_ROWS.min(inner.height.saturating_sub(slot as u16 * FIELD_ROWS)),
    )
}

fn draw_field(field: &FormField, selected: bool, rect: Rect, buf: &mut Buffer, theme: &Theme) {
    let colors = &theme.colors;
    let marker = if field.required { " *" } else { "" };
    let choice_hint = if field.choices.is_some() {
        "  [Enter: choose]"
    } else {
        ""
    };
    let label_style = if selected {
        Style::default()
            .fg(colors.accent())
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(colors.fg())
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(format!(" {}{marker}:", field.name), label_style),
        Span::styled(choice_hint, Style::default().fg(colors.text_dim())),
    ])];

    let value_style = Style::default().fg(if selected {
        colors.fg()
    } else {
        colors.text_dim()
    });
    if field.password {
        let masked = "\u{2022}".repeat(field.input.char_len());
        let mut spans = vec![Span::raw("   "), Span::styled(masked, value_style)];
        if selected {
            spans.push(Span::styled(
                " ",
                Style::default().bg(colors.selected_bg()),
            ));
        }
        lines.push(Line::from(spans));
    } else if selected {
        let (before, at, after) = field.input.render_parts();
        let cursor_style = Style::default()
            .fg(colors.selected_fg())
            .bg(colors.selected_bg());
        lines.push(Line::from(vec![
            Span::raw("   "),
            Span::styled(before.to_string(), value_style),
            Span::styled(at.unwrap_or(' ').to_string(), cursor_style),
            Span::styled(after.to_string(), value_style),
        ]));
    } else {
        lines.push(Line::from(vec![
            Span::raw("   "),
            Span::styled(field.input.value().to_string(), value_style),
        ]));
    }

    Paragraph::new(lines).render(rect, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::layout::GridLayout;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn form() -> Form {
        let mut grid = GridLayout::new(9, 3);
        Form::new(grid.place("Add Customer", 4, 1, 5, 2, true).unwrap())
    }

    fn selected_names(form: &Form) -> Vec<&str> {
        form.fields()
            .iter()
            .filter(|f| f.is_selected())
            .map(|f| f.name.as_str())
            .collect()
    }

    #[test]
    fn first_field_is_selected() {
        let mut f = form();
        f.add_field("name", "", true, false);
        f.add_field("age", "", false, false);
        assert_eq!(selected_names(&f), vec!["name"]);
        assert_eq!(f.selected_index(), 0);
    }

    #[test]
    fn tab_order_cycles_with_exactly_one_selected() {
        let mut f = form();
        f.add_field("a", "", false, false);
        f.add_field("b", "", false, false);
        f.add_field("c", "", false, false);

        let mut visited = vec![f.selected_index()];
        for _ in 0..5 {
            f.handle_key(key(KeyCode::Tab));
            assert_eq!(selected_names(&f).len(), 1);
            visited.push(f.selected_index());
        }
        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn validation_names_unmet_required_fields() {
        let mut f = form();
        f.add_field("name", "", true, false);
        f.add_field("age", "", false, false);

        let err = f.validate().unwrap_err();
        assert_eq!(
            err,
            FormError::MissingRequired {
                fields: vec!["name".to_string()]
            }
        );
        assert!(err.to_string().contains("name"));
        assert!(!err.to_string().contains("age"));

        f.set_field_value(0, "x");
        assert!(f.validate().is_ok());
    }

    #[test]
    fn typing_edits_only_the_selected_field() {
        let mut f = form();
        f.add_field("a", "", false, false);
        f.add_field("b", "", false, false);

        f.handle_key(key(KeyCode::Char('x')));
        f.handle_key(key(KeyCode::Tab));
        f.handle_key(key(KeyCode::Char('y')));

        assert_eq!(f.fields()[0].input.value(), "x");
        assert_eq!(f.fields()[1].input.value(), "y");
    }

    #[test]
    fn enter_submits_unless_field_has_choices() {
        let mut f = form();
        f.add_field("name", "", true, false);
        f.add_choice_field("tier", "", false, vec!["gold".into(), "basic".into()]);

        assert_eq!(f.handle_key(key(KeyCode::Enter)), FormEvent::Submit);
        f.handle_key(key(KeyCode::Tab));
        assert_eq!(f.handle_key(key(KeyCode::Enter)), FormEvent::OpenChoices(1));
    }

    #[test]
    fn ctrl_s_always_submits() {
        let mut f = form();
        f.add_choice_field("tier", "", false, vec!["gold".into()]);
        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        assert_eq!(f.handle_key(ctrl_s), FormEvent::Submit);
    }

    #[test]
    fn clear_fields_resets_sequence_and_selection() {
        let mut f = form();
        f.add_field("a", "", false, false);
        f.add_field("b", "", false, false);
        f.next_field();
        f.clear_fields();
        assert!(f.is_empty());
        assert_eq!(f.selected_index(), 0);
        assert!(f.selected_field().is_none());
    }

    #[test]
    fn failed_validation_preserves_buffers() {
        let mut f = form();
        f.add_field("name", "", true, false);
        f.add_field("note", "keep me", false, false);
        assert!(f.validate().is_err());
        assert_eq!(f.fields()[1].input.value(), "keep me");
    }
}
