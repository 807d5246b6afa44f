use std::marker::PhantomData;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, StatefulWidget, Widget, Wrap};

use super::layout::centered_fixed;
use super::theme::Theme;
use super::widgets::text_input::{InputResult, TextInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Payload a popup hands back alongside its command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopupReply {
    Closed,
    Decision(bool),
    Text(String),
    Choice(usize),
    Save,
}

/// What a key press did to the active popup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopupOutcome<A> {
    /// Key consumed; the popup stays active.
    Open,
    /// Popup closed with nothing to run.
    Dismissed,
    /// Run `command` with `reply`; close the popup iff `close`.
    Run {
        command: A,
        reply: PopupReply,
        close: bool,
    },
    /// A terminal key was pressed but no command was registered; the
    /// caller surfaces a recoverable warning.
    NoCommand,
}

/// The single active modal popup. While one is active it receives every
/// key event exclusively; opening another popup replaces it (last wins),
/// discarding the previous popup's pending command.
///
/// Completion callbacks are modeled as a caller-supplied action value `A`
/// returned through [`PopupOutcome::Run`] together with the kind-specific
/// reply payload.
pub enum Popup<A> {
    Message {
        title: String,
        text: String,
        level: MessageLevel,
        on_close: Option<A>,
    },
    YesNo {
        prompt: String,
        command: Option<A>,
    },
    TextEntry {
        title: String,
        input: TextInput,
        password: bool,
        command: Option<A>,
    },
    MenuSelect {
        title: String,
        items: Vec<String>,
        selected: usize,
        top: usize,
        command: Option<A>,
        save_command: Option<A>,
        /// When set, Enter fires the command but keeps the popup open so
        /// the caller can accumulate several selections.
        manual_close: bool,
    },
}

impl<A: Clone> Popup<A> {
    pub fn message(title: &str, text: &str, on_close: Option<A>) -> Self {
        Popup::Message {
            title: title.to_string(),
            text: text.to_string(),
            level: MessageLevel::Info,
            on_close,
        }
    }

    pub fn warning(title: &str, text: &str) -> Self {
        Popup::Message {
            title: title.to_string(),
            text: text.to_string(),
            level: MessageLevel::Warning,
            on_close: None,
        }
    }

    pub fn error(title: &str, text: &str) -> Self {
        Popup::Message {
            title: title.to_string(),
            text: text.to_string(),
            level: MessageLevel::Error,
            on_close: None,
        }
    }

    pub fn yes_no(prompt: &str, command: Option<A>) -> Self {
        Popup::YesNo {
            prompt: prompt.to_string(),
            command,
        }
    }

    /// Text entry pre-seeded with `text`; the cursor starts at the end of
    /// the seed so the operator can append immediately.
    pub fn text_entry(title: &str, text: &str, password: bool, command: Option<A>) -> Self {
        Popup::TextEntry {
            title: title.to_string(),
            input: TextInput::new(text),
            password,
            command,
        }
    }

    pub fn menu_select(
        title: &str,
        items: Vec<String>,
        command: Option<A>,
        save_command: Option<A>,
        manual_close: bool,
    ) -> Self {
        Popup::MenuSelect {
            title: title.to_string(),
            items,
            selected: 0,
            top: 0,
            command,
            save_command,
            manual_close,
        }
    }

    /// Hint rendered in the status bar while this popup is active.
    pub fn help_text(&self) -> &'static str {
        match self {
            Popup::Message { .. } => "Enter/Esc: close",
            Popup::YesNo { .. } => "y: yes  n: no",
            Popup::TextEntry { .. } => "Enter: confirm  Esc: cancel",
            Popup::MenuSelect {
                save_command: Some(_),
                ..
            } => "Up/Down: move  Enter: choose  S: save  Esc: close",
            Popup::MenuSelect { .. } => "Up/Down: move  Enter: choose  Esc: close",
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PopupOutcome<A> {
        match self {
            Popup::Message { on_close, .. } => match key.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => match on_close.take() {
                    Some(command) => PopupOutcome::Run {
                        command,
                        reply: PopupReply::Closed,
                        close: true,
                    },
                    None => PopupOutcome::Dismissed,
                },
                _ => PopupOutcome::Open,
            },

            Popup::YesNo { command, .. } => {
                let decision = match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => Some(true),
                    KeyCode::Char('n') | KeyCode::Char('N') => Some(false),
                    _ => None,
                };
                match decision {
                    Some(value) => match command.clone() {
                        Some(command) => PopupOutcome::Run {
                            command,
                            reply: PopupReply::Decision(value),
                            close: true,
                        },
                        None => PopupOutcome::NoCommand,
                    },
                    None => PopupOutcome::Open,
                }
            }

            Popup::TextEntry { input, command, .. } => match input.handle(key) {
                InputResult::Submit => match command.clone() {
                    Some(command) => PopupOutcome::Run {
                        command,
                        reply: PopupReply::Text(input.value().to_string()),
                        close: true,
                    },
                    None => PopupOutcome::NoCommand,
                },
                InputResult::Cancel => PopupOutcome::Dismissed,
                InputResult::Continue => PopupOutcome::Open,
            },

            Popup::MenuSelect {
                items,
                selected,
                command,
                save_command,
                manual_close,
                ..
            } => match key.code {
                KeyCode::Up => {
                    *selected = selected.saturating_sub(1);
                    PopupOutcome::Open
                }
                KeyCode::Down => {
                    if *selected + 1 < items.len() {
                        *selected += 1;
                    }
                    PopupOutcome::Open
                }
                KeyCode::Enter => {
                    if items.is_empty() {
                        return PopupOutcome::Open;
                    }
                    match command.clone() {
                        Some(command) => PopupOutcome::Run {
                            command,
                            reply: PopupReply::Choice(*selected),
                            close: !*manual_close,
                        },
                        None => PopupOutcome::NoCommand,
                    }
                }
                // Save binding sits outside normal navigation and leaves
                // the popup state untouched.
                KeyCode::Char('S') => match save_command.clone() {
                    Some(command) => PopupOutcome::Run {
                        command,
                        reply: PopupReply::Save,
                        close: false,
                    },
                    None => PopupOutcome::Open,
                },
                KeyCode::Esc => PopupOutcome::Dismissed,
                _ => PopupOutcome::Open,
            },
        }
    }
}

/// Draw adapter: centered overlay cleared above whatever is beneath.
pub struct PopupView<'a, A> {
    pub theme: &'a Theme,
    marker: PhantomData<A>,
}

impl<'a, A> PopupView<'a, A> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            marker: PhantomData,
        }
    }
}

impl<A> StatefulWidget for PopupView<'_, A> {
    type State = Popup<A>;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Popup<A>) {
        let colors = &self.theme.colors;
        match state {
            Popup::Message {
                title, text, level, ..
            } => {
                let width = 54.min(area.width);
                let text_rows = (text.chars().count() as u16 / width.saturating_sub(4).max(1)) + 1;
                let rect = centered_fixed(width, text_rows + 4, area);
                Clear.render(rect, buf);
                let border = match level {
                    MessageLevel::Info => colors.success(),
                    MessageLevel::Warning => colors.warning(),
                    MessageLevel::Error => colors.error(),
                };
                let block = Block::bordered()
                    .title(format!(" {title} "))
                    .border_style(Style::default().fg(border))
                    .style(Style::default().bg(colors.bg()));
                let inner = block.inner(rect);
                block.render(rect, buf);
                Paragraph::new(text.as_str())
                    .style(Style::default().fg(colors.fg()))
                    .wrap(Wrap { trim: true })
                    .render(inner, buf);
            }

            Popup::YesNo { prompt, .. } => {
                let rect = centered_fixed(60.min(area.width), 6, area);
                Clear.render(rect, buf);
                let block = Block::bordered()
                    .title(" Confirm ")
                    .border_style(Style::default().fg(colors.warning()))
                    .style(Style::default().bg(colors.bg()));
                let inner = block.inner(rect);
                block.render(rect, buf);
                let lines = vec![
                    Line::from(Span::styled(
                        prompt.as_str(),
                        Style::default().fg(colors.fg()),
                    )),
                    Line::from(""),
                    Line::from(Span::styled(
                        "  [y] Yes   [n] No",
                        Style::default()
                            .fg(colors.accent())
                            .add_modifier(Modifier::BOLD),
                    )),
                ];
                Paragraph::new(lines)
                    .wrap(Wrap { trim: true })
                    .render(inner, buf);
            }

            Popup::TextEntry {
                title,
                input,
                password,
                ..
            } => {
                let rect = centered_fixed(60.min(area.width), 5, area);
                Clear.render(rect, buf);
                let block = Block::bordered()
                    .title(format!(" {title} "))
                    .border_style(Style::default().fg(colors.border_focused()))
                    .style(Style::default().bg(colors.bg()));
                let inner = block.inner(rect);
                block.render(rect, buf);

                let cursor_style = Style::default()
                    .fg(colors.selected_fg())
                    .bg(colors.selected_bg());
                let line = if *password {
                    Line::from(vec![
                        Span::raw(" "),
                        Span::styled(
                            "\u{2022}".repeat(input.char_len()),
                            Style::default().fg(colors.fg()),
                        ),
                        Span::styled(" ", cursor_style),
                    ])
                } else {
                    let (before, at, after) = input.render_parts();
                    Line::from(vec![
                        Span::raw(" "),
                        Span::styled(before.to_string(), Style::default().fg(colors.fg())),
                        Span::styled(at.unwrap_or(' ').to_string(), cursor_style),
                        Span::styled(after.to_string(), Style::default().fg(colors.fg())),
                    ])
                };
                Paragraph::new(vec![Line::from(""), line]).render(inner, buf);
            }

            Popup::MenuSelect {
                title,
                items,
                selected,
                top,
                ..
            } => {
                let height = (items.len() as u16).clamp(1, 12) + 2;
                let rect = centered_fixed(64.min(area.width), height, area);
                Clear.render(rect, buf);
                let block = Block::bordered()
                    .title(format!(" {title} "))
                    .border_style(Style::default().fg(colors.border_focused()))
                    .style(Style::default().bg(colors.bg()));
                let inner = block.inner(rect);
                block.render(rect, buf);

                let visible = inner.height as usize;
                if visible > 0 {
                    if *selected < *top {
                        *top = *selected;
                    } else if *selected >= *top + visible {
                        *top = *selected + 1 - visible;
                    }
                }

                let mut lines = Vec::new();
                for (i, item) in items.iter().enumerate().skip(*top).take(visible) {
                    let style = if i == *selected {
                        Style::default()
                            .fg(colors.selected_fg())
                            .bg(colors.selected_bg())
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(colors.fg())
                    };
                    let marker = if i == *selected { ">" } else { " " };
                    lines.push(Line::from(Span::styled(format!("{marker} {item}"), style)));
                }
                Paragraph::new(lines).render(inner, buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Cmd {
        Close,
        Pick,
        Save,
        Confirm,
        Edit,
    }

    #[test]
    fn message_close_fires_optional_callback() {
        let mut p: Popup<Cmd> = Popup::message("Done", "Created.", Some(Cmd::Close));
        assert_eq!(p.handle_key(key(KeyCode::Char('x'))), PopupOutcome::Open);
        assert_eq!(
            p.handle_key(key(KeyCode::Enter)),
            PopupOutcome::Run {
                command: Cmd::Close,
                reply: PopupReply::Closed,
                close: true,
            }
        );
    }

    #[test]
    fn warning_without_callback_just_dismisses() {
        let mut p: Popup<Cmd> = Popup::warning("No results", "Nothing matched.");
        assert_eq!(p.handle_key(key(KeyCode::Esc)), PopupOutcome::Dismissed);
    }

    #[test]
    fn yes_no_reports_both_decisions() {
        let mut p: Popup<Cmd> = Popup::yes_no("Update?", Some(Cmd::Confirm));
        assert_eq!(
            p.handle_key(key(KeyCode::Char('y'))),
            PopupOutcome::Run {
                command: Cmd::Confirm,
                reply: PopupReply::Decision(true),
                close: true,
            }
        );

        let mut p: Popup<Cmd> = Popup::yes_no("Update?", Some(Cmd::Confirm));
        assert_eq!(
            p.handle_key(key(KeyCode::Char('n'))),
            PopupOutcome::Run {
                command: Cmd::Confirm,
                reply: PopupReply::Decision(false),
                close: true,
            }
        );
    }

    #[test]
    fn yes_no_without_command_surfaces_no_command() {
        let mut p: Popup<Cmd> = Popup::yes_no("Update?", None);
        assert_eq!(p.handle_key(key(KeyCode::Char('y'))), PopupOutcome::NoCommand);
    }

    #[test]
    fn text_entry_preseeds_with_cursor_at_end() {
        let mut p: Popup<Cmd> = Popup::text_entry("Edit", "abc", false, Some(Cmd::Edit));
        if let Popup::TextEntry { input, .. } = &p {
            assert_eq!(input.cursor(), 3);
        } else {
            unreachable!();
        }
        // Typing appends rather than inserting at the front.
        p.handle_key(key(KeyCode::Char('d')));
        assert_eq!(
            p.handle_key(key(KeyCode::Enter)),
            PopupOutcome::Run {
                command: Cmd::Edit,
                reply: PopupReply::Text("abcd".to_string()),
                close: true,
            }
        );
    }

    #[test]
    fn text_entry_escape_dismisses_without_running() {
        let mut p: Popup<Cmd> = Popup::text_entry("Edit", "abc", false, Some(Cmd::Edit));
        assert_eq!(p.handle_key(key(KeyCode::Esc)), PopupOutcome::Dismissed);
    }

    #[test]
    fn menu_select_closes_on_enter_by_default() {
        let mut p: Popup<Cmd> = Popup::menu_select(
            "Pick",
            vec!["a".into(), "b".into()],
            Some(Cmd::Pick),
            None,
            false,
        );
        p.handle_key(key(KeyCode::Down));
        assert_eq!(
            p.handle_key(key(KeyCode::Enter)),
            PopupOutcome::Run {
                command: Cmd::Pick,
                reply: PopupReply::Choice(1),
                close: true,
            }
        );
    }

    #[test]
    fn manual_close_menu_stays_open_and_save_key_fires() {
        let mut p: Popup<Cmd> = Popup::menu_select(
            "Fields",
            vec!["name".into(), "email".into()],
            Some(Cmd::Pick),
            Some(Cmd::Save),
            true,
        );
        assert_eq!(
            p.handle_key(key(KeyCode::Enter)),
            PopupOutcome::Run {
                command: Cmd::Pick,
                reply: PopupReply::Choice(0),
                close: false,
            }
        );
        assert_eq!(
            p.handle_key(key(KeyCode::Char('S'))),
            PopupOutcome::Run {
                command: Cmd::Save,
                reply: PopupReply::Save,
                close: false,
            }
        );
    }

    #[test]
    fn menu_select_without_command_surfaces_no_command() {
        let mut p: Popup<Cmd> = Popup::menu_select("Pick", vec!["a".into()], None, None, false);
        assert_eq!(p.handle_key(key(KeyCode::Enter)), PopupOutcome::NoCommand);
    }

    #[test]
    fn menu_select_navigation_clamps() {
        let mut p: Popup<Cmd> =
            Popup::menu_select("Pick", vec!["a".into(), "b".into()], Some(Cmd::Pick), None, false);
        p.handle_key(key(KeyCode::Up));
        p.handle_key(key(KeyCode::Down));
        p.handle_key(key(KeyCode::Down));
        p.handle_key(key(KeyCode::Down));
        if let Popup::MenuSelect { selected, .. } = &p {
            assert_eq!(*selected, 1);
        } else {
            unreachable!();
        }
    }

    #[test]
    fn empty_menu_enter_is_noop() {
        let mut p: Popup<Cmd> = Popup::menu_select("Pick", vec![], Some(Cmd::Pick), None, false);
        assert_eq!(p.handle_key(key(KeyCode::Enter)), PopupOutcome::Open);
    }
}
