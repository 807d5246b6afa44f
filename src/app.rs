use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph};
use ratatui::Frame;

use crate::data::{pk_field, DataSource, FieldDescriptor, FieldKind, ModelHandle, Record};
use crate::focus::FocusController;
use crate::ui::layout::{centered_fixed, GridLayout};
use crate::ui::popup::{Popup, PopupOutcome, PopupReply, PopupView};
use crate::ui::theme::Theme;
use crate::ui::widget::{WidgetBase, WidgetId};
use crate::ui::widgets::button::{Button, ButtonView};
use crate::ui::widgets::checkbox_menu::{CheckEntry, CheckboxMenu, CheckboxMenuView};
use crate::ui::widgets::form::{Form, FormEvent, FormView};
use crate::ui::widgets::scroll_menu::{MenuEntry, ScrollMenu, ScrollMenuView};
use crate::ui::widgets::text_input::{InputResult, TextInput};

/// Deferred work a popup hands back when it completes. Interpreted by
/// [`App::run_command`] together with the popup's reply payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Re-read the open model's records and refill the row list.
    RefreshRows,
    /// A field of the record `pk` was picked in the edit menu.
    ChooseRecordField { pk: String },
    /// A replacement value for `field` was entered.
    ApplyEdit { pk: String, field: String },
    /// The operator confirmed (or declined) writing `value` to `field`.
    ConfirmUpdate {
        pk: String,
        field: String,
        value: String,
    },
    /// A choice was picked for the form field at `field_index`.
    PickChoice { field_index: usize },
}

/// One row of the record list; checked state is keyed by primary key so it
/// survives refilters.
pub struct RecordEntry {
    pub pk: String,
    pub text: String,
}

impl MenuEntry for RecordEntry {
    fn label(&self) -> String {
        self.text.clone()
    }
}

impl CheckEntry for RecordEntry {
    fn key(&self) -> &str {
        &self.pk
    }
}

const GRID_ROWS: u16 = 9;
const GRID_COLS: u16 = 3;

/// Top-level screen state: the placed widgets, the single focus holder,
/// the optional entry form and the optional modal popup.
///
/// Key dispatch runs to completion before the next draw; a quit chord is
/// checked first, then an active popup consumes the key exclusively, then
/// an active form, then focus cycling, then the focused widget.
pub struct App {
    source: Box<dyn DataSource>,
    theme: &'static Theme,
    grid: GridLayout,

    app_menu: ScrollMenu<String>,
    model_menu: ScrollMenu<String>,
    action_menu: ScrollMenu<String>,
    model_label: WidgetBase,
    search_base: WidgetBase,
    search: TextInput,
    add_button: Button,
    rows: CheckboxMenu<RecordEntry>,

    form: Option<Form>,
    popup: Option<Popup<Command>>,
    focus: FocusController,

    selected_app: Option<String>,
    selected_model: Option<ModelHandle>,
    records: Vec<Record>,
    search_text: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(source: Box<dyn DataSource>, theme: &'static Theme, checked_char: char) -> Result<Self> {
        let mut grid = GridLayout::new(GRID_ROWS, GRID_COLS);

        let app_menu = ScrollMenu::new(
            grid.place("Apps", 0, 0, 3, 1, true)?
                .with_help("Up/Down: move  Enter: open app  Tab: next widget"),
        );
        let model_menu = ScrollMenu::new(
            grid.place("Models", 3, 0, 6, 1, true)?
                .with_help("Up/Down: move  Enter: open model  Tab: next widget"),
        );
        let model_label = grid.place("No model open", 0, 1, 1, 2, false)?;
        let search_base = grid
            .place("Search", 1, 1, 1, 1, true)?
            .with_help("type + Enter: filter rows  Esc/Ctrl+U: clear filter");
        let action_menu = ScrollMenu::new(
            grid.place("Actions (0 of 0 selected)", 1, 2, 2, 1, true)?
                .with_help("Up/Down: move  Enter: run action"),
        );
        let add_button = Button::new(
            grid.place("Add", 3, 2, 1, 1, true)?
                .with_help("Enter: open the create form"),
        );
        let rows = CheckboxMenu::new(
            grid.place("Records", 4, 1, 5, 2, true)?
                .with_help("Space: select  Enter: edit fields  Up/Down: move"),
            checked_char,
        );

        let mut app = Self {
            source,
            theme,
            grid,
            app_menu,
            model_menu,
            action_menu,
            model_label,
            search_base,
            search: TextInput::new(""),
            add_button,
            rows,
            form: None,
            popup: None,
            focus: FocusController::new(),
            selected_app: None,
            selected_model: None,
            records: Vec::new(),
            search_text: None,
            should_quit: false,
        };

        app.app_menu.add_items(app.source.list_apps());
        app.action_menu
            .add_items(["Clear selection".to_string(), "Refresh".to_string()]);
        app.focus_widget(app.app_menu.base.id);
        Ok(app)
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn popup(&self) -> Option<&Popup<Command>> {
        self.popup.as_ref()
    }

    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    pub fn focused_id(&self) -> Option<WidgetId> {
        self.focus.focused()
    }

    pub fn rows_id(&self) -> WidgetId {
        self.rows.base().id
    }

    pub fn model_menu_id(&self) -> WidgetId {
        self.model_menu.base.id
    }

    pub fn search_id(&self) -> WidgetId {
        self.search_base.id
    }

    pub fn add_button_id(&self) -> WidgetId {
        self.add_button.base.id
    }

    pub fn row_labels(&self) -> Vec<String> {
        self.rows.menu().items().iter().map(|r| r.text.clone()).collect()
    }

    pub fn checked_rows(&self) -> usize {
        self.rows.checked_count()
    }

    pub fn actions_title(&self) -> &str {
        &self.action_menu.base.title
    }

    pub fn search_value(&self) -> &str {
        self.search.value()
    }

    /// Jump focus to a widget by id; unknown ids are ignored.
    pub fn focus_widget(&mut self, id: WidgetId) {
        let base = if id == self.app_menu.base.id {
            &self.app_menu.base
        } else if id == self.model_menu.base.id {
            &self.model_menu.base
        } else if id == self.search_base.id {
            &self.search_base
        } else if id == self.action_menu.base.id {
            &self.action_menu.base
        } else if id == self.add_button.base.id {
            &self.add_button.base
        } else if id == self.rows.base().id {
            self.rows.base()
        } else {
            return;
        };
        let _ = self.focus.move_focus(base);
    }

    fn focus_order(&self) -> [WidgetId; 6] {
        [
            self.app_menu.base.id,
            self.model_menu.base.id,
            self.search_base.id,
            self.action_menu.base.id,
            self.add_button.base.id,
            self.rows.base().id,
        ]
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = self.focus_order();
        let position = self
            .focus
            .focused()
            .and_then(|id| order.iter().position(|&o| o == id));
        let next = match position {
            Some(i) if forward => (i + 1) % order.len(),
            Some(i) => (i + order.len() - 1) % order.len(),
            None => 0,
        };
        self.focus_widget(order[next]);
    }

    /// Line for the bottom bar: the popup's hint wins, then the form's,
    /// then the focused widget's.
    pub fn help_line(&self) -> String {
        if let Some(popup) = &self.popup {
            return popup.help_text().to_string();
        }
        if self.form.is_some() {
            return "Tab: next field  Enter/Ctrl+S: save  Esc: cancel".to_string();
        }
        let order = self.focus_order();
        let bases = [
            &self.app_menu.base,
            &self.model_menu.base,
            &self.search_base,
            &self.action_menu.base,
            &self.add_button.base,
            self.rows.base(),
        ];
        if let Some(id) = self.focus.focused() {
            if let Some(i) = order.iter().position(|&o| o == id) {
                return bases[i].help_text.clone();
            }
        }
        "Tab: move focus  Ctrl+Q: quit".to_string()
    }

    pub fn dispatch_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
        {
            self.should_quit = true;
            return;
        }

        // An active popup owns the keyboard outright.
        if let Some(mut popup) = self.popup.take() {
            match popup.handle_key(key) {
                PopupOutcome::Open => self.popup = Some(popup),
                PopupOutcome::Dismissed => {}
                PopupOutcome::NoCommand => {
                    self.popup = Some(Popup::warning("Error", "No command specified."));
                }
                PopupOutcome::Run {
                    command,
                    reply,
                    close,
                } => {
                    if !close {
                        self.popup = Some(popup);
                    }
                    // A command that opens its own popup replaces the
                    // restored one; last opened wins.
                    self.run_command(command, reply);
                }
            }
            return;
        }

        if self.form.is_some() {
            let event = self.form.as_mut().map(|f| f.handle_key(key));
            match event {
                Some(FormEvent::Submit) => self.submit_form(),
                Some(FormEvent::Cancel) => {
                    self.form = None;
                    self.focus_widget(self.rows.base().id);
                }
                Some(FormEvent::OpenChoices(index)) => self.open_choice_picker(index),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.cycle_focus(true);
                return;
            }
            KeyCode::BackTab => {
                self.cycle_focus(false);
                return;
            }
            _ => {}
        }

        let Some(focused) = self.focus.focused() else {
            return;
        };
        if focused == self.app_menu.base.id {
            self.handle_app_menu(key);
        } else if focused == self.model_menu.base.id {
            self.handle_model_menu(key);
        } else if focused == self.search_base.id {
            self.handle_search(key);
        } else if focused == self.action_menu.base.id {
            self.handle_action_menu(key);
        } else if focused == self.add_button.base.id {
            self.handle_add_button(key);
        } else if focused == self.rows.base().id {
            self.handle_rows(key);
        }
    }

    fn handle_app_menu(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => {
                self.app_menu.scroll_up();
            }
            KeyCode::Down => {
                self.app_menu.scroll_down();
            }
            KeyCode::Enter => {
                if let Some(name) = self.app_menu.get().cloned() {
                    self.open_app(&name);
                }
            }
            _ => {}
        }
    }

    fn handle_model_menu(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => {
                self.model_menu.scroll_up();
            }
            KeyCode::Down => {
                self.model_menu.scroll_down();
            }
            KeyCode::Enter => {
                let Some(app) = self.selected_app.clone() else {
                    self.popup = Some(Popup::warning("Models", "Open an app first."));
                    self.focus_widget(self.app_menu.base.id);
                    return;
                };
                if let Some(name) = self.model_menu.get().cloned() {
                    self.open_model(ModelHandle::new(&app, &name));
                }
            }
            _ => {}
        }
    }

    fn handle_search(&mut self, key: KeyEvent) {
        // Ctrl+U drops the active filter along with the buffer.
        if key.code == KeyCode::Char('u') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.clear_search();
            return;
        }
        match self.search.handle(key) {
            InputResult::Submit => self.apply_search(),
            InputResult::Cancel => self.clear_search(),
            InputResult::Continue => {}
        }
    }

    fn handle_action_menu(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => {
                self.action_menu.scroll_up();
            }
            KeyCode::Down => {
                self.action_menu.scroll_down();
            }
            KeyCode::Enter => match self.action_menu.get().map(String::as_str) {
                Some("Clear selection") => {
                    self.rows.uncheck_all();
                    self.update_titles();
                }
                Some("Refresh") => self.refresh_rows(),
                _ => {}
            },
            _ => {}
        }
    }

    fn handle_add_button(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
            self.open_add_form();
        }
    }

    fn handle_rows(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => {
                self.rows.menu_mut().scroll_up();
            }
            KeyCode::Down => {
                self.rows.menu_mut().scroll_down();
            }
            KeyCode::Char(' ') => {
                if self.rows.toggle_current() {
                    self.update_titles();
                }
            }
            KeyCode::Enter => {
                if let Some(pk) = self.rows.menu().get().map(|r| r.pk.clone()) {
                    self.open_edit_menu(&pk);
                }
            }
            _ => {}
        }
    }

    /// Open an app: fill the model menu and move focus there. Any open
    /// model is closed and its filter and selections dropped.
    pub fn open_app(&mut self, name: &str) {
        self.selected_app = Some(name.to_string());
        self.model_menu.clear();
        self.model_menu.add_items(
            self.source
                .list_models(name)
                .into_iter()
                .map(|model| model.name),
        );
        self.selected_model = None;
        self.records.clear();
        self.rows.menu_mut().clear();
        self.rows.uncheck_all();
        self.rows.base_mut().set_title("Records");
        self.search.clear();
        self.search_text = None;
        self.model_label.set_title(format!("{name} (pick a model)"));
        self.update_titles();
        self.focus_widget(self.model_menu.base.id);
    }

    /// Open a model: cache its records, fill the row list and move focus
    /// to it.
    pub fn open_model(&mut self, model: ModelHandle) {
        self.model_label
            .set_title(format!("{} / {}", model.app, model.name));
        self.selected_model = Some(model);
        self.search.clear();
        self.search_text = None;
        self.rows.uncheck_all();
        self.refresh_rows();
        self.focus_widget(self.rows.base().id);
    }

    /// Re-read the open model's records and refill the visible rows,
    /// honoring the active filter. Checked keys survive the refill.
    fn refresh_rows(&mut self) {
        let Some(model) = self.selected_model.clone() else {
            return;
        };
        self.records = self.source.list_records(&model);
        let filter = self.search_text.clone();
        let visible: Vec<RecordEntry> = self
            .records
            .iter()
            .filter(|record| match &filter {
                Some(query) => record_matches(record, query),
                None => true,
            })
            .map(|record| RecordEntry {
                pk: record.pk.clone(),
                text: format!("{} -- {}", record.pk, record.label),
            })
            .collect();
        self.rows.menu_mut().clear();
        self.rows.menu_mut().add_items(visible);
        self.update_titles();
    }

    fn update_titles(&mut self) {
        let total = self.rows.menu().len();
        let checked = self.rows.checked_count();
        self.action_menu
            .base
            .set_title(format!("Actions ({checked} of {total} selected)"));
        if let Some(model) = &self.selected_model {
            let suffix = if self.search_text.is_some() {
                " [filtered]"
            } else {
                ""
            };
            self.rows
                .base_mut()
                .set_title(format!("{} ({total} records){suffix}", model.name));
        }
    }

    fn apply_search(&mut self) {
        if self.selected_model.is_none() {
            self.popup = Some(Popup::warning("Search", "Open a model first."));
            self.focus_widget(self.model_menu.base.id);
            return;
        }
        let query = self.search.value().trim().to_string();
        if query.is_empty() {
            self.search_text = None;
            self.refresh_rows();
            return;
        }
        let hits = self
            .records
            .iter()
            .filter(|record| record_matches(record, &query))
            .count();
        if hits == 0 {
            // Leave the current rows in place so nothing is lost.
            self.popup = Some(Popup::warning(
                "Search",
                &format!("No results for \"{query}\"."),
            ));
            return;
        }
        self.search_text = Some(query);
        self.refresh_rows();
        self.focus_widget(self.rows.base().id);
    }

    fn clear_search(&mut self) {
        self.search.clear();
        if self.search_text.take().is_some() {
            self.refresh_rows();
        }
    }

    fn editable_fields(&self, model: &ModelHandle) -> Vec<FieldDescriptor> {
        self.source
            .list_fields(model)
            .into_iter()
            .filter(|field| !field.is_auto())
            .collect()
    }

    /// Field menu for one record. Stays open across picks so several
    /// fields can be edited in a row; S closes it and refreshes.
    fn open_edit_menu(&mut self, pk: &str) {
        let Some(model) = self.selected_model.clone() else {
            return;
        };
        let Some(record) = self.source.get_record(&model, pk) else {
            self.popup = Some(Popup::error("Edit", "Record not found."));
            return;
        };
        let all_fields = self.source.list_fields(&model);
        let pk_name = pk_field(&all_fields).to_string();
        let items = all_fields
            .iter()
            .filter(|field| !field.is_auto())
            .map(|field| format!("{}: {}", field.name, record.value(&field.name)))
            .collect();
        self.popup = Some(Popup::menu_select(
            &format!("Edit {} ({}={})", record.label, pk_name, record.pk),
            items,
            Some(Command::ChooseRecordField { pk: pk.to_string() }),
            Some(Command::RefreshRows),
            true,
        ));
    }

    fn open_add_form(&mut self) {
        let Some(model) = self.selected_model.clone() else {
            self.popup = Some(Popup::warning("Add", "Open a model first."));
            self.focus_widget(self.model_menu.base.id);
            return;
        };
        let Ok(base) = self.grid.place(
            &format!("Add {} (Ctrl+S to save)", model.name),
            4,
            1,
            5,
            2,
            true,
        ) else {
            return;
        };
        let mut form = Form::new(base);
        for field in self.editable_fields(&model) {
            let init = field.default.clone().unwrap_or_default();
            match field.choices {
                Some(choices) => form.add_choice_field(&field.name, &init, field.required, choices),
                None => form.add_field(
                    &field.name,
                    &init,
                    field.required,
                    field.kind == FieldKind::Password,
                ),
            }
        }
        self.form = Some(form);
    }

    fn open_choice_picker(&mut self, index: usize) {
        let Some(form) = &self.form else {
            return;
        };
        let Some(field) = form.fields().get(index) else {
            return;
        };
        let Some(choices) = field.choices.clone() else {
            return;
        };
        self.popup = Some(Popup::menu_select(
            &format!("Choose {}", field.name),
            choices,
            Some(Command::PickChoice { field_index: index }),
            None,
            false,
        ));
    }

    /// Validate and write the form. Failures keep the form (and every
    /// typed buffer) so the operator can correct and resubmit.
    fn submit_form(&mut self) {
        let Some(form) = &self.form else {
            return;
        };
        if let Err(err) = form.validate() {
            self.popup = Some(Popup::warning("Missing data", &err.to_string()));
            return;
        }
        let Some(model) = self.selected_model.clone() else {
            return;
        };
        let values = form.values();
        match self.source.create_record(&model, &values) {
            Ok(record) => {
                self.form = None;
                self.focus_widget(self.rows.base().id);
                self.popup = Some(Popup::message(
                    "Created",
                    &format!("{} saved.", record.label),
                    Some(Command::RefreshRows),
                ));
            }
            Err(err) => {
                self.popup = Some(Popup::error("Could not save", &err.to_string()));
            }
        }
    }

    fn run_command(&mut self, command: Command, reply: PopupReply) {
        match command {
            Command::RefreshRows => {
                // Fired both as the save binding of the edit menu and as
                // the close callback of the created-record message.
                if reply == PopupReply::Save {
                    self.popup = None;
                }
                self.refresh_rows();
            }

            Command::ChooseRecordField { pk } => {
                let PopupReply::Choice(index) = reply else {
                    return;
                };
                let Some(model) = self.selected_model.clone() else {
                    return;
                };
                let fields = self.editable_fields(&model);
                let Some(field) = fields.get(index) else {
                    return;
                };
                let current = self
                    .source
                    .get_record(&model, &pk)
                    .map(|record| record.value(&field.name).to_string())
                    .unwrap_or_default();
                self.popup = Some(Popup::text_entry(
                    &format!("New value for {}", field.name),
                    &current,
                    field.kind == FieldKind::Password,
                    Some(Command::ApplyEdit {
                        pk,
                        field: field.name.clone(),
                    }),
                ));
            }

            Command::ApplyEdit { pk, field } => {
                let PopupReply::Text(value) = reply else {
                    return;
                };
                let Some(model) = self.selected_model.clone() else {
                    return;
                };
                let all_fields = self.source.list_fields(&model);
                let pk_name = pk_field(&all_fields).to_string();
                let label = self
                    .source
                    .get_record(&model, &pk)
                    .map(|record| record.label)
                    .unwrap_or_else(|| pk.clone());
                self.popup = Some(Popup::yes_no(
                    &format!("Update \"{field}\" on {label} ({pk_name}={pk})?"),
                    Some(Command::ConfirmUpdate { pk, field, value }),
                ));
            }

            Command::ConfirmUpdate { pk, field, value } => match reply {
                PopupReply::Decision(true) => {
                    let Some(model) = self.selected_model.clone() else {
                        return;
                    };
                    match self.source.update_field(&model, &pk, &field, &value) {
                        Ok(()) => {
                            self.refresh_rows();
                            self.open_edit_menu(&pk);
                        }
                        Err(err) => {
                            self.popup = Some(Popup::error("Update failed", &err.to_string()));
                        }
                    }
                }
                PopupReply::Decision(false) => self.open_edit_menu(&pk),
                _ => {}
            },

            Command::PickChoice { field_index } => {
                let PopupReply::Choice(choice) = reply else {
                    return;
                };
                if let Some(form) = &mut self.form {
                    let value = form
                        .fields()
                        .get(field_index)
                        .and_then(|field| field.choices.as_ref())
                        .and_then(|choices| choices.get(choice))
                        .cloned();
                    if let Some(value) = value {
                        form.set_field_value(field_index, &value);
                    }
                }
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let theme = self.theme;
        let colors = &theme.colors;
        let [header, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let location = match (&self.selected_app, &self.selected_model) {
            (_, Some(model)) => format!("{} / {}", model.app, model.name),
            (Some(app), None) => app.clone(),
            _ => "no app open".to_string(),
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(" recdeck ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(" {location}")),
            ]))
            .style(Style::default().bg(colors.header_bg()).fg(colors.header_fg())),
            header,
        );

        let app_rect = self.grid.rect_for(self.app_menu.base.region, body);
        frame.render_stateful_widget(
            ScrollMenuView::new(self.focus.is_focused(self.app_menu.base.id), theme),
            app_rect,
            &mut self.app_menu,
        );

        let model_rect = self.grid.rect_for(self.model_menu.base.region, body);
        frame.render_stateful_widget(
            ScrollMenuView::new(self.focus.is_focused(self.model_menu.base.id), theme),
            model_rect,
            &mut self.model_menu,
        );

        let label_rect = self.grid.rect_for(self.model_label.region, body);
        frame.render_widget(
            Paragraph::new(self.model_label.title.as_str())
                .style(Style::default().fg(colors.accent()).bg(colors.bg()))
                .block(
                    Block::bordered().border_style(Style::default().fg(colors.border())),
                ),
            label_rect,
        );

        let search_rect = self.grid.rect_for(self.search_base.region, body);
        self.render_search(frame, search_rect);

        let action_rect = self.grid.rect_for(self.action_menu.base.region, body);
        frame.render_stateful_widget(
            ScrollMenuView::new(self.focus.is_focused(self.action_menu.base.id), theme),
            action_rect,
            &mut self.action_menu,
        );

        let add_rect = self.grid.rect_for(self.add_button.base.region, body);
        frame.render_widget(
            ButtonView {
                button: &self.add_button,
                focused: self.focus.is_focused(self.add_button.base.id),
                theme,
            },
            add_rect,
        );

        let rows_rect = self.grid.rect_for(self.rows.base().region, body);
        frame.render_stateful_widget(
            CheckboxMenuView::new(self.focus.is_focused(self.rows.base().id), theme),
            rows_rect,
            &mut self.rows,
        );

        if let Some(form) = &mut self.form {
            let height = (form.field_count() as u16 * 2 + 2).min(body.height);
            let rect = centered_fixed(64.min(body.width), height, body);
            frame.render_widget(Clear, rect);
            frame.render_stateful_widget(FormView { theme }, rect, form);
        }

        if let Some(popup) = &mut self.popup {
            frame.render_stateful_widget(PopupView::new(theme), body, popup);
        }

        frame.render_widget(
            Paragraph::new(format!(" {}", self.help_line()))
                .style(Style::default().bg(colors.header_bg()).fg(colors.text_dim())),
            status,
        );
    }

    fn render_search(&self, frame: &mut Frame, rect: Rect) {
        let colors = &self.theme.colors;
        let focused = self.focus.is_focused(self.search_base.id);
        let border = if focused {
            colors.border_focused()
        } else {
            colors.border()
        };
        let block = Block::bordered()
            .title(format!(" {} ", self.search_base.title))
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let line = if focused {
            let (before, at, after) = self.search.render_parts();
            Line::from(vec![
                Span::styled(before.to_string(), Style::default().fg(colors.fg())),
                Span::styled(
                    at.unwrap_or(' ').to_string(),
                    Style::default()
                        .fg(colors.selected_fg())
                        .bg(colors.selected_bg()),
                ),
                Span::styled(after.to_string(), Style::default().fg(colors.fg())),
            ])
        } else {
            Line::from(Span::styled(
                self.search.value().to_string(),
                Style::default().fg(colors.text_dim()),
            ))
        };
        frame.render_widget(Paragraph::new(line), inner);
    }
}

fn record_matches(record: &Record, query: &str) -> bool {
    let query = query.to_lowercase();
    record.pk.to_lowercase().contains(&query) || record.label.to_lowercase().contains(&query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemorySource;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app() -> App {
        let theme: &'static Theme = Box::leak(Box::new(Theme::default()));
        App::new(Box::new(MemorySource::sample()), theme, '*').unwrap()
    }

    fn open_customers(app: &mut App) {
        app.open_app("crm");
        app.open_model(ModelHandle::new("crm", "Customer"));
    }

    #[test]
    fn starts_focused_on_the_app_menu() {
        let app = app();
        assert_eq!(app.focused_id(), Some(app.app_menu.base.id));
        assert_eq!(app.app_menu.items(), &["crm".to_string(), "library".to_string()]);
    }

    #[test]
    fn enter_opens_the_highlighted_app() {
        let mut app = app();
        app.dispatch_key(key(KeyCode::Enter));
        assert_eq!(
            app.model_menu.items(),
            &["Customer".to_string(), "Ticket".to_string()]
        );
        assert_eq!(app.focused_id(), Some(app.model_menu_id()));
    }

    #[test]
    fn opening_a_model_fills_rows_and_titles() {
        let mut app = app();
        open_customers(&mut app);
        assert_eq!(app.row_labels()[0], "1 -- Ada Lovelace");
        assert_eq!(app.row_labels().len(), 4);
        assert_eq!(app.rows.base().title, "Customer (4 records)");
        assert_eq!(app.actions_title(), "Actions (0 of 4 selected)");
        assert_eq!(app.focused_id(), Some(app.rows_id()));
    }

    #[test]
    fn space_toggles_rows_and_updates_the_tally() {
        let mut app = app();
        open_customers(&mut app);
        app.dispatch_key(key(KeyCode::Char(' ')));
        app.dispatch_key(key(KeyCode::Down));
        app.dispatch_key(key(KeyCode::Char(' ')));
        assert_eq!(app.checked_rows(), 2);
        assert_eq!(app.actions_title(), "Actions (2 of 4 selected)");

        app.dispatch_key(key(KeyCode::Char(' ')));
        assert_eq!(app.checked_rows(), 1);
        assert_eq!(app.actions_title(), "Actions (1 of 4 selected)");
    }

    #[test]
    fn clear_selection_action_unchecks_everything() {
        let mut app = app();
        open_customers(&mut app);
        app.dispatch_key(key(KeyCode::Char(' ')));
        assert_eq!(app.checked_rows(), 1);

        app.focus_widget(app.action_menu.base.id);
        app.dispatch_key(key(KeyCode::Enter));
        assert_eq!(app.checked_rows(), 0);
        assert_eq!(app.actions_title(), "Actions (0 of 4 selected)");
    }

    #[test]
    fn active_popup_swallows_keys_meant_for_widgets() {
        let mut app = app();
        open_customers(&mut app);
        let before = app.rows.menu().selected_index();
        app.popup = Some(Popup::warning("Hold", "Something happened."));

        app.dispatch_key(key(KeyCode::Down));
        app.dispatch_key(key(KeyCode::Char('x')));
        assert!(app.popup.is_some());
        assert_eq!(app.rows.menu().selected_index(), before);
        assert_eq!(app.checked_rows(), 0);

        app.dispatch_key(key(KeyCode::Enter));
        assert!(app.popup.is_none());
    }

    #[test]
    fn add_without_an_open_model_warns_and_refocuses() {
        let mut app = app();
        app.open_app("crm");
        app.focus_widget(app.add_button_id());
        app.dispatch_key(key(KeyCode::Enter));
        assert!(matches!(app.popup(), Some(Popup::Message { .. })));
        app.dispatch_key(key(KeyCode::Enter));
        assert_eq!(app.focused_id(), Some(app.model_menu_id()));
    }

    #[test]
    fn tab_cycles_focus_through_every_focusable_widget() {
        let mut app = app();
        let start = app.focused_id();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(app.focused_id());
            app.dispatch_key(key(KeyCode::Tab));
        }
        assert_eq!(app.focused_id(), start);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 6);

        app.dispatch_key(key(KeyCode::BackTab));
        assert_eq!(app.focused_id(), Some(app.rows_id()));
    }

    #[test]
    fn search_filters_rows_and_ctrl_u_restores_order() {
        let mut app = app();
        app.open_app("library");
        app.open_model(ModelHandle::new("library", "Book"));
        let original = app.row_labels();

        app.focus_widget(app.search_id());
        app.dispatch_key(key(KeyCode::Char('4')));
        app.dispatch_key(key(KeyCode::Char('2')));
        app.dispatch_key(key(KeyCode::Enter));
        assert_eq!(app.row_labels(), vec!["42 -- The Hitchhiker's Guide"]);
        assert!(app.rows.base().title.ends_with("[filtered]"));
        assert_eq!(app.focused_id(), Some(app.rows_id()));

        app.focus_widget(app.search_id());
        app.dispatch_key(ctrl('u'));
        assert_eq!(app.row_labels(), original);
        assert_eq!(app.search_value(), "");
    }

    #[test]
    fn search_with_no_hits_warns_and_keeps_rows() {
        let mut app = app();
        open_customers(&mut app);
        app.focus_widget(app.search_id());
        for c in "zzz".chars() {
            app.dispatch_key(key(KeyCode::Char(c)));
        }
        app.dispatch_key(key(KeyCode::Enter));
        assert!(app.popup().is_some());
        assert_eq!(app.row_labels().len(), 4);
    }

    #[test]
    fn checked_rows_survive_a_filter_round_trip() {
        let mut app = app();
        open_customers(&mut app);
        app.dispatch_key(key(KeyCode::Char(' ')));
        assert!(app.rows.is_checked("1"));

        app.focus_widget(app.search_id());
        for c in "grace".chars() {
            app.dispatch_key(key(KeyCode::Char(c)));
        }
        app.dispatch_key(key(KeyCode::Enter));
        assert_eq!(app.row_labels(), vec!["2 -- Grace Hopper"]);

        app.focus_widget(app.search_id());
        app.dispatch_key(key(KeyCode::Esc));
        assert!(app.rows.is_checked("1"));
        assert_eq!(app.checked_rows(), 1);
    }

    #[test]
    fn add_form_lists_editable_fields_with_defaults() {
        let mut app = app();
        open_customers(&mut app);
        app.focus_widget(app.add_button_id());
        app.dispatch_key(key(KeyCode::Enter));

        let form = app.form().unwrap();
        let names: Vec<&str> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "email", "tier", "notes"]);
        assert_eq!(form.fields()[2].input.value(), "basic");
        assert!(form.fields()[2].choices.is_some());
    }

    #[test]
    fn submitting_with_missing_required_fields_keeps_the_form() {
        let mut app = app();
        open_customers(&mut app);
        app.focus_widget(app.add_button_id());
        app.dispatch_key(key(KeyCode::Enter));
        app.dispatch_key(ctrl('s'));

        match app.popup() {
            Some(Popup::Message { text, .. }) => {
                assert!(text.contains("name"));
                assert!(text.contains("email"));
            }
            _ => panic!("expected a warning popup"),
        }
        assert!(app.form().is_some());
    }

    #[test]
    fn edit_menu_opens_with_current_values_and_stays_open() {
        let mut app = app();
        open_customers(&mut app);
        app.dispatch_key(key(KeyCode::Enter));

        match app.popup() {
            Some(Popup::MenuSelect { items, .. }) => {
                assert_eq!(items[0], "name: Ada Lovelace");
                assert_eq!(items[2], "tier: gold");
            }
            _ => panic!("expected the field menu"),
        }

        // Picking a field swaps in a text entry seeded with the value.
        app.dispatch_key(key(KeyCode::Enter));
        match app.popup() {
            Some(Popup::TextEntry { input, .. }) => {
                assert_eq!(input.value(), "Ada Lovelace");
                assert_eq!(input.cursor(), "Ada Lovelace".chars().count());
            }
            _ => panic!("expected a text entry"),
        }
    }

    #[test]
    fn confirmed_edit_writes_through_and_reopens_the_menu() {
        let mut app = app();
        open_customers(&mut app);
        app.dispatch_key(key(KeyCode::Enter));
        app.dispatch_key(key(KeyCode::Enter));
        for c in " III".chars() {
            app.dispatch_key(key(KeyCode::Char(c)));
        }
        app.dispatch_key(key(KeyCode::Enter));

        match app.popup() {
            Some(Popup::YesNo { prompt, .. }) => {
                assert_eq!(prompt, "Update \"name\" on Ada Lovelace (id=1)?");
            }
            _ => panic!("expected a confirmation"),
        }
        app.dispatch_key(key(KeyCode::Char('y')));

        let model = ModelHandle::new("crm", "Customer");
        let record = app.source().get_record(&model, "1").unwrap();
        assert_eq!(record.value("name"), "Ada Lovelace III");
        assert!(matches!(app.popup(), Some(Popup::MenuSelect { .. })));
        assert_eq!(app.row_labels()[0], "1 -- Ada Lovelace III");
    }

    #[test]
    fn declined_edit_leaves_the_record_alone() {
        let mut app = app();
        open_customers(&mut app);
        app.dispatch_key(key(KeyCode::Enter));
        app.dispatch_key(key(KeyCode::Enter));
        app.dispatch_key(key(KeyCode::Backspace));
        app.dispatch_key(key(KeyCode::Enter));
        app.dispatch_key(key(KeyCode::Char('n')));

        let model = ModelHandle::new("crm", "Customer");
        let record = app.source().get_record(&model, "1").unwrap();
        assert_eq!(record.value("name"), "Ada Lovelace");
    }

    #[test]
    fn ctrl_q_requests_quit() {
        let mut app = app();
        assert!(!app.should_quit());
        app.dispatch_key(ctrl('q'));
        assert!(app.should_quit());
    }
}
