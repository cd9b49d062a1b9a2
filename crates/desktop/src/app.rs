//! Footman Desktop: egui app state and UI.

use eframe::egui;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc;
use std::sync::{Mutex, OnceLock};

use lib::coerce::{apply_validator, coerce_and_validate, CollectionError, REQUIRED_MESSAGE};
use lib::form::{spawn_script_run, HostEvent};
use lib::prompt::{
    choice_label, coerce_choice, default_choice_index, default_multi_flags, ensure_required,
};
use lib::schema::{CollectedValues, NormalizedField, Widget};
use serde_json::Value;

const LOG_BUFFER_MAX_LINES: usize = 2000;

/// Ring buffer of log lines for the Logs screen. Written by DesktopLogger.
static LOG_LINES: OnceLock<Mutex<VecDeque<String>>> = OnceLock::new();

fn log_buffer() -> &'static Mutex<VecDeque<String>> {
    LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()))
}

fn push_log_line(line: String) {
    if let Ok(mut buf) = log_buffer().lock() {
        buf.push_back(line);
        while buf.len() > LOG_BUFFER_MAX_LINES {
            buf.pop_front();
        }
    }
}

/// Logger that appends to LOG_LINES for display in the Logs screen.
struct DesktopLogger;

impl log::Log for DesktopLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("{} [{}] {}", chrono_lite(), record.level(), record.args());
        push_log_line(line);
    }

    fn flush(&self) {}
}

fn chrono_lite() -> String {
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = t.as_secs();
    let millis = t.subsec_millis();
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, millis)
}

static LOGGER: DesktopLogger = DesktopLogger;

#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Screen {
    #[default]
    Scripts,
    Logs,
}

/// Editable state behind one rendered form field.
enum FieldInput {
    Text(String),
    Secret(String),
    Path(String),
    Confirm(bool),
    Single(Option<usize>),
    Multi(Vec<bool>),
}

struct FieldState {
    field: NormalizedField,
    input: FieldInput,
    /// Inline failure message from the last submit attempt.
    error: Option<String>,
}

impl FieldState {
    fn new(field: NormalizedField) -> Self {
        let input = match field.widget {
            Widget::SingleChoice => FieldInput::Single(default_choice_index(&field)),
            Widget::MultiChoice => FieldInput::Multi(default_multi_flags(&field)),
            Widget::Confirm => FieldInput::Confirm(
                field
                    .default
                    .as_ref()
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
            ),
            Widget::PathText => FieldInput::Path(text_default(&field)),
            Widget::SecretText => FieldInput::Secret(text_default(&field)),
            Widget::Text => FieldInput::Text(text_default(&field)),
        };
        Self {
            field,
            input,
            error: None,
        }
    }

    /// Coerce and validate the current input. A bad value records its
    /// message inline and yields None.
    fn harvest(&mut self) -> Option<Value> {
        self.error = None;
        let result = match &self.input {
            FieldInput::Text(raw) | FieldInput::Secret(raw) | FieldInput::Path(raw) => {
                coerce_and_validate(raw, &self.field)
            }
            FieldInput::Confirm(checked) => apply_validator(&self.field, Value::Bool(*checked)),
            FieldInput::Single(selected) => match selected {
                Some(i) => {
                    let choice = self.field.choices.get(*i).cloned().unwrap_or(Value::Null);
                    apply_validator(&self.field, coerce_choice(&choice, self.field.kind))
                }
                None => Ok(Value::Null),
            },
            FieldInput::Multi(flags) => {
                let picked: Vec<Value> = self
                    .field
                    .choices
                    .iter()
                    .zip(flags)
                    .filter(|(_, on)| **on)
                    .map(|(choice, _)| coerce_choice(choice, self.field.kind))
                    .collect();
                apply_validator(&self.field, Value::Array(picked))
            }
        };
        match result {
            Ok(value) => Some(value),
            Err(failure) => {
                self.error = Some(failure.message);
                None
            }
        }
    }
}

/// Seed text for the text-like widgets from the resolved default.
fn text_default(field: &NormalizedField) -> String {
    match &field.default {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Harvest a whole form. Bad values and missing required fields mark the
/// offending field inline and yield None; nothing is partially applied.
fn harvest_form(form: &mut [FieldState]) -> Option<CollectedValues> {
    let mut values = CollectedValues::new();
    let mut ok = true;
    for state in form.iter_mut() {
        match state.harvest() {
            Some(value) => {
                values.insert(state.field.key.clone(), value);
            }
            None => ok = false,
        }
    }
    if !ok {
        return None;
    }
    let fields: Vec<NormalizedField> = form.iter().map(|s| s.field.clone()).collect();
    if let Err(e) = ensure_required(&fields, &values) {
        if let CollectionError::MissingRequired { key } = &e {
            if let Some(state) = form.iter_mut().find(|s| s.field.key == *key) {
                state.error = Some(REQUIRED_MESSAGE.to_string());
            }
        }
        return None;
    }
    Some(values)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A mid-run parameter section waiting on the user.
struct SectionState {
    title: String,
    form: Vec<FieldState>,
    /// Single-use reply slot back to the parked worker.
    reply: Option<std::sync::mpsc::SyncSender<CollectedValues>>,
}

pub struct FootmanApp {
    /// Environment for placeholder defaults: process env overlaid with config.
    env: HashMap<String, String>,
    registry: lib::registry::ScriptRegistry,
    /// Registry path of the script shown in the central panel.
    selected_script: Option<String>,
    /// Editable pre-run form for the selected script.
    main_form: Vec<FieldState>,
    /// When Some, a script run is live; its events arrive here.
    run_events: Option<mpsc::Receiver<HostEvent>>,
    /// Output lines of the current or last run.
    run_output: Vec<String>,
    /// Section the worker is parked on, if any.
    pending_section: Option<SectionState>,
    /// Last error from a run, if any.
    run_error: Option<String>,
    /// Parameters the current run started with (echoed after it finishes).
    last_params: Option<CollectedValues>,
    current_screen: Screen,
}

impl FootmanApp {
    /// Space between the main screen title (Scripts, Logs) and the content below.
    const SCREEN_TITLE_BOTTOM_SPACING: f32 = 18.0;
    /// Space between the bottom of the content and the window edge.
    const SCREEN_FOOTER_SPACING: f32 = 48.0;

    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let _ = LOG_LINES.get_or_init(|| Mutex::new(VecDeque::new()));
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);
        log::info!("desktop started");

        let (config, _) = lib::config::load_config(None)
            .unwrap_or((lib::config::Config::default(), std::path::PathBuf::new()));
        let env = lib::config::collection_env(&config);
        let registry = lib::scripts::builtin_registry();
        Self {
            env,
            registry,
            selected_script: None,
            main_form: Vec::new(),
            run_events: None,
            run_output: Vec::new(),
            pending_section: None,
            run_error: None,
            last_params: None,
            current_screen: Screen::default(),
        }
    }

    /// Switch the central panel to `path` and rebuild its parameter form.
    fn select_script(&mut self, path: &str) {
        self.selected_script = Some(path.to_string());
        self.main_form = self
            .registry
            .get(path)
            .map(|script| {
                script
                    .params()
                    .normalize(&self.env)
                    .into_iter()
                    .map(FieldState::new)
                    .collect()
            })
            .unwrap_or_default();
        self.run_output.clear();
        self.run_error = None;
        self.last_params = None;
        self.pending_section = None;
    }

    /// Harvest the main form and hand the script to a worker thread.
    fn start_run(&mut self) {
        let Some(path) = self.selected_script.clone() else {
            return;
        };
        let Some(script) = self.registry.get(&path) else {
            return;
        };
        let Some(params) = harvest_form(&mut self.main_form) else {
            return;
        };
        self.run_output.clear();
        self.run_error = None;
        self.last_params = Some(params.clone());
        let (rx, _worker) = spawn_script_run(script, params, self.env.clone());
        self.run_events = Some(rx);
    }

    /// Harvest the pending section and wake the parked worker.
    fn submit_section(&mut self) {
        let Some(section) = self.pending_section.as_mut() else {
            return;
        };
        let Some(values) = harvest_form(&mut section.form) else {
            return;
        };
        if let Some(reply) = section.reply.take() {
            if reply.send(values).is_err() {
                self.run_error = Some("script stopped before the section was submitted".to_string());
            }
        }
        self.pending_section = None;
    }

    /// Drain run events from the worker. Call each frame.
    fn poll_run_events(&mut self) {
        loop {
            let event = match &self.run_events {
                Some(rx) => match rx.try_recv() {
                    Ok(e) => e,
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => {
                        self.run_events = None;
                        break;
                    }
                },
                None => break,
            };
            match event {
                HostEvent::Output(line) => self.run_output.push(line),
                HostEvent::Section(request) => {
                    self.pending_section = Some(SectionState {
                        title: request.title,
                        form: request.fields.into_iter().map(FieldState::new).collect(),
                        reply: Some(request.reply),
                    });
                }
                HostEvent::Finished(result) => {
                    match result {
                        Ok(()) => self.push_run_summary(),
                        Err(e) => self.run_error = Some(e),
                    }
                    self.run_events = None;
                    self.pending_section = None;
                    break;
                }
            }
        }
    }

    /// Echo the starting parameters under the output after a clean finish.
    fn push_run_summary(&mut self) {
        let Some(params) = &self.last_params else {
            return;
        };
        self.run_output.push(String::new());
        self.run_output.push("Main parameters:".to_string());
        for (key, value) in params {
            self.run_output.push(format!("  {}: {}", key, display_value(value)));
        }
    }

    fn ui_scripts_screen(&mut self, ui: &mut egui::Ui, running: bool) {
        ui.add_space(24.0);
        ui.heading("Scripts");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let Some(path) = self.selected_script.clone() else {
            ui.label("Pick a script from the list on the right.");
            ui.add_space(Self::SCREEN_FOOTER_SPACING);
            return;
        };
        let description = self
            .registry
            .get(&path)
            .map(|s| s.description().to_string())
            .unwrap_or_default();

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.label(egui::RichText::new(path.as_str()).strong());
            ui.add_space(6.0);
            ui.label(description);
            ui.add_space(18.0);

            if !self.main_form.is_empty() {
                ui.label(egui::RichText::new("Main Parameters").strong());
                ui.add_space(6.0);
                ui.add_enabled_ui(!running, |ui| {
                    for state in &mut self.main_form {
                        let id = ("main", state.field.key.clone());
                        ui.push_id(id, |ui| {
                            render_field(ui, state);
                        });
                        ui.add_space(6.0);
                    }
                });
                ui.add_space(12.0);
            }

            if let Some(section) = &mut self.pending_section {
                ui.separator();
                ui.add_space(12.0);
                ui.label(egui::RichText::new(section.title.as_str()).strong());
                ui.add_space(6.0);
                for state in &mut section.form {
                    let id = ("section", state.field.key.clone());
                    ui.push_id(id, |ui| {
                        render_field(ui, state);
                    });
                    ui.add_space(6.0);
                }
                ui.add_space(12.0);
            }

            // One action button: it reads Continue while a section waits.
            let waiting = self.pending_section.is_some();
            let label = if waiting { "Continue" } else { "Run Script" };
            let enabled = waiting || !running;
            if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                if waiting {
                    self.submit_section();
                } else {
                    self.start_run();
                }
            }

            if let Some(ref err) = self.run_error {
                ui.add_space(8.0);
                ui.colored_label(egui::Color32::RED, err);
            }

            if !self.run_output.is_empty() {
                ui.add_space(12.0);
                ui.separator();
                ui.add_space(6.0);
                for line in &self.run_output {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
            }
        });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }

    fn ui_logs_screen(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.heading("Logs");
        ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);

        let lines: Vec<String> = log_buffer()
            .lock()
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default();

        let available = ui.available_height();
        let scroll_height = (available - Self::SCREEN_FOOTER_SPACING).max(0.0);
        egui::ScrollArea::vertical()
            .max_height(scroll_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &lines {
                    ui.label(
                        egui::RichText::new(line.as_str()).family(egui::FontFamily::Monospace),
                    );
                }
                if lines.is_empty() {
                    ui.label("No log output yet.");
                }
            });
        ui.add_space(Self::SCREEN_FOOTER_SPACING);
    }
}

fn render_field(ui: &mut egui::Ui, state: &mut FieldState) {
    ui.horizontal(|ui| {
        ui.label(state.field.label.as_str());
        if state.field.required {
            ui.label(egui::RichText::new("*").color(egui::Color32::LIGHT_RED));
        }
    });
    if let Some(ref d) = state.field.description {
        ui.label(egui::RichText::new(d.as_str()).weak());
    }
    match &mut state.input {
        FieldInput::Text(raw) | FieldInput::Path(raw) => {
            ui.add(egui::TextEdit::singleline(raw).desired_width(320.0));
        }
        FieldInput::Secret(raw) => {
            ui.add(
                egui::TextEdit::singleline(raw)
                    .password(true)
                    .desired_width(320.0),
            );
        }
        FieldInput::Confirm(checked) => {
            ui.checkbox(checked, "");
        }
        FieldInput::Single(selected) => {
            let selected_text = selected
                .and_then(|i| state.field.choices.get(i))
                .map(choice_label)
                .unwrap_or_else(|| "(pick one)".to_string());
            egui::ComboBox::from_id_source(state.field.key.as_str())
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    for (i, choice) in state.field.choices.iter().enumerate() {
                        if ui
                            .selectable_label(*selected == Some(i), choice_label(choice))
                            .clicked()
                        {
                            *selected = Some(i);
                        }
                    }
                });
        }
        FieldInput::Multi(flags) => {
            for (choice, on) in state.field.choices.iter().zip(flags.iter_mut()) {
                ui.checkbox(on, choice_label(choice));
            }
        }
    }
    if let Some(ref err) = state.error {
        ui.colored_label(egui::Color32::RED, err);
    }
}

impl eframe::App for FootmanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_run_events();
        let running = self.run_events.is_some();
        if running {
            // a worker is live; keep polling even without input events
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::Frame::none()
                .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                .show(ui, |ui| {
                    ui.add_space(16.0);
                    ui.horizontal(|ui| {
                        ui.heading("Footman");
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if running {
                                ui.add_enabled(false, egui::Button::new("Script running"));
                            }
                        });
                    });
                    ui.add_space(16.0);
                });
        });

        let current_screen = &mut self.current_screen;
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .exact_width(140.0)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        ui.add_space(24.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Scripts, "Scripts")
                            .clicked()
                        {
                            *current_screen = Screen::Scripts;
                        }
                        ui.add_space(12.0);
                        if ui
                            .selectable_label(*current_screen == Screen::Logs, "Logs")
                            .clicked()
                        {
                            *current_screen = Screen::Logs;
                        }
                    });
            });

        if self.current_screen == Screen::Scripts {
            egui::SidePanel::right("scripts_panel")
                .resizable(false)
                .exact_width(220.0)
                .show(ctx, |ui| {
                    egui::Frame::none()
                        .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                        .show(ui, |ui| {
                            ui.add_space(24.0);
                            ui.heading("Available Scripts");
                            ui.add_space(Self::SCREEN_TITLE_BOTTOM_SPACING);
                            let paths = self.registry.paths();
                            if paths.is_empty() {
                                ui.label("No scripts registered.");
                            }
                            ui.add_enabled_ui(!running, |ui| {
                                for path in paths {
                                    let is_selected =
                                        self.selected_script.as_deref() == Some(path.as_str());
                                    if ui.selectable_label(is_selected, path.as_str()).clicked()
                                        && !is_selected
                                    {
                                        self.select_script(&path);
                                    }
                                }
                            });
                            ui.add_space(Self::SCREEN_FOOTER_SPACING);
                        });
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.current_screen == Screen::Scripts {
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        self.ui_scripts_screen(ui, running);
                    });
            } else {
                // Logs screen has its own scroll area for the log lines; avoid double scrollbars
                egui::Frame::none()
                    .inner_margin(egui::Margin::symmetric(24.0, 0.0))
                    .show(ui, |ui| {
                        self.ui_logs_screen(ui);
                    });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib::schema::{FieldDescriptor, FieldKind, Verdict};
    use serde_json::json;

    fn tags_field() -> NormalizedField {
        FieldDescriptor::new("tags", FieldKind::String)
            .with_choices(vec![json!("a"), json!("b")])
            .multiple()
            .with_validator(|v| match v.as_array() {
                Some(items) if items.contains(&json!("b")) => {
                    Verdict::FailWith("'b' is not allowed.".to_string())
                }
                _ => Verdict::Pass,
            })
            .normalize(&HashMap::new())
    }

    #[test]
    fn multi_choice_harvest_runs_the_validator() {
        let mut state = FieldState::new(tags_field());
        let FieldInput::Multi(flags) = &mut state.input else {
            panic!("expected checkbox flags");
        };
        flags[1] = true;
        assert_eq!(state.harvest(), None);
        assert_eq!(state.error.as_deref(), Some("'b' is not allowed."));
    }

    #[test]
    fn multi_choice_harvest_passes_a_clean_selection() {
        let mut state = FieldState::new(tags_field());
        let FieldInput::Multi(flags) = &mut state.input else {
            panic!("expected checkbox flags");
        };
        flags[0] = true;
        assert_eq!(state.harvest(), Some(json!(["a"])));
        assert_eq!(state.error, None);
    }

    #[test]
    fn failed_multi_validation_blocks_the_whole_form() {
        let mut form = vec![FieldState::new(tags_field())];
        let FieldInput::Multi(flags) = &mut form[0].input else {
            panic!("expected checkbox flags");
        };
        flags[1] = true;
        assert!(harvest_form(&mut form).is_none());
        assert_eq!(form[0].error.as_deref(), Some("'b' is not allowed."));
    }
}
