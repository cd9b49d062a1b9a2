//! Dynamic form sections for running scripts.
//!
//! A script runs on a worker thread and talks to its front-end through a
//! channel of [`HostEvent`]s. Requesting a section parks the worker on a
//! one-shot reply slot until the user submits the rendered form; the
//! front-end fills the slot exactly once per request. Only one section may
//! be in flight at a time per run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::coerce::CollectionError;
use crate::schema::{CollectedValues, NormalizedField, Schema, SectionOptions};
use crate::script::{Script, ScriptHost};

/// What a running script sends to its front-end.
pub enum HostEvent {
    /// One line of script output.
    Output(String),
    /// A parameter section to render; the worker is parked until the reply
    /// slot is filled.
    Section(SectionRequest),
    /// The run ended; errors cross the channel as plain text.
    Finished(Result<(), String>),
}

/// A mid-run parameter section, ready for rendering.
pub struct SectionRequest {
    pub title: String,
    /// Fields with defaults resolved, choice overrides applied, widgets fixed.
    pub fields: Vec<NormalizedField>,
    /// Single-use reply slot. Dropping it without sending abandons the
    /// request and fails the waiting script.
    pub reply: SyncSender<CollectedValues>,
}

/// Script-side half of the form channel.
///
/// Owned by the worker thread; the front-end holds the matching receiver
/// and polls it from its own loop.
pub struct FormBridge {
    events: Sender<HostEvent>,
    in_flight: AtomicBool,
    env: HashMap<String, String>,
}

impl FormBridge {
    /// Bridge resolving `${VAR}` defaults against the process environment.
    pub fn new(events: Sender<HostEvent>) -> Self {
        Self::with_env(events, std::env::vars().collect())
    }

    pub fn with_env(events: Sender<HostEvent>, env: HashMap<String, String>) -> Self {
        Self {
            events,
            in_flight: AtomicBool::new(false),
            env,
        }
    }

    fn request_inner(
        &self,
        title: &str,
        schema: Schema,
        options: SectionOptions,
    ) -> Result<CollectedValues, CollectionError> {
        let schema = apply_options(&schema, &options);
        let fields = schema.normalize(&self.env);
        let (reply, answer) = mpsc::sync_channel(1);
        let request = SectionRequest {
            title: title.to_string(),
            fields,
            reply,
        };
        self.events
            .send(HostEvent::Section(request))
            .map_err(|_| CollectionError::HostGone {
                title: title.to_string(),
            })?;
        answer.recv().map_err(|_| CollectionError::HostGone {
            title: title.to_string(),
        })
    }
}

impl ScriptHost for FormBridge {
    fn emit(&self, line: &str) {
        let _ = self.events.send(HostEvent::Output(line.to_string()));
    }

    fn request_section(
        &self,
        title: &str,
        schema: Schema,
        options: SectionOptions,
    ) -> Result<CollectedValues, CollectionError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(CollectionError::SectionInFlight);
        }
        let out = self.request_inner(title, schema, options);
        self.in_flight.store(false, Ordering::SeqCst);
        out
    }
}

/// Override the choice lists of the named keys; overrides win over choices
/// baked into the schema.
pub fn apply_options(schema: &Schema, options: &SectionOptions) -> Schema {
    let mut out = Schema::new();
    for field in schema.fields() {
        let mut field = field.clone();
        if let Some(choices) = options.get(&field.key) {
            field.choices = Some(choices.clone());
        }
        out = out.with(field);
    }
    out
}

/// Flatten section results over a base mapping: later sections win on key
/// collisions, the base backstops keys no section touched.
pub fn merge_sections<I>(base: CollectedValues, sections: I) -> CollectedValues
where
    I: IntoIterator<Item = CollectedValues>,
{
    let mut merged = base;
    for section in sections {
        for (key, value) in section {
            merged.insert(key, value);
        }
    }
    merged
}

/// Run a script on a worker thread, returning the event stream to poll and
/// the handle to join after `Finished` arrives. `env` backs the `${VAR}`
/// defaults of any section the script requests.
pub fn spawn_script_run(
    script: Arc<dyn Script>,
    params: CollectedValues,
    env: HashMap<String, String>,
) -> (Receiver<HostEvent>, JoinHandle<()>) {
    let (events, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let bridge = FormBridge::with_env(events.clone(), env);
        let result = script.run(&bridge, &params).map_err(|e| e.to_string());
        let _ = events.send(HostEvent::Finished(result));
    });
    (rx, handle)
}
