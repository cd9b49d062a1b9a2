//! Interactive terminal prompts for parameter schemas.
//!
//! One field at a time: render by widget, loop until the input validates,
//! then re-check every required key in a final aggregate pass. In
//! non-interactive mode (or when stdin is not a TTY) defaults are taken
//! without prompting.

use std::collections::HashMap;
use std::io::IsTerminal;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use serde_json::Value;

use crate::coerce::{self, CollectionError};
use crate::schema::{CollectedValues, FieldKind, NormalizedField, Schema, Verdict, Widget};

/// Sequential prompt engine over a schema.
pub struct PromptEngine {
    non_interactive: bool,
    env: HashMap<String, String>,
}

impl PromptEngine {
    /// Engine with the process environment. Prompting is disabled when
    /// `non_interactive` is set or stdin is not a terminal.
    pub fn new(non_interactive: bool) -> Self {
        Self::with_env(non_interactive, std::env::vars().collect())
    }

    /// Engine with an explicit environment mapping for `${VAR}` defaults.
    pub fn with_env(non_interactive: bool, env: HashMap<String, String>) -> Self {
        Self {
            non_interactive: non_interactive || !std::io::stdin().is_terminal(),
            env,
        }
    }

    /// Collect every field of `schema` in order, then enforce required keys.
    pub fn collect(&self, schema: &Schema) -> Result<CollectedValues, CollectionError> {
        self.collect_with(schema, &CollectedValues::new())
    }

    /// `collect`, with preset values (already coerced) that skip prompting.
    pub fn collect_with(
        &self,
        schema: &Schema,
        presets: &CollectedValues,
    ) -> Result<CollectedValues, CollectionError> {
        let fields = schema.normalize(&self.env);
        let mut values = CollectedValues::new();
        for field in &fields {
            if let Some(preset) = presets.get(&field.key) {
                values.insert(field.key.clone(), preset.clone());
                continue;
            }
            let value = if self.non_interactive {
                field.default.clone().unwrap_or(Value::Null)
            } else {
                self.prompt_field(field)?
            };
            values.insert(field.key.clone(), value);
        }
        ensure_required(&fields, &values)?;
        Ok(values)
    }

    fn prompt_field(&self, field: &NormalizedField) -> Result<Value, CollectionError> {
        match field.widget {
            Widget::Confirm => prompt_confirm(field),
            Widget::SingleChoice => prompt_single_choice(field),
            Widget::MultiChoice => prompt_multi_choice(field),
            Widget::SecretText => prompt_secret(field),
            Widget::PathText => prompt_path(field),
            Widget::Text => prompt_text(field),
        }
    }
}

/// Aggregate pass over collected values: the first required key holding no
/// value fails the whole collection.
pub fn ensure_required(
    fields: &[NormalizedField],
    values: &CollectedValues,
) -> Result<(), CollectionError> {
    for field in fields {
        if !field.required {
            continue;
        }
        let missing = match values.get(&field.key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if missing {
            return Err(CollectionError::MissingRequired {
                key: field.key.clone(),
            });
        }
    }
    Ok(())
}

/// Pre-selected index for a single-choice field: the resolved default's
/// position, or none when the default is not a member of the choices.
pub fn default_choice_index(field: &NormalizedField) -> Option<usize> {
    let default = field.default.as_ref()?;
    field
        .choices
        .iter()
        .position(|c| c == default || coerce_choice(c, field.kind) == *default)
}

/// Initial checked flags for a multi-choice field, from its resolved default.
pub fn default_multi_flags(field: &NormalizedField) -> Vec<bool> {
    let defaults: &[Value] = match &field.default {
        Some(Value::Array(items)) => items,
        _ => &[],
    };
    field
        .choices
        .iter()
        .map(|c| defaults.contains(c) || defaults.contains(&coerce_choice(c, field.kind)))
        .collect()
}

/// Coerce one choice literal per the field kind; choices may be written as
/// strings even for numeric fields.
pub fn coerce_choice(choice: &Value, kind: FieldKind) -> Value {
    match choice {
        Value::String(s) => coerce::coerce_kind(s, kind).unwrap_or_else(|_| choice.clone()),
        _ => choice.clone(),
    }
}

/// Display label for a choice value (strings without quotes).
pub fn choice_label(choice: &Value) -> String {
    match choice {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Validate a picked value. On rejection the returned line carries the
/// validator's own words when it gave any, and is ready to print.
fn check_choice(field: &NormalizedField, value: Value) -> Result<Value, String> {
    match coerce::run_validator(field, &value) {
        Verdict::Pass => Ok(value),
        Verdict::FailWith(message) => Err(format!("{message}  Please choose again.")),
        Verdict::Fail => Err(format!(
            "Validation failed for '{}'. Please choose again.",
            field.key
        )),
    }
}

fn prompt_confirm(field: &NormalizedField) -> Result<Value, CollectionError> {
    let theme = ColorfulTheme::default();
    let default = matches!(field.default, Some(Value::Bool(true)));
    let answer = Confirm::with_theme(&theme)
        .with_prompt(field.label.clone())
        .default(default)
        .interact_opt()
        .map_err(dialog_err)?;
    Ok(answer.map(Value::Bool).unwrap_or(Value::Null))
}

fn prompt_single_choice(field: &NormalizedField) -> Result<Value, CollectionError> {
    let theme = ColorfulTheme::default();
    let labels: Vec<String> = field.choices.iter().map(choice_label).collect();
    let preselect = default_choice_index(field);
    loop {
        let mut select = Select::with_theme(&theme)
            .with_prompt(field.label.clone())
            .items(&labels);
        if let Some(index) = preselect {
            select = select.default(index);
        }
        let Some(picked) = select.interact_opt().map_err(dialog_err)? else {
            return Ok(Value::Null);
        };
        let value = coerce_choice(&field.choices[picked], field.kind);
        match check_choice(field, value) {
            Ok(value) => return Ok(value),
            Err(line) => eprintln!("{}", style(line).red()),
        }
    }
}

fn prompt_multi_choice(field: &NormalizedField) -> Result<Value, CollectionError> {
    let theme = ColorfulTheme::default();
    let labels: Vec<String> = field.choices.iter().map(choice_label).collect();
    let mut flags = default_multi_flags(field);
    loop {
        let picked = MultiSelect::with_theme(&theme)
            .with_prompt(field.label.clone())
            .items(&labels)
            .defaults(&flags)
            .interact_opt()
            .map_err(dialog_err)?;
        let Some(indices) = picked else {
            return Ok(Value::Array(Vec::new()));
        };
        let values: Vec<Value> = indices
            .iter()
            .map(|&i| coerce_choice(&field.choices[i], field.kind))
            .collect();
        match check_choice(field, Value::Array(values)) {
            Ok(value) => return Ok(value),
            Err(line) => {
                // keep the rejected picks checked for the retry
                for (i, on) in flags.iter_mut().enumerate() {
                    *on = indices.contains(&i);
                }
                eprintln!("{}", style(line).red());
            }
        }
    }
}

fn prompt_text(field: &NormalizedField) -> Result<Value, CollectionError> {
    let theme = ColorfulTheme::default();
    loop {
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(field.label.clone())
            .allow_empty(true);
        if let Some(default) = default_text(field) {
            input = input.default(default);
        }
        let raw = input.interact_text().map_err(dialog_err)?;
        match coerce::coerce_and_validate(&raw, field) {
            Ok(value) => return Ok(value),
            Err(failure) => eprintln!("{}", style(failure.message).red()),
        }
    }
}

fn prompt_path(field: &NormalizedField) -> Result<Value, CollectionError> {
    let theme = ColorfulTheme::default();
    loop {
        let checked = field.clone();
        let mut input = Input::<String>::with_theme(&theme)
            .with_prompt(field.label.clone())
            .allow_empty(true)
            .validate_with(move |raw: &String| -> Result<(), String> {
                coerce::coerce_and_validate(raw, &checked)
                    .map(|_| ())
                    .map_err(|failure| failure.message)
            });
        if let Some(default) = default_text(field) {
            input = input.default(default);
        }
        let raw = input.interact_text().map_err(dialog_err)?;
        // validate_with vets each submit, but an existence check can race
        // the filesystem; a stale pass re-prompts like any other rejection
        match coerce::coerce_and_validate(&raw, field) {
            Ok(value) => return Ok(value),
            Err(failure) => eprintln!("{}", style(failure.message).red()),
        }
    }
}

fn prompt_secret(field: &NormalizedField) -> Result<Value, CollectionError> {
    let theme = ColorfulTheme::default();
    loop {
        let raw = Password::with_theme(&theme)
            .with_prompt(field.label.clone())
            .allow_empty_password(true)
            .interact()
            .map_err(dialog_err)?;
        match coerce::coerce_and_validate(&raw, field) {
            Ok(value) => return Ok(value),
            Err(failure) => eprintln!("{}", style(failure.message).red()),
        }
    }
}

/// Default rendered into a text prompt, when one exists.
fn default_text(field: &NormalizedField) -> Option<String> {
    field.default.as_ref().map(|d| match d {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

pub(crate) fn dialog_err(err: dialoguer::Error) -> CollectionError {
    match err {
        dialoguer::Error::IO(io) => CollectionError::Io(io),
    }
}
