//! Minimal demo: greets someone, exercising defaults, booleans, and a
//! custom validator.

use serde_json::Value;

use crate::schema::{CollectedValues, FieldDescriptor, FieldKind, Schema, Verdict};
use crate::script::{Script, ScriptError, ScriptHost};

pub struct Greet;

impl Script for Greet {
    fn path(&self) -> &str {
        "demo/greet"
    }

    fn description(&self) -> &str {
        "Print a configurable greeting."
    }

    fn params(&self) -> Schema {
        Schema::new()
            .with(
                FieldDescriptor::new("who", FieldKind::String)
                    .required()
                    .with_default("${USER}")
                    .with_label("Who should be greeted?"),
            )
            .with(
                FieldDescriptor::new("excited", FieldKind::Boolean)
                    .with_default(false)
                    .with_label("Add an exclamation mark?"),
            )
            .with(
                FieldDescriptor::new("times", FieldKind::Integer)
                    .with_default(1)
                    .with_label("How many times?")
                    .with_validator(|v| match v.as_i64() {
                        Some(n) if n >= 1 => Verdict::Pass,
                        _ => Verdict::FailWith("must be at least 1".to_string()),
                    }),
            )
    }

    fn run(&self, host: &dyn ScriptHost, params: &CollectedValues) -> Result<(), ScriptError> {
        let who = params.get("who").and_then(Value::as_str).unwrap_or("world");
        let times = params.get("times").and_then(Value::as_i64).unwrap_or(1);
        let excited = params
            .get("excited")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let punct = if excited { "!" } else { "." };
        for _ in 0..times {
            host.emit(&format!("Hello, {who}{punct}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::{apply_validator, CollectionError};
    use crate::schema::SectionOptions;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingHost {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingHost {
        fn new() -> Self {
            Self {
                lines: Mutex::new(Vec::new()),
            }
        }

        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl ScriptHost for RecordingHost {
        fn emit(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        fn request_section(
            &self,
            _title: &str,
            _schema: Schema,
            _options: SectionOptions,
        ) -> Result<CollectedValues, CollectionError> {
            Ok(CollectedValues::new())
        }
    }

    #[test]
    fn greets_the_requested_number_of_times() {
        let host = RecordingHost::new();
        let mut params = CollectedValues::new();
        params.insert("who".to_string(), json!("Ada"));
        params.insert("excited".to_string(), json!(true));
        params.insert("times".to_string(), json!(2));
        Greet.run(&host, &params).unwrap();
        assert_eq!(host.lines(), vec!["Hello, Ada!", "Hello, Ada!"]);
    }

    #[test]
    fn missing_optionals_fall_back_to_plain_greeting() {
        let host = RecordingHost::new();
        let mut params = CollectedValues::new();
        params.insert("who".to_string(), json!("Ada"));
        Greet.run(&host, &params).unwrap();
        assert_eq!(host.lines(), vec!["Hello, Ada."]);
    }

    #[test]
    fn times_validator_rejects_non_positive_counts() {
        let env = HashMap::new();
        let fields = Greet.params().normalize(&env);
        let times = fields.iter().find(|f| f.key == "times").unwrap();
        let err = apply_validator(times, json!(0)).unwrap_err();
        assert_eq!(err.to_string(), "must be at least 1");
        assert!(apply_validator(times, json!(3)).is_ok());
    }

    #[test]
    fn who_default_resolves_from_environment() {
        let env = HashMap::from([("USER".to_string(), "ada".to_string())]);
        let fields = Greet.params().normalize(&env);
        let who = fields.iter().find(|f| f.key == "who").unwrap();
        assert_eq!(who.default, Some(json!("ada")));
    }
}
