//! Blank script template for Footman.
//!
//! Basic structure for a new automation script. Customize as needed.

use std::fs;
use std::path::Path;

use serde_json::Value;

use lib::schema::{CollectedValues, FieldDescriptor, FieldKind, Schema, SectionOptions};
use lib::script::{Script, ScriptError, ScriptHost};

pub struct BlankScript;

impl Script for BlankScript {
    fn path(&self) -> &str {
        "blank"
    }

    fn description(&self) -> &str {
        "Template: scan a folder, then ask for more input mid-run."
    }

    fn params(&self) -> Schema {
        Schema::new().with(
            FieldDescriptor::new("folder", FieldKind::Path)
                .with_default("./data")
                .with_label("Folder Path"),
        )
    }

    fn run(&self, host: &dyn ScriptHost, params: &CollectedValues) -> Result<(), ScriptError> {
        let folder = params.get("folder").and_then(Value::as_str).unwrap_or("");
        if folder.is_empty() || !Path::new(folder).is_dir() {
            host.emit("Invalid folder path.");
            return Ok(());
        }
        host.emit(&format!("Processing folder: {folder}"));

        // At some point, additional parameters are needed.
        let mut names = Vec::new();
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            names.push(Value::String(entry.file_name().to_string_lossy().into_owned()));
        }
        names.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
        let schema = Schema::new()
            .with(
                FieldDescriptor::new("file_choice", FieldKind::String)
                    .with_label("Choose a file from folder"),
            )
            .with(
                FieldDescriptor::new("comment", FieldKind::String)
                    .with_default("")
                    .with_label("Enter your comment"),
            );
        let mut options = SectionOptions::new();
        options.insert("file_choice".to_string(), names);

        // Append the extra fields and wait for user input.
        let extra = host.request_section("Dynamic Parameters", schema, options)?;

        host.emit("Script running with parameters:");
        host.emit(&format!("  folder = {folder}"));
        for (key, value) in &extra {
            host.emit(&format!("  {key} = {value}"));
        }
        Ok(())
    }
}
