//! Demo of mid-run parameter collection: scan a folder, then ask the user
//! to pick one of its entries and annotate it.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::form::merge_sections;
use crate::schema::{CollectedValues, FieldDescriptor, FieldKind, Schema, SectionOptions};
use crate::script::{Script, ScriptError, ScriptHost};

pub struct Inspect;

impl Script for Inspect {
    fn path(&self) -> &str {
        "demo/inspect"
    }

    fn description(&self) -> &str {
        "Scan a folder, then pick an entry and annotate it."
    }

    fn params(&self) -> Schema {
        Schema::new().with(
            FieldDescriptor::new("folder", FieldKind::Path)
                .required()
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

        let mut names = Vec::new();
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        if names.is_empty() {
            host.emit("Folder is empty, nothing to pick.");
            return Ok(());
        }

        // The choice list only exists now, so it rides in as an override.
        let schema = Schema::new()
            .with(
                FieldDescriptor::new("file_choice", FieldKind::String)
                    .required()
                    .with_label("Choose a file from folder"),
            )
            .with(
                FieldDescriptor::new("comment", FieldKind::String)
                    .with_default("")
                    .with_label("Enter your comment"),
            );
        let mut options = SectionOptions::new();
        options.insert(
            "file_choice".to_string(),
            names.into_iter().map(Value::String).collect(),
        );
        let extra = host.request_section("Dynamic Parameters", schema, options)?;

        let merged = merge_sections(params.clone(), [extra]);
        host.emit("Script running with parameters:");
        for (key, value) in &merged {
            host.emit(&format!("  {key} = {value}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::CollectionError;
    use serde_json::json;
    use std::sync::Mutex;

    struct SectionHost {
        lines: Mutex<Vec<String>>,
        sections: Mutex<Vec<(String, SectionOptions)>>,
        reply: CollectedValues,
    }

    impl SectionHost {
        fn new(reply: CollectedValues) -> Self {
            Self {
                lines: Mutex::new(Vec::new()),
                sections: Mutex::new(Vec::new()),
                reply,
            }
        }

        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl ScriptHost for SectionHost {
        fn emit(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }

        fn request_section(
            &self,
            title: &str,
            _schema: Schema,
            options: SectionOptions,
        ) -> Result<CollectedValues, CollectionError> {
            self.sections
                .lock()
                .unwrap()
                .push((title.to_string(), options));
            Ok(self.reply.clone())
        }
    }

    fn scratch_dir(files: &[&str]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("footman-inspect-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        for name in files {
            fs::write(dir.join(name), b"x").unwrap();
        }
        dir
    }

    #[test]
    fn requests_a_section_with_sorted_folder_entries() {
        let dir = scratch_dir(&["b.txt", "a.txt"]);
        let mut reply = CollectedValues::new();
        reply.insert("file_choice".to_string(), json!("a.txt"));
        reply.insert("comment".to_string(), json!("fine"));
        let host = SectionHost::new(reply);

        let mut params = CollectedValues::new();
        params.insert("folder".to_string(), json!(dir.to_string_lossy()));
        Inspect.run(&host, &params).unwrap();

        let sections = host.sections.lock().unwrap();
        assert_eq!(sections.len(), 1);
        let (title, options) = &sections[0];
        assert_eq!(title, "Dynamic Parameters");
        assert_eq!(
            options.get("file_choice"),
            Some(&vec![json!("a.txt"), json!("b.txt")])
        );
        drop(sections);

        let lines = host.lines();
        assert!(lines.iter().any(|l| l.contains("file_choice = \"a.txt\"")));
        assert!(lines.iter().any(|l| l.contains("comment = \"fine\"")));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn bad_folder_short_circuits_without_a_section() {
        let host = SectionHost::new(CollectedValues::new());
        let mut params = CollectedValues::new();
        params.insert("folder".to_string(), json!("/definitely/not/here"));
        Inspect.run(&host, &params).unwrap();
        assert_eq!(host.lines(), vec!["Invalid folder path."]);
        assert!(host.sections.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_folder_short_circuits_after_the_scan() {
        let dir = scratch_dir(&[]);
        let host = SectionHost::new(CollectedValues::new());
        let mut params = CollectedValues::new();
        params.insert("folder".to_string(), json!(dir.to_string_lossy()));
        Inspect.run(&host, &params).unwrap();
        assert!(host
            .lines()
            .contains(&"Folder is empty, nothing to pick.".to_string()));
        assert!(host.sections.lock().unwrap().is_empty());
        fs::remove_dir_all(dir).unwrap();
    }
}
