//! Field descriptors and parameter schemas.
//!
//! A schema is an ordered set of field descriptors. Descriptors are normalized
//! once before rendering: the `${VAR}` default is resolved and the widget is
//! fixed. Front-ends only ever see normalized fields.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Typed values harvested from one section, keyed by field key (insertion order kept).
pub type CollectedValues = serde_json::Map<String, Value>;

/// Per-key choice-list overrides for a section, taking precedence over the
/// choices baked into the schema.
pub type SectionOptions = HashMap<String, Vec<Value>>;

/// Declared type of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Path,
    /// Value is one of an enumerated set; the set itself lives in `choices`.
    Choice,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Path => "path",
            FieldKind::Choice => "choice",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict from a custom field validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Invalid, no detail.
    Fail,
    /// Invalid, with a reason shown to the user.
    FailWith(String),
}

/// Custom validation hook, run on the coerced value (never the raw text).
pub type Validator = Arc<dyn Fn(&Value) -> Verdict + Send + Sync>;

/// How a field is rendered. Fixed once at normalization, not re-derived per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    /// Yes/no confirmation (boolean fields without choices).
    Confirm,
    /// Plain text entry.
    Text,
    /// Masked text entry.
    SecretText,
    /// Text entry rejected inline on submit when invalid.
    PathText,
    /// Pick exactly one of the choices.
    SingleChoice,
    /// Pick zero or more of the choices.
    MultiChoice,
}

/// One parameter definition: type, constraints, and presentation.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub key: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Literal value, or a `${VAR}` placeholder resolved at normalization.
    pub default: Option<Value>,
    /// Presence switches rendering to a selection widget regardless of `kind`.
    pub choices: Option<Vec<Value>>,
    /// With `choices`: select 0..N values instead of exactly one.
    pub multiple: bool,
    pub secret: bool,
    pub label: Option<String>,
    pub description: Option<String>,
    pub validator: Option<Validator>,
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("multiple", &self.multiple)
            .field("secret", &self.secret)
            .field("label", &self.label)
            .field("description", &self.description)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
            required: false,
            default: None,
            choices: None,
            multiple: false,
            secret: false,
            label: None,
            description: None,
            validator: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_choices(mut self, choices: Vec<Value>) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&Value) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Text shown at the prompt: the label when set, the key otherwise.
    pub fn prompt_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    /// Resolve the default and fix the widget for rendering.
    pub fn normalize(&self, env: &HashMap<String, String>) -> NormalizedField {
        let default = self
            .default
            .as_ref()
            .map(|d| resolve_default(d, env))
            .filter(|d| !d.is_null());
        let choices = self.choices.clone().unwrap_or_default();
        let widget = widget_for(self.kind, !choices.is_empty(), self.multiple, self.secret);
        NormalizedField {
            key: self.key.clone(),
            kind: self.kind,
            required: self.required,
            default,
            choices,
            label: self.prompt_label().to_string(),
            description: self.description.clone(),
            validator: self.validator.clone(),
            widget,
        }
    }
}

/// A descriptor ready for rendering: default resolved, widget fixed.
#[derive(Clone)]
pub struct NormalizedField {
    pub key: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Resolved default; never a placeholder, never null.
    pub default: Option<Value>,
    /// Empty when the field has no choices.
    pub choices: Vec<Value>,
    pub label: String,
    pub description: Option<String>,
    pub validator: Option<Validator>,
    pub widget: Widget,
}

impl fmt::Debug for NormalizedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedField")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("label", &self.label)
            .field("widget", &self.widget)
            .finish()
    }
}

/// Widget for a descriptor shape. Choices win over everything; booleans
/// confirm; paths and secrets get their own text entries.
fn widget_for(kind: FieldKind, has_choices: bool, multiple: bool, secret: bool) -> Widget {
    if has_choices {
        if multiple {
            Widget::MultiChoice
        } else {
            Widget::SingleChoice
        }
    } else {
        match kind {
            FieldKind::Boolean => Widget::Confirm,
            FieldKind::Path => Widget::PathText,
            _ if secret => Widget::SecretText,
            _ => Widget::Text,
        }
    }
}

/// Resolve a `${NAME}` placeholder default against an environment mapping.
/// The exact placeholder form resolves to the mapped value (null when the
/// name is absent); anything else is returned unchanged.
pub fn resolve_default(default: &Value, env: &HashMap<String, String>) -> Value {
    if let Value::String(s) = default {
        if let Some(name) = placeholder_name(s) {
            return env
                .get(name)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null);
        }
    }
    default.clone()
}

fn placeholder_name(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(inner)
}

/// Ordered mapping of key to descriptor. Insertion order is presentation order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. A duplicate key replaces the existing descriptor in place,
    /// keeping its position.
    pub fn insert(&mut self, field: FieldDescriptor) {
        match self.fields.iter_mut().find(|f| f.key == field.key) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// `insert` for chained construction.
    pub fn with(mut self, field: FieldDescriptor) -> Self {
        self.insert(field);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Normalize every field in presentation order.
    pub fn normalize(&self, env: &HashMap<String, String>) -> Vec<NormalizedField> {
        self.fields.iter().map(|f| f.normalize(env)).collect()
    }

    /// Resolved defaults of this schema, for backstopping merged values.
    pub fn defaults(&self, env: &HashMap<String, String>) -> CollectedValues {
        self.normalize(env)
            .into_iter()
            .filter_map(|f| f.default.map(|d| (f.key, d)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn resolve_default_substitutes_placeholder() {
        let e = env(&[("USER", "giulia")]);
        assert_eq!(
            resolve_default(&json!("${USER}"), &e),
            json!("giulia")
        );
    }

    #[test]
    fn resolve_default_missing_name_is_null() {
        assert_eq!(resolve_default(&json!("${NOPE}"), &env(&[])), Value::Null);
    }

    #[test]
    fn resolve_default_leaves_plain_values_alone() {
        let e = env(&[("USER", "giulia")]);
        assert_eq!(resolve_default(&json!("plain"), &e), json!("plain"));
        assert_eq!(resolve_default(&json!(42), &e), json!(42));
        assert_eq!(resolve_default(&json!("pre ${USER}"), &e), json!("pre ${USER}"));
        assert_eq!(resolve_default(&json!("${}"), &e), json!("${}"));
    }

    #[test]
    fn resolve_default_is_idempotent() {
        let e = env(&[("HOME_DIR", "/home/giulia")]);
        for default in [json!("${HOME_DIR}"), json!("${MISSING}"), json!("literal")] {
            let once = resolve_default(&default, &e);
            let twice = resolve_default(&once, &e);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn widget_dispatch_is_fixed_at_normalization() {
        let e = env(&[]);
        let cases = [
            (FieldDescriptor::new("a", FieldKind::Boolean), Widget::Confirm),
            (
                FieldDescriptor::new("b", FieldKind::Boolean)
                    .with_choices(vec![json!(true), json!(false)]),
                Widget::SingleChoice,
            ),
            (
                FieldDescriptor::new("c", FieldKind::String)
                    .with_choices(vec![json!("x")])
                    .multiple(),
                Widget::MultiChoice,
            ),
            (FieldDescriptor::new("d", FieldKind::Path), Widget::PathText),
            (FieldDescriptor::new("e", FieldKind::String).secret(), Widget::SecretText),
            (FieldDescriptor::new("f", FieldKind::Integer), Widget::Text),
        ];
        for (field, expected) in cases {
            assert_eq!(field.normalize(&e).widget, expected, "field {}", field.key);
        }
    }

    #[test]
    fn normalize_resolves_default_before_rendering() {
        let e = env(&[("COLOR", "blue")]);
        let field = FieldDescriptor::new("color", FieldKind::String)
            .with_default("${COLOR}")
            .with_choices(vec![json!("red"), json!("blue")]);
        let normalized = field.normalize(&e);
        assert_eq!(normalized.default, Some(json!("blue")));
    }

    #[test]
    fn normalize_drops_unresolvable_default() {
        let field = FieldDescriptor::new("who", FieldKind::String).with_default("${ABSENT}");
        assert_eq!(field.normalize(&env(&[])).default, None);
    }

    #[test]
    fn schema_insert_replaces_in_place() {
        let mut schema = Schema::new()
            .with(FieldDescriptor::new("first", FieldKind::String))
            .with(FieldDescriptor::new("second", FieldKind::Integer));
        schema.insert(FieldDescriptor::new("first", FieldKind::Boolean));
        let keys: Vec<&str> = schema.keys().collect();
        assert_eq!(keys, vec!["first", "second"]);
        assert_eq!(schema.get("first").unwrap().kind, FieldKind::Boolean);
    }

    #[test]
    fn schema_defaults_collect_resolved_values() {
        let e = env(&[("WHO", "giulia")]);
        let schema = Schema::new()
            .with(FieldDescriptor::new("who", FieldKind::String).with_default("${WHO}"))
            .with(FieldDescriptor::new("count", FieldKind::Integer).with_default(3))
            .with(FieldDescriptor::new("bare", FieldKind::String));
        let defaults = schema.defaults(&e);
        assert_eq!(defaults.get("who"), Some(&json!("giulia")));
        assert_eq!(defaults.get("count"), Some(&json!(3)));
        assert!(!defaults.contains_key("bare"));
    }
}
