//! Per-user records that ground a coaching response.
//!
//! Rows arrive from the record store as loose JSON objects. The types here
//! give them just enough structure for the pipeline: a [`Profile`] with
//! named accessors, opaque [`OnboardingAnswer`]s, and rendered
//! [`RecordItem`]s for goals, tasks, and journal entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound on records shown to the model per coaching query.
pub const MAX_RELEVANT_ITEMS: usize = 10;

/// Look up a field, treating JSON `null` and the empty string as absent.
pub fn present<'a>(row: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match row.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    }
}

/// Render a JSON value the way it should read in a prompt: strings raw,
/// everything else as its JSON text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The user's profile row. At most one per user; absent means empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(pub Map<String, Value>);

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn text(&self, key: &str) -> Option<String> {
        present(&self.0, key).map(display_value)
    }

    /// Display name, falling back to first name.
    pub fn display_name(&self) -> Option<String> {
        self.text("display_name").or_else(|| self.text("first_name"))
    }

    pub fn vision(&self) -> Option<String> {
        self.text("vision")
    }

    pub fn level(&self) -> Option<String> {
        self.text("level")
    }

    pub fn xp(&self) -> Option<String> {
        self.text("xp")
    }
}

impl From<Map<String, Value>> for Profile {
    fn from(row: Map<String, Value>) -> Self {
        Self(row)
    }
}

/// One onboarding questionnaire row, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OnboardingAnswer(pub Map<String, Value>);

impl From<Map<String, Value>> for OnboardingAnswer {
    fn from(row: Map<String, Value>) -> Self {
        Self(row)
    }
}

/// Profile plus onboarding answers, echoed back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub profile: Profile,
    pub onboarding: Vec<OnboardingAnswer>,
}

/// Which source a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Goal,
    Task,
    Journal,
}

impl RecordKind {
    /// Capitalized label used in prompt bullets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Goal => "Goal",
            Self::Task => "Task",
            Self::Journal => "Journal",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Goal => write!(f, "goal"),
            Self::Task => write!(f, "task"),
            Self::Journal => write!(f, "journal"),
        }
    }
}

/// A goal, task, or journal entry after rendering.
///
/// `content` is always the human-readable summary the model sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordItem {
    #[serde(rename = "type")]
    pub kind: RecordKind,

    pub content: String,

    /// Kind-specific fields (due date, progress, status, mood, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Set only by search-mode selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,

    /// Raw text the search mode matches against (title, description, or
    /// journal content). Not part of the wire shape.
    #[serde(skip)]
    pub search_fields: Vec<String>,
}

impl RecordItem {
    pub fn new(kind: RecordKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: Map::new(),
            relevance_score: None,
            search_fields: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_search_fields(mut self, fields: Vec<String>) -> Self {
        self.search_fields = fields;
        self
    }

    /// Case-insensitive substring match against the search fields.
    pub fn matches(&self, query_lower: &str) -> bool {
        self.search_fields
            .iter()
            .any(|f| f.to_lowercase().contains(query_lower))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn present_skips_null_and_empty() {
        let row = map(json!({"a": null, "b": "", "c": 0, "d": false}));
        assert!(present(&row, "a").is_none());
        assert!(present(&row, "b").is_none());
        assert!(present(&row, "missing").is_none());
        assert_eq!(present(&row, "c"), Some(&json!(0)));
        assert_eq!(present(&row, "d"), Some(&json!(false)));
    }

    #[test]
    fn profile_display_name_falls_back_to_first_name() {
        let profile = Profile::from(map(json!({"display_name": null, "first_name": "Ada"})));
        assert_eq!(profile.display_name().as_deref(), Some("Ada"));

        let empty = Profile::default();
        assert!(empty.display_name().is_none());
    }

    #[test]
    fn profile_numbers_render_as_text() {
        let profile = Profile::from(map(json!({"level": 3, "xp": 1250})));
        assert_eq!(profile.level().as_deref(), Some("3"));
        assert_eq!(profile.xp().as_deref(), Some("1250"));
    }

    #[test]
    fn record_item_wire_shape_uses_type_key() {
        let item =
            RecordItem::new(RecordKind::Task, "Call mentor (Status: todo, High Impact: true)")
                .with_search_fields(vec!["Call mentor".into()]);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "task");
        assert!(json.get("search_fields").is_none());
        assert!(json.get("relevance_score").is_none());
    }

    #[test]
    fn record_item_matches_case_insensitively() {
        let item = RecordItem::new(RecordKind::Goal, "x")
            .with_search_fields(vec!["Run a Marathon".into(), "".into()]);
        assert!(item.matches("marathon"));
        assert!(!item.matches("swim"));
    }
}
