use std::fmt;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Reserved key carrying the source line number of a sample row.
pub const LINE_KEY: &str = "__line__";

/// Row id used when a sample carries no [`LINE_KEY`].
pub const UNKNOWN_ROW_ID: &str = "n/a";

/// One sample row as returned by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleRow {
    entries: Vec<(String, String)>,
}

impl SampleRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn line(&self) -> Option<&str> {
        self.get(LINE_KEY)
    }

    pub fn row_id(&self) -> String {
        self.line().unwrap_or(UNKNOWN_ROW_ID).to_string()
    }

    /// Absent or empty. Unlike a plain falsy check, `0` and `false` count as
    /// present since they are real key values.
    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).map_or(true, str::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| *k != LINE_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl Serialize for SampleRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct SampleRowVisitor;

impl<'de> Visitor<'de> for SampleRowVisitor {
    type Value = SampleRow;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of column names to values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut row = SampleRow::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            row.insert(key, value_to_text(value));
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for SampleRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(SampleRowVisitor)
    }
}
