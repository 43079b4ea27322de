//! Session state store: one user's in-progress answers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field::{Field, FieldValue};

/// Read-only copy of a session's answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord(BTreeMap<String, FieldValue>);

impl SessionRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, FieldValue)> for SessionRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Mutable per-session answers, exclusively owned by one interactive session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    id: Uuid,
    values: BTreeMap<String, FieldValue>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionStore {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            values: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Overwrite a field's value unconditionally.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
        self.updated_at = Utc::now();
    }

    /// Remove a field's value. Returns the previous value, if any.
    pub fn unset(&mut self, name: &str) -> Option<FieldValue> {
        let previous = self.values.remove(name);
        self.updated_at = Utc::now();
        previous
    }

    /// The entered value, if any.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// The entered value, falling back to the field's display default.
    pub fn get_or_default(&self, field: &Field) -> Option<FieldValue> {
        self.values
            .get(&field.name)
            .cloned()
            .or_else(|| field.default.clone())
    }

    pub fn snapshot(&self) -> SessionRecord {
        SessionRecord(self.values.clone())
    }

    /// Discard every answer. The session id is kept.
    pub fn clear(&mut self) {
        self.values.clear();
        self.updated_at = Utc::now();
    }

    /// Record an interaction without changing any value.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
