use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{MealError, Result};
use crate::week::{entry_timestamp, format_date, parse_time};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealEntry {
    pub time: String,
    pub description: String,
    pub timestamp: i64,
}

impl MealEntry {
    /// Build an entry for `date`, deriving the timestamp from `time`.
    pub fn new(date: NaiveDate, time: &str, description: &str) -> Result<Self> {
        let parsed = parse_time(time)?;
        Ok(Self {
            time: time.trim().to_string(),
            description: description.to_string(),
            timestamp: entry_timestamp(date, parsed),
        })
    }
}

/// All meal entries of one Monday–Sunday week, keyed by `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekBucket {
    days: BTreeMap<String, Vec<MealEntry>>,
}

impl WeekBucket {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    #[must_use]
    pub fn day(&self, date: NaiveDate) -> &[MealEntry] {
        self.days
            .get(&format_date(date))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MealEntry])> {
        self.days.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Append `entry` under `date` and re-sort that day by timestamp.
    /// The sort is stable, so equal timestamps keep insertion order.
    pub fn insert(&mut self, date: NaiveDate, entry: MealEntry) {
        let entries = self.days.entry(format_date(date)).or_default();
        entries.push(entry);
        entries.sort_by_key(|e| e.timestamp);
    }

    /// Remove the entry at `index` under `date`. Later entries shift down by
    /// one; the date key is dropped once its list is empty.
    pub fn remove(&mut self, date: NaiveDate, index: usize) -> Option<MealEntry> {
        let key = format_date(date);
        let entries = self.days.get_mut(&key)?;
        if index >= entries.len() {
            return None;
        }
        let removed = entries.remove(index);
        if entries.is_empty() {
            self.days.remove(&key);
        }
        Some(removed)
    }
}

/// Meal as echoed back to API clients after a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealRef {
    pub date: String,
    pub time: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
    #[serde(default)]
    pub usage: BTreeMap<String, u64>,
}

impl TemplateRecord {
    /// Set the description for `name` and count one more use of it.
    /// Overwriting an existing template still increments its usage.
    pub fn upsert(&mut self, name: &str, description: &str) {
        self.templates
            .insert(name.to_string(), description.to_string());
        *self.usage.entry(name.to_string()).or_insert(0) += 1;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub name: String,
    pub description: String,
}

/// Reject a missing or blank required field.
pub fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MealError::validation(format!("'{field}' is required"))),
    }
}
