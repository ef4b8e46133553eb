use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{MealError, Result};
use crate::models::{TemplateRecord, WeekBucket};
use crate::storage::{DirStorage, MemoryStorage, Storage};
use crate::week::week_bucket_key;

pub const TEMPLATES_UNIT: &str = "templates";

/// Week buckets and the template record on top of a unit storage backend.
pub struct Database {
    storage: Box<dyn Storage>,
}

impl Database {
    /// Open a data directory, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self::with_storage(DirStorage::open(dir)?))
    }

    #[must_use]
    pub fn open_in_memory() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    #[must_use]
    pub fn with_storage(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    // --- Weeks ---

    pub fn load_week(&self, date: NaiveDate) -> Result<WeekBucket> {
        self.load_unit(&week_bucket_key(date))
    }

    pub fn save_week(&self, date: NaiveDate, bucket: &WeekBucket) -> Result<()> {
        self.save_unit(&week_bucket_key(date), bucket)
    }

    // --- Templates ---

    pub fn load_templates(&self) -> Result<TemplateRecord> {
        self.load_unit(TEMPLATES_UNIT)
    }

    pub fn save_templates(&self, record: &TemplateRecord) -> Result<()> {
        self.save_unit(TEMPLATES_UNIT, record)
    }

    pub fn upsert_template(&self, name: &str, description: &str) -> Result<TemplateRecord> {
        let mut record = self.load_templates()?;
        record.upsert(name, description);
        self.save_templates(&record)?;
        Ok(record)
    }

    // --- Units ---

    fn load_unit<T: DeserializeOwned + Default>(&self, unit: &str) -> Result<T> {
        let Some(contents) = self.storage.read_unit(unit)? else {
            return Ok(T::default());
        };
        serde_json::from_str(&contents).map_err(|source| MealError::Malformed {
            unit: unit.to_string(),
            source,
        })
    }

    fn save_unit<T: Serialize>(&self, unit: &str, value: &T) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(value).map_err(|source| MealError::Malformed {
                unit: unit.to_string(),
                source,
            })?;
        self.storage.write_unit(unit, &contents)
    }
}
