use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{MealError, Result};

/// Persistence for named units of JSON text.
///
/// A unit that was never written reads back as `None`; callers treat that as
/// an empty document rather than a failure.
pub trait Storage: Send + Sync {
    fn read_unit(&self, unit: &str) -> Result<Option<String>>;
    fn write_unit(&self, unit: &str, contents: &str) -> Result<()>;
}

/// One `<unit>.json` file per unit inside a data directory.
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|source| MealError::Storage {
            unit: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    #[must_use]
    pub fn unit_path(&self, unit: &str) -> PathBuf {
        self.dir.join(format!("{unit}.json"))
    }
}

impl Storage for DirStorage {
    fn read_unit(&self, unit: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.unit_path(unit)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MealError::Storage {
                unit: unit.to_string(),
                source,
            }),
        }
    }

    fn write_unit(&self, unit: &str, contents: &str) -> Result<()> {
        let path = self.unit_path(unit);
        tracing::debug!(path = %path.display(), bytes = contents.len(), "writing unit");
        std::fs::write(&path, contents).map_err(|source| MealError::Storage {
            unit: unit.to_string(),
            source,
        })
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    units: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read_unit(&self, unit: &str) -> Result<Option<String>> {
        let units = self
            .units
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(units.get(unit).cloned())
    }

    fn write_unit(&self, unit: &str, contents: &str) -> Result<()> {
        let mut units = self
            .units
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        units.insert(unit.to_string(), contents.to_string());
        Ok(())
    }
}
