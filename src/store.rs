//! Persistence for user assumption overrides.
//!
//! Stores hold only what the user changed. Resolving against a base
//! assumption set happens on read, so a new default reaches every user who
//! never overrode that field.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info};

use crate::core::{AssumptionOverrides, AssumptionPreset, Assumptions};
use crate::error::{CashflowError, CashflowResult};

pub trait AssumptionStore: Send + Sync {
    fn load(&self) -> CashflowResult<AssumptionOverrides>;

    /// Replaces the stored overrides.
    fn save(&self, overrides: &AssumptionOverrides) -> CashflowResult<()>;

    fn reset(&self) -> CashflowResult<()>;

    fn resolve(&self, base: &Assumptions) -> CashflowResult<Assumptions> {
        Ok(self.load()?.apply_to(base))
    }
}

/// Builds the assumption set for one computation: preset defaults, then the
/// stored overrides, then the per-request overrides. The result is validated.
pub fn resolve_assumptions(
    store: &dyn AssumptionStore,
    preset: AssumptionPreset,
    request: &AssumptionOverrides,
) -> CashflowResult<Assumptions> {
    let layered = store.load()?.merged_with(request);
    let assumptions = layered.apply_to(&preset.assumptions());
    assumptions.validate()?;
    Ok(assumptions)
}

/// Overrides kept as a pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AssumptionStore for JsonFileStore {
    fn load(&self) -> CashflowResult<AssumptionOverrides> {
        if !self.path.exists() {
            debug!("no stored assumptions at {}", self.path.display());
            return Ok(AssumptionOverrides::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(AssumptionOverrides::default());
        }
        serde_json::from_str(&contents).map_err(|e| {
            CashflowError::Config(format!(
                "failed to parse {}: {e}",
                self.path.display()
            ))
        })
    }

    fn save(&self, overrides: &AssumptionOverrides) -> CashflowResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(overrides)?;
        fs::write(&self.path, contents)?;
        info!("saved assumptions to {}", self.path.display());
        Ok(())
    }

    fn reset(&self) -> CashflowResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!("removed stored assumptions at {}", self.path.display());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    overrides: Mutex<AssumptionOverrides>,
}

impl MemoryStore {
    pub fn new(overrides: AssumptionOverrides) -> Self {
        Self {
            overrides: Mutex::new(overrides),
        }
    }
}

impl AssumptionStore for MemoryStore {
    fn load(&self) -> CashflowResult<AssumptionOverrides> {
        let guard = self
            .overrides
            .lock()
            .map_err(|_| CashflowError::Config("assumption store lock poisoned".to_string()))?;
        Ok(*guard)
    }

    fn save(&self, overrides: &AssumptionOverrides) -> CashflowResult<()> {
        let mut guard = self
            .overrides
            .lock()
            .map_err(|_| CashflowError::Config("assumption store lock poisoned".to_string()))?;
        *guard = *overrides;
        Ok(())
    }

    fn reset(&self) -> CashflowResult<()> {
        self.save(&AssumptionOverrides::default())
    }
}
