//! Path and environment configuration.
//!
//! ## Base directory resolution
//!
//! 1. `RENTAL_CASHFLOW_DIR` environment variable (if set)
//! 2. `$XDG_CONFIG_HOME/rental-cashflow`
//! 3. `$HOME/.config/rental-cashflow`

use std::path::PathBuf;

use crate::error::{CashflowError, CashflowResult};

pub const DIR_ENV_VAR: &str = "RENTAL_CASHFLOW_DIR";
pub const DEFAULT_PORT: u16 = 8080;
const APP_DIR_NAME: &str = "rental-cashflow";

#[derive(Debug, Clone)]
pub struct AppPaths {
    base_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> CashflowResult<Self> {
        let base_dir = match std::env::var(DIR_ENV_VAR) {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };
        Ok(Self { base_dir })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Stored assumption overrides
    pub fn assumptions_file(&self) -> PathBuf {
        self.base_dir.join("assumptions.json")
    }

    /// Default CSV ledger for exported listings
    pub fn export_file(&self) -> PathBuf {
        self.data_dir().join("properties.csv")
    }
}

fn resolve_default_path() -> CashflowResult<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Ok(PathBuf::from(xdg).join(APP_DIR_NAME));
        }
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| CashflowError::Config("could not determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
}

/// Port for the HTTP API: the `PORT` variable when it parses, else 8080.
pub fn server_port() -> u16 {
    parse_port(std::env::var("PORT").ok().as_deref())
}

fn parse_port(raw: Option<&str>) -> u16 {
    match raw {
        Some(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
            log::warn!("PORT={value} is not a valid port, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn custom_base_dir_drives_file_paths() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.data_dir(), temp_dir.path().join("data"));
        assert_eq!(
            paths.assumptions_file(),
            temp_dir.path().join("assumptions.json")
        );
        assert_eq!(
            paths.export_file(),
            temp_dir.path().join("data").join("properties.csv")
        );
    }

    #[test]
    fn port_parsing_falls_back_to_default() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("3030")), 3030);
        assert_eq!(parse_port(Some(" 9000 ")), 9000);
        assert_eq!(parse_port(Some("http")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("70000")), DEFAULT_PORT);
    }
}
