//! src/config.rs
//! ============================================================================
//! # Config: view configuration loader and saver
//!
//! Refresh tiers, view defaults and logging settings, stored as TOML at the
//! platform config path resolved by [`directories`](https://docs.rs/directories).
//! Missing sections and fields fall back to defaults.
//!
//! ## Example
//! ```rust,ignore
//! let config = Config::load().await?;
//! config.save().await?;
//! ```

use chrono::format::{Item, StrftimeItems};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use tokio::fs as TokioFs;

use crate::error::{ViewError, ViewResult};
use crate::logging::LoggerConfig;
use crate::model::comparators::SortKey;
use crate::model::criteria::FilterCriteria;

/// Delay tiers of the refresh scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Delay used after a long idle period.
    #[serde(with = "humantime_serde")]
    pub immediate_delay: Duration,

    /// Debounce for small lists refreshed recently.
    #[serde(with = "humantime_serde")]
    pub short_delay: Duration,

    /// Throttle for large lists refreshed recently.
    #[serde(with = "humantime_serde")]
    pub long_delay: Duration,

    /// Time since the last refresh after which a change refreshes almost
    /// immediately.
    #[serde(with = "humantime_serde")]
    pub idle_threshold: Duration,

    /// Row count below which a list counts as small.
    pub small_list_rows: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            immediate_delay: Duration::from_millis(100),
            short_delay: Duration::from_secs(2),
            long_delay: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(5),
            small_list_rows: 500,
        }
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> ViewResult<()> {
        if self.idle_threshold.is_zero() {
            return Err(ViewError::invalid_config(
                "refresh.idle_threshold",
                "must be greater than 0",
            ));
        }

        if self.small_list_rows == 0 {
            return Err(ViewError::invalid_config(
                "refresh.small_list_rows",
                "must be greater than 0",
            ));
        }

        if self.long_delay < self.short_delay {
            return Err(ViewError::invalid_config(
                "refresh.long_delay",
                "must not be shorter than short_delay",
            ));
        }

        Ok(())
    }
}

/// Initial state of a newly opened view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub sort_key: SortKey,
    pub sort_ascending: bool,
    pub recursive: bool,
    pub show_normal: bool,
    pub show_expected: bool,
    pub show_deleted: bool,

    /// `strftime` format of the modified column.
    pub date_format: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            sort_key: SortKey::Name,
            sort_ascending: true,
            recursive: false,
            show_normal: true,
            show_expected: true,
            show_deleted: false,
            date_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl ViewConfig {
    pub fn validate(&self) -> ViewResult<()> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ViewError::invalid_config(
                "view.date_format",
                "not a valid strftime format",
            ));
        }

        Ok(())
    }

    /// Criteria a fresh view starts with: no text, configured toggles.
    #[must_use]
    pub fn initial_criteria(&self) -> FilterCriteria {
        FilterCriteria::new(
            "",
            self.show_normal,
            self.show_expected,
            self.show_deleted,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub refresh: RefreshConfig,

    pub view: ViewConfig,

    pub logging: LoggerConfig,
}

impl Config {
    pub fn validate(&self) -> ViewResult<()> {
        self.refresh.validate()?;
        self.view.validate()?;

        crate::logging::validate_config(&self.logging)
            .map_err(|e| ViewError::invalid_config("logging", &e.to_string()))
    }

    /// Loads config from the platform config dir, writing defaults if the
    /// file does not exist yet.
    ///
    /// The config is expected at `$XDG_CONFIG_HOME/folderview/config.toml`
    /// (Linux), or equivalent on Windows/macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(&path).await?;

            Ok(default_config)
        }
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?).await
    }

    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        info!("Loading config from {}", path.display());

        let text = TokioFs::read_to_string(path)
            .await
            .map_err(|e| ViewError::from(e).trace())?;
        let cfg: Self = toml::from_str(&text).map_err(ViewError::from)?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent)
                .await
                .map_err(ViewError::from)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str)
            .await
            .map_err(ViewError::from)?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "folderview", "folderview")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}
