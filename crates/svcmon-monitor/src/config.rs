//! Monitor thresholds and the configuration store collaborator.
//!
//! The three tunables live in an external configuration store under the
//! `service_monitor` category. On every start the monitor makes sure the
//! category exists with defaults (never overwriting stored values), then
//! reads the effective values back. Unparsable values are fatal to `start`.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use svcmon_common::{ConfigError, ConfigResult};
use tracing::{debug, info};

/// Category name for the monitor's tunables in the configuration store.
pub const CONFIG_CATEGORY: &str = "service_monitor";

pub const DEFAULT_SLEEP_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 1;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;

/// Default definition for one configuration item.
#[derive(Debug, Clone)]
pub struct ConfigItemDefault {
    pub name: &'static str,
    pub description: &'static str,
    pub default: String,
}

/// External configuration store collaborator.
///
/// `create_category_if_absent` is idempotent: calling it on every process
/// start is safe, and values already present in the store are never
/// overwritten - only missing items get their defaults.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn create_category_if_absent(
        &self,
        category: &str,
        items: &[ConfigItemDefault],
        description: &str,
    ) -> ConfigResult<()>;

    /// Effective values for a category, as an item -> value mapping.
    async fn get_all_items(&self, category: &str) -> ConfigResult<HashMap<String, String>>;
}

/// Validated monitor thresholds. Loaded once at `start`, immutable for the
/// lifetime of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time to sleep between health check rounds.
    pub sleep_interval: Duration,
    /// Timeout for a ping response from any given service.
    pub ping_timeout: Duration,
    /// Consecutive failed pings after which a service is evicted.
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sleep_interval: Duration::from_secs(DEFAULT_SLEEP_INTERVAL_SECS),
            ping_timeout: Duration::from_secs(DEFAULT_PING_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl MonitorConfig {
    /// Item definitions registered with the store on first use.
    pub fn default_items() -> Vec<ConfigItemDefault> {
        vec![
            ConfigItemDefault {
                name: "sleep_interval",
                description: "The time (in seconds) to sleep between health check rounds",
                default: DEFAULT_SLEEP_INTERVAL_SECS.to_string(),
            },
            ConfigItemDefault {
                name: "ping_timeout",
                description: "Timeout (in seconds) for a ping response from any given service",
                default: DEFAULT_PING_TIMEOUT_SECS.to_string(),
            },
            ConfigItemDefault {
                name: "max_attempts",
                description: "Number of consecutive failed pings before a service is marked as failed",
                default: DEFAULT_MAX_ATTEMPTS.to_string(),
            },
        ]
    }

    /// Ensures the category exists, then reads and validates the effective
    /// thresholds.
    pub async fn load(store: &dyn ConfigStore) -> ConfigResult<Self> {
        store
            .create_category_if_absent(
                CONFIG_CATEGORY,
                &Self::default_items(),
                "Service monitor configuration",
            )
            .await?;

        let items = store.get_all_items(CONFIG_CATEGORY).await?;

        let sleep_interval: u64 = parse_item(&items, "sleep_interval")?;
        let ping_timeout: u64 = parse_item(&items, "ping_timeout")?;
        let max_attempts: u32 = parse_item(&items, "max_attempts")?;

        let config = Self {
            sleep_interval: Duration::from_secs(sleep_interval),
            ping_timeout: Duration::from_secs(ping_timeout),
            max_attempts,
        };
        debug!(?config, "Loaded monitor configuration");
        Ok(config)
    }
}

fn parse_item<T: FromStr>(items: &HashMap<String, String>, name: &str) -> ConfigResult<T> {
    let raw = items.get(name).ok_or_else(|| ConfigError::MissingItem {
        category: CONFIG_CATEGORY.to_string(),
        item: name.to_string(),
    })?;
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        item: name.to_string(),
        value: raw.clone(),
    })
}

/// In-memory configuration store. Useful for tests and embedded setups.
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    categories: DashMap<String, HashMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides a single stored value.
    pub fn set_item(&self, category: &str, item: &str, value: impl Into<String>) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(item.to_string(), value.into());
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn create_category_if_absent(
        &self,
        category: &str,
        items: &[ConfigItemDefault],
        _description: &str,
    ) -> ConfigResult<()> {
        let mut entry = self.categories.entry(category.to_string()).or_default();
        for item in items {
            entry
                .entry(item.name.to_string())
                .or_insert_with(|| item.default.clone());
        }
        Ok(())
    }

    async fn get_all_items(&self, category: &str) -> ConfigResult<HashMap<String, String>> {
        Ok(self
            .categories
            .get(category)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }
}

/// JSON-file-backed configuration store.
///
/// The whole store is a `category -> { item -> value }` map persisted on
/// every mutation. Good enough for a single monitor process; anything
/// heavier belongs in a real configuration service behind the same trait.
pub struct FileConfigStore {
    path: PathBuf,
    categories: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl FileConfigStore {
    /// Opens (or initializes) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();

        let categories = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                ConfigError::Store(format!("{} is not a valid config store: {}", path.display(), e))
            })?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            categories: RwLock::new(categories),
        })
    }

    /// Overrides a single stored value and persists the change.
    pub fn set_item(&self, category: &str, item: &str, value: impl Into<String>) -> ConfigResult<()> {
        let mut categories = self.categories.write();
        categories
            .entry(category.to_string())
            .or_default()
            .insert(item.to_string(), value.into());
        self.persist(&categories)
    }

    fn persist(&self, categories: &HashMap<String, HashMap<String, String>>) -> ConfigResult<()> {
        let raw = serde_json::to_string_pretty(categories)
            .map_err(|e| ConfigError::Store(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn create_category_if_absent(
        &self,
        category: &str,
        items: &[ConfigItemDefault],
        description: &str,
    ) -> ConfigResult<()> {
        let mut categories = self.categories.write();
        let entry = categories.entry(category.to_string()).or_default();

        let mut changed = false;
        for item in items {
            if !entry.contains_key(item.name) {
                entry.insert(item.name.to_string(), item.default.clone());
                changed = true;
            }
        }

        if changed {
            info!(category, description, "Initialized configuration category");
            self.persist(&categories)?;
        }
        Ok(())
    }

    async fn get_all_items(&self, category: &str) -> ConfigResult<HashMap<String, String>> {
        Ok(self
            .categories
            .read()
            .get(category)
            .cloned()
            .unwrap_or_default())
    }
}
