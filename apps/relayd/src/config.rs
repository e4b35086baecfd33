//! Relay daemon configuration.
//!
//! Stored as TOML; every field has a default so an empty file (or none at
//! all) yields a working demo configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use filegate_transfer::TransferConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint settings.
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Logical tag -> physical queue bindings.
    #[serde(default = "default_routes")]
    pub routes: HashMap<String, String>,

    /// Seconds between download poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Capacity of the in-process upload queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Queue consumed by the disk-writing listener.
    #[serde(default = "default_listener_queue")]
    pub listener_queue: String,

    /// Directory the listener materializes files into.
    #[serde(default = "default_save_dir")]
    pub save_dir: String,

    /// Seconds between listener idle ticks.
    #[serde(default = "default_listener_interval")]
    pub listener_interval_secs: u64,
}

fn default_routes() -> HashMap<String, String> {
    HashMap::from([
        ("server1".to_owned(), "queue1".to_owned()),
        ("server2".to_owned(), "queue2".to_owned()),
        ("server3".to_owned(), "queue3".to_owned()),
        ("sftp".to_owned(), "queue-sftp".to_owned()),
    ])
}

fn default_poll_interval() -> u64 {
    2
}

fn default_queue_capacity() -> usize {
    filegate_gateway::DEFAULT_QUEUE_CAPACITY
}

fn default_listener_queue() -> String {
    "queue-sftp".into()
}

fn default_save_dir() -> String {
    "received".into()
}

fn default_listener_interval() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transfer: TransferConfig::default(),
            routes: default_routes(),
            poll_interval_secs: default_poll_interval(),
            queue_capacity: default_queue_capacity(),
            listener_queue: default_listener_queue(),
            save_dir: default_save_dir(),
            listener_interval_secs: default_listener_interval(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` (default `relayd.toml`), falling back
    /// to defaults if the file does not exist.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let path = Path::new(path.unwrap_or("relayd.toml"));
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}
