use serde::{Deserialize, Serialize};

/// Connection settings for a remote transfer endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Remote directory polled for inbound files; uploads land here too.
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    22
}

fn default_source_dir() -> String {
    "inbox".into()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            source_dir: default_source_dir(),
        }
    }
}
