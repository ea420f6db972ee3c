//! Configuration defaults and environment helpers.
//!
//! Every fallback value used across the project lives here so the crates
//! never duplicate constants or reach for ambient mutable state. Values are
//! threaded explicitly into the functions that need them.

use std::path::PathBuf;

/// Default values shared across the workspace.
pub mod defaults {
    /// Directory holding the provisioned client identity artifacts.
    pub const DATA_DIR: &str = "./data";
    /// Client certificate file name (binary DER).
    pub const CERT_FILE: &str = "client_cert.der";
    /// Client private key file name (unencrypted PEM).
    pub const KEY_FILE: &str = "client_key.pem";

    /// Depth bound for a recursive address-space scan.
    pub const SCAN_MAX_DEPTH: u32 = 8;
    /// Session timeout for a single-level browse, in milliseconds.
    pub const BROWSE_TIMEOUT_MS: u32 = 15_000;
    /// Session timeout for a connection test, in milliseconds.
    pub const TEST_TIMEOUT_MS: u32 = 5_000;
    /// Session timeout for a full recursive scan, in milliseconds.
    pub const SCAN_TIMEOUT_MS: u32 = 60_000;

    /// Sampling interval applied to tags without a scan class, in
    /// milliseconds, when no default scan class is configured either.
    pub const FALLBACK_INTERVAL_MS: u32 = 10_000;

    /// Where the collector expects its configuration file.
    pub const TELEGRAF_CONFIG_PATH: &str = "/etc/telegraf/telegraf.conf";
    /// Command the admin layer runs to apply a new configuration. Carried
    /// as data only; this core never invokes it.
    pub const TELEGRAF_RELOAD_COMMAND: &str = "systemctl reload telegraf";
}

/// Environment variable names and typed readers.
pub mod env_vars {
    use super::*;

    /// Overrides the identity artifact directory.
    pub const DATA_DIR: &str = "TAGFORGE_DATA_DIR";

    /// Identity artifact directory from the environment, or the default.
    pub fn data_dir() -> PathBuf {
        std::env::var(DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DATA_DIR))
    }
}
