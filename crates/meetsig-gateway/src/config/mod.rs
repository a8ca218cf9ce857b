//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use meetsig_core::error::{Result, SignalError};

pub use schema::{
    AdmissionSection, DirectorySection, GatewayConfig, GatewaySection, MemberConfig, RoomConfig,
    UserConfig,
};

/// Env var consulted when no path is given on the command line.
pub const CONFIG_ENV: &str = "MEETSIG_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "meetsig.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SignalError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| SignalError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// First CLI argument, then `MEETSIG_CONFIG`, then `meetsig.yaml`.
pub fn resolve_path(arg: Option<String>) -> String {
    arg.or_else(|| std::env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}
