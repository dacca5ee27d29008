//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use wirecall_core::error::{Result, WireCallError};

pub use schema::{RoutesSection, RpcConfig, ServerSection};

/// Environment variable overriding the config path.
pub const CONFIG_PATH_ENV: &str = "WIRECALL_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "wirecall.yaml";

pub fn load_from_file(path: &str) -> Result<RpcConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WireCallError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RpcConfig> {
    let cfg: RpcConfig = serde_yaml::from_str(s)
        .map_err(|e| WireCallError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Path from `WIRECALL_CONFIG`, falling back to `wirecall.yaml`.
pub fn default_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
