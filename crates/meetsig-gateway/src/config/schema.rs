use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use meetsig_core::error::{Result, SignalError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub admission: AdmissionSection,

    #[serde(default)]
    pub directory: DirectorySection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SignalError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.admission.validate()?;
        self.directory.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: u64,

    /// Frames above this are dropped, the connection survives.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Hard transport limit; frames above this fail the socket.
    #[serde(default = "default_transport_limit_bytes")]
    pub transport_limit_bytes: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            max_payload_bytes: default_max_payload_bytes(),
            transport_limit_bytes: default_transport_limit_bytes(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(SignalError::BadRequest(
                "gateway.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if !(2000..=600000).contains(&self.liveness_timeout_ms) {
            return Err(SignalError::BadRequest(
                "gateway.liveness_timeout_ms must be between 2000 and 600000".into(),
            ));
        }
        if self.liveness_timeout_ms <= self.ping_interval_ms {
            return Err(SignalError::BadRequest(
                "gateway.liveness_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if self.max_payload_bytes == 0 {
            return Err(SignalError::BadRequest(
                "gateway.max_payload_bytes must be positive".into(),
            ));
        }
        if self.transport_limit_bytes < self.max_payload_bytes {
            return Err(SignalError::BadRequest(
                "gateway.transport_limit_bytes must be >= max_payload_bytes".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    25000
}
fn default_liveness_timeout_ms() -> u64 {
    70000
}
fn default_max_payload_bytes() -> usize {
    64 * 1024
}
fn default_transport_limit_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdmissionSection {
    /// How long before `begin_at` a room starts accepting peers.
    #[serde(default = "default_early_join_secs")]
    pub early_join_secs: u64,
}

impl Default for AdmissionSection {
    fn default() -> Self {
        Self { early_join_secs: default_early_join_secs() }
    }
}

impl AdmissionSection {
    pub fn validate(&self) -> Result<()> {
        if self.early_join_secs > 24 * 3600 {
            return Err(SignalError::BadRequest(
                "admission.early_join_secs must be at most one day".into(),
            ));
        }
        Ok(())
    }
}

fn default_early_join_secs() -> u64 {
    15 * 60
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectorySection {
    #[serde(default)]
    pub users: Vec<UserConfig>,
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
}

impl DirectorySection {
    pub fn validate(&self) -> Result<()> {
        let mut tokens = HashSet::new();
        let mut ids = HashSet::new();
        for u in &self.users {
            if u.token.trim().is_empty() {
                return Err(SignalError::BadRequest(format!(
                    "directory user {} has an empty token",
                    u.id
                )));
            }
            if !tokens.insert(u.token.as_str()) {
                return Err(SignalError::BadRequest(format!(
                    "directory user {} reuses another user's token",
                    u.id
                )));
            }
            if !ids.insert(u.id) {
                return Err(SignalError::BadRequest(format!("duplicate directory user id: {}", u.id)));
            }
        }

        let mut identities = HashSet::new();
        for r in &self.rooms {
            if r.identity.trim().is_empty() {
                return Err(SignalError::BadRequest("directory room identity must not be empty".into()));
            }
            if !identities.insert(r.identity.as_str()) {
                return Err(SignalError::BadRequest(format!(
                    "duplicate directory room identity: {}",
                    r.identity
                )));
            }
            if r.end_at < r.begin_at {
                return Err(SignalError::BadRequest(format!(
                    "room {} ends before it begins",
                    r.identity
                )));
            }
            for m in &r.members {
                if !ids.contains(&m.user_id) {
                    return Err(SignalError::BadRequest(format!(
                        "room {} member references unknown user {}",
                        r.identity, m.user_id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub id: u64,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomConfig {
    pub identity: String,
    pub id: u64,
    pub begin_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub owner_id: u64,
    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberConfig {
    pub user_id: u64,
    pub display_name: String,
}
