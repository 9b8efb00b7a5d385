//! WolfSync - Configuration Replication for DNS-Filtering Nodes
//!
//! Keeps a set of replica nodes in line with one primary node through their
//! HTTP configuration API.
//!
//! # Sync Modes
//!
//! - **Full sync** exports a teleporter snapshot from the primary and
//!   imports it on every replica.
//! - **Selective sync** patches individual configuration sections, each
//!   with an enable flag and an optional key filter. Local DNS records
//!   matching an exclude list are treated as owned by the replica and kept.
//!
//! Every run authenticates against all nodes first and closes all sessions
//! afterwards, whether the run succeeded or not. Replicas are synced one at
//! a time; the first replica that cannot be written after its retries ends
//! the run.

pub mod config;
pub mod error;
pub mod model;
pub mod filter;
pub mod retry;
pub mod client;
pub mod sync;

pub use config::WolfSyncConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{ConfigNode, HttpNode};
    pub use crate::config::{SyncConfig, SyncMode, WolfSyncConfig};
    pub use crate::error::{Error, Phase, Result};
    pub use crate::model::{ConfigDocument, PatchConfigRequest, PostTeleporterRequest, Section};
    pub use crate::retry::RetryPolicy;
    pub use crate::sync::SyncTarget;
}
