//! Sync Module
//!
//! Replicates the primary's configuration to its replicas, either as a
//! whole teleporter snapshot or as per-section config patches.

pub mod merge;
pub mod request;
mod target;

pub use merge::merge_dns_records;
pub use request::{
    create_patch_config_request, create_post_teleporter_request, filter_patch_config_request,
    Diagnostic,
};
pub use target::SyncTarget;
