//! Node Client Module
//!
//! The operations a sync run needs from a node, and the HTTP client that
//! provides them.

mod http;

pub use http::HttpNode;

use bytes::Bytes;

use crate::error::Result;
use crate::model::{ConfigDocument, PatchConfigRequest, PostTeleporterRequest};

/// One configuration endpoint, primary or replica.
///
/// Implementations keep their own session state: [`authenticate`] opens a
/// session that the other calls use, [`delete_session`] closes it.
///
/// [`authenticate`]: ConfigNode::authenticate
/// [`delete_session`]: ConfigNode::delete_session
#[async_trait::async_trait]
pub trait ConfigNode: Send + Sync {
    /// Human readable node name, used in logs and errors
    fn name(&self) -> &str;

    /// Open a session
    async fn authenticate(&self) -> Result<()>;

    /// Close the current session
    async fn delete_session(&self) -> Result<()>;

    /// Fetch the full configuration document
    async fn get_config(&self) -> Result<ConfigDocument>;

    /// Write the sections present in `request`
    async fn patch_config(&self, request: &PatchConfigRequest) -> Result<()>;

    /// Export a teleporter snapshot
    async fn get_teleporter(&self) -> Result<Bytes>;

    /// Import a teleporter snapshot, restricted to `request` when given
    async fn post_teleporter(
        &self,
        snapshot: &Bytes,
        request: Option<&PostTeleporterRequest>,
    ) -> Result<()>;

    /// Rebuild the gravity database
    async fn run_gravity(&self) -> Result<()>;
}
