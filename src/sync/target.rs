//! Sync Target
//!
//! Runs a sync from the primary to every replica: authenticate all nodes,
//! run the selected sync, and always close the sessions afterwards.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::request::{create_patch_config_request, create_post_teleporter_request, Diagnostic};
use crate::client::{ConfigNode, HttpNode};
use crate::config::{ConfigSettings, GravitySettings, SyncConfig, SyncMode, WolfSyncConfig};
use crate::error::{Phase, Result};
use crate::retry::{self, RetryPolicy};

/// Primary plus the replicas it is synced to
pub struct SyncTarget {
    /// Authoritative node
    primary: Arc<dyn ConfigNode>,
    /// Replicas, synced one after another in this order
    replicas: Vec<Arc<dyn ConfigNode>>,
    /// Attempt budgets and retry pause
    retry: RetryPolicy,
}

impl SyncTarget {
    /// Create a new sync target
    pub fn new(
        primary: Arc<dyn ConfigNode>,
        replicas: Vec<Arc<dyn ConfigNode>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            primary,
            replicas,
            retry,
        }
    }

    /// Create a sync target talking HTTP to the configured nodes
    pub fn from_config(config: &WolfSyncConfig) -> Result<Self> {
        let primary: Arc<dyn ConfigNode> = Arc::new(HttpNode::new(&config.primary, &config.client)?);
        let replicas = config
            .replicas
            .iter()
            .map(|node| {
                HttpNode::new(node, &config.client).map(|n| Arc::new(n) as Arc<dyn ConfigNode>)
            })
            .collect::<Result<Vec<_>>>()?;
        let retry = RetryPolicy::from_config(&config.retry, config.retry_delay());

        Ok(Self::new(primary, replicas, retry))
    }

    /// Number of replicas
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Run the sync mode selected in `settings`
    pub async fn run(&self, settings: &SyncConfig) -> Result<()> {
        match settings.mode {
            SyncMode::Full => self.full_sync(settings).await,
            SyncMode::Selective => {
                self.selective_sync(settings, &settings.exclude_dns_records)
                    .await
            }
        }
    }

    /// Run every `interval` until `shutdown` resolves.
    ///
    /// `shutdown` is polled across runs, so a request arriving while a run
    /// is in flight stops the loop once that run returns. A failed run is
    /// logged and retried at the next tick.
    pub async fn run_every<F>(&self, settings: &SyncConfig, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run(settings).await {
                        tracing::error!(error = %e, "Sync run failed, retrying at next interval");
                    }
                }
            }
        }
    }

    /// Push the primary's teleporter snapshot to every replica
    pub async fn full_sync(&self, settings: &SyncConfig) -> Result<()> {
        self.sync(SyncMode::Full, || async {
            self.sync_teleporters(settings.gravity.as_ref())
                .await
                .map_err(|e| e.in_phase(Phase::Teleporter))?;
            self.maybe_run_gravity(settings).await
        })
        .await
    }

    /// Patch the enabled config sections of every replica, keeping DNS
    /// records that match `exclude_dns_records` on the replica
    pub async fn selective_sync(
        &self,
        settings: &SyncConfig,
        exclude_dns_records: &[String],
    ) -> Result<()> {
        self.sync(SyncMode::Selective, || async {
            if let Some(gravity) = &settings.gravity {
                self.sync_teleporters(Some(gravity))
                    .await
                    .map_err(|e| e.in_phase(Phase::Teleporter))?;
            }
            self.sync_configs(&settings.config, exclude_dns_records)
                .await
                .map_err(|e| e.in_phase(Phase::Config))?;
            self.maybe_run_gravity(settings).await
        })
        .await
    }

    /// Authenticate, run `sync_fn`, and close all sessions whatever happened
    async fn sync<F, Fut>(&self, mode: SyncMode, sync_fn: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        tracing::info!(mode = %mode, replicas = self.replicas.len(), "Running sync");

        let outcome = AssertUnwindSafe(async {
            self.authenticate()
                .await
                .map_err(|e| e.in_phase(Phase::Authenticate))?;
            sync_fn().await
        })
        .catch_unwind()
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                tracing::error!("Sync panicked");
                self.delete_sessions().await;
                std::panic::resume_unwind(panic);
            }
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "Error during sync");
        }
        self.delete_sessions().await;

        if result.is_ok() {
            tracing::info!(mode = %mode, "Sync completed");
        }
        result
    }

    /// Open sessions on the primary (single attempt) and every replica
    async fn authenticate(&self) -> Result<()> {
        tracing::info!("Authenticating clients...");
        self.primary.authenticate().await?;

        for replica in &self.replicas {
            retry::fixed(self.retry.authenticate, self.retry.delay, || {
                replica.authenticate()
            })
            .await?;
        }

        Ok(())
    }

    /// Close every session; failures only leak a session and are logged
    async fn delete_sessions(&self) {
        tracing::info!("Invalidating sessions...");
        if let Err(e) = self.primary.delete_session().await {
            tracing::warn!(node = self.primary.name(), error = %e, "Failed to invalidate session");
        }

        for replica in &self.replicas {
            if let Err(e) = retry::fixed(self.retry.delete_session, self.retry.delay, || {
                replica.delete_session()
            })
            .await
            {
                tracing::warn!(node = replica.name(), error = %e, "Failed to invalidate session");
            }
        }
    }

    async fn sync_teleporters(&self, gravity: Option<&GravitySettings>) -> Result<()> {
        tracing::info!("Syncing teleporters...");
        let snapshot = self.primary.get_teleporter().await?;
        let request = gravity.map(create_post_teleporter_request);

        for replica in &self.replicas {
            retry::fixed(self.retry.teleporter_push, self.retry.delay, || {
                replica.post_teleporter(&snapshot, request.as_ref())
            })
            .await?;
            tracing::debug!(node = replica.name(), "Teleporter imported");
        }

        Ok(())
    }

    async fn sync_configs(
        &self,
        settings: &ConfigSettings,
        exclude_dns_records: &[String],
    ) -> Result<()> {
        tracing::info!("Syncing configs...");
        let primary_config = self.primary.get_config().await?;

        for replica in &self.replicas {
            let replica_config = if exclude_dns_records.is_empty() {
                None
            } else {
                match replica.get_config().await {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(
                            node = replica.name(),
                            error = %e,
                            "Failed to get config from replica, excluded records might be deleted"
                        );
                        None
                    }
                }
            };

            let (request, diagnostics) = create_patch_config_request(
                settings,
                &primary_config,
                replica_config.as_ref(),
                exclude_dns_records,
            )?;
            for diagnostic in &diagnostics {
                log_diagnostic(replica.name(), diagnostic);
            }

            retry::fixed(self.retry.config_patch, self.retry.delay, || {
                replica.patch_config(&request)
            })
            .await?;
            tracing::debug!(node = replica.name(), "Config patched");
        }

        Ok(())
    }

    async fn maybe_run_gravity(&self, settings: &SyncConfig) -> Result<()> {
        if !settings.run_gravity {
            return Ok(());
        }
        self.run_gravity()
            .await
            .map_err(|e| e.in_phase(Phase::Gravity))
    }

    /// Rebuild gravity on the primary (single attempt) and every replica
    async fn run_gravity(&self) -> Result<()> {
        tracing::info!("Running gravity...");
        self.primary.run_gravity().await?;

        for replica in &self.replicas {
            retry::fixed(self.retry.maintenance_job, self.retry.delay, || {
                replica.run_gravity()
            })
            .await?;
        }

        Ok(())
    }
}

fn log_diagnostic(node: &str, diagnostic: &Diagnostic) {
    match diagnostic {
        Diagnostic::FilterFailed { section, error } => {
            tracing::warn!(node, section = %section, error = %error, "Unable to filter json object");
        }
        Diagnostic::FilteredEmpty { section } => {
            tracing::warn!(node, section = %section, "Filter left nothing to sync");
        }
        Diagnostic::ReplicaDnsUnusable { reason } => {
            tracing::warn!(node, reason = %reason, "Ignoring replica DNS, excluded records might be deleted");
        }
    }
}
