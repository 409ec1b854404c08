//! Durable interpretation storage seam.
//!
//! The relational store for saved interpretations lives outside this
//! crate; the gateway only needs save/delete/load keyed by fingerprint.
//! Both mutating operations trigger ephemeral-cache invalidation in the
//! gateway, so a stale ephemeral copy can never shadow the durable one.

use async_trait::async_trait;

use crate::Result;
use crate::fingerprint::Fingerprint;

/// Where saved interpretations live.
///
/// Implemented by the application's database layer; test fakes live with
/// the gateway tests. Durable copies always win over ephemeral ones on
/// read paths.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist interpretation text for a chart.
    async fn save(&self, fingerprint: &Fingerprint, text: &str) -> Result<()>;

    /// Remove a persisted interpretation.
    async fn delete(&self, fingerprint: &Fingerprint) -> Result<()>;

    /// Fetch a persisted interpretation, if one exists.
    async fn load(&self, fingerprint: &Fingerprint) -> Result<Option<String>>;
}
