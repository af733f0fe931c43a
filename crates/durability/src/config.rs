//! Ambient durability configuration. Not named by the ingestion algorithm
//! itself, but the same kind of knob every production kv-backed store
//! exposes: how aggressively to ask the backend to make a commit durable
//! before considering an ingestion step complete.

/// How eagerly a store instance asks its backend to persist writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// No extra durability beyond whatever the backend does on its own
    /// (e.g. an in-memory backend, or a persistent one relying on its own
    /// default fsync policy). Fastest, least durable.
    Cache,
    /// The backend is asked to make every batch commit durable before the
    /// ingestion step that issued it is considered complete.
    Always,
    /// The backend is asked to make a batch commit durable at least every
    /// `batch_size` commits.
    Batched {
        /// Commits between durability checkpoints.
        batch_size: usize,
    },
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Always
    }
}

/// Recovery-time configuration for a store's durability layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryConfig {
    /// How eagerly the store's backend is asked to persist writes.
    pub durability_mode: DurabilityMode,
}
