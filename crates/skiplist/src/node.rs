//! The physical node record stored at `(layer, logical_key)` (§4.4).

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use willow_core::{Error, Result};

/// The value half of a physical `(layer, logical_key) -> PhysicalNode`
/// row. `logical_value` is populated only at layer zero; every layer
/// carries its own `summary` for the span this node covers at that layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalNode<T> {
    /// The stored value, present only on the layer-zero copy of a node.
    pub logical_value: Option<Vec<u8>>,
    /// The highest layer this logical key occupies.
    pub max_layer: u8,
    /// The monoidal fingerprint of this node's span at this layer.
    pub fingerprint: T,
    /// The number of layer-zero entries in this node's span at this layer.
    pub count: u64,
}

impl<T: Serialize> PhysicalNode<T> {
    /// Serialize for storage.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Codec(format!("skip list node: {e}")))
    }
}

impl<T: DeserializeOwned> PhysicalNode<T> {
    /// Deserialize from storage.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Codec(format!("skip list node: {e}")))
    }
}
