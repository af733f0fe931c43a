//! The persistent key-value layout (§6.3): one root backend carved into
//! five prefix-isolated sub-stores, the way the teacher's
//! `durability::database::paths` module carves one data directory into
//! named files.

use std::sync::Arc;

use willow_core::KeyPart;
use willow_kv::{KvBackend, PrefixedBackend};

/// The five prefix-isolated regions a store is built from.
pub struct StoreLayout {
    /// `["entries", "spt"]`.
    pub entries_spt: Arc<dyn KvBackend>,
    /// `["entries", "pts"]`.
    pub entries_pts: Arc<dyn KvBackend>,
    /// `["entries", "tsp"]`.
    pub entries_tsp: Arc<dyn KvBackend>,
    /// `["prefix"]`.
    pub prefix: Arc<dyn KvBackend>,
    /// `["waf"]`.
    pub waf: Arc<dyn KvBackend>,
    /// `["payloadRefCount"]`.
    pub payload_ref_count: Arc<dyn KvBackend>,
    root: Arc<dyn KvBackend>,
}

impl StoreLayout {
    /// Carve `root` into the five sub-stores §6.3 names.
    pub fn new(root: Arc<dyn KvBackend>) -> Self {
        StoreLayout {
            entries_spt: Arc::new(PrefixedBackend::new(
                root.clone(),
                vec![KeyPart::text("entries"), KeyPart::text("spt")],
            )),
            entries_pts: Arc::new(PrefixedBackend::new(
                root.clone(),
                vec![KeyPart::text("entries"), KeyPart::text("pts")],
            )),
            entries_tsp: Arc::new(PrefixedBackend::new(
                root.clone(),
                vec![KeyPart::text("entries"), KeyPart::text("tsp")],
            )),
            prefix: Arc::new(PrefixedBackend::new(root.clone(), vec![KeyPart::text("prefix")])),
            waf: Arc::new(PrefixedBackend::new(root.clone(), vec![KeyPart::text("waf")])),
            payload_ref_count: Arc::new(PrefixedBackend::new(root.clone(), vec![KeyPart::text("payloadRefCount")])),
            root,
        }
    }

    /// The prefix-iterator region scoped to a single subspace: the prefix
    /// iterator of §4.6 is per-subspace in use (admission only ever
    /// queries prefixes/extensions within `e.subspace`), but one root
    /// `["prefix"]` store backs every subspace, sharded by an extra
    /// subspace-bytes segment of the key.
    pub fn prefix_region_for_subspace(&self, subspace_bytes: Vec<u8>) -> Arc<dyn KvBackend> {
        Arc::new(PrefixedBackend::new(
            self.root.clone(),
            vec![KeyPart::text("prefix"), KeyPart::bytes(subspace_bytes)],
        ))
    }
}
