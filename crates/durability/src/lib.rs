//! The write-ahead flag and persistent key-value layout (§6.3/§6.4):
//! carves one root backend into the five sub-stores an ingestion engine
//! needs, encodes entries for on-disk/write-ahead-flag storage, and
//! counts payload references.

#![warn(missing_docs)]

pub mod config;
pub mod entry_codec;
pub mod layout;
pub mod ref_count;
pub mod waf;

pub use config::{DurabilityMode, RecoveryConfig};
pub use entry_codec::{decode_entry, decode_partial_entry, encode_entry, encode_partial_entry, PartialEntry};
pub use layout::StoreLayout;
pub use ref_count::PayloadRefCounter;
pub use waf::{WafState, WriteAheadFlag};
