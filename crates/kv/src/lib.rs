//! The ordered key-value backend contract (§4.1) plus its two conforming
//! implementations, the order-preserving key codec, and the prefix-isolated
//! backend wrapper used to carve one physical backend into named regions.

#![warn(missing_docs)]

pub mod backend;
pub mod codec;
pub mod memory;
pub mod prefixed;
pub mod redb_backend;
pub mod selector;

pub use backend::{Batch, BatchOp, KvBackend, ListIter};
pub use memory::MemoryBackend;
pub use prefixed::PrefixedBackend;
pub use redb_backend::RedbBackend;
pub use selector::{effective_bounds, matches, ListOpts, Selector};
