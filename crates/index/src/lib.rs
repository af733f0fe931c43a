//! The three-dimensional entry index (§4.7): subspace, path, and timestamp
//! addressed entries, queryable and summarisable along any one of the three
//! orderings.

#![warn(missing_docs)]

pub mod encoding;
pub mod index;
pub mod row;

pub use encoding::Order;
pub use index::{EntryIndex, IndexedEntry, QueryOrder};
pub use row::RowValue;
