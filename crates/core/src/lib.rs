//! Shared types, errors, and dependency-injected schemes for willow-store.
//!
//! This crate defines the data model (`Entry`, `Path`, `KeyPart`), the
//! error taxonomy threaded through every other crate, the lifting-monoid
//! abstraction behind summarisation, and the narrow capability traits
//! (`NamespaceId`, `SubspaceId`, `Digest`, `AuthorisationScheme`) that let
//! the rest of the workspace stay generic over a deployment's choice of
//! cryptography.

#![warn(missing_docs)]

pub mod area;
pub mod digest;
pub mod entry;
pub mod error;
pub mod ids;
pub mod key_part;
pub mod limits;
pub mod monoid;
pub mod path;
pub mod schemes;
pub mod testing;

pub use area::{Area, AreaOfInterest, SubspaceSpec, TimeRange, TimeRangeEnd};
pub use digest::Digest;
pub use entry::Entry;
pub use error::{Error, Result};
pub use ids::{NamespaceId, SubspaceId};
pub use key_part::{KeyPart, TupleKey};
pub use limits::Limits;
pub use monoid::{LiftingMonoid, Monoid, Summary};
pub use path::Path;
pub use schemes::{AuthorisationScheme, PayloadScheme};
