//! The ingestion / write-ahead-flag engine (§4.8): the top-level
//! orchestrator wiring the three-dimensional index, the prefix iterator,
//! the write-ahead flag, and the payload reference counter into the
//! `ingest_entry`/`ingest_payload`/`set`/`query` surface.

#![warn(missing_docs)]

pub mod engine;
pub mod events;
pub mod outcome;
pub mod payload_driver;
pub mod recovery;

pub use engine::{EntryAttrs, StoreEngine};
pub use events::{Event, EventSink, TracingEventSink};
pub use outcome::{IngestOutcome, PayloadOutcome, RemoveOutcome};
pub use payload_driver::{MemoryPayloadDriver, PayloadDriver, Received};
pub use recovery::Recovery;
