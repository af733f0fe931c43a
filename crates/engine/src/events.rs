//! The four ingestion events of §4.8: `entryingest`, `entrypayloadset`,
//! `entryremove`, `payloadingest`.
//!
//! The teacher reports commit outcomes as `tracing` spans/fields rather
//! than a typed event bus (`concurrency::manager::TransactionManager::commit`
//! logs `tracing::error!` on abort, `tracing::debug!`/`info!` on durability
//! writes elsewhere in `durability::wal_manager`). This crate generalises
//! that into a typed `EventSink` trait so a caller can subscribe to
//! ingestion outcomes programmatically, but keeps a `tracing`-backed
//! default so nothing needs a sink to get useful logs.

use willow_core::{Digest, Entry, NamespaceId, SubspaceId};

/// An ingestion-time event (§4.8 "Events").
#[derive(Debug, Clone)]
pub enum Event<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> {
    /// `entryingest(entry, removed[])`: `entry` was admitted, pruning
    /// `removed` (entries at paths of which `entry.path` is a prefix).
    EntryIngest {
        /// The newly admitted entry.
        entry: Entry<N, S, PD, AD>,
        /// Entries pruned as a consequence of admitting `entry`.
        removed: Vec<Entry<N, S, PD, AD>>,
    },
    /// `entrypayloadset(entry)`: a payload was ingested and matched an
    /// existing entry's recorded digest.
    EntryPayloadSet {
        /// The entry whose payload was confirmed present.
        entry: Entry<N, S, PD, AD>,
    },
    /// `entryremove(entry)`: `entry` was removed other than by prefix
    /// pruning (e.g. an explicit removal batch).
    EntryRemove {
        /// The removed entry.
        entry: Entry<N, S, PD, AD>,
    },
    /// `payloadingest(digest)`: a payload was received and stored,
    /// independent of whether any entry referenced it yet.
    PayloadIngest {
        /// Digest of the newly stored payload.
        digest: PD,
    },
}

/// A sink for ingestion events. Implementations must not block the
/// ingestion lock for long; the engine calls `publish` while holding it.
pub trait EventSink<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest>: Send + Sync {
    /// Handle one event, emitted synchronously as part of the ingestion
    /// step that produced it.
    fn publish(&self, event: Event<N, S, PD, AD>);
}

/// An `EventSink` that reports every event as a `tracing` event. Used as
/// the default sink when a caller doesn't need programmatic subscription.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl<N: NamespaceId, S: SubspaceId, PD: Digest, AD: Digest> EventSink<N, S, PD, AD> for TracingEventSink {
    fn publish(&self, event: Event<N, S, PD, AD>) {
        match event {
            Event::EntryIngest { entry, removed } => {
                tracing::debug!(
                    timestamp = entry.timestamp,
                    pruned = removed.len(),
                    "entryingest"
                );
            }
            Event::EntryPayloadSet { entry } => {
                tracing::debug!(timestamp = entry.timestamp, "entrypayloadset");
            }
            Event::EntryRemove { entry } => {
                tracing::debug!(timestamp = entry.timestamp, "entryremove");
            }
            Event::PayloadIngest { digest } => {
                let _ = digest;
                tracing::debug!("payloadingest");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use willow_core::testing::{TestAuthDigest, TestNamespace, TestPayloadDigest, TestSubspace};
    use willow_core::Path;

    type TestEvent = Event<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest>;

    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<&'static str>>,
    }

    impl EventSink<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest> for RecordingSink {
        fn publish(&self, event: TestEvent) {
            let label = match event {
                Event::EntryIngest { .. } => "entryingest",
                Event::EntryPayloadSet { .. } => "entrypayloadset",
                Event::EntryRemove { .. } => "entryremove",
                Event::PayloadIngest { .. } => "payloadingest",
            };
            self.received.lock().push(label);
        }
    }

    fn entry() -> Entry<TestNamespace, TestSubspace, TestPayloadDigest, TestAuthDigest> {
        Entry {
            namespace_id: TestNamespace(0),
            subspace_id: TestSubspace(0),
            path: Path::empty(),
            timestamp: 0,
            payload_digest: TestPayloadDigest(vec![]),
            payload_length: 0,
            authorisation_token_digest: TestAuthDigest(vec![]),
        }
    }

    #[test]
    fn sink_receives_published_events_in_order() {
        let sink = RecordingSink::default();
        sink.publish(Event::EntryIngest { entry: entry(), removed: vec![] });
        sink.publish(Event::PayloadIngest { digest: TestPayloadDigest(vec![1]) });
        assert_eq!(*sink.received.lock(), vec!["entryingest", "payloadingest"]);
    }

    #[test]
    fn tracing_sink_does_not_panic_on_any_event() {
        let sink = TracingEventSink;
        sink.publish(Event::EntryIngest { entry: entry(), removed: vec![entry()] });
        sink.publish(Event::EntryPayloadSet { entry: entry() });
        sink.publish(Event::EntryRemove { entry: entry() });
        sink.publish(TestEvent::PayloadIngest { digest: TestPayloadDigest(vec![]) });
    }
}
