//! Linear reference summarisable store (§4.5): same contract as
//! [`crate::list::SkipList`], implemented by a single full scan per
//! `summarise` call. Used only as a correctness oracle in property tests —
//! gated behind the `testing` feature (or plain `#[cfg(test)]`) the way the
//! teacher gates its reference-model helpers, never linked into a release
//! build.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use willow_core::{LiftingMonoid, Monoid, Summary};
use willow_kv::ListOpts;

/// A full-scan summarisable store, used only to check the skip list's
/// output against an obviously-correct (if slow) implementation.
pub struct LinearStore<M: LiftingMonoid<[u8], [u8]>> {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    monoid: M,
}

impl<M: LiftingMonoid<[u8], [u8]>> LinearStore<M> {
    /// An empty store.
    pub fn new(monoid: M) -> Self {
        LinearStore {
            map: Mutex::new(BTreeMap::new()),
            monoid,
        }
    }

    /// Read the current value for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.lock().get(key).cloned()
    }

    /// Insert or update `key`.
    pub fn insert(&self, key: Vec<u8>, value: Vec<u8>) {
        self.map.lock().insert(key, value);
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&self, key: &[u8]) -> bool {
        self.map.lock().remove(key).is_some()
    }

    /// Sum the monoid over `[start, end)`, with the same `start == end`
    /// (full range) and `start > end` (wrap-around) semantics as the skip
    /// list.
    pub fn summarise(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Summary<M::Output> {
        match (start, end) {
            (Some(s), Some(e)) if s > e => {
                let left = self.summarise_straight(None, Some(e));
                let right = self.summarise_straight(Some(s), None);
                left.combine(&right)
            }
            (Some(s), Some(e)) if s == e => self.summarise_straight(None, None),
            _ => self.summarise_straight(start, end),
        }
    }

    fn summarise_straight(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Summary<M::Output> {
        let guard = self.map.lock();
        let mut acc = Summary::<M::Output>::neutral();
        for (key, value) in guard.iter() {
            if let Some(s) = start {
                if key.as_slice() < s {
                    continue;
                }
            }
            if let Some(e) = end {
                if key.as_slice() >= e {
                    continue;
                }
            }
            acc = acc.combine(&Summary::singleton(self.monoid.lift(key, value)));
        }
        acc
    }

    /// All `(key, value)` pairs in `[start, end)`, honoring `opts`.
    pub fn entries(&self, start: Option<&[u8]>, end: Option<&[u8]>, opts: ListOpts) -> Vec<(Vec<u8>, Vec<u8>)> {
        let guard = self.map.lock();
        let mut rows: Vec<(Vec<u8>, Vec<u8>)> = guard
            .iter()
            .filter(|(key, _)| {
                if let Some(s) = start {
                    if key.as_slice() < s {
                        return false;
                    }
                }
                if let Some(e) = end {
                    if key.as_slice() >= e {
                        return false;
                    }
                }
                true
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if opts.reverse {
            rows.reverse();
        }
        if let Some(limit) = opts.limit {
            rows.truncate(limit);
        }
        rows
    }
}
