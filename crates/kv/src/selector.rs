//! `Selector`/`ListOpts`: the `list`/`clear` query shape (§4.1), plus the
//! combined-selector short-circuit rules shared by every `KvBackend` impl.

use willow_core::TupleKey;

/// Restricts a `list`/`clear` call to a sub-range of the key space.
///
/// `start`/`end` describe a half-open `[start, end)` range; `prefix`
/// additionally restricts to keys of which `prefix` is itself a prefix.
/// All three may be combined; see [`effective_bounds`] for the combination
/// semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    /// Inclusive lower bound.
    pub start: Option<TupleKey>,
    /// Exclusive upper bound.
    pub end: Option<TupleKey>,
    /// Required key prefix.
    pub prefix: Option<TupleKey>,
}

impl Selector {
    /// A selector matching every key.
    pub fn all() -> Self {
        Selector::default()
    }

    /// A selector matching only keys prefixed by `prefix`.
    pub fn with_prefix(prefix: TupleKey) -> Self {
        Selector {
            prefix: Some(prefix),
            ..Default::default()
        }
    }

    /// A selector matching `[start, end)`.
    pub fn range(start: Option<TupleKey>, end: Option<TupleKey>) -> Self {
        Selector {
            start,
            end,
            prefix: None,
        }
    }
}

/// Options controlling how a `list` call is iterated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOpts {
    /// Iterate from `end` towards `start` when true.
    pub reverse: bool,
    /// Stop after this many entries; `None` means unbounded.
    pub limit: Option<usize>,
    /// Advisory page size a backend may use internally; implementations
    /// are free to ignore it.
    pub batch_size: usize,
}

impl Default for ListOpts {
    fn default() -> Self {
        ListOpts {
            reverse: false,
            limit: None,
            batch_size: 256,
        }
    }
}

fn is_prefixed_by(key: &TupleKey, prefix: &TupleKey) -> bool {
    key.len() >= prefix.len() && key[..prefix.len()] == prefix[..]
}

/// Folds `prefix` together with `start`/`end` into the pair of bounds a
/// backend should scan, per the §4.1 combination rules:
///
/// - if `start` is strictly less than `prefix`, it is ignored (unbounded
///   below, i.e. effectively `prefix` itself);
/// - if `start` is not prefixed by `prefix` and sorts after it, no key can
///   satisfy the selector and the whole selector is empty;
/// - `end` is treated symmetrically.
///
/// Returns `None` when the selector can statically be proven empty. A
/// `Some` result gives a coarse scan range; callers MUST still filter each
/// candidate key against [`matches`] before yielding it, since a coarse
/// bound alone does not exclude every non-prefixed key above `prefix`.
pub fn effective_bounds(selector: &Selector) -> Option<(Option<TupleKey>, Option<TupleKey>)> {
    let mut lower = selector.start.clone();
    let mut upper = selector.end.clone();

    if let Some(prefix) = &selector.prefix {
        lower = match lower {
            Some(start) if &start < prefix => Some(prefix.clone()),
            Some(start) if !is_prefixed_by(&start, prefix) && &start > prefix => {
                return None;
            }
            Some(start) => Some(start),
            None => Some(prefix.clone()),
        };

        if let Some(end) = &upper {
            if !is_prefixed_by(end, prefix) && end < prefix {
                return None;
            }
        }
    }

    if let (Some(l), Some(u)) = (&lower, &upper) {
        if l >= u {
            return None;
        }
    }

    Some((lower, upper))
}

/// True iff `key` satisfies every clause of `selector`. Used to filter a
/// coarse backend scan down to the selector's exact semantics.
pub fn matches(key: &TupleKey, selector: &Selector) -> bool {
    if let Some(prefix) = &selector.prefix {
        if !is_prefixed_by(key, prefix) {
            return false;
        }
    }
    if let Some(start) = &selector.start {
        if key < start {
            return false;
        }
    }
    if let Some(end) = &selector.end {
        if key >= end {
            return false;
        }
    }
    true
}
