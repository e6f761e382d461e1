use std::hash::BuildHasher;

use hashbrown::HashMap;

use crate::{DeterministicHashBuilder, InternString};

/// A multimap from content hash to string references.
///
/// Several entries may share a bucket. Lookups scan the bucket for content
/// equality, never identity alone, since equal content may live in distinct
/// objects until it has been deduplicated.
pub(crate) struct Table<S, H = DeterministicHashBuilder> {
    buckets: HashMap<i32, Vec<S>, H>,
    len: usize,
}

impl<S: InternString, H: BuildHasher> Table<S, H> {
    pub fn with_capacity_and_hasher(capacity: usize, build_hasher: H) -> Self {
        Self {
            buckets: HashMap::with_capacity_and_hasher(capacity, build_hasher),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// The first entry in the `hash` bucket whose content equals `s`.
    pub fn lookup(&self, s: &S, hash: i32) -> Option<&S> {
        self.buckets
            .get(&hash)?
            .iter()
            .find(|entry| entry.content_eq(s))
    }

    /// Unconditionally add `s` to the `hash` bucket.
    pub fn insert(&mut self, s: S, hash: i32) -> S {
        self.buckets.entry(hash).or_default().push(s.clone());
        self.len += 1;
        s
    }

    /// Remove the entry that is the same object as `s`, if any.
    pub fn remove(&mut self, s: &S, hash: i32) -> bool {
        let Some(bucket) = self.buckets.get_mut(&hash) else {
            return false;
        };
        let Some(i) = bucket.iter().position(|entry| entry.same_object(s)) else {
            return false;
        };
        // bucket order carries no meaning
        bucket.swap_remove(i);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }
        self.len -= 1;
        true
    }

    /// Overwrite every entry with `f(entry)`, leaving it in its bucket.
    pub fn update_in_place(&mut self, mut f: impl FnMut(&S) -> S) {
        for entry in self.buckets.values_mut().flatten() {
            *entry = f(entry);
        }
    }

    /// Keep the entries for which `f` returns a replacement, drop the rest.
    /// Replacements stay in the bucket of the entry they replace.
    pub fn retain_map(&mut self, mut f: impl FnMut(&S) -> Option<S>) -> usize {
        let mut dropped = 0;
        self.buckets.retain(|_, bucket| {
            bucket.retain_mut(|entry| match f(entry) {
                Some(new) => {
                    *entry = new;
                    true
                }
                None => {
                    dropped += 1;
                    false
                }
            });
            !bucket.is_empty()
        });
        self.len -= dropped;
        dropped
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.buckets.values().flatten()
    }
}
