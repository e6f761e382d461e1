#![warn(missing_docs)]
/*!

This crate provides the string [`InternTable`] of a garbage-collected
 runtime: content-equal strings are represented by a single canonical
 object wherever possible, while a tracing collector that may move or
 reclaim objects stays in charge of liveness.

The table keeps three hash-bucketed tables behind one lock:
 *image-strong* entries registered in bulk from a trusted snapshot,
 *strong* entries that are GC roots, and *weak* entries that the
 collector may drop at any sweep.
 Strongly interned content always wins over weakly interned content,
 and a later strong intern of weakly interned content promotes the
 weak instance.

```
use intern_table::{InternString, InternTable, JavaString};

let table = InternTable::new();
let weak = table.intern_weak(JavaString::from_str("banana"));
let strong = table.intern_strong(JavaString::from_str("banana"));
assert!(strong.same_object(&weak));
assert_eq!(table.weak_size(), 0);
assert_eq!(table.strong_size(), 1);
```

The collector drives the two GC hooks, [`InternTable::visit_roots`]
 and [`InternTable::sweep_weaks`], while mutators are paused.
*/

mod dump;
mod error;
mod gc;
mod string;
mod table;
use ahash::AHasher;
pub use error::{AllocError, InternError};
pub use gc::{IsMarked, RootVisitor, SweepStats};
use parking_lot::Mutex;
pub use string::{compute_hash_code, InternString, JavaString, StringAllocator, StringHeap};
use table::Table;

use std::hash::BuildHasher;

/// A `BuildHasher` that builds a determinstically seeded AHasher
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicHashBuilder;

impl BuildHasher for DeterministicHashBuilder {
    type Hasher = AHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ahash::RandomState::with_seeds(0, 0, 0, 0).build_hasher()
    }
}

struct Tables<S, H> {
    image_strong: Table<S, H>,
    strong: Table<S, H>,
    weak: Table<S, H>,
}

/// A table in which you can intern strings strongly or weakly.
///
/// Every operation takes the one table-wide lock for its whole duration, so
/// no caller ever sees the three tables half updated. Share one instance per
/// runtime by reference or through an `Arc`.
///
/// `S` is the string reference type; `H` builds the hashers of the bucket
/// maps (default [`DeterministicHashBuilder`]).
pub struct InternTable<S, H = DeterministicHashBuilder> {
    tables: Mutex<Tables<S, H>>,
}

impl<S: InternString> InternTable<S, DeterministicHashBuilder> {
    /// Creates a new, empty [`InternTable`] with the default generic arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table whose strong and weak tables have room for
    /// `capacity` distinct hashes each before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DeterministicHashBuilder)
    }
}

impl<S: InternString, H: BuildHasher + Clone> InternTable<S, H> {
    /// Creates an empty table whose bucket maps hash with `build_hasher`.
    pub fn with_hasher(build_hasher: H) -> Self {
        Self::with_capacity_and_hasher(0, build_hasher)
    }

    /// Creates an empty table with both a capacity and a hasher.
    pub fn with_capacity_and_hasher(capacity: usize, build_hasher: H) -> Self {
        Self {
            tables: Mutex::new(Tables {
                // filled once from the image, sized by its own inserts
                image_strong: Table::with_capacity_and_hasher(0, build_hasher.clone()),
                strong: Table::with_capacity_and_hasher(capacity, build_hasher.clone()),
                weak: Table::with_capacity_and_hasher(capacity, build_hasher),
            }),
        }
    }
}

impl<S: InternString, H: Default + BuildHasher + Clone> Default for InternTable<S, H> {
    fn default() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<S: InternString, H: BuildHasher> InternTable<S, H> {
    /// Intern `s` in the strong table.
    ///
    /// Returns the canonical instance for the content of `s`: an existing
    /// image-strong or strong entry if there is one, otherwise the weak entry
    /// promoted to strong, otherwise `s` itself. Once this returns, the
    /// content is strongly interned and has no weak entry.
    ///
    /// ```
    /// use intern_table::{InternString, InternTable, JavaString};
    /// let table = InternTable::new();
    /// let a = table.intern_strong(JavaString::from_str("foo"));
    /// let b = table.intern_strong(JavaString::from_str("foo"));
    /// assert!(a.same_object(&b));
    /// ```
    pub fn intern_strong(&self, s: S) -> S {
        self.insert(s, true)
    }

    /// Intern the string with content `units` in the strong table.
    ///
    /// The candidate is allocated from `heap` before the table is consulted;
    /// if an equal string is already canonical the candidate is simply not
    /// retained by the table. An allocation failure leaves the table unchanged.
    ///
    /// ```
    /// use intern_table::{InternString, InternTable, StringHeap};
    /// let heap = StringHeap::new();
    /// let table = InternTable::new();
    /// let units: Vec<u16> = "foo".encode_utf16().collect();
    /// let a = table.intern_strong_utf16(&heap, &units).unwrap();
    /// let b = table.intern_strong_str(&heap, "foo").unwrap();
    /// assert!(a.same_object(&b));
    /// ```
    pub fn intern_strong_utf16<A>(&self, heap: &A, units: &[u16]) -> Result<S, InternError>
    where
        A: StringAllocator<S> + ?Sized,
    {
        let candidate = heap.alloc_utf16(units)?;
        Ok(self.intern_strong(candidate))
    }

    /// Like [`intern_strong_utf16`](Self::intern_strong_utf16), encoding `s`
    /// as UTF-16 first.
    pub fn intern_strong_str<A>(&self, heap: &A, s: &str) -> Result<S, InternError>
    where
        A: StringAllocator<S> + ?Sized,
    {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.intern_strong_utf16(heap, &units)
    }

    /// Intern `s` in the weak table.
    ///
    /// A strongly interned equal string is returned in preference to any weak
    /// entry, and no weak entry is created for it. Otherwise an existing weak
    /// entry is returned, or `s` is added to the weak table.
    ///
    /// ```
    /// use intern_table::{InternString, InternTable, JavaString};
    /// let table = InternTable::new();
    /// let strong = table.intern_strong(JavaString::from_str("foo"));
    /// let weak = table.intern_weak(JavaString::from_str("foo"));
    /// assert!(weak.same_object(&strong));
    /// assert_eq!(table.weak_size(), 0);
    /// ```
    pub fn intern_weak(&self, s: S) -> S {
        self.insert(s, false)
    }

    fn insert(&self, s: S, is_strong: bool) -> S {
        let hash = s.hash_code();
        let mut guard = self.tables.lock();
        let tables = &mut *guard;

        if let Some(found) = tables.image_strong.lookup(&s, hash) {
            return found.clone();
        }
        if let Some(found) = tables.strong.lookup(&s, hash) {
            return found.clone();
        }

        let weak = tables.weak.lookup(&s, hash).cloned();
        if !is_strong {
            return match weak {
                Some(found) => found,
                None => tables.weak.insert(s, hash),
            };
        }
        match weak {
            Some(found) => {
                log::trace!("promoting weak intern with hash {hash:#x} to strong");
                tables.weak.remove(&found, hash);
                tables.strong.insert(found, hash)
            }
            None => tables.strong.insert(s, hash),
        }
    }

    /// Add `s` to the image-strong table without looking for duplicates.
    ///
    /// Only for filling the table from a trusted image at startup, before any
    /// mutator interns: the image must not hold two strings of equal content.
    pub fn register_strong(&self, s: S) {
        let hash = s.hash_code();
        self.tables.lock().image_strong.insert(s, hash);
    }

    /// Register every string of a trusted image. See
    /// [`register_strong`](Self::register_strong).
    pub fn register_image<I: IntoIterator<Item = S>>(&self, image: I) {
        let mut tables = self.tables.lock();
        let before = tables.image_strong.len();
        for s in image {
            let hash = s.hash_code();
            tables.image_strong.insert(s, hash);
        }
        log::debug!(
            "registered {} image strings in the intern table",
            tables.image_strong.len() - before
        );
    }

    /// Remove the weak entry that is the same object as `s`.
    ///
    /// Returns whether there was one. Entries of equal content but different
    /// identity are left alone.
    pub fn remove_weak(&self, s: &S) -> bool {
        let removed = self.tables.lock().weak.remove(s, s.hash_code());
        if removed {
            log::trace!("removed weak intern with hash {:#x}", s.hash_code());
        }
        removed
    }

    /// Whether the weak table holds a string with the same content as `s`.
    ///
    /// The answer may be stale as soon as it is returned.
    pub fn contains_weak(&self, s: &S) -> bool {
        self.tables.lock().weak.lookup(s, s.hash_code()).is_some()
    }

    /// Total number of entries across the image-strong, strong and weak tables.
    pub fn size(&self) -> usize {
        let tables = self.tables.lock();
        tables.image_strong.len() + tables.strong.len() + tables.weak.len()
    }

    /// Whether all three tables are empty.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of entries registered from the image.
    pub fn image_strong_size(&self) -> usize {
        self.tables.lock().image_strong.len()
    }

    /// Number of entries in the runtime strong table.
    pub fn strong_size(&self) -> usize {
        self.tables.lock().strong.len()
    }

    /// Number of entries in the weak table.
    pub fn weak_size(&self) -> usize {
        self.tables.lock().weak.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(content: &str) -> JavaString {
        JavaString::from_str(content)
    }

    #[test]
    fn strong_intern_is_idempotent() {
        let table = InternTable::new();
        let a = table.intern_strong(s("foo"));
        let b = table.intern_strong(s("foo"));
        let c = table.intern_strong(a.clone());
        assert!(a.same_object(&b));
        assert!(a.same_object(&c));
        assert_eq!(table.strong_size(), 1);
    }

    #[test]
    fn image_entry_wins_over_new_strong() {
        let table = InternTable::new();
        let image = s("apple");
        table.register_strong(image.clone());
        let found = table.intern_strong(s("apple"));
        assert!(found.same_object(&image));
        assert_eq!(table.strong_size(), 0);
        assert_eq!(table.image_strong_size(), 1);
    }

    #[test]
    fn register_strong_skips_dedup() {
        let table = InternTable::new();
        table.register_strong(s("dup"));
        table.register_strong(s("dup"));
        assert_eq!(table.image_strong_size(), 2);
    }

    #[test]
    fn register_image_counts() {
        let table = InternTable::new();
        table.register_image(["a", "b", "c"].into_iter().map(s));
        assert_eq!(table.image_strong_size(), 3);
        assert_eq!(table.size(), 3);
    }

    #[test]
    fn weak_returns_existing_weak() {
        let table = InternTable::new();
        let a = table.intern_weak(s("w"));
        let b = table.intern_weak(s("w"));
        assert!(a.same_object(&b));
        assert_eq!(table.weak_size(), 1);
        assert!(table.contains_weak(&s("w")));
    }

    #[test]
    fn weak_defers_to_image() {
        let table = InternTable::new();
        let image = s("img");
        table.register_strong(image.clone());
        assert!(table.intern_weak(s("img")).same_object(&image));
        assert_eq!(table.weak_size(), 0);
    }

    #[test]
    fn promotion_moves_weak_instance() {
        let table = InternTable::new();
        let weak = table.intern_weak(s("banana"));
        let strong = table.intern_strong(s("banana"));
        assert!(strong.same_object(&weak));
        assert!(!table.contains_weak(&s("banana")));
        assert_eq!(table.weak_size(), 0);
        assert_eq!(table.strong_size(), 1);
        assert!(table.intern_weak(s("banana")).same_object(&strong));
    }

    #[test]
    fn content_forms_promote_too() {
        let heap = StringHeap::new();
        let table = InternTable::new();
        let weak = table.intern_weak(s("pear"));
        let strong = table.intern_strong_str(&heap, "pear").unwrap();
        assert!(strong.same_object(&weak));
        assert_eq!(table.weak_size(), 0);
    }

    #[test]
    fn alloc_failure_leaves_table_alone() {
        let heap = StringHeap::with_limit(2);
        let table: InternTable<JavaString> = InternTable::new();
        let err = table.intern_strong_str(&heap, "toolong").unwrap_err();
        assert!(matches!(err, InternError::Alloc(AllocError::OutOfMemory { .. })));
        assert!(table.is_empty());
    }

    #[test]
    fn remove_weak_is_by_identity() {
        let table = InternTable::new();
        let w = table.intern_weak(s("gone"));
        assert!(!table.remove_weak(&s("gone")));
        assert!(table.remove_weak(&w));
        assert!(!table.contains_weak(&w));
        assert!(!table.remove_weak(&w));
    }

    #[test]
    fn hash_collisions_stay_distinct() {
        // "Aa" and "BB" share a hash code
        let table = InternTable::new();
        assert_eq!(s("Aa").hash_code(), s("BB").hash_code());
        let aa = table.intern_strong(s("Aa"));
        let bb = table.intern_strong(s("BB"));
        assert!(!aa.same_object(&bb));
        assert!(table.intern_strong(s("BB")).same_object(&bb));
        assert_eq!(table.strong_size(), 2);
    }

    #[test]
    fn custom_hasher() {
        let table = InternTable::with_hasher(std::collections::hash_map::RandomState::new());
        let a = table.intern_strong(s("x"));
        assert!(table.intern_strong(s("x")).same_object(&a));
    }
}
