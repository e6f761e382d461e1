//! The string objects the table interns, and the allocator that makes them.
//!
//! The table itself only needs [`InternString`]: a content hash, content
//! equality and object identity. [`JavaString`] is the stock reference type, an
//! immutable UTF-16 buffer whose hash is computed once at allocation.

use std::{
    fmt::{self, Write as _},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::error::AllocError;

/// A reference to a managed string object.
///
/// Cloning a reference must not copy the object: a clone is [`same_object`]
/// as its source.
///
/// [`same_object`]: InternString::same_object
pub trait InternString: Clone {
    /// Deterministic hash of the content. Equal content must hash equally.
    fn hash_code(&self) -> i32;

    /// Whether both strings hold the same sequence of code units.
    fn content_eq(&self, other: &Self) -> bool;

    /// Whether both references point at the same object.
    fn same_object(&self, other: &Self) -> bool;
}

/// Hash of a UTF-16 sequence: `s[0]*31^(n-1) + s[1]*31^(n-2) + ... + s[n-1]`
/// in wrapping 32-bit arithmetic.
///
/// ```
/// use intern_table::compute_hash_code;
/// let units: Vec<u16> = "hello".encode_utf16().collect();
/// assert_eq!(compute_hash_code(&units), 99162322);
/// assert_eq!(compute_hash_code(&[]), 0);
/// ```
#[inline]
pub fn compute_hash_code(units: &[u16]) -> i32 {
    units
        .iter()
        .fold(0i32, |h, &c| h.wrapping_mul(31).wrapping_add(i32::from(c)))
}

struct StringData {
    hash_code: i32,
    units: Box<[u16]>,
}

/// An immutable, reference-counted UTF-16 string.
///
/// Equality via `==` compares content; use [`InternString::same_object`] for
/// identity.
#[derive(Clone)]
pub struct JavaString(Arc<StringData>);

impl JavaString {
    /// Allocate a string outside of any [`StringHeap`] accounting.
    pub fn from_utf16(units: &[u16]) -> Self {
        JavaString(Arc::new(StringData {
            hash_code: compute_hash_code(units),
            units: units.into(),
        }))
    }

    /// Encode `s` as UTF-16 and allocate it.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        let units: Vec<u16> = s.encode_utf16().collect();
        Self::from_utf16(&units)
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.0.units.len()
    }

    /// Whether the string has no code units.
    pub fn is_empty(&self) -> bool {
        self.0.units.is_empty()
    }

    /// The code units.
    pub fn utf16(&self) -> &[u16] {
        &self.0.units
    }

    /// Decode to UTF-8, replacing unpaired surrogates.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0.units)
    }

    /// A new object with the same content, as a moving collector would
    /// produce when it relocates this one.
    pub fn relocate(&self) -> Self {
        JavaString(Arc::new(StringData {
            hash_code: self.0.hash_code,
            units: self.0.units.clone(),
        }))
    }
}

impl InternString for JavaString {
    #[inline]
    fn hash_code(&self) -> i32 {
        self.0.hash_code
    }

    #[inline]
    fn content_eq(&self, other: &Self) -> bool {
        self.same_object(other)
            || (self.0.hash_code == other.0.hash_code && self.0.units == other.0.units)
    }

    #[inline]
    fn same_object(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for JavaString {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for JavaString {}

impl PartialEq<str> for JavaString {
    fn eq(&self, other: &str) -> bool {
        self.0.units.iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for JavaString {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl fmt::Display for JavaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        char::decode_utf16(self.0.units.iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .try_for_each(|c| f.write_char(c))
    }
}

impl fmt::Debug for JavaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JavaString({:?} @ {:p})", self.to_string_lossy(), Arc::as_ptr(&self.0))
    }
}

/// Allocates string objects from raw content.
pub trait StringAllocator<S> {
    /// Allocate a new string object holding `units`.
    fn alloc_utf16(&self, units: &[u16]) -> Result<S, AllocError>;
}

/// Allocator for [`JavaString`] that can be capped at a number of UTF-16 units.
///
/// Reclaiming memory is the collector's business, so the count only grows.
#[derive(Debug, Default)]
pub struct StringHeap {
    limit: Option<usize>,
    used: AtomicUsize,
}

impl StringHeap {
    /// A heap that never runs out.
    pub fn new() -> Self {
        Self::default()
    }

    /// A heap that fails once `units` UTF-16 units have been handed out.
    pub fn with_limit(units: usize) -> Self {
        StringHeap {
            limit: Some(units),
            used: AtomicUsize::new(0),
        }
    }

    /// UTF-16 units allocated so far.
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

impl StringAllocator<JavaString> for StringHeap {
    fn alloc_utf16(&self, units: &[u16]) -> Result<JavaString, AllocError> {
        let requested = units.len();
        match self.limit {
            None => {
                self.used.fetch_add(requested, Ordering::Relaxed);
            }
            Some(limit) => {
                self.used
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                        used.checked_add(requested).filter(|&total| total <= limit)
                    })
                    .map_err(|used| AllocError::OutOfMemory {
                        requested,
                        available: limit.saturating_sub(used),
                    })?;
            }
        }
        Ok(JavaString::from_utf16(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn hash_matches_polynomial() {
        assert_eq!(compute_hash_code(&utf16("a")), 97);
        assert_eq!(compute_hash_code(&utf16("ab")), 97 * 31 + 98);
        // wraps instead of overflowing
        let long = utf16(&"z".repeat(64));
        let _ = compute_hash_code(&long);
    }

    #[test]
    fn equal_content_distinct_objects() {
        let a = JavaString::from_str("apple");
        let b = JavaString::from_str("apple");
        assert!(a.content_eq(&b));
        assert!(!a.same_object(&b));
        assert!(a.same_object(&a.clone()));
        assert_eq!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn relocate_keeps_content_changes_identity() {
        let a = JavaString::from_str("moved");
        let b = a.relocate();
        assert_eq!(a, b);
        assert!(!a.same_object(&b));
        assert_eq!(a.hash_code(), b.hash_code());
    }

    #[test]
    fn display_replaces_lone_surrogates() {
        let s = JavaString::from_utf16(&[0x68, 0xD800, 0x69]);
        assert_eq!(s.to_string(), "h\u{FFFD}i");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn bounded_heap_runs_out() {
        let heap = StringHeap::with_limit(8);
        assert!(heap.alloc_utf16(&utf16("apple")).is_ok());
        assert_eq!(
            heap.alloc_utf16(&utf16("banana")),
            Err(AllocError::OutOfMemory {
                requested: 6,
                available: 3
            })
        );
        assert_eq!(heap.used(), 5);
        assert!(heap.alloc_utf16(&utf16("fig")).is_ok());
    }
}
