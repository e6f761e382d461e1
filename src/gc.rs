//! Hooks the collector calls while mutators are paused.
//!
//! Strong entries are reported as roots through [`InternTable::visit_roots`].
//! Weak entries are never roots: once marking has finished,
//! [`InternTable::sweep_weaks`] asks the collector about each of them and
//! drops the ones it did not reach.

use std::hash::BuildHasher;

use crate::{InternString, InternTable};

/// Receives every strong entry during root enumeration.
///
/// The returned reference replaces the entry, which is how a moving collector
/// relocates interned strings.
pub trait RootVisitor<S> {
    /// Report `root` and return its (possibly new) address.
    fn visit_root(&mut self, root: &S) -> S;
}

impl<S, F: FnMut(&S) -> S> RootVisitor<S> for F {
    fn visit_root(&mut self, root: &S) -> S {
        self(root)
    }
}

/// Decides the fate of weak entries after marking.
pub trait IsMarked<S> {
    /// `None` if `obj` was not reached and is being reclaimed, otherwise its
    /// (possibly new) address.
    fn is_marked(&mut self, obj: &S) -> Option<S>;
}

impl<S, F: FnMut(&S) -> Option<S>> IsMarked<S> for F {
    fn is_marked(&mut self, obj: &S) -> Option<S> {
        self(obj)
    }
}

/// What a weak sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Entries whose referent survived, relocated or not.
    pub retained: usize,
    /// Entries dropped because their referent was not marked.
    pub reclaimed: usize,
}

impl<S: InternString, H: BuildHasher> InternTable<S, H> {
    /// Report every image-strong and strong entry to `visitor`, exactly once
    /// each, writing back whatever reference it returns. Weak entries are not
    /// visited.
    ///
    /// ```
    /// use intern_table::{InternString, InternTable, JavaString};
    /// let table = InternTable::new();
    /// let s = table.intern_strong(JavaString::from_str("root"));
    /// let moved = s.relocate();
    /// table.visit_roots(|_: &JavaString| moved.clone());
    /// let again = table.intern_strong(JavaString::from_str("root"));
    /// assert!(again.same_object(&moved));
    /// ```
    pub fn visit_roots(&self, mut visitor: impl RootVisitor<S>) {
        let mut tables = self.tables.lock();
        tables
            .image_strong
            .update_in_place(|s| visitor.visit_root(s));
        tables.strong.update_in_place(|s| visitor.visit_root(s));
        log::debug!(
            "visited {} intern table roots",
            tables.image_strong.len() + tables.strong.len()
        );
    }

    /// Filter the weak table through `is_marked` after the mark phase.
    ///
    /// Unmarked entries are removed. Marked entries are overwritten with the
    /// reference `is_marked` returns and keep their bucket: relocation does not
    /// change content, so it does not change the hash. The returned reference
    /// is trusted as is.
    ///
    /// ```
    /// use intern_table::{InternTable, JavaString};
    /// let table = InternTable::new();
    /// table.intern_weak(JavaString::from_str("cherry"));
    /// let stats = table.sweep_weaks(|_: &JavaString| None);
    /// assert_eq!(stats.reclaimed, 1);
    /// assert!(!table.contains_weak(&JavaString::from_str("cherry")));
    /// ```
    pub fn sweep_weaks(&self, mut is_marked: impl IsMarked<S>) -> SweepStats {
        let mut tables = self.tables.lock();
        let reclaimed = tables.weak.retain_map(|s| is_marked.is_marked(s));
        let stats = SweepStats {
            retained: tables.weak.len(),
            reclaimed,
        };
        log::debug!(
            "swept intern table weaks: {} retained, {} reclaimed",
            stats.retained,
            stats.reclaimed
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::SweepStats;
    use crate::{InternString, InternTable, JavaString};

    #[test]
    fn visit_roots_skips_weak_entries() {
        let table = InternTable::new();
        table.register_strong(JavaString::from_str("image"));
        table.intern_strong(JavaString::from_str("strong"));
        table.intern_weak(JavaString::from_str("weak"));

        let mut seen = Vec::new();
        table.visit_roots(|s: &JavaString| {
            seen.push(s.to_string());
            s.clone()
        });
        seen.sort();
        assert_eq!(seen, ["image", "strong"]);
    }

    #[test]
    fn relocated_image_root_stays_canonical() {
        let table = InternTable::new();
        let image = JavaString::from_str("apple");
        table.register_strong(image.clone());
        let moved = image.relocate();
        table.visit_roots(|s: &JavaString| {
            if s.same_object(&image) {
                moved.clone()
            } else {
                s.clone()
            }
        });
        let found = table.intern_weak(JavaString::from_str("apple"));
        assert!(found.same_object(&moved));
        assert_eq!(table.image_strong_size(), 1);
    }

    #[test]
    fn sweep_keeps_marked_entries() {
        let table = InternTable::new();
        let w = table.intern_weak(JavaString::from_str("kept"));
        let stats = table.sweep_weaks(|s: &JavaString| Some(s.clone()));
        assert_eq!(stats.retained, 1);
        assert_eq!(stats.reclaimed, 0);
        assert!(table
            .intern_weak(JavaString::from_str("kept"))
            .same_object(&w));
    }

    #[test]
    fn sweep_relocates_in_place() {
        let table = InternTable::new();
        let w = table.intern_weak(JavaString::from_str("moving"));
        let moved = w.relocate();
        table.sweep_weaks(|_: &JavaString| Some(moved.clone()));
        assert_eq!(table.weak_size(), 1);
        let found = table.intern_weak(JavaString::from_str("moving"));
        assert!(found.same_object(&moved));
        assert!(!found.same_object(&w));
    }

    #[test]
    fn sweep_does_not_touch_strong_entries() {
        let table = InternTable::new();
        table.intern_strong(JavaString::from_str("strong"));
        let stats = table.sweep_weaks(|_: &JavaString| None);
        assert_eq!(stats, SweepStats::default());
        assert_eq!(table.strong_size(), 1);
    }
}
