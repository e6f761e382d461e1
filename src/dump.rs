use std::{fmt, hash::BuildHasher, io};

use crate::{InternString, InternTable};

#[derive(Clone, Copy)]
struct Counts {
    image_strong: usize,
    strong: usize,
    weak: usize,
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Intern table: {} strong; {} weak; {} image strong",
            self.strong, self.weak, self.image_strong
        )
    }
}

impl<S: InternString, H: BuildHasher> InternTable<S, H> {
    fn counts(&self) -> Counts {
        let tables = self.tables.lock();
        Counts {
            image_strong: tables.image_strong.len(),
            strong: tables.strong.len(),
            weak: tables.weak.len(),
        }
    }

    /// Write a one-line summary of the table sizes to `os`, as done when the
    /// runtime is asked to dump its state.
    ///
    /// The lock is released before anything is written.
    ///
    /// ```
    /// use intern_table::{InternTable, JavaString};
    /// let table = InternTable::new();
    /// table.intern_strong(JavaString::from_str("a"));
    /// let mut out = Vec::new();
    /// table.dump_for_sig_quit(&mut out).unwrap();
    /// assert_eq!(out, b"Intern table: 1 strong; 0 weak; 0 image strong\n");
    /// ```
    pub fn dump_for_sig_quit<W: io::Write + ?Sized>(&self, os: &mut W) -> io::Result<()> {
        let counts = self.counts();
        writeln!(os, "{counts}")
    }
}

impl<S: InternString, H: BuildHasher> fmt::Debug for InternTable<S, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        f.debug_struct("InternTable")
            .field("image_strong", &counts.image_strong)
            .field("strong", &counts.strong)
            .field("weak", &counts.weak)
            .finish()
    }
}
