use thiserror::Error;

/// The string allocator could not satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The heap has fewer free UTF-16 units than requested.
    #[error("out of memory: requested {requested} UTF-16 units, {available} available")]
    OutOfMemory {
        /// Units requested by the failed allocation.
        requested: usize,
        /// Units still free when the request was made.
        available: usize,
    },
}

/// Errors surfaced by the content forms of strong interning.
///
/// Lookup, insertion and removal never fail; "not found" is `None`, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternError {
    /// The candidate string could not be allocated. The table is unchanged.
    #[error("failed to allocate intern candidate")]
    Alloc(#[from] AllocError),
}
