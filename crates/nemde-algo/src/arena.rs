//! Arena allocation context for interval-scoped scratch data.
//!
//! The model builder groups offers, region terms and generic-constraint
//! references in arena-backed collections. One arena serves one interval and
//! is reset between solves, so a cancelled or failed interval releases its
//! scratch in one step and never shares it with another interval.

use bumpalo::Bump;

/// Vector allocated in an interval arena.
pub type ArenaVec<'a, T> = bumpalo::collections::Vec<'a, T>;

/// Hash map allocated in an interval arena.
pub type ArenaMap<'a, K, V> = hashbrown::HashMap<K, V, hashbrown::DefaultHashBuilder, &'a Bump>;

/// Arena context for interval-scoped allocations.
///
/// # Example
///
/// ```
/// use nemde_algo::arena::ArenaContext;
///
/// let mut ctx = ArenaContext::new();
/// {
///     let mut rows = ctx.alloc_vec::<usize>();
///     rows.push(1);
/// }
/// ctx.reset();
/// ```
pub struct ArenaContext {
    bump: Bump,
}

impl ArenaContext {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Reset arena for reuse (O(1) operation).
    ///
    /// Arena-allocated values must be plain data; destructors are not run.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Bytes currently held by the arena.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    pub fn alloc_vec<T>(&self) -> ArenaVec<'_, T> {
        bumpalo::collections::Vec::new_in(&self.bump)
    }

    pub fn alloc_hashmap<K: Eq + std::hash::Hash, V>(&self) -> ArenaMap<'_, K, V> {
        hashbrown::HashMap::new_in(&self.bump)
    }
}

impl Default for ArenaContext {
    fn default() -> Self {
        Self::new()
    }
}
