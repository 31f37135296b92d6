//! Temporary variable allocation for the dispatcher
//!
//! The line protocol dispatcher is one C function with one declaration
//! block shared by every command branch. Only one branch runs per request,
//! so temporaries are reused across branches: each type gets as many
//! variables as the hungriest single prototype needs, not the sum.

use crate::types::CType;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TempPool {
    /// Allocated in the current prototype
    current: usize,
    /// Largest `current` seen so far
    max: usize,
}

/// Allocation state threaded through dispatcher emission
#[derive(Debug, Clone, Default)]
pub struct EmissionContext {
    pools: BTreeMap<CType, TempPool>,
    max_results: usize,
}

impl EmissionContext {
    pub fn new() -> Self {
        EmissionContext::default()
    }

    /// Start allocating for a new prototype; earlier temporaries become reusable
    pub fn begin_prototype(&mut self) {
        for pool in self.pools.values_mut() {
            pool.current = 0;
        }
    }

    /// Next unused temporary of type `ty` within the current prototype
    pub fn alloc(&mut self, ty: &CType) -> String {
        let pool = self.pools.entry(ty.clone()).or_default();
        let index = pool.current;
        pool.current += 1;
        pool.max = pool.max.max(pool.current);
        temp_name(ty, index)
    }

    /// Record how many response values the current prototype produces
    pub fn record_results(&mut self, count: usize) {
        self.max_results = self.max_results.max(count);
    }

    /// Number of temporaries that will be declared for `ty`
    pub fn pool_size(&self, ty: &CType) -> usize {
        self.pools.get(ty).map_or(0, |p| p.max)
    }

    /// Size of the response arrays (at least one, so the arrays are valid C)
    pub fn max_results(&self) -> usize {
        self.max_results.max(1)
    }

    /// Declarations for every temporary, ordered by type then index
    pub fn declarations(&self) -> Vec<String> {
        self.pools
            .iter()
            .flat_map(|(ty, pool)| {
                (0..pool.max).map(move |i| format!("{};", ty.declare(&temp_name(ty, i))))
            })
            .collect()
    }
}

fn temp_name(ty: &CType, index: usize) -> String {
    format!("tmp_{}_{}", ty.ident(), index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_uses_maximum_not_sum() {
        let char_p = CType::new("char", 1);
        let mut ctx = EmissionContext::new();

        ctx.begin_prototype();
        assert_eq!(ctx.alloc(&char_p), "tmp_char_p_0");
        assert_eq!(ctx.alloc(&char_p), "tmp_char_p_1");

        ctx.begin_prototype();
        assert_eq!(ctx.alloc(&char_p), "tmp_char_p_0");

        assert_eq!(ctx.pool_size(&char_p), 2);
        assert_eq!(
            ctx.declarations(),
            vec!["char *tmp_char_p_0;".to_string(), "char *tmp_char_p_1;".to_string()]
        );
    }

    #[test]
    fn test_pools_are_per_type() {
        let mut ctx = EmissionContext::new();
        ctx.begin_prototype();
        ctx.alloc(&CType::new("mark_t", 1));
        ctx.alloc(&CType::new("bint_t", 0));
        ctx.alloc(&CType::new("bint_t", 0));
        ctx.alloc(&CType::new("mark_t", 1));
        assert_eq!(ctx.pool_size(&CType::new("mark_t", 1)), 2);
        assert_eq!(ctx.pool_size(&CType::new("bint_t", 0)), 2);
        assert_eq!(ctx.pool_size(&CType::new("int", 0)), 0);
        assert_eq!(ctx.declarations().len(), 4);
    }

    #[test]
    fn test_max_results() {
        let mut ctx = EmissionContext::new();
        assert_eq!(ctx.max_results(), 1);
        ctx.record_results(4);
        ctx.record_results(2);
        assert_eq!(ctx.max_results(), 4);
    }
}
