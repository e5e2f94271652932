use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use rustc_hash::FxHashMap;

use super::{
    rebase::{self, LowerRebase, RebaseTable},
    DsCompiler,
};

/// Memoized compilers and rebase tables.
///
/// Each table is built at most once per cache: the lock is held for the whole construction, so
/// concurrent first accesses wait for the thread that builds it. Built tables are immutable and
/// handed out as shared [`Arc`]s.
#[derive(Debug, Default)]
pub struct TableCache {
    compilers: Mutex<FxHashMap<(usize, usize), Arc<DsCompiler>>>,
    rebasers: Mutex<FxHashMap<(usize, usize, usize), Arc<RebaseTable>>>,
}

// The tables never hold partially built state, so a panic while the lock is held cannot leave
// them inconsistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by derivative structures.
    pub fn global() -> &'static TableCache {
        static CACHE: OnceLock<TableCache> = OnceLock::new();
        CACHE.get_or_init(TableCache::new)
    }

    pub fn compiler(&self, parameters: usize, order: usize) -> Arc<DsCompiler> {
        let mut compilers = lock(&self.compilers);
        if let Some(compiler) = compilers.get(&(parameters, order)) {
            return Arc::clone(compiler);
        }
        // build every missing compiler in increasing diagonal order, so that both the value
        // compiler (p - 1, o) and the derivative compiler (p, o - 1) already exist
        for diagonal in 0..=parameters + order {
            for o in diagonal.saturating_sub(parameters)..=order.min(diagonal) {
                let p = diagonal - o;
                if compilers.contains_key(&(p, o)) {
                    continue;
                }
                let value = if p == 0 {
                    None
                } else {
                    compilers.get(&(p - 1, o)).cloned()
                };
                let derivative = if o == 0 {
                    None
                } else {
                    compilers.get(&(p, o - 1)).cloned()
                };
                let compiler = DsCompiler::build(p, o, value.as_deref(), derivative.as_deref());
                compilers.insert((p, o), Arc::new(compiler));
            }
        }
        Arc::clone(&compilers[&(parameters, order)])
    }

    /// Chain rule table from `outer_parameters` to `base_parameters` at the given order.
    pub fn rebaser(
        &self,
        outer_parameters: usize,
        base_parameters: usize,
        order: usize,
    ) -> Arc<RebaseTable> {
        let mut rebasers = lock(&self.rebasers);
        if let Some(rebaser) = rebasers.get(&(outer_parameters, base_parameters, order)) {
            return Arc::clone(rebaser);
        }
        for o in 0..=order {
            if rebasers.contains_key(&(outer_parameters, base_parameters, o)) {
                continue;
            }
            let outer = self.compiler(outer_parameters, o);
            let base = self.compiler(base_parameters, o);
            let table = if o == 0 {
                rebase::compile(&outer, &base, None)
            } else {
                let lower_table = Arc::clone(&rebasers[&(outer_parameters, base_parameters, o - 1)]);
                let lower_outer = self.compiler(outer_parameters, o - 1);
                let lower_base = self.compiler(base_parameters, o - 1);
                rebase::compile(
                    &outer,
                    &base,
                    Some(LowerRebase {
                        table: &lower_table,
                        outer: &lower_outer,
                        base: &lower_base,
                    }),
                )
            };
            rebasers.insert((outer_parameters, base_parameters, o), Arc::new(table));
        }
        Arc::clone(&rebasers[&(outer_parameters, base_parameters, order)])
    }

    /// Number of compilers built so far.
    pub fn compiled_count(&self) -> usize {
        lock(&self.compilers).len()
    }
}

#[test]
fn test_compilers_are_shared() {
    let cache = TableCache::new();
    let a = cache.compiler(3, 2);
    let b = cache.compiler(3, 2);
    assert!(Arc::ptr_eq(&a, &b));
    // (0..=3) x (0..=2)
    assert_eq!(cache.compiled_count(), 12);
}

#[test]
fn test_concurrent_first_access_builds_once() {
    let cache = TableCache::new();
    let compilers = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| cache.compiler(4, 4)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });
    for compiler in &compilers {
        assert!(Arc::ptr_eq(compiler, &compilers[0]));
    }
    let rebasers = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| cache.rebaser(2, 3, 3)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });
    for rebaser in &rebasers {
        assert!(Arc::ptr_eq(rebaser, &rebasers[0]));
    }
}
