//! Compiled derivation tables for a given number of free parameters and truncation order.
//!
//! A [`DsCompiler`] owns the canonical layout of the coefficient arrays and the tables encoding
//! the product rule and the univariate chain rule. Chain rule tables between two compilers are
//! kept in [`RebaseTable`]s. Everything here is integer only and shared through [`TableCache`].

pub mod cache;
pub mod composition;
pub(crate) mod index;
pub mod multiplication;
pub mod rebase;

use std::{fmt::Write, hash::Hash, sync::Arc};

use rustc_hash::FxHashMap;

pub use cache::TableCache;
pub use composition::CompositionTerm;
pub use index::size;
pub use multiplication::MultiplicationTerm;
pub use rebase::{RebaseTable, RebaseTerm};

use crate::error::{DsError, Shape};

pub(crate) trait Term {
    type Key: Clone + Eq + Hash + Ord;

    fn key(&self) -> Self::Key;
    fn coefficient_mut(&mut self) -> &mut u64;
}

/// Merges terms with equal keys by summing their coefficients, then sorts by key.
pub(crate) fn combine_similar_terms<T: Term>(terms: Vec<T>) -> Vec<T> {
    let mut positions: FxHashMap<T::Key, usize> = FxHashMap::default();
    let mut combined: Vec<T> = Vec::with_capacity(terms.len());
    for mut term in terms {
        let key = term.key();
        if let Some(&position) = positions.get(&key) {
            let coefficient = *term.coefficient_mut();
            *combined[position].coefficient_mut() += coefficient;
        } else {
            positions.insert(key, combined.len());
            combined.push(term);
        }
    }
    combined.sort_by_cached_key(Term::key);
    combined
}

#[derive(Debug)]
pub struct DsCompiler {
    parameters: usize,
    order: usize,
    sizes: Vec<Vec<usize>>,
    derivatives_orders: Vec<Vec<usize>>,
    orders_sum: Vec<usize>,
    multiplication: Vec<Vec<MultiplicationTerm>>,
    composition: Vec<Vec<CompositionTerm>>,
}

impl DsCompiler {
    /// Compiler for `parameters` free parameters and derivation order `order`, from the
    /// process-wide cache.
    pub fn get(parameters: usize, order: usize) -> Arc<DsCompiler> {
        TableCache::global().compiler(parameters, order)
    }

    /// Assembles the compiler for `(parameters, order)` from the compilers for
    /// `(parameters - 1, order)` and `(parameters, order - 1)`.
    pub(crate) fn build(
        parameters: usize,
        order: usize,
        value: Option<&DsCompiler>,
        derivative: Option<&DsCompiler>,
    ) -> Self {
        debug_assert_eq!(value.is_some(), parameters > 0);
        debug_assert_eq!(derivative.is_some(), order > 0);
        let sizes = index::compile_sizes(parameters, order, value.map(|v| v.sizes.as_slice()));
        let derivatives_orders = index::compile_derivatives_orders(
            parameters,
            value.map(|v| v.derivatives_orders.as_slice()),
            derivative.map(|d| d.derivatives_orders.as_slice()),
        );
        let orders_sum = derivatives_orders
            .iter()
            .map(|orders| orders.iter().sum())
            .collect();
        let multiplication =
            multiplication::compile(parameters, order, &sizes, &derivatives_orders);
        let composition = composition::compile(
            parameters,
            order,
            value,
            derivative,
            &sizes,
            &derivatives_orders,
        );
        Self {
            parameters,
            order,
            sizes,
            derivatives_orders,
            orders_sum,
            multiplication,
            composition,
        }
    }

    pub fn parameters(&self) -> usize {
        self.parameters
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn shape(&self) -> Shape {
        Shape {
            parameters: self.parameters,
            order: self.order,
        }
    }

    /// Number of coefficients of a derivative structure.
    pub fn size(&self) -> usize {
        self.derivatives_orders.len()
    }

    /// Derivation orders of the coefficient at linear index `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not below [`DsCompiler::size`].
    pub fn multi_index(&self, k: usize) -> &[usize] {
        &self.derivatives_orders[k]
    }

    /// Total derivation order of the coefficient at linear index `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not below [`DsCompiler::size`].
    pub fn orders_sum(&self, k: usize) -> usize {
        self.orders_sum[k]
    }

    /// Linear index of the partial derivative with the given derivation orders.
    pub fn index_of(&self, orders: &[usize]) -> Result<usize, DsError> {
        if orders.len() != self.parameters {
            return Err(DsError::InvalidShape {
                expected: self.parameters,
                actual: orders.len(),
            });
        }
        let sum = orders.iter().sum();
        if sum > self.order {
            return Err(DsError::OrderTooLarge {
                order: sum,
                max: self.order,
            });
        }
        Ok(self.index_of_unchecked(orders))
    }

    pub(crate) fn index_of_unchecked(&self, orders: &[usize]) -> usize {
        index::partial_derivative_index(self.parameters, self.order, &self.sizes, orders)
    }

    /// Moves linear index `k` of `from` into this layout, dropping or zero-filling trailing
    /// parameters.
    pub(crate) fn convert_index(&self, k: usize, from: &DsCompiler) -> usize {
        let source = from.multi_index(k);
        let mut orders = vec![0; self.parameters];
        let shared = self.parameters.min(from.parameters);
        orders[..shared].copy_from_slice(&source[..shared]);
        self.index_of_unchecked(&orders)
    }

    pub fn check_compatibility(&self, other: &DsCompiler) -> Result<(), DsError> {
        if self.parameters == other.parameters && self.order == other.order {
            Ok(())
        } else {
            Err(DsError::IncompatibleOperands {
                expected: self.shape(),
                actual: other.shape(),
            })
        }
    }

    /// Product rule terms contributing to the coefficient at linear index `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not below [`DsCompiler::size`].
    pub fn multiplication_terms(&self, k: usize) -> &[MultiplicationTerm] {
        &self.multiplication[k]
    }

    /// Univariate chain rule terms contributing to the coefficient at linear index `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not below [`DsCompiler::size`].
    pub fn composition_terms(&self, k: usize) -> &[CompositionTerm] {
        &self.composition[k]
    }

    /// Chain rule table from this compiler's parameters to the parameters of `base`.
    pub fn rebaser(&self, base: &DsCompiler) -> Result<Arc<RebaseTable>, DsError> {
        if self.order != base.order {
            return Err(DsError::IncompatibleOperands {
                expected: Shape {
                    parameters: base.parameters,
                    order: self.order,
                },
                actual: base.shape(),
            });
        }
        Ok(TableCache::global().rebaser(self.parameters, base.parameters, self.order))
    }

    /// Renders a multi-index as `[o_0,o_1,...]`.
    pub fn format_multi_index(&self, k: usize) -> String {
        let orders = self.multi_index(k);
        let mut result = String::from("[");
        for (i, o) in orders.iter().enumerate() {
            if i > 0 {
                result.push(',');
            }
            let _ = write!(result, "{o}");
        }
        result.push(']');
        result
    }

    pub fn multiplication_rule(&self, k: usize) -> String {
        join_terms(self.multiplication_terms(k).iter().map(|term| {
            format!(
                "{}f{}*g{}",
                coefficient_prefix(term.coefficient),
                self.format_multi_index(term.lhs_index),
                self.format_multi_index(term.rhs_index)
            )
        }))
    }

    pub fn composition_rule(&self, k: usize) -> String {
        join_terms(self.composition_terms(k).iter().map(|term| {
            let mut rendered = format!(
                "{}f^({})",
                coefficient_prefix(term.coefficient),
                term.f_index
            );
            for &j in &term.ds_indices {
                let _ = write!(rendered, "*g{}", self.format_multi_index(j));
            }
            rendered
        }))
    }

    /// Renders row `k` of a table produced by `self.rebaser(base)`.
    pub fn rebase_rule(&self, base: &DsCompiler, table: &RebaseTable, k: usize) -> String {
        let base_size = base.size();
        join_terms(table.terms(k).iter().map(|term| {
            let mut rendered = format!(
                "{}f{}",
                coefficient_prefix(term.coefficient),
                self.format_multi_index(term.ds_index)
            );
            for &j in &term.product_indices {
                let _ = write!(
                    rendered,
                    "*p{}{}",
                    j / base_size,
                    base.format_multi_index(j % base_size)
                );
            }
            rendered
        }))
    }
}

fn coefficient_prefix(coefficient: u64) -> String {
    if coefficient == 1 {
        String::new()
    } else {
        format!("{coefficient}*")
    }
}

fn join_terms(terms: impl Iterator<Item = String>) -> String {
    let rendered = terms.collect::<Vec<_>>();
    if rendered.is_empty() {
        "0".to_owned()
    } else {
        rendered.join(" + ")
    }
}

#[cfg(test)]
fn compiler(parameters: usize, order: usize) -> Arc<DsCompiler> {
    TableCache::new().compiler(parameters, order)
}

#[test]
fn test_layout_two_parameters_order_two() {
    let c = compiler(2, 2);
    let layout = (0..c.size())
        .map(|k| c.multi_index(k).to_vec())
        .collect::<Vec<_>>();
    assert_eq!(
        layout,
        vec![
            vec![0, 0],
            vec![1, 0],
            vec![2, 0],
            vec![0, 1],
            vec![1, 1],
            vec![0, 2]
        ]
    );
}

#[test]
fn test_layout_three_parameters_order_two() {
    let c = compiler(3, 2);
    let layout = (0..c.size())
        .map(|k| c.format_multi_index(k))
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(
        layout,
        "[0,0,0] [1,0,0] [2,0,0] [0,1,0] [1,1,0] [0,2,0] [0,0,1] [1,0,1] [0,1,1] [0,0,2]"
    );
}

#[test]
fn test_layout_two_parameters_order_three() {
    let c = compiler(2, 3);
    let layout = (0..c.size())
        .map(|k| c.format_multi_index(k))
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(
        layout,
        "[0,0] [1,0] [2,0] [3,0] [0,1] [1,1] [2,1] [0,2] [1,2] [0,3]"
    );
    let sums = (0..c.size()).map(|k| c.orders_sum(k)).collect::<Vec<_>>();
    assert_eq!(sums, vec![0, 1, 2, 3, 1, 2, 3, 2, 3, 3]);
}

#[test]
fn test_layout_first_order() {
    let c = compiler(4, 1);
    assert_eq!(c.size(), 5);
    for i in 0..4 {
        let mut orders = vec![0; 4];
        orders[i] = 1;
        assert_eq!(c.index_of(&orders), Ok(i + 1));
    }
}

#[test]
fn test_index_round_trip() {
    for p in 0..5 {
        for n in 0..5 {
            let c = compiler(p, n);
            assert_eq!(c.size(), size(p, n));
            for k in 0..c.size() {
                assert_eq!(c.index_of(c.multi_index(k)), Ok(k));
            }
        }
    }
}

#[test]
fn test_index_of_rejects_bad_orders() {
    let c = compiler(2, 3);
    assert_eq!(
        c.index_of(&[1, 1, 1]),
        Err(DsError::InvalidShape {
            expected: 2,
            actual: 3
        })
    );
    assert_eq!(
        c.index_of(&[2, 2]),
        Err(DsError::OrderTooLarge { order: 4, max: 3 })
    );
}

#[test]
#[should_panic(expected = "index out of bounds")]
fn test_multiplication_terms_past_the_layout() {
    let c = compiler(2, 3);
    let _ = c.multiplication_terms(c.size());
}

#[test]
fn test_smaller_multi_indices_come_first() {
    let c = compiler(3, 4);
    for k in 0..c.size() {
        for j in 0..c.size() {
            let below = c
                .multi_index(j)
                .iter()
                .zip(c.multi_index(k))
                .all(|(b, a)| b <= a);
            if below {
                assert!(j <= k);
            }
        }
    }
}

#[test]
fn test_multiplication_rules() {
    let c = compiler(4, 3);
    let index = |orders: &[usize]| c.index_of(orders).unwrap();
    assert_eq!(c.multiplication_rule(0), "f[0,0,0,0]*g[0,0,0,0]");
    assert_eq!(
        c.multiplication_rule(index(&[1, 0, 0, 0])),
        "f[0,0,0,0]*g[1,0,0,0] + f[1,0,0,0]*g[0,0,0,0]"
    );
    assert_eq!(
        c.multiplication_rule(index(&[2, 0, 0, 0])),
        "f[0,0,0,0]*g[2,0,0,0] + 2*f[1,0,0,0]*g[1,0,0,0] + f[2,0,0,0]*g[0,0,0,0]"
    );
    assert_eq!(
        c.multiplication_rule(index(&[1, 1, 0, 0])),
        "f[0,0,0,0]*g[1,1,0,0] + f[1,0,0,0]*g[0,1,0,0] + f[0,1,0,0]*g[1,0,0,0] + f[1,1,0,0]*g[0,0,0,0]"
    );
    assert_eq!(
        c.multiplication_rule(index(&[0, 0, 0, 3])),
        "f[0,0,0,0]*g[0,0,0,3] + 3*f[0,0,0,1]*g[0,0,0,2] + 3*f[0,0,0,2]*g[0,0,0,1] + f[0,0,0,3]*g[0,0,0,0]"
    );
}

#[test]
fn test_multiplication_term_count() {
    // Σ_{β ≤ α} 1 = Π (α_i + 1)
    let c = compiler(3, 4);
    for k in 0..c.size() {
        let expected: usize = c.multi_index(k).iter().map(|o| o + 1).product();
        assert_eq!(c.multiplication_terms(k).len(), expected);
    }
}

#[test]
fn test_composition_rules() {
    let c = compiler(1, 4);
    assert_eq!(c.composition_rule(0), "f^(0)");
    assert_eq!(c.composition_rule(1), "f^(1)*g[1]");
    assert_eq!(c.composition_rule(2), "f^(1)*g[2] + f^(2)*g[1]*g[1]");
    assert_eq!(
        c.composition_rule(3),
        "f^(1)*g[3] + 3*f^(2)*g[1]*g[2] + f^(3)*g[1]*g[1]*g[1]"
    );
    assert_eq!(
        c.composition_rule(4),
        "f^(1)*g[4] + 4*f^(2)*g[1]*g[3] + 3*f^(2)*g[2]*g[2] + 6*f^(3)*g[1]*g[1]*g[2] + f^(4)*g[1]*g[1]*g[1]*g[1]"
    );
}

#[test]
fn test_composition_mixed_rule() {
    let c = compiler(2, 2);
    // ∂²f(g)/∂x∂y = f'' g_x g_y + f' g_xy
    assert_eq!(
        c.composition_rule(4),
        "f^(1)*g[1,1] + f^(2)*g[1,0]*g[0,1]"
    );
}

#[test]
fn test_composition_coefficients_count_set_partitions() {
    // for p = 1 the coefficients of row n sum to the Bell number B_n
    let c = compiler(1, 6);
    let sums = (0..=6)
        .map(|k| {
            c.composition_terms(k)
                .iter()
                .map(CompositionTerm::coefficient)
                .sum::<u64>()
        })
        .collect::<Vec<_>>();
    assert_eq!(sums, vec![1, 1, 2, 5, 15, 52, 203]);
}

#[test]
fn test_check_compatibility() {
    let a = compiler(2, 3);
    let b = compiler(3, 2);
    assert!(a.check_compatibility(&a).is_ok());
    assert_eq!(
        a.check_compatibility(&b),
        Err(DsError::IncompatibleOperands {
            expected: Shape {
                parameters: 2,
                order: 3
            },
            actual: Shape {
                parameters: 3,
                order: 2
            }
        })
    );
}
