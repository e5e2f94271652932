//! Multivariate chain rule for `f(p_0(q), ..., p_{m-1}(q))`.
//!
//! `f` is expanded in its own `m` parameters, each `p_i` is expanded in the `k` base parameters
//! `q`. The table for order `n` starts from the table for order `n - 1` (indices moved to the
//! larger layouts) and derives every top order entry `∂ⁿf/∂q_j…∂q_l` from a lower entry by
//! differentiating once more along one base parameter: the `∂f/∂p` factor through the chain
//! rule and each `∂p/∂q` factor directly.

use super::{combine_similar_terms, DsCompiler, Term};

/// `coefficient * f[ds_index] * Π p[product_indices]`
///
/// Product indices address the concatenation of the `m` inner coefficient arrays: function
/// `i` occupies the block starting at `i * base_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebaseTerm {
    pub(crate) coefficient: u64,
    pub(crate) ds_index: usize,
    /// Sorted.
    pub(crate) product_indices: Vec<usize>,
}

impl RebaseTerm {
    pub fn coefficient(&self) -> u64 {
        self.coefficient
    }

    /// Partial derivative of the outer expansion with respect to its own parameters.
    pub fn ds_index(&self) -> usize {
        self.ds_index
    }

    pub fn product_indices(&self) -> &[usize] {
        &self.product_indices
    }
}

impl Term for RebaseTerm {
    type Key = (usize, Vec<usize>);

    fn key(&self) -> Self::Key {
        (self.ds_index, self.product_indices.clone())
    }

    fn coefficient_mut(&mut self) -> &mut u64 {
        &mut self.coefficient
    }
}

/// Compiled chain rule from `outer_parameters` intermediate parameters to `base_parameters`.
#[derive(Clone, Debug)]
pub struct RebaseTable {
    outer_parameters: usize,
    base_parameters: usize,
    order: usize,
    base_size: usize,
    rows: Vec<Vec<RebaseTerm>>,
}

impl RebaseTable {
    pub fn outer_parameters(&self) -> usize {
        self.outer_parameters
    }

    pub fn base_parameters(&self) -> usize {
        self.base_parameters
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Size of one inner expansion.
    pub fn base_size(&self) -> usize {
        self.base_size
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Terms contributing to the base derivative at linear index `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is not below [`RebaseTable::len`].
    pub fn terms(&self, k: usize) -> &[RebaseTerm] {
        &self.rows[k]
    }

    pub(crate) fn rows(&self) -> &[Vec<RebaseTerm>] {
        &self.rows
    }
}

/// Compiler shapes and table of the previous order.
pub(crate) struct LowerRebase<'a> {
    pub table: &'a RebaseTable,
    pub outer: &'a DsCompiler,
    pub base: &'a DsCompiler,
}

pub(crate) fn compile(
    outer: &DsCompiler,
    base: &DsCompiler,
    lower: Option<LowerRebase<'_>>,
) -> RebaseTable {
    debug_assert_eq!(outer.order(), base.order());
    let base_size = base.size();
    let table = |rows: Vec<Vec<RebaseTerm>>| RebaseTable {
        outer_parameters: outer.parameters(),
        base_parameters: base.parameters(),
        order: outer.order(),
        base_size,
        rows,
    };

    let Some(lower) = lower else {
        // order 0 only copies the function value
        debug_assert_eq!(outer.order(), 0);
        return table(vec![vec![RebaseTerm {
            coefficient: 1,
            ds_index: 0,
            product_indices: Vec::new(),
        }]]);
    };

    let lower_base_size = lower.base.size();
    let mut rows: Vec<Option<Vec<RebaseTerm>>> = vec![None; base_size];
    for (i, lower_row) in lower.table.rows().iter().enumerate() {
        let index = base.convert_index(i, lower.base);
        let row = lower_row
            .iter()
            .map(|term| {
                let mut product_indices = term
                    .product_indices
                    .iter()
                    .map(|&j| {
                        let p_index = j / lower_base_size;
                        p_index * base_size + base.convert_index(j % lower_base_size, lower.base)
                    })
                    .collect::<Vec<_>>();
                product_indices.sort_unstable();
                RebaseTerm {
                    coefficient: term.coefficient,
                    ds_index: outer.convert_index(term.ds_index, lower.outer),
                    product_indices,
                }
            })
            .collect();
        rows[index] = Some(row);
    }

    for k in 1..base_size {
        if rows[k].is_some() {
            continue;
        }
        // top order entry: pick the first base parameter it is differentiated along
        let mut orders = base.multi_index(k).to_vec();
        let Some(q) = orders.iter().position(|&o| o > 0) else {
            continue;
        };
        orders[q] -= 1;
        let lower_row = rows[base.index_of_unchecked(&orders)]
            .as_ref()
            .map_or(&[][..], Vec::as_slice);

        let mut row = Vec::new();
        for term in lower_row {
            for i in 0..outer.parameters() {
                row.push(differentiate_f_part(term, i, q, outer, base));
            }
            for j in 0..term.product_indices.len() {
                row.push(differentiate_product_part(term, j, q, base));
            }
        }
        rows[k] = Some(combine_similar_terms(row));
    }

    table(rows.into_iter().map(Option::unwrap_or_default).collect())
}

/// `∂/∂q (∂f/∂p…) = Σ_i ∂(∂f/∂p…)/∂p_i * ∂p_i/∂q`, term `i` of the sum.
fn differentiate_f_part(
    term: &RebaseTerm,
    i: usize,
    q: usize,
    outer: &DsCompiler,
    base: &DsCompiler,
) -> RebaseTerm {
    let mut term_orders = outer.multi_index(term.ds_index).to_vec();
    term_orders[i] += 1;
    let mut q_orders = vec![0; base.parameters()];
    q_orders[q] = 1;
    let mut product_indices = term.product_indices.clone();
    product_indices.push(i * base.size() + base.index_of_unchecked(&q_orders));
    product_indices.sort_unstable();
    RebaseTerm {
        coefficient: term.coefficient,
        ds_index: outer.index_of_unchecked(&term_orders),
        product_indices,
    }
}

/// Differentiates the `j`-th `∂p/∂q…` factor once more along `q`.
fn differentiate_product_part(
    term: &RebaseTerm,
    j: usize,
    q: usize,
    base: &DsCompiler,
) -> RebaseTerm {
    let base_size = base.size();
    let mut product_indices = term.product_indices.clone();
    let p_index = product_indices[j] / base_size;
    let mut p_orders = base.multi_index(product_indices[j] % base_size).to_vec();
    p_orders[q] += 1;
    product_indices[j] = p_index * base_size + base.index_of_unchecked(&p_orders);
    product_indices.sort_unstable();
    RebaseTerm {
        coefficient: term.coefficient,
        ds_index: term.ds_index,
        product_indices,
    }
}

#[cfg(test)]
use super::TableCache;

#[test]
fn test_rebase_first_order_rule() {
    let cache = TableCache::new();
    let table = cache.rebaser(2, 3, 1);
    let outer = cache.compiler(2, 1);
    let base = cache.compiler(3, 1);
    assert_eq!(table.len(), 4);
    assert_eq!(outer.rebase_rule(&base, &table, 0), "f[0,0]");
    // ∂f/∂q₀ = ∂f/∂p₀ ∂p₀/∂q₀ + ∂f/∂p₁ ∂p₁/∂q₀
    assert_eq!(
        outer.rebase_rule(&base, &table, 1),
        "f[1,0]*p0[1,0,0] + f[0,1]*p1[1,0,0]"
    );
    assert_eq!(
        outer.rebase_rule(&base, &table, 3),
        "f[1,0]*p0[0,0,1] + f[0,1]*p1[0,0,1]"
    );
}

#[test]
fn test_rebase_second_order_rule() {
    let cache = TableCache::new();
    let table = cache.rebaser(2, 1, 2);
    let outer = cache.compiler(2, 2);
    let base = cache.compiler(1, 2);
    assert_eq!(
        outer.rebase_rule(&base, &table, 2),
        "f[1,0]*p0[2] + f[2,0]*p0[1]*p0[1] + f[0,1]*p1[2] + 2*f[1,1]*p0[1]*p1[1] + f[0,2]*p1[1]*p1[1]"
    );
}

#[test]
fn test_rebase_single_outer_parameter_matches_composition() {
    let cache = TableCache::new();
    let table = cache.rebaser(1, 2, 4);
    let compiler = cache.compiler(2, 4);
    assert_eq!(table.len(), compiler.size());
    for k in 0..compiler.size() {
        let rebased = table
            .terms(k)
            .iter()
            .map(|t| (t.coefficient(), t.ds_index(), t.product_indices().to_vec()))
            .collect::<Vec<_>>();
        let composed = compiler
            .composition_terms(k)
            .iter()
            .map(|t| (t.coefficient(), t.f_index(), t.ds_indices().to_vec()))
            .collect::<Vec<_>>();
        assert_eq!(rebased, composed);
    }
}

#[test]
fn test_rebase_without_base_parameters() {
    let cache = TableCache::new();
    let table = cache.rebaser(3, 0, 3);
    assert_eq!(table.len(), 1);
    assert_eq!(
        table.terms(0),
        &[RebaseTerm {
            coefficient: 1,
            ds_index: 0,
            product_indices: Vec::new()
        }]
    );
}
