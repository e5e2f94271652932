//! Multivariate Faà di Bruno rule for `f(g(x_0, ..., x_{p-1}))` with a univariate `f`.
//!
//! Each term reads `coefficient * f^(f_index)(g) * Π g[ds_indices]`. The rows for a
//! compiler are the rows of its value part reused as is, followed by the rows of its
//! derivative part differentiated once more along the last parameter.

use super::{combine_similar_terms, index::partial_derivative_index, DsCompiler, Term};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionTerm {
    pub(crate) coefficient: u64,
    pub(crate) f_index: usize,
    /// Sorted.
    pub(crate) ds_indices: Vec<usize>,
}

impl CompositionTerm {
    pub fn coefficient(&self) -> u64 {
        self.coefficient
    }

    /// Derivation order of the outer function.
    pub fn f_index(&self) -> usize {
        self.f_index
    }

    /// Factors taken from the inner expansion, in increasing order.
    pub fn ds_indices(&self) -> &[usize] {
        &self.ds_indices
    }
}

impl Term for CompositionTerm {
    type Key = (usize, Vec<usize>);

    fn key(&self) -> Self::Key {
        (self.f_index, self.ds_indices.clone())
    }

    fn coefficient_mut(&mut self) -> &mut u64 {
        &mut self.coefficient
    }
}

pub(crate) fn compile(
    parameters: usize,
    order: usize,
    value: Option<&DsCompiler>,
    derivative: Option<&DsCompiler>,
    sizes: &[Vec<usize>],
    derivatives_orders: &[Vec<usize>],
) -> Vec<Vec<CompositionTerm>> {
    let (Some(value), Some(derivative)) = (value, derivative) else {
        return vec![vec![CompositionTerm {
            coefficient: 1,
            f_index: 0,
            ds_indices: Vec::new(),
        }]];
    };

    // the value part keeps the same linear indices in the larger layout
    let mut table = value.composition.clone();

    let index_of = |orders: &[usize]| partial_derivative_index(parameters, order, sizes, orders);
    let mut first_order = vec![0; parameters];
    first_order[parameters - 1] = 1;
    let first_order = index_of(&first_order);

    for lower_row in &derivative.composition {
        let mut row = Vec::new();
        for term in lower_row {
            // indices of the derivative part have to be moved to the layout of this order
            let converted = term
                .ds_indices
                .iter()
                .map(|&j| index_of(&derivative.derivatives_orders[j]))
                .collect::<Vec<_>>();

            // d/dx f^(k)(g) = f^(k+1)(g) * dg/dx
            let mut ds_indices = converted.clone();
            ds_indices.push(first_order);
            ds_indices.sort_unstable();
            row.push(CompositionTerm {
                coefficient: term.coefficient,
                f_index: term.f_index + 1,
                ds_indices,
            });

            // product rule over the g factors
            for l in 0..converted.len() {
                let mut ds_indices = converted.clone();
                let mut orders = derivatives_orders[ds_indices[l]].clone();
                orders[parameters - 1] += 1;
                ds_indices[l] = index_of(&orders);
                ds_indices.sort_unstable();
                row.push(CompositionTerm {
                    coefficient: term.coefficient,
                    f_index: term.f_index,
                    ds_indices,
                });
            }
        }
        table.push(combine_similar_terms(row));
    }
    table
}
