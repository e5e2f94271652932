//! Generalized Leibniz rule: `∂^α(f g) = Σ_{β ≤ α} C(α, β) ∂^β f ∂^(α-β) g`.

use super::{combine_similar_terms, index::partial_derivative_index, Term};
use crate::util::binomial;

/// `coefficient * lhs[lhs_index] * rhs[rhs_index]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiplicationTerm {
    pub(crate) coefficient: u64,
    pub(crate) lhs_index: usize,
    pub(crate) rhs_index: usize,
}

impl MultiplicationTerm {
    pub fn coefficient(&self) -> u64 {
        self.coefficient
    }

    pub fn lhs_index(&self) -> usize {
        self.lhs_index
    }

    pub fn rhs_index(&self) -> usize {
        self.rhs_index
    }
}

impl Term for MultiplicationTerm {
    type Key = (usize, usize);

    fn key(&self) -> Self::Key {
        (self.lhs_index, self.rhs_index)
    }

    fn coefficient_mut(&mut self) -> &mut u64 {
        &mut self.coefficient
    }
}

pub(crate) fn compile(
    parameters: usize,
    order: usize,
    sizes: &[Vec<usize>],
    derivatives_orders: &[Vec<usize>],
) -> Vec<Vec<MultiplicationTerm>> {
    let binomial = binomial(order);
    let mut table = Vec::with_capacity(derivatives_orders.len());
    let mut complement = vec![0; parameters];
    for (k, alpha) in derivatives_orders.iter().enumerate() {
        let mut row = Vec::new();
        // β ≤ α componentwise implies index(β) ≤ index(α)
        for (j, beta) in derivatives_orders[..=k].iter().enumerate() {
            if beta.iter().zip(alpha).any(|(b, a)| b > a) {
                continue;
            }
            let mut coefficient = 1;
            for i in 0..parameters {
                complement[i] = alpha[i] - beta[i];
                coefficient *= binomial[alpha[i]][beta[i]];
            }
            row.push(MultiplicationTerm {
                coefficient,
                lhs_index: j,
                rhs_index: partial_derivative_index(parameters, order, sizes, &complement),
            });
        }
        table.push(combine_similar_terms(row));
    }
    table
}
