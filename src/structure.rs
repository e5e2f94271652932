//! Derivative structures: value and all partial derivatives up to a truncation order.
//!
//! The coefficient at linear index `k` holds `∂^α f` for the multi-index `α` of `k` in the
//! compiler layout (derivatives, not Taylor coefficients). Every operation is a linear pass over
//! the compiled tables of the shared [`DsCompiler`].

use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    sync::Arc,
};

use crate::{
    compiler::{DsCompiler, RebaseTable},
    error::{DsError, Shape},
    numbers::FloatNumber,
    util::pow_nonneg,
};

#[derive(Clone)]
pub struct DerivativeStructure<T> {
    compiler: Arc<DsCompiler>,
    data: Vec<T>,
}

impl<T> DerivativeStructure<T> {
    #[inline]
    fn check_invariants(&self) {
        debug_assert_eq!(self.data.len(), self.compiler.size());
    }

    pub fn compiler(&self) -> &Arc<DsCompiler> {
        &self.compiler
    }

    pub fn free_parameters(&self) -> usize {
        self.compiler.parameters()
    }

    pub fn order(&self) -> usize {
        self.compiler.order()
    }

    pub fn shape(&self) -> Shape {
        self.compiler.shape()
    }

    /// All partial derivatives in the compiler layout, the value first.
    pub fn all_derivatives(&self) -> &[T] {
        self.check_invariants();
        &self.data
    }

    pub fn into_derivatives(self) -> Vec<T> {
        self.check_invariants();
        self.data
    }

    pub fn check_compatibility(&self, other: &Self) -> Result<(), DsError> {
        self.compiler.check_compatibility(&other.compiler)
    }

    /// Panics with the structured error on shape mismatch, used by the operator impls.
    #[inline]
    fn assert_compatible(&self, other: &Self) {
        if let Err(e) = self.check_compatibility(other) {
            panic!("{e}");
        }
    }
}

impl<T: FloatNumber> DerivativeStructure<T> {
    pub(crate) fn from_parts(compiler: Arc<DsCompiler>, data: Vec<T>) -> Self {
        let result = Self { compiler, data };
        result.check_invariants();
        result
    }

    pub fn with_compiler(compiler: Arc<DsCompiler>, data: Vec<T>) -> Result<Self, DsError> {
        if data.len() != compiler.size() {
            return Err(DsError::InvalidShape {
                expected: compiler.size(),
                actual: data.len(),
            });
        }
        Ok(Self::from_parts(compiler, data))
    }

    pub fn constant_with(compiler: Arc<DsCompiler>, value: T) -> Self {
        let mut data = vec![T::zero(); compiler.size()];
        data[0] = value;
        Self::from_parts(compiler, data)
    }

    /// Constant function: value `value`, all derivatives zero.
    pub fn constant(parameters: usize, order: usize, value: T) -> Self {
        Self::constant_with(DsCompiler::get(parameters, order), value)
    }

    /// Free parameter `index` at `value`: first derivative one along itself, zero elsewhere.
    pub fn variable(
        parameters: usize,
        order: usize,
        index: usize,
        value: T,
    ) -> Result<Self, DsError> {
        if index >= parameters {
            return Err(DsError::VariableIndex { index, parameters });
        }
        let mut result = Self::constant(parameters, order, value);
        if order > 0 {
            let mut orders = vec![0; parameters];
            orders[index] = 1;
            let k = result.compiler.index_of_unchecked(&orders);
            result.data[k] = T::one();
        }
        Ok(result)
    }

    /// Structure from all its derivatives in the compiler layout.
    pub fn from_derivatives(parameters: usize, order: usize, data: Vec<T>) -> Result<Self, DsError> {
        Self::with_compiler(DsCompiler::get(parameters, order), data)
    }

    /// Constant with the same shape as `self`.
    pub fn new_constant(&self, value: T) -> Self {
        Self::constant_with(Arc::clone(&self.compiler), value)
    }

    pub(crate) fn with_data(&self, data: Vec<T>) -> Self {
        Self::from_parts(Arc::clone(&self.compiler), data)
    }

    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn value(&self) -> &T {
        &self.data[0]
    }

    pub fn partial_derivative(&self, orders: &[usize]) -> Result<T, DsError> {
        let k = self.compiler.index_of(orders)?;
        Ok(self.data[k].clone())
    }

    /// Overwrites one coefficient, for hand-built expansions.
    pub fn set_derivative(&mut self, k: usize, value: T) -> Result<(), DsError> {
        if k >= self.data.len() {
            return Err(DsError::IndexOutOfRange {
                index: k,
                size: self.data.len(),
            });
        }
        self.data[k] = value;
        Ok(())
    }

    fn add_unchecked(&self, other: &Self) -> Self {
        self.with_data(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a.clone() + b.clone())
                .collect(),
        )
    }

    fn sub_unchecked(&self, other: &Self) -> Self {
        self.with_data(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a.clone() - b.clone())
                .collect(),
        )
    }

    fn mul_unchecked(&self, other: &Self) -> Self {
        self.with_data(multiply(&self.compiler, &self.data, &other.data))
    }

    fn div_unchecked(&self, other: &Self) -> Self {
        self.with_data(divide(&self.compiler, &self.data, &other.data))
    }

    pub fn try_add(&self, other: &Self) -> Result<Self, DsError> {
        self.check_compatibility(other)?;
        Ok(self.add_unchecked(other))
    }

    pub fn try_sub(&self, other: &Self) -> Result<Self, DsError> {
        self.check_compatibility(other)?;
        Ok(self.sub_unchecked(other))
    }

    pub fn try_mul(&self, other: &Self) -> Result<Self, DsError> {
        self.check_compatibility(other)?;
        Ok(self.mul_unchecked(other))
    }

    /// Quotient through the differentiated identity `q * b = a`, solved index by index.
    pub fn try_div(&self, other: &Self) -> Result<Self, DsError> {
        self.check_compatibility(other)?;
        Ok(self.div_unchecked(other))
    }

    pub fn add_scalar(&self, a: T) -> Self {
        let mut result = self.clone();
        result.data[0] += a;
        result
    }

    pub fn sub_scalar(&self, a: T) -> Self {
        self.add_scalar(-a)
    }

    pub fn mul_scalar(&self, a: &T) -> Self {
        self.with_data(self.data.iter().map(|x| x.clone() * a.clone()).collect())
    }

    pub fn mul_int(&self, n: i64) -> Self {
        self.mul_scalar(&T::from_i64(n))
    }

    pub fn div_scalar(&self, a: &T) -> Self {
        self.with_data(self.data.iter().map(|x| x.clone() / a.clone()).collect())
    }

    pub fn negate(&self) -> Self {
        self.with_data(self.data.iter().map(|x| -x.clone()).collect())
    }

    /// Applies a univariate function given by its value and derivatives
    /// `f(x₀), f'(x₀), ..., f⁽ⁿ⁾(x₀)` at the value `x₀` of this structure.
    pub fn compose(&self, f: &[T]) -> Result<Self, DsError> {
        if f.len() != self.order() + 1 {
            return Err(DsError::DimensionMismatch {
                expected: self.order() + 1,
                actual: f.len(),
            });
        }
        Ok(self.compose_unchecked(f))
    }

    pub(crate) fn compose_unchecked(&self, f: &[T]) -> Self {
        self.with_data(compose(&self.compiler, &self.data, f))
    }

    /// Re-expresses this structure, a function of its own free parameters `p`, as a function of
    /// the free parameters of the inner structures, given `p` as such functions.
    pub fn rebase(&self, p: &[Self]) -> Result<Self, DsError> {
        if p.len() != self.free_parameters() {
            return Err(DsError::DimensionMismatch {
                expected: self.free_parameters(),
                actual: p.len(),
            });
        }
        let Some(first) = p.first() else {
            return Err(DsError::EmptyInput);
        };
        for pi in &p[1..] {
            first.check_compatibility(pi)?;
        }
        let table = self.compiler.rebaser(&first.compiler)?;
        let flat = p.iter().flat_map(|pi| pi.data.iter().cloned()).collect::<Vec<_>>();
        Ok(Self::from_parts(
            Arc::clone(&first.compiler),
            rebase(&table, &self.data, &flat),
        ))
    }

    /// Evaluates the truncated Taylor expansion at the offset `delta` from the expansion point.
    pub fn taylor(&self, delta: &[T]) -> Result<T, DsError> {
        if delta.len() != self.free_parameters() {
            return Err(DsError::DimensionMismatch {
                expected: self.free_parameters(),
                actual: delta.len(),
            });
        }
        // 1 / k! for k = 0..=order
        let mut inverse_factorials = vec![T::one()];
        for k in 1..=self.order() as u64 {
            let previous = inverse_factorials[inverse_factorials.len() - 1].clone();
            inverse_factorials.push(previous / T::from(k));
        }
        let mut value = T::zero();
        for k in (0..self.data.len()).rev() {
            let mut term = self.data[k].clone();
            for (d, &o) in delta.iter().zip(self.compiler.multi_index(k)) {
                if o > 0 {
                    term *= pow_nonneg(d.clone(), o as u32) * inverse_factorials[o].clone();
                }
            }
            value += term;
        }
        Ok(value)
    }

    /// `Σ a_i b_i`
    pub fn linear_combination(a: &[T], b: &[Self]) -> Result<Self, DsError> {
        if a.len() != b.len() {
            return Err(DsError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        let Some(first) = b.first() else {
            return Err(DsError::EmptyInput);
        };
        let mut data = vec![T::zero(); first.data.len()];
        for (ai, bi) in a.iter().zip(b) {
            first.check_compatibility(bi)?;
            for (d, x) in data.iter_mut().zip(&bi.data) {
                *d += ai.clone() * x.clone();
            }
        }
        Ok(first.with_data(data))
    }

    /// `Σ a_i b_i` with structure factors on both sides.
    pub fn linear_combination_ds(a: &[Self], b: &[Self]) -> Result<Self, DsError> {
        if a.len() != b.len() {
            return Err(DsError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        let Some(first) = a.first() else {
            return Err(DsError::EmptyInput);
        };
        let mut result = first.new_constant(T::zero());
        for (ai, bi) in a.iter().zip(b) {
            result = result.try_add(&ai.try_mul(bi)?)?;
        }
        Ok(result)
    }

    /// Integrates `integration_order` times along free parameter `var`.
    ///
    /// Entries pushed past the truncation order are lost and constants of integration are zero.
    /// A negative order differentiates instead.
    pub fn integrate(&self, var: usize, integration_order: i32) -> Result<Self, DsError> {
        self.check_variable(var)?;
        let shift = integration_order.unsigned_abs() as usize;
        Ok(if integration_order < 0 {
            self.shift_down(var, shift)
        } else {
            self.shift_up(var, shift)
        })
    }

    /// Differentiates `differentiation_order` times along free parameter `var`.
    ///
    /// The highest orders of the result are zero since they are not known. A negative order
    /// integrates instead.
    pub fn differentiate(&self, var: usize, differentiation_order: i32) -> Result<Self, DsError> {
        self.check_variable(var)?;
        let shift = differentiation_order.unsigned_abs() as usize;
        Ok(if differentiation_order < 0 {
            self.shift_up(var, shift)
        } else {
            self.shift_down(var, shift)
        })
    }

    fn shift_up(&self, var: usize, shift: usize) -> Self {
        if shift == 0 {
            return self.clone();
        } else if shift > self.order() {
            return self.new_constant(T::zero());
        }
        let mut data = vec![T::zero(); self.data.len()];
        for (k, x) in self.data.iter().enumerate() {
            if x.is_zero() || self.compiler.orders_sum(k) + shift > self.order() {
                continue;
            }
            let mut orders = self.compiler.multi_index(k).to_vec();
            orders[var] += shift;
            data[self.compiler.index_of_unchecked(&orders)] = x.clone();
        }
        self.with_data(data)
    }

    fn shift_down(&self, var: usize, shift: usize) -> Self {
        if shift == 0 {
            return self.clone();
        } else if shift > self.order() {
            return self.new_constant(T::zero());
        }
        let mut data = vec![T::zero(); self.data.len()];
        for (k, x) in self.data.iter().enumerate() {
            let mut orders = self.compiler.multi_index(k).to_vec();
            if x.is_zero() || orders[var] < shift {
                continue;
            }
            orders[var] -= shift;
            data[self.compiler.index_of_unchecked(&orders)] = x.clone();
        }
        self.with_data(data)
    }

    fn check_variable(&self, var: usize) -> Result<(), DsError> {
        if var < self.free_parameters() {
            Ok(())
        } else {
            Err(DsError::VariableIndex {
                index: var,
                parameters: self.free_parameters(),
            })
        }
    }
}

pub(crate) fn multiply<T: FloatNumber>(compiler: &DsCompiler, lhs: &[T], rhs: &[T]) -> Vec<T> {
    (0..compiler.size())
        .map(|k| {
            let mut r = T::zero();
            for term in compiler.multiplication_terms(k) {
                r += T::from(term.coefficient())
                    * (lhs[term.lhs_index()].clone() * rhs[term.rhs_index()].clone());
            }
            r
        })
        .collect()
}

/// Solves `q * rhs = lhs` index by index: every term of the product rule except `q[k] * rhs[0]`
/// only involves lower indices of `q`.
pub(crate) fn divide<T: FloatNumber>(compiler: &DsCompiler, lhs: &[T], rhs: &[T]) -> Vec<T> {
    let mut result: Vec<T> = Vec::with_capacity(lhs.len());
    for (k, l) in lhs.iter().enumerate() {
        let mut r = l.clone();
        for term in compiler.multiplication_terms(k) {
            if term.lhs_index() == k {
                continue;
            }
            r -= T::from(term.coefficient())
                * (result[term.lhs_index()].clone() * rhs[term.rhs_index()].clone());
        }
        result.push(r / rhs[0].clone());
    }
    result
}

pub(crate) fn compose<T: FloatNumber>(compiler: &DsCompiler, operand: &[T], f: &[T]) -> Vec<T> {
    (0..compiler.size())
        .map(|k| {
            let mut r = T::zero();
            for term in compiler.composition_terms(k) {
                let mut product = T::from(term.coefficient()) * f[term.f_index()].clone();
                for &j in term.ds_indices() {
                    product *= operand[j].clone();
                }
                r += product;
            }
            r
        })
        .collect()
}

pub(crate) fn rebase<T: FloatNumber>(table: &RebaseTable, ds: &[T], p: &[T]) -> Vec<T> {
    (0..table.len())
        .map(|k| {
            let mut r = T::zero();
            for term in table.terms(k) {
                let mut product = T::from(term.coefficient()) * ds[term.ds_index()].clone();
                for &j in term.product_indices() {
                    product *= p[j].clone();
                }
                r += product;
            }
            r
        })
        .collect()
}

impl<T: PartialEq> PartialEq for DerivativeStructure<T> {
    fn eq(&self, other: &Self) -> bool {
        self.compiler.shape() == other.compiler.shape() && self.data == other.data
    }
}

impl<T: Display> Debug for DerivativeStructure<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DerivativeStructure({}, {}, {self})",
            self.compiler.parameters(),
            self.compiler.order()
        )
    }
}

impl<T: Display> Display for DerivativeStructure<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, x) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{x}")?;
        }
        write!(f, "]")
    }
}

impl<T: FloatNumber> Neg for DerivativeStructure<T> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl<T: FloatNumber> Add for DerivativeStructure<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.assert_compatible(&rhs);
        self.add_unchecked(&rhs)
    }
}

impl<T: FloatNumber> AddAssign for DerivativeStructure<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.assert_compatible(&rhs);
        for (a, b) in self.data.iter_mut().zip(rhs.data) {
            *a += b;
        }
    }
}

impl<T: FloatNumber> Sub for DerivativeStructure<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.assert_compatible(&rhs);
        self.sub_unchecked(&rhs)
    }
}

impl<T: FloatNumber> SubAssign for DerivativeStructure<T> {
    fn sub_assign(&mut self, rhs: Self) {
        self.assert_compatible(&rhs);
        for (a, b) in self.data.iter_mut().zip(rhs.data) {
            *a -= b;
        }
    }
}

impl<T: FloatNumber> Mul for DerivativeStructure<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.assert_compatible(&rhs);
        self.mul_unchecked(&rhs)
    }
}

impl<T: FloatNumber> MulAssign for DerivativeStructure<T> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.clone() * rhs;
    }
}

impl<T: FloatNumber> Div for DerivativeStructure<T> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        self.assert_compatible(&rhs);
        self.div_unchecked(&rhs)
    }
}

impl<T: FloatNumber> DivAssign for DerivativeStructure<T> {
    fn div_assign(&mut self, rhs: Self) {
        *self = self.clone() / rhs;
    }
}

#[cfg(test)]
use rand::{rngs::StdRng, Rng, SeedableRng};

#[cfg(test)]
use crate::numbers::F64;

#[cfg(test)]
pub(crate) fn random_structure(
    rng: &mut StdRng,
    parameters: usize,
    order: usize,
) -> DerivativeStructure<F64> {
    let size = DsCompiler::get(parameters, order).size();
    let data = (0..size)
        .map(|_| F64::from(rng.gen_range(-1.0..1.0)))
        .collect();
    DerivativeStructure::from_derivatives(parameters, order, data).unwrap()
}

#[test]
fn test_constant_and_variable() {
    let c = DerivativeStructure::constant(2, 2, F64::from(3.0));
    assert_eq!(c.all_derivatives(), &[3.0, 0.0, 0.0, 0.0, 0.0, 0.0].map(F64::from));
    let y = DerivativeStructure::variable(2, 2, 1, F64::from(-1.5)).unwrap();
    assert_eq!(y.partial_derivative(&[0, 1]).unwrap(), F64::from(1.0));
    assert_eq!(y.partial_derivative(&[1, 0]).unwrap(), F64::from(0.0));
    assert_eq!(*y.value(), F64::from(-1.5));
    assert_eq!(
        DerivativeStructure::variable(2, 2, 2, F64::from(0.0)),
        Err(DsError::VariableIndex {
            index: 2,
            parameters: 2
        })
    );
    let x0 = DerivativeStructure::variable(1, 0, 0, F64::from(2.0)).unwrap();
    assert_eq!(x0.all_derivatives(), &[F64::from(2.0)]);
}

#[test]
fn test_from_derivatives_checks_length() {
    assert_eq!(
        DerivativeStructure::from_derivatives(2, 2, vec![F64::from(1.0); 5]),
        Err(DsError::InvalidShape {
            expected: 6,
            actual: 5
        })
    );
}

#[test]
fn test_incompatible_operands() {
    let a = DerivativeStructure::constant(2, 2, F64::from(1.0));
    let b = DerivativeStructure::constant(2, 3, F64::from(1.0));
    assert_eq!(
        a.try_add(&b),
        Err(DsError::IncompatibleOperands {
            expected: Shape {
                parameters: 2,
                order: 2
            },
            actual: Shape {
                parameters: 2,
                order: 3
            }
        })
    );
    assert!(a.try_mul(&b).is_err());
    assert!(a.try_div(&b).is_err());
}

#[test]
#[should_panic(expected = "incompatible operands")]
fn test_operator_panics_on_incompatible_operands() {
    let a = DerivativeStructure::constant(1, 2, F64::from(1.0));
    let b = DerivativeStructure::constant(2, 2, F64::from(1.0));
    let _ = a * b;
}

#[test]
fn test_product_of_variables() {
    // f = x y at (2, 3)
    let x = DerivativeStructure::variable(2, 2, 0, F64::from(2.0)).unwrap();
    let y = DerivativeStructure::variable(2, 2, 1, F64::from(3.0)).unwrap();
    let f = x * y;
    // [f, f_x, f_xx, f_y, f_xy, f_yy]
    assert_eq!(f.all_derivatives(), &[6.0, 3.0, 0.0, 2.0, 1.0, 0.0].map(F64::from));
}

#[test]
fn test_square_one_variable() {
    // x² at x = 3: [9, 6, 2, 0]
    let x = DerivativeStructure::variable(1, 3, 0, F64::from(3.0)).unwrap();
    let square = x.clone() * x;
    assert_eq!(square.all_derivatives(), &[9.0, 6.0, 2.0, 0.0].map(F64::from));
}

#[test]
fn test_divide_matches_multiply_by_reciprocal() {
    let mut rng = StdRng::seed_from_u64(0);
    for (p, n) in [(1, 5), (2, 3), (3, 3)] {
        let a = random_structure(&mut rng, p, n);
        let b = random_structure(&mut rng, p, n).add_scalar(F64::from(3.0));
        let quotient = a.try_div(&b).unwrap();
        let product = a.try_mul(&b.reciprocal()).unwrap();
        crate::assert_all_close!(
            quotient.all_derivatives(),
            product.all_derivatives(),
            &F64::from(1e-12),
            &F64::from(1e-12)
        );
        // q * b = a
        let back = quotient * b;
        crate::assert_all_close!(
            back.all_derivatives(),
            a.all_derivatives(),
            &F64::from(1e-12),
            &F64::from(1e-12)
        );
    }
}

#[test]
fn test_sqrt_squares_back() {
    let mut rng = StdRng::seed_from_u64(1);
    let a = random_structure(&mut rng, 2, 4).add_scalar(F64::from(2.0));
    let s = a.sqrt();
    let square = s.clone() * s;
    crate::assert_all_close!(
        square.all_derivatives(),
        a.all_derivatives(),
        &F64::from(1e-12),
        &F64::from(1e-12)
    );
}

#[test]
fn test_integrate_then_differentiate() {
    let mut rng = StdRng::seed_from_u64(2);
    let n = 7;
    let a = random_structure(&mut rng, 3, n);
    for var in 0..3 {
        for k in 0..=n as i32 {
            let integrated = a.integrate(var, k).unwrap();
            let back = integrated.differentiate(var, k).unwrap();
            // entries whose total order would exceed n after integration are lost
            for i in 0..a.all_derivatives().len() {
                let expected = if a.compiler().orders_sum(i) + k as usize <= n {
                    a.all_derivatives()[i]
                } else {
                    F64::from(0.0)
                };
                assert_eq!(back.all_derivatives()[i], expected);
            }
            // differentiating with a negative order integrates
            assert_eq!(a.differentiate(var, -k).unwrap(), integrated);
        }
        assert_eq!(a.integrate(var, 0).unwrap(), a);
        assert_eq!(a.differentiate(var, 0).unwrap(), a);
        assert_eq!(
            a.integrate(var, n as i32 + 1).unwrap(),
            a.new_constant(F64::from(0.0))
        );
    }
    assert_eq!(
        a.integrate(3, 1),
        Err(DsError::VariableIndex {
            index: 3,
            parameters: 3
        })
    );
}

#[test]
fn test_integrate_extreme_orders() {
    let mut rng = StdRng::seed_from_u64(6);
    let a = random_structure(&mut rng, 2, 3);
    let zero = a.new_constant(F64::from(0.0));
    for order in [i32::MIN, i32::MIN + 1, -4, 4, i32::MAX] {
        assert_eq!(a.integrate(1, order).unwrap(), zero);
        assert_eq!(a.differentiate(1, order).unwrap(), zero);
    }
}

#[test]
fn test_differentiate_univariate() {
    // sin at x = 0.3, order 25, with the value and the highest derivative zeroed
    let n = 25;
    let x = DerivativeStructure::variable(1, n, 0, F64::from(0.3)).unwrap();
    let mut s = x.sin();
    s.set_derivative(0, F64::from(0.0)).unwrap();
    s.set_derivative(n, F64::from(0.0)).unwrap();
    let back = s.differentiate(0, 1).unwrap().integrate(0, 1).unwrap();
    assert_eq!(back, s);
}

#[test]
fn test_set_derivative_out_of_range() {
    let mut c = DerivativeStructure::constant(1, 1, F64::from(1.0));
    assert_eq!(
        c.set_derivative(2, F64::from(0.0)),
        Err(DsError::IndexOutOfRange { index: 2, size: 2 })
    );
}

#[test]
fn test_taylor_evaluation() {
    // exact for a polynomial of degree ≤ order: f = 1 + 2x + 3y + x y + x²
    let x = DerivativeStructure::variable(2, 2, 0, F64::from(0.5)).unwrap();
    let y = DerivativeStructure::variable(2, 2, 1, F64::from(-0.25)).unwrap();
    let poly = |x: F64, y: F64| {
        F64::from(1.0) + F64::from(2.0) * x + F64::from(3.0) * y + x * y + x * x
    };
    let f = x.mul_int(2).add_scalar(F64::from(1.0))
        + y.mul_int(3)
        + x.clone() * y.clone()
        + x.clone() * x.clone();
    for (dx, dy) in [(0.1, 0.2), (-0.3, 0.05), (0.0, 0.0)] {
        let value = f.taylor(&[F64::from(dx), F64::from(dy)]).unwrap();
        let expected = poly(F64::from(0.5 + dx), F64::from(-0.25 + dy));
        crate::assert_close!(value, expected, F64::from(1e-14), F64::from(1e-14));
    }
    assert!(f.taylor(&[F64::from(0.0)]).is_err());
}

#[test]
fn test_linear_combination() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random_structure(&mut rng, 2, 3);
    let b = random_structure(&mut rng, 2, 3);
    let combined = DerivativeStructure::linear_combination(
        &[F64::from(2.0), F64::from(-3.0)],
        &[a.clone(), b.clone()],
    )
    .unwrap();
    let expected = a.mul_int(2) - b.mul_int(3);
    crate::assert_all_close!(combined.all_derivatives(), expected.all_derivatives());
    let combined_ds =
        DerivativeStructure::linear_combination_ds(&[a.clone(), b.clone()], &[b.clone(), a.clone()])
            .unwrap();
    let expected = (a.clone() * b.clone()).mul_int(2);
    crate::assert_all_close!(combined_ds.all_derivatives(), expected.all_derivatives());
    assert_eq!(
        DerivativeStructure::<F64>::linear_combination(&[], &[]),
        Err(DsError::EmptyInput)
    );
}

#[test]
fn test_compose_checks_length() {
    let x = DerivativeStructure::variable(1, 2, 0, F64::from(1.0)).unwrap();
    assert_eq!(
        x.compose(&[F64::from(1.0)]),
        Err(DsError::DimensionMismatch {
            expected: 3,
            actual: 1
        })
    );
}

#[test]
fn test_rebase_identity() {
    // rebasing on the variables themselves changes nothing
    let mut rng = StdRng::seed_from_u64(4);
    let f = random_structure(&mut rng, 3, 4);
    let variables = (0..3)
        .map(|i| DerivativeStructure::variable(3, 4, i, F64::from(0.1 * i as f64)).unwrap())
        .collect::<Vec<_>>();
    let rebased = f.rebase(&variables).unwrap();
    crate::assert_all_close!(rebased.all_derivatives(), f.all_derivatives());
}

#[test]
fn test_rebase_matches_direct_computation() {
    // f(p0, p1) = p0 * sin(p1), p0 = q0 + q1², p1 = q0 q1
    let order = 3;
    let q0 = DerivativeStructure::variable(2, order, 0, F64::from(0.7)).unwrap();
    let q1 = DerivativeStructure::variable(2, order, 1, F64::from(-0.4)).unwrap();
    let p0 = q0.clone() + q1.clone() * q1.clone();
    let p1 = q0 * q1;
    let direct = p0.clone() * p1.sin();

    let u0 = DerivativeStructure::variable(2, order, 0, *p0.value()).unwrap();
    let u1 = DerivativeStructure::variable(2, order, 1, *p1.value()).unwrap();
    let f = u0 * u1.sin();
    let rebased = f.rebase(&[p0, p1]).unwrap();
    crate::assert_all_close!(
        rebased.all_derivatives(),
        direct.all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
}

#[test]
fn test_rebase_to_fewer_parameters() {
    // f(p0, p1, p2) = p0 p1 + p2 with all p functions of a single q
    let order = 4;
    let q = DerivativeStructure::variable(1, order, 0, F64::from(0.3)).unwrap();
    let p = vec![q.exp(), q.sin(), q.clone() * q.clone()];
    let vars = (0..3)
        .map(|i| DerivativeStructure::variable(3, order, i, *p[i].value()).unwrap())
        .collect::<Vec<_>>();
    let f = vars[0].clone() * vars[1].clone() + vars[2].clone();
    let rebased = f.rebase(&p).unwrap();
    let direct = p[0].clone() * p[1].clone() + p[2].clone();
    assert_eq!(rebased.free_parameters(), 1);
    crate::assert_all_close!(
        rebased.all_derivatives(),
        direct.all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
}

#[test]
fn test_rebase_errors() {
    let f = DerivativeStructure::constant(2, 2, F64::from(1.0));
    let p = DerivativeStructure::constant(3, 2, F64::from(1.0));
    assert_eq!(
        f.rebase(&[p.clone()]),
        Err(DsError::DimensionMismatch {
            expected: 2,
            actual: 1
        })
    );
    let q = DerivativeStructure::constant(3, 1, F64::from(1.0));
    assert!(f.rebase(&[p.clone(), q]).is_err());
    let r = DerivativeStructure::constant(3, 3, F64::from(1.0));
    assert!(f.rebase(&[r.clone(), r]).is_err());
}
