//! Elementary functions of derivative structures.
//!
//! Each univariate function fills the array `f(x₀), f'(x₀), ..., f⁽ⁿ⁾(x₀)` at the value of the
//! operand and applies the composition table. The functions with long derivative sequences
//! (`tan`, the inverse trigonometric and hyperbolic functions) track their derivatives as
//! `P_k(x) / (1 ± x²)^(k - 1/2)` with polynomial recurrences on `P_k`, which only keep the
//! coefficients of one parity.

use crate::{
    error::DsError,
    numbers::FloatNumber,
    structure::DerivativeStructure,
};

pub(crate) fn exp_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    vec![x.exp(); order + 1]
}

pub(crate) fn exp_m1_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let mut function = exp_derivatives(x, order);
    function[0] = x.exp_m1();
    function
}

/// Logarithm derivatives `f⁽ⁱ⁾ = first * (-1)^(i-1) (i-1)! inv^(i-1)`.
fn log_like_derivatives<T: FloatNumber>(value: T, inv: T, first: T, order: usize) -> Vec<T> {
    let mut function = vec![T::zero(); order + 1];
    function[0] = value;
    let mut xk = first;
    for (i, f) in function.iter_mut().enumerate().skip(1) {
        *f = xk.clone();
        xk *= T::from_i64(-(i as i64)) * inv.clone();
    }
    function
}

pub(crate) fn ln_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let inv = T::one() / x.clone();
    log_like_derivatives(x.ln(), inv.clone(), inv, order)
}

pub(crate) fn ln_1p_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let inv = T::one() / (T::one() + x.clone());
    log_like_derivatives(x.ln_1p(), inv.clone(), inv, order)
}

pub(crate) fn log10_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let inv = T::one() / x.clone();
    let first = inv.clone() / T::from(10u64).ln();
    log_like_derivatives(x.log10(), inv, first, order)
}

/// `f⁽ⁱ⁾ = sign * f⁽ⁱ⁻²⁾`: `-1` for `sin` and `cos`, `+1` for `sinh` and `cosh`.
fn periodic_derivatives<T: FloatNumber>(f0: T, f1: T, sign: i64, order: usize) -> Vec<T> {
    let mut function = Vec::with_capacity(order + 1);
    function.push(f0);
    if order > 0 {
        function.push(f1);
    }
    for i in 2..=order {
        let next = T::from_i64(sign) * function[i - 2].clone();
        function.push(next);
    }
    function
}

pub(crate) fn sin_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    periodic_derivatives(x.sin(), x.cos(), -1, order)
}

pub(crate) fn cos_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    periodic_derivatives(x.cos(), -x.sin(), -1, order)
}

pub(crate) fn sinh_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    periodic_derivatives(x.sinh(), x.cosh(), 1, order)
}

pub(crate) fn cosh_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    periodic_derivatives(x.cosh(), x.sinh(), 1, order)
}

/// Derivatives of `tan` (`sign = 1`) or `tanh` (`sign = -1`) as polynomials in `t = f(x)`:
/// `f⁽ⁿ⁾ = P_n(t)` with `P_1 = 1 ± t²`.
fn tangent_derivatives<T: FloatNumber>(t: T, sign: i64, order: usize) -> Vec<T> {
    let mut function = vec![T::zero(); order + 1];
    function[0] = t.clone();
    if order == 0 {
        return function;
    }
    let mut p = vec![T::zero(); order + 2];
    p[1] = T::one();
    let t2 = t.clone() * t.clone();
    for n in 1..=order {
        let mut v = T::zero();
        p[n + 1] = T::from_i64(sign * n as i64) * p[n].clone();
        for k in (0..=n + 1).rev().step_by(2) {
            v = v * t2.clone() + p[k].clone();
            if k > 2 {
                p[k - 2] = T::from_i64(k as i64 - 1) * p[k - 1].clone()
                    + T::from_i64(sign * (k as i64 - 3)) * p[k - 3].clone();
            } else if k == 2 {
                p[0] = p[1].clone();
            }
        }
        if n % 2 == 0 {
            v *= t.clone();
        }
        function[n] = v;
    }
    function
}

pub(crate) fn tan_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    tangent_derivatives(x.tan(), 1, order)
}

pub(crate) fn tanh_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    tangent_derivatives(x.tanh(), -1, order)
}

/// Recurrence of the numerator polynomials of an inverse function:
/// `f⁽ⁿ⁾ = coeff_n * P_n(x)` with `coeff_n = coeff_1 * base^(n-1)`.
struct InverseRecurrence {
    /// Constant coefficient of `P_1`.
    first: i64,
    /// Factor from the highest coefficient of `P_{n-1}` to that of `P_n`.
    leading: fn(i64) -> i64,
    /// Factors of `p[k-1]` and `p[k-3]` in the new coefficient `p[k-2]`.
    inner: fn(i64, i64) -> (i64, i64),
    /// Sign of the constant coefficient copied from the linear one.
    low_sign: i64,
}

const ASIN: InverseRecurrence = InverseRecurrence {
    first: 1,
    leading: |n| n - 1,
    inner: |k, n| (k - 1, 2 * n - k),
    low_sign: 1,
};

const ACOS: InverseRecurrence = InverseRecurrence { first: -1, ..ASIN };

const ATAN: InverseRecurrence = InverseRecurrence {
    first: 1,
    leading: |n| -n,
    inner: |k, n| (k - 1, k - 1 - 2 * n),
    low_sign: 1,
};

const ACOSH: InverseRecurrence = InverseRecurrence {
    first: 1,
    leading: |n| 1 - n,
    inner: |k, n| (1 - k, k - 2 * n),
    low_sign: -1,
};

const ASINH: InverseRecurrence = InverseRecurrence {
    first: 1,
    leading: |n| 1 - n,
    inner: |k, n| (k - 1, k - 2 * n),
    low_sign: 1,
};

const ATANH: InverseRecurrence = InverseRecurrence {
    first: 1,
    leading: |n| n,
    inner: |k, n| (k - 1, 2 * n - k + 1),
    low_sign: 1,
};

fn inverse_derivatives<T: FloatNumber>(
    value: T,
    x: &T,
    base: T,
    first_coeff: T,
    recurrence: &InverseRecurrence,
    order: usize,
) -> Vec<T> {
    let mut function = vec![T::zero(); order + 1];
    function[0] = value;
    if order == 0 {
        return function;
    }
    let mut p = vec![T::zero(); order];
    p[0] = T::from_i64(recurrence.first);
    let x2 = x.clone() * x.clone();
    let mut coeff = first_coeff;
    function[1] = coeff.clone() * p[0].clone();
    for n in 2..=order {
        let mut v = T::zero();
        p[n - 1] = T::from_i64((recurrence.leading)(n as i64)) * p[n - 2].clone();
        for k in (0..n).rev().step_by(2) {
            v = v * x2.clone() + p[k].clone();
            if k > 2 {
                let (a, b) = (recurrence.inner)(k as i64, n as i64);
                p[k - 2] = T::from_i64(a) * p[k - 1].clone() + T::from_i64(b) * p[k - 3].clone();
            } else if k == 2 {
                p[0] = T::from_i64(recurrence.low_sign) * p[1].clone();
            }
        }
        if n % 2 == 0 {
            v *= x.clone();
        }
        coeff *= base.clone();
        function[n] = coeff.clone() * v;
    }
    function
}

pub(crate) fn asin_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let base = T::one() / (T::one() - x.clone() * x.clone());
    inverse_derivatives(x.asin(), x, base.clone(), base.sqrt(), &ASIN, order)
}

pub(crate) fn acos_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let base = T::one() / (T::one() - x.clone() * x.clone());
    inverse_derivatives(x.acos(), x, base.clone(), base.sqrt(), &ACOS, order)
}

pub(crate) fn atan_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let base = T::one() / (T::one() + x.clone() * x.clone());
    inverse_derivatives(x.atan(), x, base.clone(), base, &ATAN, order)
}

pub(crate) fn acosh_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let base = T::one() / (x.clone() * x.clone() - T::one());
    inverse_derivatives(x.acosh(), x, base.clone(), base.sqrt(), &ACOSH, order)
}

pub(crate) fn asinh_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let base = T::one() / (T::one() + x.clone() * x.clone());
    inverse_derivatives(x.asinh(), x, base.clone(), base.sqrt(), &ASINH, order)
}

pub(crate) fn atanh_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let base = T::one() / (T::one() - x.clone() * x.clone());
    inverse_derivatives(x.atanh(), x, base.clone(), base, &ATANH, order)
}

/// `f⁽ⁱ⁾ = (-1)^i i! / x^(i+1)`
pub(crate) fn reciprocal_derivatives<T: FloatNumber>(x: &T, order: usize) -> Vec<T> {
    let inv = T::one() / x.clone();
    let mut function = Vec::with_capacity(order + 1);
    function.push(inv.clone());
    for i in 1..=order {
        let next = function[i - 1].clone() * T::from_i64(-(i as i64)) * inv.clone();
        function.push(next);
    }
    function
}

/// Multiplies `f⁽ⁱ⁾` by the falling factorial `p (p - 1) ... (p - i + 1)`.
fn apply_falling_factorial<T: FloatNumber>(function: &mut [T], p: &T) {
    let mut coefficient = p.clone();
    for (i, f) in function.iter_mut().enumerate().skip(1) {
        *f *= coefficient.clone();
        coefficient *= p.clone() - T::from(i as u64);
    }
}

pub(crate) fn pow_int_derivatives<T: FloatNumber>(x: &T, n: i32, order: usize) -> Vec<T> {
    let mut function = vec![T::zero(); order + 1];
    if n == 0 {
        function[0] = T::one();
        return function;
    }
    if n > 0 {
        // derivatives beyond the polynomial degree vanish
        let max_order = order.min(n as usize);
        let mut xk = x.powi(n - max_order as i32);
        for f in function[1..=max_order].iter_mut().rev() {
            *f = xk.clone();
            xk *= x.clone();
        }
        function[0] = xk;
    } else {
        let inv = T::one() / x.clone();
        let mut xk = inv.powi(-n);
        for f in &mut function {
            *f = xk.clone();
            xk *= inv.clone();
        }
    }
    apply_falling_factorial(&mut function, &T::from_i64(i64::from(n)));
    function
}

pub(crate) fn pow_real_derivatives<T: FloatNumber>(x: &T, p: &T, order: usize) -> Vec<T> {
    let mut function = vec![T::zero(); order + 1];
    if p.is_zero() {
        function[0] = T::one();
        return function;
    }
    if x.is_zero() {
        return function;
    }
    let mut xk = x.powf(&(p.clone() - T::from(order as u64)));
    for f in function[1..].iter_mut().rev() {
        *f = xk.clone();
        xk *= x.clone();
    }
    function[0] = xk;
    apply_falling_factorial(&mut function, p);
    function
}

/// Derivatives of `a^x` with respect to `x`.
pub(crate) fn scalar_pow_derivatives<T: FloatNumber>(a: &T, x: &T, order: usize) -> Vec<T> {
    let mut function = vec![T::zero(); order + 1];
    if a.is_zero() {
        if x.is_zero() {
            function[0] = T::one();
            let mut infinity = T::infinity();
            for f in function.iter_mut().skip(1) {
                infinity = -infinity;
                *f = infinity.clone();
            }
        } else if *x < T::zero() {
            function.fill(T::nan());
        }
        return function;
    }
    function[0] = a.powf(x);
    let ln_a = a.ln();
    for i in 1..=order {
        function[i] = ln_a.clone() * function[i - 1].clone();
    }
    function
}

pub(crate) fn root_n_derivatives<T: FloatNumber>(x: &T, n: i32, order: usize) -> Vec<T> {
    let mut function = vec![T::zero(); order + 1];
    let mut xk = match n {
        2 => {
            function[0] = x.sqrt();
            T::from(0.5) / function[0].clone()
        }
        3 => {
            function[0] = x.cbrt();
            T::one() / (T::from(3u64) * function[0].clone() * function[0].clone())
        }
        _ => {
            function[0] = x.powf(&(T::one() / T::from_i64(i64::from(n))));
            T::one() / (T::from_i64(i64::from(n)) * function[0].powi(n - 1))
        }
    };
    let n_reciprocal = T::one() / T::from_i64(i64::from(n));
    let x_reciprocal = T::one() / x.clone();
    for (i, f) in function.iter_mut().enumerate().skip(1) {
        *f = xk.clone();
        xk *= x_reciprocal.clone() * (n_reciprocal.clone() - T::from(i as u64));
    }
    function
}

macro_rules! univariate {
    ($(#[$attr:meta])* $name:ident, $derivatives:ident) => {
        $(#[$attr])*
        pub fn $name(&self) -> Self {
            self.compose_unchecked(&$derivatives(self.value(), self.order()))
        }
    };
}

impl<T: FloatNumber> DerivativeStructure<T> {
    univariate!(exp, exp_derivatives);
    univariate!(
        /// `exp(x) - 1`, accurate near zero.
        exp_m1,
        exp_m1_derivatives
    );
    univariate!(ln, ln_derivatives);
    univariate!(
        /// `ln(1 + x)`, accurate near zero.
        ln_1p,
        ln_1p_derivatives
    );
    univariate!(log10, log10_derivatives);
    univariate!(sin, sin_derivatives);
    univariate!(cos, cos_derivatives);
    univariate!(tan, tan_derivatives);
    univariate!(asin, asin_derivatives);
    univariate!(acos, acos_derivatives);
    univariate!(atan, atan_derivatives);
    univariate!(sinh, sinh_derivatives);
    univariate!(cosh, cosh_derivatives);
    univariate!(tanh, tanh_derivatives);
    univariate!(asinh, asinh_derivatives);
    univariate!(acosh, acosh_derivatives);
    univariate!(atanh, atanh_derivatives);
    univariate!(
        /// `1 / x` through the closed form of its derivatives.
        reciprocal,
        reciprocal_derivatives
    );

    pub fn sin_cos(&self) -> (Self, Self) {
        (self.sin(), self.cos())
    }

    pub fn sinh_cosh(&self) -> (Self, Self) {
        (self.sinh(), self.cosh())
    }

    pub fn sqrt(&self) -> Self {
        self.root_n(2)
    }

    pub fn cbrt(&self) -> Self {
        self.root_n(3)
    }

    /// `n`-th root.
    pub fn root_n(&self, n: i32) -> Self {
        self.compose_unchecked(&root_n_derivatives(self.value(), n, self.order()))
    }

    pub fn pow_int(&self, n: i32) -> Self {
        self.compose_unchecked(&pow_int_derivatives(self.value(), n, self.order()))
    }

    pub fn pow_real(&self, p: &T) -> Self {
        self.compose_unchecked(&pow_real_derivatives(self.value(), p, self.order()))
    }

    /// `a^self` for a constant base.
    pub fn scalar_pow(a: &T, x: &Self) -> Self {
        x.compose_unchecked(&scalar_pow_derivatives(a, x.value(), x.order()))
    }

    /// `self^e = exp(e ln(self))`
    pub fn try_pow(&self, e: &Self) -> Result<Self, DsError> {
        Ok(e.try_mul(&self.ln())?.exp())
    }

    /// `atan(self / x)` with the quadrant of `(x, self)`.
    pub fn try_atan2(&self, x: &Self) -> Result<Self, DsError> {
        self.check_compatibility(x)?;
        let y = self;
        let r = (x.clone() * x.clone() + y.clone() * y.clone()).root_n(2);
        let x0 = x.value().clone();
        let mut result = if x0 >= T::zero() {
            // atan2(y, x) = 2 atan(y / (r + x))
            (y.clone() / (r + x.clone())).atan().mul_int(2)
        } else {
            // atan2(y, x) = +/- pi - 2 atan(y / (r - x))
            let tmp = (y.clone() / (r - x.clone())).atan();
            let mut data = tmp.all_derivatives().to_vec();
            let two = T::from(2u64);
            let half_turn = if data[0] <= T::zero() {
                -T::pi()
            } else {
                T::pi()
            };
            data[0] = half_turn - two.clone() * data[0].clone();
            for d in &mut data[1..] {
                *d = -two.clone() * d.clone();
            }
            tmp.with_data(data)
        };
        // fix the value for better accuracy
        result.data_mut()[0] = y.value().atan2(&x0);
        Ok(result)
    }

    /// `sqrt(self² + y²)` without intermediate overflow or underflow.
    pub fn try_hypot(&self, y: &Self) -> Result<Self, DsError> {
        self.check_compatibility(y)?;
        let (x0, y0) = (self.value(), y.value());
        if x0.is_infinite() || y0.is_infinite() {
            return Ok(self.new_constant(T::infinity()));
        } else if x0.is_nan() || y0.is_nan() {
            return Ok(self.new_constant(T::nan()));
        }
        let exp_x = x0.exponent();
        let exp_y = y0.exponent();
        if exp_x > exp_y + 27 {
            // y is negligible with respect to x
            Ok(self.abs())
        } else if exp_y > exp_x + 27 {
            Ok(y.abs())
        } else {
            let middle = (exp_x + exp_y) / 2;
            let scaled_x = self.scalb(-middle);
            let scaled_y = y.scalb(-middle);
            let scaled_h = (scaled_x.clone() * scaled_x + scaled_y.clone() * scaled_y).sqrt();
            Ok(scaled_h.scalb(middle))
        }
    }

    /// IEEE remainder `self - k y` with `k` the integer nearest to `self / y`.
    pub fn try_remainder(&self, y: &Self) -> Result<Self, DsError> {
        self.check_compatibility(y)?;
        let rem = self.value().remainder(y.value());
        let k = ((self.value().clone() - rem.clone()) / y.value().clone()).rint();
        let mut data = self
            .all_derivatives()
            .iter()
            .zip(y.all_derivatives())
            .map(|(a, b)| a.clone() - k.clone() * b.clone())
            .collect::<Vec<_>>();
        data[0] = rem;
        Ok(self.with_data(data))
    }

    /// IEEE remainder by a constant: only the value changes.
    pub fn remainder_scalar(&self, a: &T) -> Self {
        let mut result = self.clone();
        result.data_mut()[0] = self.value().remainder(a);
        result
    }

    pub fn abs(&self) -> Self {
        if self.value().is_sign_negative() {
            self.negate()
        } else {
            self.clone()
        }
    }

    pub fn ceil(&self) -> Self {
        self.new_constant(self.value().ceil())
    }

    pub fn floor(&self) -> Self {
        self.new_constant(self.value().floor())
    }

    /// Nearest integer, ties to even.
    pub fn rint(&self) -> Self {
        self.new_constant(self.value().rint())
    }

    pub fn signum(&self) -> Self {
        self.new_constant(self.value().signum())
    }

    /// `self` with the sign of `sign`.
    pub fn copysign(&self, sign: &T) -> Self {
        if self.value().is_sign_negative() == sign.is_sign_negative() {
            self.clone()
        } else {
            self.negate()
        }
    }

    pub fn copysign_ds(&self, sign: &Self) -> Self {
        self.copysign(sign.value())
    }

    /// Binary exponent of the value.
    pub fn exponent(&self) -> i32 {
        self.value().exponent()
    }

    /// `self * 2^n`, exact on every coefficient.
    pub fn scalb(&self, n: i32) -> Self {
        self.with_data(self.all_derivatives().iter().map(|x| x.scalb(n)).collect())
    }

    pub fn to_degrees(&self) -> Self {
        self.mul_scalar(&(T::from(180u64) / T::pi()))
    }

    pub fn to_radians(&self) -> Self {
        self.mul_scalar(&(T::pi() / T::from(180u64)))
    }
}

#[cfg(test)]
use crate::numbers::{MultiPrecFloat, F64};

#[cfg(test)]
fn univariate_seeds(x: f64, order: usize, f: impl Fn(&F64, usize) -> Vec<F64>) -> Vec<F64> {
    f(&F64::from(x), order)
}

#[test]
fn test_sin_first_derivatives() {
    let x = DerivativeStructure::variable(1, 5, 0, F64::from(1.0)).unwrap();
    let s = x.sin();
    let (sin1, cos1) = (1.0f64.sin(), 1.0f64.cos());
    let expected = [sin1, cos1, -sin1, -cos1, sin1, cos1].map(F64::from);
    crate::assert_all_close!(
        s.all_derivatives(),
        &expected,
        &F64::from(5e-16),
        &F64::from(5e-16)
    );
}

#[test]
fn test_exp_ln_inverse() {
    let x = DerivativeStructure::variable(2, 4, 1, F64::from(0.7)).unwrap();
    let y = DerivativeStructure::variable(2, 4, 0, F64::from(-0.2)).unwrap();
    let f = x.clone() * y.exp() + y;
    let back = f.exp().ln();
    crate::assert_all_close!(
        back.all_derivatives(),
        f.all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
    let back = f.exp_m1().ln_1p();
    crate::assert_all_close!(
        back.all_derivatives(),
        f.all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
}

#[test]
fn test_log_derivatives() {
    // ln: [ln x, 1/x, -1/x², 2/x³, -6/x⁴]
    let ln = univariate_seeds(2.0, 4, ln_derivatives);
    let expected = [2.0f64.ln(), 0.5, -0.25, 0.25, -0.375].map(F64::from);
    crate::assert_all_close!(&ln, &expected);
    let log10 = univariate_seeds(2.0, 2, log10_derivatives);
    let l10 = 10.0f64.ln();
    let expected = [2.0f64.log10(), 0.5 / l10, -0.25 / l10].map(F64::from);
    crate::assert_all_close!(&log10, &expected);
}

#[test]
fn test_trigonometric_identities() {
    let x = DerivativeStructure::variable(2, 5, 0, F64::from(0.4)).unwrap();
    let y = DerivativeStructure::variable(2, 5, 1, F64::from(1.3)).unwrap();
    let f = x * y;
    let (s, c) = f.sin_cos();
    let one = s.clone() * s.clone() + c.clone() * c.clone();
    crate::assert_all_close!(
        one.all_derivatives(),
        f.new_constant(F64::from(1.0)).all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
    let tan = s / c;
    crate::assert_all_close!(
        f.tan().all_derivatives(),
        tan.all_derivatives(),
        &F64::from(1e-12),
        &F64::from(1e-12)
    );
    let (sh, ch) = f.sinh_cosh();
    let one = ch.clone() * ch.clone() - sh.clone() * sh.clone();
    crate::assert_all_close!(
        one.all_derivatives(),
        f.new_constant(F64::from(1.0)).all_derivatives(),
        &F64::from(1e-12),
        &F64::from(1e-12)
    );
    let tanh = sh / ch;
    crate::assert_all_close!(
        f.tanh().all_derivatives(),
        tanh.all_derivatives(),
        &F64::from(1e-12),
        &F64::from(1e-12)
    );
}

#[test]
fn test_tan_derivatives() {
    // tan' = 1 + t², tan'' = 2t(1 + t²), tan''' = (1 + t²)(2 + 6t²)
    let t = 0.3f64.tan();
    let s = 1.0 + t * t;
    let expected = [t, s, 2.0 * t * s, s * (2.0 + 6.0 * t * t)].map(F64::from);
    crate::assert_all_close!(&univariate_seeds(0.3, 3, tan_derivatives), &expected);
    // tanh' = 1 - t², tanh'' = -2t(1 - t²)
    let t = 0.3f64.tanh();
    let s = 1.0 - t * t;
    let expected = [t, s, -2.0 * t * s, s * (6.0 * t * t - 2.0)].map(F64::from);
    crate::assert_all_close!(&univariate_seeds(0.3, 3, tanh_derivatives), &expected);
}

#[test]
fn test_inverse_trigonometric_derivatives() {
    let x = 0.3f64;
    let s = 1.0 - x * x;
    // asin' = (1 - x²)^(-1/2), asin'' = x (1 - x²)^(-3/2), asin''' = (1 + 2x²)(1 - x²)^(-5/2)
    let asin = [x.asin(), s.powf(-0.5), x * s.powf(-1.5), (1.0 + 2.0 * x * x) * s.powf(-2.5)];
    crate::assert_all_close!(
        &univariate_seeds(x, 3, asin_derivatives),
        &asin.map(F64::from)
    );
    let acos = [x.acos(), -asin[1], -asin[2], -asin[3]];
    crate::assert_all_close!(
        &univariate_seeds(x, 3, acos_derivatives),
        &acos.map(F64::from)
    );
    // atan' = 1/(1 + x²), atan'' = -2x/(1 + x²)², atan''' = (6x² - 2)/(1 + x²)³
    let a = 1.0 + x * x;
    let atan = [x.atan(), 1.0 / a, -2.0 * x / (a * a), (6.0 * x * x - 2.0) / (a * a * a)];
    crate::assert_all_close!(
        &univariate_seeds(x, 3, atan_derivatives),
        &atan.map(F64::from)
    );
}

#[test]
fn test_inverse_hyperbolic_derivatives() {
    let x = 0.3f64;
    // atanh' = 1/(1 - x²), atanh'' = 2x/(1 - x²)², atanh''' = (2 + 6x²)/(1 - x²)³
    let s = 1.0 - x * x;
    let atanh = [x.atanh(), 1.0 / s, 2.0 * x / (s * s), (2.0 + 6.0 * x * x) / (s * s * s)];
    crate::assert_all_close!(
        &univariate_seeds(x, 3, atanh_derivatives),
        &atanh.map(F64::from)
    );
    // asinh' = (1 + x²)^(-1/2), asinh'' = -x (1 + x²)^(-3/2), asinh''' = (2x² - 1)(1 + x²)^(-5/2)
    let a = 1.0 + x * x;
    let asinh = [x.asinh(), a.powf(-0.5), -x * a.powf(-1.5), (2.0 * x * x - 1.0) * a.powf(-2.5)];
    crate::assert_all_close!(
        &univariate_seeds(x, 3, asinh_derivatives),
        &asinh.map(F64::from)
    );
    // acosh' = (x² - 1)^(-1/2), acosh'' = -x (x² - 1)^(-3/2), acosh''' = (2x² + 1)(x² - 1)^(-5/2)
    let x = 1.7f64;
    let b = x * x - 1.0;
    let acosh = [x.acosh(), b.powf(-0.5), -x * b.powf(-1.5), (2.0 * x * x + 1.0) * b.powf(-2.5)];
    crate::assert_all_close!(
        &univariate_seeds(x, 3, acosh_derivatives),
        &acosh.map(F64::from)
    );
}

#[test]
fn test_inverse_functions_round_trip() {
    let order = 6;
    let x = DerivativeStructure::variable(1, order, 0, F64::from(0.35)).unwrap();
    let round_trips = [
        x.sin().asin(),
        x.cos().acos(),
        x.tan().atan(),
        x.sinh().asinh(),
        x.tanh().atanh(),
        x.add_scalar(F64::from(1.0)).cosh().acosh().sub_scalar(F64::from(1.0)),
    ];
    for f in &round_trips {
        crate::assert_all_close!(
            f.all_derivatives(),
            x.all_derivatives(),
            &F64::from(1e-10),
            &F64::from(1e-10)
        );
    }
}

#[test]
fn test_powers_agree() {
    let x = DerivativeStructure::variable(2, 4, 0, F64::from(1.3)).unwrap();
    let y = DerivativeStructure::variable(2, 4, 1, F64::from(0.6)).unwrap();
    let f = x.clone() + y.clone() * y.clone();
    // sqrt
    let sqrt = f.sqrt();
    for other in [f.pow_real(&F64::from(0.5)), f.root_n(2)] {
        crate::assert_all_close!(
            sqrt.all_derivatives(),
            other.all_derivatives(),
            &F64::from(1e-13),
            &F64::from(1e-13)
        );
    }
    // cube root
    let cbrt = f.cbrt();
    crate::assert_all_close!(
        (cbrt.clone() * cbrt.clone() * cbrt).all_derivatives(),
        f.all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
    crate::assert_all_close!(
        f.root_n(5).pow_int(5).all_derivatives(),
        f.all_derivatives(),
        &F64::from(1e-12),
        &F64::from(1e-12)
    );
    // integer powers
    let reciprocal = f.reciprocal();
    let divided = f.new_constant(F64::from(1.0)) / f.clone();
    for other in [f.pow_int(-1), divided, f.pow_real(&F64::from(-1.0))] {
        crate::assert_all_close!(
            reciprocal.all_derivatives(),
            other.all_derivatives(),
            &F64::from(1e-13),
            &F64::from(1e-13)
        );
    }
    crate::assert_all_close!(
        f.pow_int(3).all_derivatives(),
        (f.clone() * f.clone() * f.clone()).all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
    assert_eq!(f.pow_int(0), f.new_constant(F64::from(1.0)));
    // x^y = exp(y ln x)
    let pow = x.try_pow(&y).unwrap();
    let expected = (y.clone() * x.ln()).exp();
    assert_eq!(pow, expected);
    let scalar = DerivativeStructure::scalar_pow(&F64::from(2.5), &f);
    let expected = (f.mul_scalar(&F64::from(2.5f64.ln()))).exp();
    crate::assert_all_close!(
        scalar.all_derivatives(),
        expected.all_derivatives(),
        &F64::from(1e-13),
        &F64::from(1e-13)
    );
}

#[test]
fn test_pow_int_derivatives() {
    // x³ at 2: [8, 12, 12, 6, 0, 0]
    let expected = [8.0, 12.0, 12.0, 6.0, 0.0, 0.0].map(F64::from);
    assert_eq!(univariate_seeds(2.0, 5, |x, n| pow_int_derivatives(x, 3, n)), expected);
    // x⁻² at 2: [1/4, -2/8, 6/16, -24/32]
    let expected = [0.25, -0.25, 0.375, -0.75].map(F64::from);
    assert_eq!(univariate_seeds(2.0, 3, |x, n| pow_int_derivatives(x, -2, n)), expected);
}

#[test]
fn test_pow_special_cases() {
    let zero = F64::from(0.0);
    // 0^x at x = 0
    let f = scalar_pow_derivatives(&zero, &zero, 3);
    assert_eq!(
        f,
        vec![1.0, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY]
            .into_iter()
            .map(F64::from)
            .collect::<Vec<_>>()
    );
    assert!(scalar_pow_derivatives(&zero, &F64::from(-1.0), 2)
        .iter()
        .all(FloatNumber::is_nan));
    assert!(scalar_pow_derivatives(&zero, &F64::from(1.0), 2)
        .iter()
        .all(|x| *x == zero));
    // x^p at x = 0 is the zero function, x^0 is one
    assert!(pow_real_derivatives(&zero, &F64::from(2.5), 2)
        .iter()
        .all(|x| *x == zero));
    assert_eq!(
        pow_real_derivatives(&F64::from(3.0), &zero, 2),
        vec![F64::from(1.0), zero, zero]
    );
}

#[test]
fn test_composition_singularity() {
    for n in 2..10 {
        for max_order in 0..12 {
            // the variable is only known as the value 0 with derivatives 1, 0, 0, ...
            // so f''(0) g'² + f'(0) g'' = -inf + inf * 0 is NaN
            let x = DerivativeStructure::variable(1, max_order, 0, F64::from(0.0)).unwrap();
            let root = x.root_n(n);
            assert_eq!(*root.value(), F64::from(0.0));
            let derivatives = root.all_derivatives();
            if max_order > 0 {
                assert!(derivatives[1].is_infinite() && !derivatives[1].is_sign_negative());
            }
            for d in derivatives.iter().skip(2) {
                assert!(d.is_nan());
            }

            // an inner function with the derivatives 1, -1, 1, ... resolves to signed infinities
            let mut inner = vec![F64::from(0.0)];
            inner.extend((1..=max_order).map(|k| F64::from(if k % 2 == 1 { 1.0 } else { -1.0 })));
            let root = DerivativeStructure::from_derivatives(1, max_order, inner)
                .unwrap()
                .root_n(n);
            assert_eq!(*root.value(), F64::from(0.0));
            for (order, d) in root.all_derivatives().iter().enumerate().skip(1) {
                assert!(d.is_infinite(), "order {order}: {d}");
                assert_eq!(d.is_sign_negative(), order % 2 == 0, "order {order}: {d}");
            }
        }
    }
}

#[test]
fn test_sqrt_singularity_matches_root_n() {
    let x = DerivativeStructure::variable(1, 3, 0, F64::from(0.0)).unwrap();
    let sqrt = x.sqrt();
    assert_eq!(*sqrt.value(), F64::from(0.0));
    assert!(sqrt.all_derivatives()[1].is_infinite());
    assert!(sqrt.all_derivatives()[2].is_nan());
    assert!(sqrt.all_derivatives()[3].is_nan());
    // sqrt of a constant zero multiplies infinite derivatives by zero inner derivatives
    let c = DerivativeStructure::constant(1, 2, F64::from(0.0)).sqrt();
    assert_eq!(*c.value(), F64::from(0.0));
    assert!(c.all_derivatives()[1].is_nan());
}

#[test]
fn test_atan2_quadrants() {
    for (y0, x0) in [(0.5, 1.2), (0.5, -1.2), (-0.5, -1.2), (-0.5, 1.2), (2.0, 0.0)] {
        let y = DerivativeStructure::variable(2, 3, 0, F64::from(y0)).unwrap();
        let x = DerivativeStructure::variable(2, 3, 1, F64::from(x0)).unwrap();
        let angle = y.try_atan2(&x).unwrap();
        assert_eq!(*angle.value(), F64::from(f64::atan2(y0, x0)));
        // ∂/∂y = x / r², ∂/∂x = -y / r²
        let r2 = x0 * x0 + y0 * y0;
        crate::assert_close!(
            angle.partial_derivative(&[1, 0]).unwrap(),
            F64::from(x0 / r2),
            F64::from(1e-14),
            F64::from(1e-14)
        );
        crate::assert_close!(
            angle.partial_derivative(&[0, 1]).unwrap(),
            F64::from(-y0 / r2),
            F64::from(1e-14),
            F64::from(1e-14)
        );
        // tan(atan2(y, x)) = y / x away from x = 0
        if x0 != 0.0 {
            crate::assert_all_close!(
                angle.tan().all_derivatives(),
                (y / x).all_derivatives(),
                &F64::from(1e-12),
                &F64::from(1e-12)
            );
        }
    }
}

#[test]
fn test_hypot() {
    let x = DerivativeStructure::variable(2, 3, 0, F64::from(3.0)).unwrap();
    let y = DerivativeStructure::variable(2, 3, 1, F64::from(4.0)).unwrap();
    let h = x.try_hypot(&y).unwrap();
    let direct = (x.clone() * x.clone() + y.clone() * y.clone()).sqrt();
    crate::assert_all_close!(
        h.all_derivatives(),
        direct.all_derivatives(),
        &F64::from(1e-15),
        &F64::from(1e-15)
    );
    // no overflow
    let big = x.mul_scalar(&F64::from(1e300));
    let h = big.try_hypot(&y.mul_scalar(&F64::from(1e300))).unwrap();
    crate::assert_close!(*h.value(), F64::from(5e300));
    // negligible second argument
    let tiny = y.mul_scalar(&F64::from(1e-20));
    assert_eq!(x.try_hypot(&tiny).unwrap(), x);
    let inf = x.new_constant(F64::from(f64::INFINITY));
    assert_eq!(
        x.try_hypot(&inf).unwrap(),
        x.new_constant(F64::from(f64::INFINITY))
    );
    let nan = x.new_constant(F64::from(f64::NAN));
    assert!(x.try_hypot(&nan).unwrap().value().is_nan());
}

#[test]
fn test_remainder() {
    let x = DerivativeStructure::variable(2, 2, 0, F64::from(7.5)).unwrap();
    let y = DerivativeStructure::variable(2, 2, 1, F64::from(2.0)).unwrap();
    let r = x.try_remainder(&y).unwrap();
    // 7.5 = 4 * 2 - 0.5
    assert_eq!(
        r.all_derivatives(),
        &[-0.5, 1.0, 0.0, -4.0, 0.0, 0.0].map(F64::from)
    );
    let r = x.remainder_scalar(&F64::from(2.0));
    assert_eq!(*r.value(), F64::from(-0.5));
    assert_eq!(r.all_derivatives()[1..], x.all_derivatives()[1..]);
}

#[test]
fn test_sign_functions() {
    let x = DerivativeStructure::variable(1, 2, 0, F64::from(-2.5)).unwrap();
    let f = x.clone() * x.clone() * x.clone();
    assert_eq!(f.abs(), f.negate());
    assert_eq!(f.copysign(&F64::from(1.0)), f.negate());
    assert_eq!(f.copysign(&F64::from(-0.0)), f);
    assert_eq!(f.copysign_ds(&x.negate()), f.negate());
    assert_eq!(x.floor(), x.new_constant(F64::from(-3.0)));
    assert_eq!(x.ceil(), x.new_constant(F64::from(-2.0)));
    assert_eq!(x.rint(), x.new_constant(F64::from(-2.0)));
    assert_eq!(x.signum(), x.new_constant(F64::from(-1.0)));
    assert_eq!(x.exponent(), 1);
    assert_eq!(
        x.scalb(3).all_derivatives(),
        &[-20.0, 8.0, 0.0].map(F64::from)
    );
}

#[test]
fn test_angle_conversions() {
    let x = DerivativeStructure::variable(1, 1, 0, F64::from(std::f64::consts::PI)).unwrap();
    let degrees = x.to_degrees();
    crate::assert_close!(*degrees.value(), F64::from(180.0));
    crate::assert_all_close!(
        degrees.to_radians().all_derivatives(),
        x.all_derivatives()
    );
}

#[test]
fn test_multi_precision_matches_f64() {
    let order = 4;
    let x = DerivativeStructure::variable(1, order, 0, F64::from(0.6)).unwrap();
    let xm = DerivativeStructure::variable(1, order, 0, MultiPrecFloat::from(0.6)).unwrap();
    let f = (x.sin() * x.exp()).atan();
    let fm = (xm.sin() * xm.exp()).atan();
    for (a, b) in f.all_derivatives().iter().zip(fm.all_derivatives()) {
        crate::assert_close!(MultiPrecFloat::from(a.to_f64()), b.clone());
    }
}
