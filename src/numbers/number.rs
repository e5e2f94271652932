use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_traits::{One, Zero};

pub trait Number:
    Clone
    + Display
    + Zero
    + One
    + From<u64>
    + From<f64>
    + PartialEq
    + PartialOrd
    + Debug
    + Neg<Output = Self>
    + Add<Output = Self>
    + AddAssign
    + Sub<Output = Self>
    + SubAssign
    + Mul<Output = Self>
    + MulAssign
    + Div<Output = Self>
    + DivAssign
{
    fn from_ratio(numerator: u64, denominator: u64) -> Self {
        Self::from(numerator) / Self::from(denominator)
    }
    fn from_i64(i: i64) -> Self {
        if i < 0 {
            -Self::from(i.unsigned_abs())
        } else {
            Self::from(i.unsigned_abs())
        }
    }
    fn to_f64(&self) -> f64;
    fn max(&self, other: &Self) -> Self {
        if self > other {
            self.clone()
        } else {
            other.clone()
        }
    }
    fn min(&self, other: &Self) -> Self {
        -((-self.clone()).max(&(-other.clone())))
    }
    fn abs(&self) -> Self;
}

/// Value evaluators of the elementary functions.
///
/// Derivatives are never asked from the field: only values at a point are needed to seed
/// the univariate expansions.
pub trait FloatNumber: Number {
    fn nan() -> Self;
    fn infinity() -> Self;
    fn pi() -> Self;
    fn is_finite(&self) -> bool;
    fn is_nan(&self) -> bool;
    fn is_infinite(&self) -> bool;
    /// True for negative numbers, including `-0.0`.
    fn is_sign_negative(&self) -> bool;

    fn sqrt(&self) -> Self;
    fn cbrt(&self) -> Self;
    fn powf(&self, exp: &Self) -> Self;
    fn powi(&self, exp: i32) -> Self;
    fn exp(&self) -> Self;
    fn exp_m1(&self) -> Self;
    fn ln(&self) -> Self;
    fn ln_1p(&self) -> Self;
    fn log10(&self) -> Self;
    fn sin(&self) -> Self;
    fn cos(&self) -> Self;
    fn tan(&self) -> Self;
    fn asin(&self) -> Self;
    fn acos(&self) -> Self;
    fn atan(&self) -> Self;
    fn atan2(&self, x: &Self) -> Self;
    fn sinh(&self) -> Self;
    fn cosh(&self) -> Self;
    fn tanh(&self) -> Self;
    fn asinh(&self) -> Self;
    fn acosh(&self) -> Self;
    fn atanh(&self) -> Self;
    fn hypot(&self, other: &Self) -> Self;
    /// IEEE 754 remainder: `self - n * other` with `n` the integer nearest to `self / other`.
    fn remainder(&self, other: &Self) -> Self;
    fn ceil(&self) -> Self;
    fn floor(&self) -> Self;
    /// Rounds to the nearest integer, ties to even.
    fn rint(&self) -> Self;
    fn signum(&self) -> Self;
    fn copysign(&self, sign: &Self) -> Self;
    /// Unbiased binary exponent, i.e. `floor(log2(|self|))` for normal numbers.
    fn exponent(&self) -> i32;
    /// Multiplies by `2^n` without rounding in between.
    fn scalb(&self, n: i32) -> Self;

    /// Check whether two numbers are close to each other
    ///
    /// Relative tolerance is with respect to the second number because it is usually the expected value.
    #[inline]
    fn is_close_with(
        &self,
        other: &Self,
        relative_tolerance: &Self,
        absolute_tolerance: &Self,
    ) -> bool {
        if self.is_nan() || other.is_nan() {
            return self.is_nan() && other.is_nan();
        }
        if self.is_infinite() || other.is_infinite() {
            return self == other;
        }
        let diff = (self.clone() - other.clone()).abs();
        diff <= absolute_tolerance.clone() || diff <= relative_tolerance.clone() * other.abs()
    }
    #[inline]
    fn is_close(&self, other: &Self) -> bool {
        self.is_close_with(
            other,
            &Self::from_ratio(1, 1_000_000_000),
            &Self::from_ratio(1, 100_000_000),
        )
    }
}

#[inline]
pub fn all_close<'a, 'b, T: FloatNumber + 'a + 'b>(
    a: impl IntoIterator<Item = &'a T>,
    b: impl IntoIterator<Item = &'b T>,
) -> bool {
    matches!(find_distant(a, b), (None, None))
}

#[inline]
pub fn find_distant<'a, 'b, T: FloatNumber + 'a + 'b>(
    a: impl IntoIterator<Item = &'a T>,
    b: impl IntoIterator<Item = &'b T>,
) -> (Option<&'a T>, Option<&'b T>) {
    let mut a_iter = a.into_iter();
    let mut b_iter = b.into_iter();
    loop {
        match (a_iter.next(), b_iter.next()) {
            (Some(a), Some(b)) => {
                if !a.is_close(b) {
                    return (Some(a), Some(b));
                }
            }
            (None, None) => return (None, None),
            (a, b) => return (a, b),
        }
    }
}

#[inline]
pub fn all_close_with<'a, 'b, T: FloatNumber + 'a + 'b>(
    a: impl IntoIterator<Item = &'a T>,
    b: impl IntoIterator<Item = &'b T>,
    relative_tolerance: &T,
    absolute_tolerance: &T,
) -> bool {
    matches!(
        find_distant_with(a, b, relative_tolerance, absolute_tolerance),
        (None, None)
    )
}

#[inline]
pub fn find_distant_with<'a, 'b, T: FloatNumber + 'a + 'b>(
    a: impl IntoIterator<Item = &'a T>,
    b: impl IntoIterator<Item = &'b T>,
    relative_tolerance: &T,
    absolute_tolerance: &T,
) -> (Option<&'a T>, Option<&'b T>) {
    let mut a_iter = a.into_iter();
    let mut b_iter = b.into_iter();
    loop {
        match (a_iter.next(), b_iter.next()) {
            (Some(a), Some(b)) => {
                if !a.is_close_with(b, relative_tolerance, absolute_tolerance) {
                    return (Some(a), Some(b));
                }
            }
            (None, None) => return (None, None),
            (a, b) => return (a, b),
        }
    }
}

#[macro_export]
macro_rules! assert_close {
    ($a:expr, $b:expr) => {
        assert!(
            $a.is_close(&$b),
            "assertion failed: `is_close(left, right)`\nleft:  {}\nright: {}",
            $a,
            $b,
        )
    };
    ($a:expr, $b:expr, $relative_tolerance:expr, $absolute_tolerance:expr) => {
        assert!(
            $a.is_close_with(&$b, &$relative_tolerance, &$absolute_tolerance),
            "assertion failed: `is_close(left, right, relative_tol = {}, absolute_tol = {})`\nleft:  {}\nright: {}",
            $relative_tolerance,
            $absolute_tolerance,
            $a,
            $b,
        )
    };
}

#[macro_export]
macro_rules! assert_all_close {
    ($a:expr, $b:expr $(,)?) => {
        match $crate::numbers::find_distant($a, $b) {
            (None, None) => {}
            (a, b) => panic!(
                "assertion failed: `all_close(left, right)`\nThese values differ:\nleft:  {}\nright: {}",
                a.map_or("None".to_string(), std::string::ToString::to_string),
                b.map_or("None".to_string(), std::string::ToString::to_string),
            ),
        }
    };
    ($a:expr, $b:expr, $(rel_tol =)? $relative_tolerance:expr, $(abs_tol =)? $absolute_tolerance:expr $(,)?) => {
        match $crate::numbers::find_distant_with($a, $b, $relative_tolerance, $absolute_tolerance) {
            (None, None) => {}
            (a, b) => panic!(
                "assertion failed: `all_close(left, right, relative_tol = {}, absolute_tol = {})`\nThese values differ:\nleft:  {}\nright: {}",
                $relative_tolerance,
                $absolute_tolerance,
                a.map_or("None".to_string(), std::string::ToString::to_string),
                b.map_or("None".to_string(), std::string::ToString::to_string),
            ),
        }
    };
}
