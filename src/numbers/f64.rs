use std::{
    fmt::{Display, Formatter, Result},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_traits::{One, Zero};

use crate::numbers::{FloatNumber, Number};

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct F64(f64);

impl From<u64> for F64 {
    #[inline]
    fn from(u: u64) -> Self {
        Self(u as f64)
    }
}

impl From<f64> for F64 {
    #[inline]
    fn from(f: f64) -> Self {
        Self(f)
    }
}

impl From<F64> for f64 {
    #[inline]
    fn from(f: F64) -> Self {
        f.0
    }
}

impl Display for F64 {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", ryu::Buffer::new().format(self.0))
    }
}

impl Number for F64 {
    #[inline]
    fn from_ratio(numerator: u64, denominator: u64) -> Self {
        Self((numerator as f64) / (denominator as f64))
    }

    #[inline]
    fn from_i64(i: i64) -> Self {
        Self(i as f64)
    }

    #[inline]
    fn to_f64(&self) -> f64 {
        self.0
    }

    #[inline]
    fn abs(&self) -> Self {
        Self(self.0.abs())
    }
}

/// Scales by a power of two in at most three exact steps so that `2^n` itself never overflows.
fn scalb(x: f64, n: i32) -> f64 {
    let pow2 = |e: i32| f64::from_bits(((e + 1023) as u64) << 52);
    let mut x = x;
    let mut n = n;
    while n > 1023 {
        x *= pow2(1023);
        n -= 1023;
        if x.is_infinite() {
            return x;
        }
    }
    while n < -1022 {
        x *= pow2(-1022);
        n += 1022;
        if x == 0.0 {
            return x;
        }
    }
    x * pow2(n)
}

impl FloatNumber for F64 {
    #[inline]
    fn nan() -> Self {
        Self(f64::NAN)
    }

    #[inline]
    fn infinity() -> Self {
        Self(f64::INFINITY)
    }

    #[inline]
    fn pi() -> Self {
        Self(std::f64::consts::PI)
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    #[inline]
    fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    #[inline]
    fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }

    #[inline]
    fn is_sign_negative(&self) -> bool {
        self.0.is_sign_negative()
    }

    #[inline]
    fn sqrt(&self) -> Self {
        Self(self.0.sqrt())
    }

    #[inline]
    fn cbrt(&self) -> Self {
        Self(self.0.cbrt())
    }

    #[inline]
    fn powf(&self, exp: &Self) -> Self {
        Self(self.0.powf(exp.0))
    }

    #[inline]
    fn powi(&self, exp: i32) -> Self {
        Self(self.0.powi(exp))
    }

    #[inline]
    fn exp(&self) -> Self {
        Self(self.0.exp())
    }

    #[inline]
    fn exp_m1(&self) -> Self {
        Self(self.0.exp_m1())
    }

    #[inline]
    fn ln(&self) -> Self {
        Self(self.0.ln())
    }

    #[inline]
    fn ln_1p(&self) -> Self {
        Self(self.0.ln_1p())
    }

    #[inline]
    fn log10(&self) -> Self {
        Self(self.0.log10())
    }

    #[inline]
    fn sin(&self) -> Self {
        Self(self.0.sin())
    }

    #[inline]
    fn cos(&self) -> Self {
        Self(self.0.cos())
    }

    #[inline]
    fn tan(&self) -> Self {
        Self(self.0.tan())
    }

    #[inline]
    fn asin(&self) -> Self {
        Self(self.0.asin())
    }

    #[inline]
    fn acos(&self) -> Self {
        Self(self.0.acos())
    }

    #[inline]
    fn atan(&self) -> Self {
        Self(self.0.atan())
    }

    #[inline]
    fn atan2(&self, x: &Self) -> Self {
        Self(self.0.atan2(x.0))
    }

    #[inline]
    fn sinh(&self) -> Self {
        Self(self.0.sinh())
    }

    #[inline]
    fn cosh(&self) -> Self {
        Self(self.0.cosh())
    }

    #[inline]
    fn tanh(&self) -> Self {
        Self(self.0.tanh())
    }

    #[inline]
    fn asinh(&self) -> Self {
        Self(self.0.asinh())
    }

    #[inline]
    fn acosh(&self) -> Self {
        Self(self.0.acosh())
    }

    #[inline]
    fn atanh(&self) -> Self {
        Self(self.0.atanh())
    }

    #[inline]
    fn hypot(&self, other: &Self) -> Self {
        Self(self.0.hypot(other.0))
    }

    fn remainder(&self, other: &Self) -> Self {
        if self.0.is_infinite() || other.0 == 0.0 || self.0.is_nan() || other.0.is_nan() {
            return Self(f64::NAN);
        }
        if other.0.is_infinite() {
            return *self;
        }
        // `%` is exact; reducing modulo 2p first keeps the parity of the quotient
        let p = other.0.abs();
        let mut x = if p <= f64::MAX / 2.0 {
            self.0 % (p + p)
        } else {
            self.0
        }
        .abs();
        if p < 2.0 * f64::MIN_POSITIVE {
            if x + x > p {
                x -= p;
                if x + x >= p {
                    x -= p;
                }
            }
        } else {
            let half = 0.5 * p;
            if x > half {
                x -= p;
                if x >= half {
                    x -= p;
                }
            }
        }
        Self(if self.0.is_sign_negative() { -x } else { x })
    }

    #[inline]
    fn ceil(&self) -> Self {
        Self(self.0.ceil())
    }

    #[inline]
    fn floor(&self) -> Self {
        Self(self.0.floor())
    }

    #[inline]
    fn rint(&self) -> Self {
        Self(self.0.round_ties_even())
    }

    #[inline]
    fn signum(&self) -> Self {
        if self.0 == 0.0 || self.0.is_nan() {
            *self
        } else {
            Self(self.0.signum())
        }
    }

    #[inline]
    fn copysign(&self, sign: &Self) -> Self {
        Self(self.0.copysign(sign.0))
    }

    fn exponent(&self) -> i32 {
        ((self.0.to_bits() >> 52) & 0x7ff) as i32 - 1023
    }

    #[inline]
    fn scalb(&self, n: i32) -> Self {
        Self(scalb(self.0, n))
    }
}

impl Zero for F64 {
    #[inline]
    fn zero() -> Self {
        Self(0.0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl One for F64 {
    #[inline]
    fn one() -> Self {
        Self(1.0)
    }
}

impl Neg for F64 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Add for F64 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for F64 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for F64 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for F64 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul for F64 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl MulAssign for F64 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        self.0 *= rhs.0;
    }
}

impl Div for F64 {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self::Output {
        Self(self.0 / rhs.0)
    }
}

impl DivAssign for F64 {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        self.0 /= rhs.0;
    }
}

#[test]
fn test_remainder_ties_to_even() {
    assert_eq!(F64::from(5.0).remainder(&F64::from(2.0)), F64::from(1.0));
    assert_eq!(F64::from(7.0).remainder(&F64::from(2.0)), F64::from(-1.0));
    assert_eq!(F64::from(-3.5).remainder(&F64::from(2.0)), F64::from(0.5));
    assert!(F64::from(1.0).remainder(&F64::zero()).is_nan());
}

#[test]
fn test_remainder_is_exact() {
    let rem = |a: f64, b: f64| F64::from(a).remainder(&F64::from(b));
    assert_eq!(rem(0.7, 0.1), F64::from(-8.326_672_684_688_674e-17));
    assert_eq!(rem(1e17 + 8.0, 3.0), F64::from(1.0));
    assert_eq!(rem(5e15 + 0.5, 0.1), F64::from(0.022_444_243_843_710_88));
    assert_eq!(rem(1e308, 1e-300), F64::from(3.019_500_097_029_384_7e-301));
    assert_eq!(rem(3.0, -2.0), F64::from(-1.0));
    assert!(rem(-4.0, 2.0).is_sign_negative());
    assert_eq!(rem(2.5, f64::INFINITY), F64::from(2.5));
}

#[test]
fn test_exponent_and_scalb() {
    assert_eq!(F64::from(1.0).exponent(), 0);
    assert_eq!(F64::from(10.0).exponent(), 3);
    assert_eq!(F64::from(0.3).exponent(), -2);
    assert_eq!(F64::from(3.0).scalb(4), F64::from(48.0));
    assert_eq!(F64::from(1.0).scalb(-1074), F64::from(f64::from_bits(1)));
    assert_eq!(F64::from(0.5).scalb(2000), F64::infinity());
}
