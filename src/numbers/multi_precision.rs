use std::{
    cell::OnceCell,
    fmt::{Debug, Display, Formatter, Result},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    rc::Rc,
};

use num_traits::{One, Zero};
use rug::{
    float::{Constant, Special},
    ops::Pow,
    Float,
};

use super::number::{FloatNumber, Number};

thread_local! {
    /// Precision of [`MultiPrecFloat`] numbers created on this thread.
    ///
    /// It can be set once; until then it defaults to [`DEFAULT_PRECISION`].
    pub static PRECISION: OnceCell<u32> = const { OnceCell::new() };
}

pub const DEFAULT_PRECISION: u32 = 53;

fn precision() -> u32 {
    PRECISION.with(|p| *p.get().unwrap_or(&DEFAULT_PRECISION))
}

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct MultiPrecFloat(Rc<Float>);

impl MultiPrecFloat {
    fn map(&self, f: impl FnOnce(Float) -> Float) -> Self {
        Self(Rc::new(f(self.0.as_ref().clone())))
    }

    fn with_special(special: Special) -> Self {
        Self(Rc::new(Float::with_val(precision(), special)))
    }
}

impl From<u64> for MultiPrecFloat {
    #[inline]
    fn from(u: u64) -> Self {
        Self(Rc::new(Float::with_val(precision(), u)))
    }
}

impl From<f64> for MultiPrecFloat {
    #[inline]
    fn from(f: f64) -> Self {
        Self(Rc::new(Float::with_val(precision(), f)))
    }
}

impl From<MultiPrecFloat> for f64 {
    #[inline]
    fn from(f: MultiPrecFloat) -> Self {
        f.0.to_f64()
    }
}

impl Display for MultiPrecFloat {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self.0)
    }
}

impl Zero for MultiPrecFloat {
    #[inline]
    fn zero() -> Self {
        Self::from(0.0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl One for MultiPrecFloat {
    #[inline]
    fn one() -> Self {
        Self::from(1.0)
    }

    #[inline]
    fn is_one(&self) -> bool {
        *self.0 == 1.0
    }
}

impl Neg for MultiPrecFloat {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(Rc::new(Float::with_val(self.0.prec(), -&*self.0)))
    }
}

impl Add for MultiPrecFloat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.0.prec(), rhs.0.prec());
        if self.is_zero() {
            return rhs;
        }
        if rhs.is_zero() {
            return self;
        }
        Self(Rc::new(Float::with_val(self.0.prec(), &*self.0 + &*rhs.0)))
    }
}

impl AddAssign for MultiPrecFloat {
    fn add_assign(&mut self, rhs: Self) {
        if rhs.is_zero() {
            return;
        }
        *self = self.clone() + rhs;
    }
}

impl Sub for MultiPrecFloat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.0.prec(), rhs.0.prec());
        if rhs.is_zero() {
            return self;
        }
        Self(Rc::new(Float::with_val(self.0.prec(), &*self.0 - &*rhs.0)))
    }
}

impl SubAssign for MultiPrecFloat {
    fn sub_assign(&mut self, rhs: Self) {
        if rhs.is_zero() {
            return;
        }
        *self = self.clone() - rhs;
    }
}

impl Mul for MultiPrecFloat {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.0.prec(), rhs.0.prec());
        if rhs.is_one() {
            return self;
        }
        if self.is_one() {
            return rhs;
        }
        Self(Rc::new(Float::with_val(self.0.prec(), &*self.0 * &*rhs.0)))
    }
}

impl MulAssign for MultiPrecFloat {
    fn mul_assign(&mut self, mut rhs: Self) {
        if rhs.is_one() {
            // nothing to do
        } else if self.is_one() {
            std::mem::swap(self, &mut rhs);
        } else {
            *self = self.clone() * rhs;
        }
    }
}

impl Div for MultiPrecFloat {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.0.prec(), rhs.0.prec());
        if rhs.is_one() {
            return self;
        }
        Self(Rc::new(Float::with_val(self.0.prec(), &*self.0 / &*rhs.0)))
    }
}

impl DivAssign for MultiPrecFloat {
    fn div_assign(&mut self, rhs: Self) {
        if rhs.is_one() {
            return;
        }
        *self = self.clone() / rhs;
    }
}

impl Number for MultiPrecFloat {
    fn from_ratio(numerator: u64, denominator: u64) -> Self {
        Self(Rc::new(Float::with_val(
            precision(),
            rug::Rational::from((numerator, denominator)),
        )))
    }

    fn from_i64(i: i64) -> Self {
        Self(Rc::new(Float::with_val(precision(), i)))
    }

    fn to_f64(&self) -> f64 {
        self.0.to_f64()
    }

    fn abs(&self) -> Self {
        self.map(Float::abs)
    }
}

impl FloatNumber for MultiPrecFloat {
    fn nan() -> Self {
        Self::with_special(Special::Nan)
    }

    fn infinity() -> Self {
        Self::with_special(Special::Infinity)
    }

    fn pi() -> Self {
        Self(Rc::new(Float::with_val(precision(), Constant::Pi)))
    }

    fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }

    fn is_sign_negative(&self) -> bool {
        self.0.is_sign_negative()
    }

    fn sqrt(&self) -> Self {
        self.map(Float::sqrt)
    }

    fn cbrt(&self) -> Self {
        self.map(Float::cbrt)
    }

    fn powf(&self, exp: &Self) -> Self {
        self.map(|x| x.pow(&*exp.0))
    }

    fn powi(&self, exp: i32) -> Self {
        self.map(|x| x.pow(exp))
    }

    fn exp(&self) -> Self {
        self.map(Float::exp)
    }

    fn exp_m1(&self) -> Self {
        self.map(Float::exp_m1)
    }

    fn ln(&self) -> Self {
        self.map(Float::ln)
    }

    fn ln_1p(&self) -> Self {
        self.map(Float::ln_1p)
    }

    fn log10(&self) -> Self {
        self.map(Float::log10)
    }

    fn sin(&self) -> Self {
        self.map(Float::sin)
    }

    fn cos(&self) -> Self {
        self.map(Float::cos)
    }

    fn tan(&self) -> Self {
        self.map(Float::tan)
    }

    fn asin(&self) -> Self {
        self.map(Float::asin)
    }

    fn acos(&self) -> Self {
        self.map(Float::acos)
    }

    fn atan(&self) -> Self {
        self.map(Float::atan)
    }

    fn atan2(&self, x: &Self) -> Self {
        self.map(|y| y.atan2(&x.0))
    }

    fn sinh(&self) -> Self {
        self.map(Float::sinh)
    }

    fn cosh(&self) -> Self {
        self.map(Float::cosh)
    }

    fn tanh(&self) -> Self {
        self.map(Float::tanh)
    }

    fn asinh(&self) -> Self {
        self.map(Float::asinh)
    }

    fn acosh(&self) -> Self {
        self.map(Float::acosh)
    }

    fn atanh(&self) -> Self {
        self.map(Float::atanh)
    }

    fn hypot(&self, other: &Self) -> Self {
        self.map(|x| x.hypot(&other.0))
    }

    fn remainder(&self, other: &Self) -> Self {
        self.map(|x| x.remainder(&other.0))
    }

    fn ceil(&self) -> Self {
        self.map(Float::ceil)
    }

    fn floor(&self) -> Self {
        self.map(Float::floor)
    }

    fn rint(&self) -> Self {
        self.map(Float::round_even)
    }

    fn signum(&self) -> Self {
        if self.is_zero() || self.is_nan() {
            return self.clone();
        }
        self.map(Float::signum)
    }

    fn copysign(&self, sign: &Self) -> Self {
        self.map(|x| x.copysign(&sign.0))
    }

    fn exponent(&self) -> i32 {
        // MPFR normalizes the mantissa to [0.5, 1)
        self.0.get_exp().map_or(0, |e| e - 1)
    }

    fn scalb(&self, n: i32) -> Self {
        self.map(|x| x << n)
    }
}

#[test]
fn test_multi_precision_elementary_values() {
    let x = MultiPrecFloat::from(0.5);
    crate::assert_close!(x.sin(), MultiPrecFloat::from(0.5_f64.sin()));
    crate::assert_close!(x.atan2(&MultiPrecFloat::one()), MultiPrecFloat::from(0.5_f64.atan()));
    assert_eq!(MultiPrecFloat::from(10.0).exponent(), 3);
    assert_eq!(MultiPrecFloat::from(3.0).scalb(4), MultiPrecFloat::from(48.0));
    assert_eq!(MultiPrecFloat::from(2.5).rint(), MultiPrecFloat::from(2.0));
}
