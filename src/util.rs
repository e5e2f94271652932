use std::ops::MulAssign;

use num_traits::One;

/// Compute the binomial coefficients up to `limit`.
pub(crate) fn binomial(limit: usize) -> Vec<Vec<u64>> {
    let mut result = vec![Vec::new(); limit + 1];
    result[0] = vec![1];
    for n in 1..=limit {
        result[n] = vec![1; n + 1];
        for k in 1..n {
            result[n][k] = result[n - 1][k - 1] + result[n - 1][k];
        }
    }
    result
}

pub(crate) fn pow_nonneg<T>(base: T, exp: u32) -> T
where
    T: Clone + One + MulAssign,
{
    let mut result = T::one();
    let mut base = base;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result *= base.clone();
        }
        base *= base.clone();
        exp /= 2;
    }
    result
}

#[test]
fn test_binomial() {
    let table = binomial(5);
    assert_eq!(table[4], vec![1, 4, 6, 4, 1]);
    assert_eq!(table[5][2], 10);
}

#[test]
fn test_pow_nonneg() {
    assert_eq!(pow_nonneg(3u64, 0), 1);
    assert_eq!(pow_nonneg(3u64, 5), 243);
}
