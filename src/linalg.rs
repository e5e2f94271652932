//! Dense matrix inversion for the Jacobian of Taylor maps.

use ndarray::Array2;

use crate::{error::DsError, numbers::FloatNumber};

/// Inverts square matrices.
pub trait LinearSolver<T> {
    fn invert(&self, matrix: &Array2<T>) -> Result<Array2<T>, DsError>;
}

/// LU decomposition with partial pivoting.
///
/// A pivot whose magnitude is below `threshold` makes the matrix singular.
#[derive(Clone, Debug)]
pub struct LuDecomposer<T> {
    threshold: T,
}

impl<T: FloatNumber> LuDecomposer<T> {
    pub fn new(threshold: T) -> Self {
        Self { threshold }
    }
}

impl<T: FloatNumber> Default for LuDecomposer<T> {
    fn default() -> Self {
        Self::new(T::from(1e-11))
    }
}

/// Packed factors `P A = L U`, `L` unit lower triangular below the diagonal.
struct LuFactors<T> {
    lu: Array2<T>,
    permutation: Vec<usize>,
}

impl<T: FloatNumber> LuDecomposer<T> {
    fn factor(&self, matrix: &Array2<T>) -> Result<LuFactors<T>, DsError> {
        let n = matrix.nrows();
        let mut lu = matrix.clone();
        let mut permutation = (0..n).collect::<Vec<_>>();
        for col in 0..n {
            let mut max_row = col;
            let mut max_value = lu[[col, col]].abs();
            for row in col + 1..n {
                let value = lu[[row, col]].abs();
                if value > max_value {
                    max_value = value;
                    max_row = row;
                }
            }
            if max_value.is_nan() || max_value < self.threshold {
                return Err(DsError::SingularMatrix);
            }
            if max_row != col {
                for j in 0..n {
                    lu.swap([col, j], [max_row, j]);
                }
                permutation.swap(col, max_row);
            }
            let pivot = lu[[col, col]].clone();
            for row in col + 1..n {
                let factor = lu[[row, col]].clone() / pivot.clone();
                for j in col + 1..n {
                    let update = factor.clone() * lu[[col, j]].clone();
                    lu[[row, j]] -= update;
                }
                lu[[row, col]] = factor;
            }
        }
        Ok(LuFactors { lu, permutation })
    }
}

impl<T: FloatNumber> LuFactors<T> {
    fn solve(&self, b: &[T]) -> Vec<T> {
        let n = self.permutation.len();
        let mut y = self
            .permutation
            .iter()
            .map(|&i| b[i].clone())
            .collect::<Vec<_>>();
        for i in 0..n {
            for j in 0..i {
                let update = self.lu[[i, j]].clone() * y[j].clone();
                y[i] -= update;
            }
        }
        for i in (0..n).rev() {
            for j in i + 1..n {
                let update = self.lu[[i, j]].clone() * y[j].clone();
                y[i] -= update;
            }
            y[i] /= self.lu[[i, i]].clone();
        }
        y
    }
}

impl<T: FloatNumber> LinearSolver<T> for LuDecomposer<T> {
    fn invert(&self, matrix: &Array2<T>) -> Result<Array2<T>, DsError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(DsError::DimensionMismatch {
                expected: rows,
                actual: cols,
            });
        }
        let factors = self.factor(matrix)?;
        let mut inverse = Array2::from_elem((rows, rows), T::zero());
        let mut unit = vec![T::zero(); rows];
        for j in 0..rows {
            unit[j] = T::one();
            for (i, x) in factors.solve(&unit).into_iter().enumerate() {
                inverse[[i, j]] = x;
            }
            unit[j] = T::zero();
        }
        Ok(inverse)
    }
}

#[cfg(test)]
use crate::numbers::F64;

#[cfg(test)]
fn matrix(rows: &[&[f64]]) -> Array2<F64> {
    let n = rows.len();
    let m = rows[0].len();
    Array2::from_shape_fn((n, m), |(i, j)| F64::from(rows[i][j]))
}

#[test]
fn test_invert_with_pivoting() {
    let a = matrix(&[&[0.0, 2.0, 1.0], &[1.0, 1.0, 0.0], &[3.0, 0.0, 1.0]]);
    let inverse = LuDecomposer::default().invert(&a).unwrap();
    let product = a.dot(&inverse);
    let identity = Array2::from_shape_fn((3, 3), |(i, j)| F64::from(if i == j { 1.0 } else { 0.0 }));
    crate::assert_all_close!(
        product.iter(),
        identity.iter(),
        &F64::from(1e-14),
        &F64::from(1e-14)
    );
}

#[test]
fn test_invert_two_by_two() {
    let a = matrix(&[&[2.0, 1.0], &[1.0, 3.0]]);
    let inverse = LuDecomposer::default().invert(&a).unwrap();
    let expected = matrix(&[&[0.6, -0.2], &[-0.2, 0.4]]);
    crate::assert_all_close!(inverse.iter(), expected.iter());
}

#[test]
fn test_singular_and_non_square() {
    let singular = matrix(&[&[1.0, 2.0], &[2.0, 4.0]]);
    assert_eq!(
        LuDecomposer::default().invert(&singular),
        Err(DsError::SingularMatrix)
    );
    let rectangular = matrix(&[&[1.0, 2.0, 3.0], &[2.0, 4.0, 5.0]]);
    assert_eq!(
        LuDecomposer::default().invert(&rectangular),
        Err(DsError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    );
}
