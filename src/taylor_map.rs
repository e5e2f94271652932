//! Vector functions expanded around a point, with composition and local inversion.

use std::sync::Arc;

use ndarray::Array2;

use crate::{
    error::DsError, linalg::LinearSolver, numbers::FloatNumber, structure::DerivativeStructure,
};

/// Truncated Taylor expansion of a map `ℝᵖ → ℝᵐ` around `point`.
///
/// All functions share the same number of free parameters `p` (the length of `point`) and the
/// same truncation order.
#[derive(Clone)]
pub struct TaylorMap<T> {
    point: Vec<T>,
    functions: Vec<DerivativeStructure<T>>,
}

impl<T: FloatNumber> TaylorMap<T> {
    pub fn new(point: Vec<T>, functions: Vec<DerivativeStructure<T>>) -> Result<Self, DsError> {
        if point.is_empty() {
            return Err(DsError::EmptyInput);
        }
        let Some(first) = functions.first() else {
            return Err(DsError::EmptyInput);
        };
        if point.len() != first.free_parameters() {
            return Err(DsError::DimensionMismatch {
                expected: first.free_parameters(),
                actual: point.len(),
            });
        }
        for f in &functions[1..] {
            first.check_compatibility(f)?;
        }
        Ok(Self { point, functions })
    }

    /// Map whose function `i` is free parameter `i`, expanded at the origin.
    pub fn identity(parameters: usize, order: usize, nb_functions: usize) -> Result<Self, DsError> {
        if parameters == 0 || nb_functions == 0 {
            return Err(DsError::EmptyInput);
        }
        let functions = (0..nb_functions)
            .map(|i| DerivativeStructure::variable(parameters, order, i, T::zero()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            point: vec![T::zero(); parameters],
            functions,
        })
    }

    pub fn nb_parameters(&self) -> usize {
        self.point.len()
    }

    pub fn nb_functions(&self) -> usize {
        self.functions.len()
    }

    pub fn point(&self) -> &[T] {
        &self.point
    }

    pub fn function(&self, i: usize) -> &DerivativeStructure<T> {
        &self.functions[i]
    }

    pub fn functions(&self) -> &[DerivativeStructure<T>] {
        &self.functions
    }

    /// Evaluates every function at the offset `delta` from the expansion point.
    pub fn value(&self, delta: &[T]) -> Result<Vec<T>, DsError> {
        self.functions.iter().map(|f| f.taylor(delta)).collect()
    }

    /// `self ∘ inner`: expands `self` in the parameters of `inner`, around the point of `inner`.
    pub fn compose(&self, inner: &Self) -> Result<Self, DsError> {
        if self.nb_parameters() != inner.nb_functions() {
            return Err(DsError::DimensionMismatch {
                expected: self.nb_parameters(),
                actual: inner.nb_functions(),
            });
        }
        let functions = self
            .functions
            .iter()
            .map(|f| f.rebase(&inner.functions))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            point: inner.point.clone(),
            functions,
        })
    }

    fn subtract(&self, other: &Self) -> Result<Self, DsError> {
        let functions = self
            .functions
            .iter()
            .zip(&other.functions)
            .map(|(a, b)| a.try_sub(b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            point: vec![T::zero(); self.point.len()],
            functions,
        })
    }

    /// Local inverse of a square map, expanded around the image of the point.
    ///
    /// The linear part is inverted by `solver`. Each fixed point iteration
    /// `M⁻¹ ← L⁻¹ ∘ (I - N ∘ M⁻¹)`, with `L` the linear and `N` the nonlinear part, fixes one
    /// more derivation order.
    pub fn invert(&self, solver: &impl LinearSolver<T>) -> Result<Self, DsError> {
        let n = self.functions.len();
        let first = self.functions.first().ok_or(DsError::EmptyInput)?;
        if first.free_parameters() != n {
            return Err(DsError::DimensionMismatch {
                expected: n,
                actual: first.free_parameters(),
            });
        }
        let compiler = Arc::clone(first.compiler());
        let order = compiler.order();
        if order == 0 {
            return Err(DsError::OrderTooLarge { order: 1, max: 0 });
        }

        // linear index of ∂/∂p_j, j = 0..n
        let indirection = (1..compiler.size())
            .filter(|&k| compiler.orders_sum(k) == 1)
            .take(n)
            .collect::<Vec<_>>();

        let mut linear = Array2::from_elem((n, n), T::zero());
        let mut non_linear = Vec::with_capacity(n);
        for (i, f) in self.functions.iter().enumerate() {
            let mut data = f.all_derivatives().to_vec();
            data[0] = T::zero();
            for (j, &k) in indirection.iter().enumerate() {
                linear[[i, j]] = std::mem::replace(&mut data[k], T::zero());
            }
            non_linear.push(DerivativeStructure::from_parts(Arc::clone(&compiler), data));
        }
        let non_linear = Self {
            point: vec![T::zero(); n],
            functions: non_linear,
        };

        let linear_inverse = solver.invert(&linear)?;
        let linear_inverse = Self {
            point: vec![T::zero(); n],
            functions: (0..n)
                .map(|i| {
                    let mut data = vec![T::zero(); compiler.size()];
                    for (j, &k) in indirection.iter().enumerate() {
                        data[k] = linear_inverse[[i, j]].clone();
                    }
                    DerivativeStructure::from_parts(Arc::clone(&compiler), data)
                })
                .collect(),
        };

        let identity = Self::identity(n, order, n)?;
        let mut inverse = linear_inverse.clone();
        for _ in 1..order {
            inverse = linear_inverse.compose(&identity.subtract(&non_linear.compose(&inverse)?)?)?;
        }

        for (i, f) in self.functions.iter().enumerate() {
            inverse.point[i] = f.value().clone();
            inverse.functions[i].set_derivative(0, self.point[i].clone())?;
        }
        Ok(inverse)
    }
}

#[cfg(test)]
use crate::{linalg::LuDecomposer, numbers::F64};

#[cfg(test)]
fn assert_structures_close(
    expected: &DerivativeStructure<F64>,
    actual: &DerivativeStructure<F64>,
    tolerance: f64,
) {
    assert_eq!(expected.shape(), actual.shape());
    crate::assert_all_close!(
        actual.all_derivatives(),
        expected.all_derivatives(),
        &F64::from(tolerance),
        &F64::from(tolerance)
    );
}

#[cfg(test)]
fn offsets() -> impl Iterator<Item = (f64, f64)> {
    (-10..10).flat_map(|i| (-10..10).map(move |j| (f64::from(i) * 0.01, f64::from(j) * 0.01)))
}

#[test]
fn test_invalid_maps() {
    let f = DerivativeStructure::constant(2, 2, F64::from(0.0));
    assert_eq!(
        TaylorMap::new(vec![], vec![f.clone()]).err(),
        Some(DsError::EmptyInput)
    );
    assert_eq!(
        TaylorMap::new(vec![F64::from(0.0); 2], vec![]).err(),
        Some(DsError::EmptyInput)
    );
    assert_eq!(
        TaylorMap::new(vec![F64::from(0.0); 1], vec![f.clone()]).err(),
        Some(DsError::DimensionMismatch {
            expected: 2,
            actual: 1
        })
    );
    let g = DerivativeStructure::constant(2, 1, F64::from(1.0));
    assert!(matches!(
        TaylorMap::new(vec![F64::from(0.0); 2], vec![f, g]).err(),
        Some(DsError::IncompatibleOperands { .. })
    ));
}

#[test]
fn test_sizes() {
    let functions = vec![DerivativeStructure::constant(6, 6, F64::from(0.0)); 3];
    let map = TaylorMap::new(vec![F64::from(0.0); 6], functions).unwrap();
    assert_eq!(map.nb_parameters(), 6);
    assert_eq!(map.nb_functions(), 3);
}

#[test]
fn test_identity() {
    let map = TaylorMap::<F64>::identity(7, 3, 4).unwrap();
    assert_eq!(map.point(), &[F64::from(0.0); 7]);
    for (i, f) in map.functions().iter().enumerate() {
        let mut orders = vec![0; 7];
        orders[i] = 1;
        let one = f.compiler().index_of(&orders).unwrap();
        for (k, x) in f.all_derivatives().iter().enumerate() {
            assert_eq!(*x, F64::from(if k == one { 1.0 } else { 0.0 }));
        }
    }
    assert!(TaylorMap::<F64>::identity(2, 3, 3).is_err());
}

#[test]
fn test_empty_identity() {
    assert_eq!(
        TaylorMap::<F64>::identity(2, 2, 0).err(),
        Some(DsError::EmptyInput)
    );
    assert_eq!(
        TaylorMap::<F64>::identity(0, 2, 1).err(),
        Some(DsError::EmptyInput)
    );
}

#[test]
fn test_value() {
    let p0 = DerivativeStructure::variable(2, 3, 0, F64::from(1.0)).unwrap();
    let p1 = DerivativeStructure::variable(2, 3, 1, F64::from(-3.0)).unwrap();
    let f0 = p0.sin();
    let f1 = p0.clone() + p1.clone();
    let map = TaylorMap::new(vec![*p0.value(), *p1.value()], vec![f0.clone(), f1.clone()]).unwrap();
    for (dp0, dp1) in offsets() {
        let delta = [F64::from(dp0), F64::from(dp1)];
        let value = map.value(&delta).unwrap();
        assert_eq!(value, vec![f0.taylor(&delta).unwrap(), f1.taylor(&delta).unwrap()]);
    }
}

#[test]
fn test_compose() {
    let p0 = DerivativeStructure::variable(2, 2, 0, F64::from(1.0)).unwrap();
    let p1 = DerivativeStructure::variable(2, 2, 1, F64::from(-3.0)).unwrap();
    let g0 = p0.sin();
    let g1 = p0.clone() + p1.clone();
    let g2 = p1.clone() * p0.clone();
    let v = |i, x: &DerivativeStructure<F64>| DerivativeStructure::variable(3, 2, i, *x.value()).unwrap();
    let f0 = v(0, &g0) + v(1, &g1);
    let f1 = v(0, &g0) - v(1, &g1) + v(2, &g2);
    let map_g = TaylorMap::new(
        vec![*p0.value(), *p1.value()],
        vec![g0.clone(), g1.clone(), g2.clone()],
    )
    .unwrap();
    let map_f = TaylorMap::new(vec![*g0.value(), *g1.value(), *g2.value()], vec![f0, f1]).unwrap();
    let composed = map_f.compose(&map_g).unwrap();
    assert_eq!(composed.point(), map_g.point());

    let tolerance = F64::from(1e-14);
    for (dp0, dp1) in offsets() {
        let delta = [F64::from(dp0), F64::from(dp1)];
        let value = composed.value(&delta).unwrap();
        let (t0, t1, t2) = (
            g0.taylor(&delta).unwrap(),
            g1.taylor(&delta).unwrap(),
            g2.taylor(&delta).unwrap(),
        );
        crate::assert_close!(value[0], t0 + t1, tolerance, tolerance);
        crate::assert_close!(value[1], t0 - t1 + t2, tolerance, tolerance);
    }

    let (x0, x1) = (1.0f64, -3.0f64);
    let partial = |i: usize, orders: &[usize]| composed.function(i).partial_derivative(orders).unwrap();
    let expected = [
        (0, [1, 0], x0.cos() + 1.0),
        (0, [0, 1], 1.0),
        (1, [1, 0], x0.cos() - 1.0 + x1),
        (1, [0, 1], -1.0 + x0),
        (0, [2, 0], -x0.sin()),
        (0, [1, 1], 0.0),
        (0, [0, 2], 0.0),
        (1, [2, 0], -x0.sin()),
        (1, [1, 1], 1.0),
        (1, [0, 2], 0.0),
    ];
    for (i, orders, value) in expected {
        crate::assert_close!(partial(i, &orders), F64::from(value), tolerance, tolerance);
    }
}

#[test]
fn test_compose_dimension_mismatch() {
    let map = TaylorMap::<F64>::identity(2, 2, 2).unwrap();
    let inner = TaylorMap::<F64>::identity(2, 2, 1).unwrap();
    assert_eq!(
        map.compose(&inner).err(),
        Some(DsError::DimensionMismatch {
            expected: 2,
            actual: 1
        })
    );
}

#[test]
fn test_compose_with_identity() {
    let p0 = DerivativeStructure::variable(2, 3, 0, F64::from(0.5)).unwrap();
    let p1 = DerivativeStructure::variable(2, 3, 1, F64::from(0.25)).unwrap();
    let map = TaylorMap::new(
        vec![F64::from(0.5), F64::from(0.25)],
        vec![(p0.clone() * p1.clone()).exp(), p0.clone() - p1.cos()],
    )
    .unwrap();
    let identity = TaylorMap::identity(2, 3, 2).unwrap();
    let composed = map.compose(&identity).unwrap();
    for (f, g) in map.functions().iter().zip(composed.functions()) {
        assert_structures_close(f, g, 1e-15);
    }
}

#[test]
fn test_invert_non_square() {
    let p0 = DerivativeStructure::variable(2, 2, 0, F64::from(1.0)).unwrap();
    let p1 = DerivativeStructure::variable(2, 2, 1, F64::from(-3.0)).unwrap();
    let sum = p0.clone() + p1.clone();
    let map = TaylorMap::new(vec![F64::from(1.0), F64::from(-3.0)], vec![p0, p1, sum]).unwrap();
    assert_eq!(
        map.invert(&LuDecomposer::default()).err(),
        Some(DsError::DimensionMismatch {
            expected: 3,
            actual: 2
        })
    );
}

#[test]
fn test_invert_singular() {
    let x = DerivativeStructure::variable(1, 3, 0, F64::from(0.0)).unwrap();
    // x² has a vanishing first derivative at 0
    let map = TaylorMap::new(vec![F64::from(0.0)], vec![x.clone() * x]).unwrap();
    assert_eq!(
        map.invert(&LuDecomposer::default()).err(),
        Some(DsError::SingularMatrix)
    );
}

#[test]
fn test_invert_mono_dimensional() {
    for i in 0..12 {
        let x = DerivativeStructure::variable(1, 6, 0, F64::from(f64::from(i) * 0.25)).unwrap();
        let exp_map = TaylorMap::new(vec![*x.value()], vec![x.exp()]).unwrap();
        let inverse = exp_map.invert(&LuDecomposer::default()).unwrap();
        assert_eq!(inverse.point(), &[*exp_map.function(0).value()]);
        let ln = DerivativeStructure::variable(1, 6, 0, *exp_map.function(0).value())
            .unwrap()
            .ln();
        crate::assert_all_close!(
            inverse.function(0).all_derivatives(),
            ln.all_derivatives(),
            &F64::from(1e-12),
            &F64::from(4.7e-13)
        );
    }
}

#[test]
fn test_invert_bi_dimensional() {
    for (x0, y0) in [(1.5, 0.5), (-1.2, 0.7), (0.3, -1.9), (-0.8, -0.6)] {
        let x = DerivativeStructure::variable(2, 4, 0, F64::from(x0)).unwrap();
        let y = DerivativeStructure::variable(2, 4, 1, F64::from(y0)).unwrap();
        let polar = TaylorMap::new(
            vec![F64::from(x0), F64::from(y0)],
            vec![x.try_hypot(&y).unwrap(), y.try_atan2(&x).unwrap()],
        )
        .unwrap();
        let cartesian = polar.invert(&LuDecomposer::default()).unwrap();
        let round_trip = cartesian.compose(&polar).unwrap();
        assert_structures_close(&x, round_trip.function(0), 2.8e-9);
        assert_structures_close(&y, round_trip.function(1), 2.8e-9);
    }
}
