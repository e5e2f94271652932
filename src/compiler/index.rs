//! Canonical bijection between multi-indices of derivation orders and linear positions.
//!
//! The layout for `p` parameters and order `n` is defined recursively on the last parameter:
//! first every multi-index whose last order is zero (laid out as for `p - 1` parameters and
//! order `n`), then every multi-index whose last order is positive (laid out as for `p`
//! parameters and order `n - 1`, with the last order incremented).

/// `sizes[i][j]` is the number of multi-indices for `i` parameters and order `j`.
pub(crate) fn compile_sizes(
    parameters: usize,
    order: usize,
    value_sizes: Option<&[Vec<usize>]>,
) -> Vec<Vec<usize>> {
    match value_sizes {
        None => vec![vec![1; order + 1]],
        Some(value_sizes) => {
            debug_assert!(parameters > 0);
            let mut sizes = value_sizes[..parameters].to_vec();
            let mut row = vec![1; order + 1];
            for i in 0..order {
                row[i + 1] = row[i] + sizes[parameters - 1][i + 1];
            }
            sizes.push(row);
            sizes
        }
    }
}

/// Multi-indices in canonical order, built from the value part and the derivative part.
pub(crate) fn compile_derivatives_orders(
    parameters: usize,
    value_orders: Option<&[Vec<usize>]>,
    derivative_orders: Option<&[Vec<usize>]>,
) -> Vec<Vec<usize>> {
    let (Some(value_orders), Some(derivative_orders)) = (value_orders, derivative_orders) else {
        return vec![vec![0; parameters]];
    };
    let mut orders = Vec::with_capacity(value_orders.len() + derivative_orders.len());
    for value in value_orders {
        let mut multi_index = value.clone();
        multi_index.push(0);
        orders.push(multi_index);
    }
    for derivative in derivative_orders {
        let mut multi_index = derivative.clone();
        multi_index[parameters - 1] += 1;
        orders.push(multi_index);
    }
    orders
}

/// Linear index of a multi-index.
///
/// The caller guarantees `orders.len() == parameters` and `orders.iter().sum() <= order`.
pub(crate) fn partial_derivative_index(
    parameters: usize,
    order: usize,
    sizes: &[Vec<usize>],
    orders: &[usize],
) -> usize {
    debug_assert_eq!(orders.len(), parameters);
    debug_assert!(orders.iter().sum::<usize>() <= order);
    let mut index = 0;
    let mut m = order;
    for i in (0..parameters).rev() {
        // skip the value part once per derivation along parameter i
        for _ in 0..orders[i] {
            index += sizes[i][m];
            m -= 1;
        }
    }
    index
}

/// `C(parameters + order, parameters)`, computed without intermediate overflow for table sizes
/// that fit in memory.
pub fn size(parameters: usize, order: usize) -> usize {
    let k = parameters.min(order);
    let mut result = 1usize;
    for i in 1..=k {
        result = result * (parameters + order + 1 - i) / i;
    }
    result
}

#[test]
fn test_sizes_recurrence() {
    let sizes = compile_sizes(0, 4, None);
    let sizes = compile_sizes(1, 4, Some(&sizes));
    let sizes = compile_sizes(2, 4, Some(&sizes));
    assert_eq!(sizes[0], vec![1, 1, 1, 1, 1]);
    assert_eq!(sizes[1], vec![1, 2, 3, 4, 5]);
    assert_eq!(sizes[2], vec![1, 3, 6, 10, 15]);
}

#[test]
fn test_size_is_binomial_and_symmetric() {
    for p in 0..8 {
        for n in 0..8 {
            assert_eq!(size(p, n), size(n, p));
            if p > 0 && n > 0 {
                assert_eq!(size(p, n), size(p - 1, n) + size(p, n - 1));
            }
        }
    }
    assert_eq!(size(3, 7), 120);
    assert_eq!(size(6, 6), 924);
}
