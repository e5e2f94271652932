use thiserror::Error;

/// Shape of a derivative structure: free parameters and truncation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    pub parameters: usize,
    pub order: usize,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} parameters, order {})", self.parameters, self.order)
    }
}

/// Programmer errors detected at the API boundary.
///
/// Numeric edge cases (division by zero, logarithms of negative numbers, ...) are not errors,
/// they propagate as NaN or infinities.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DsError {
    #[error("wrong number of elements: expected {expected}, got {actual}")]
    InvalidShape { expected: usize, actual: usize },
    #[error("variable index {index} out of range for {parameters} free parameters")]
    VariableIndex { index: usize, parameters: usize },
    #[error("total derivation order {order} exceeds truncation order {max}")]
    OrderTooLarge { order: usize, max: usize },
    #[error("incompatible operands: expected {expected}, got {actual}")]
    IncompatibleOperands { expected: Shape, actual: Shape },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("index {index} out of range for {size} coefficients")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("number of elements should be positive")]
    EmptyInput,
    #[error("matrix is singular")]
    SingularMatrix,
}
