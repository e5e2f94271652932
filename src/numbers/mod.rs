pub mod f64;
pub mod multi_precision;
pub mod number;

pub use f64::F64;
pub use multi_precision::{MultiPrecFloat, DEFAULT_PRECISION, PRECISION};
pub use number::{all_close, all_close_with, find_distant, find_distant_with, FloatNumber, Number};
