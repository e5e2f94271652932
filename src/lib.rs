#![warn(clippy::pedantic)]
#![expect(clippy::module_name_repetitions)]
#![expect(clippy::must_use_candidate)]
#![expect(clippy::return_self_not_must_use)]
#![expect(clippy::cast_possible_truncation)]
#![expect(clippy::cast_possible_wrap)]
#![expect(clippy::cast_sign_loss)]
#![expect(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::assigning_clones)]

pub mod compiler;
pub mod error;
pub mod functions;
pub mod linalg;
pub mod numbers;
pub mod structure;
pub mod taylor_map;
pub mod util;

pub use compiler::{DsCompiler, TableCache};
pub use error::{DsError, Shape};
pub use linalg::{LinearSolver, LuDecomposer};
pub use structure::DerivativeStructure;
pub use taylor_map::TaylorMap;
