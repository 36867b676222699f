pub mod db;
pub mod error;
pub mod grid;
pub mod util;

pub use error::EvalError;
