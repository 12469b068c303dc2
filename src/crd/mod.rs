//! Custom Resource Definitions for the SimpleOperator controller

mod simple_operator;
pub mod types;


pub use simple_operator::{SimpleOperator, SimpleOperatorSpec, SimpleOperatorStatus};
pub use types::*;
