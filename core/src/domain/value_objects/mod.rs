//! Value objects identifying a principal and carrying token material.

pub mod subject;
pub mod token;

pub use subject::Subject;
pub use token::{PlainToken, TokenHash};
