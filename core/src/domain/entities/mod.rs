//! Domain entities representing persisted state.

pub mod token_record;


pub use token_record::TokenRecord;
