//! MySQL implementations of core storage traits

pub mod token_store;

#[cfg(test)]
mod tests;

pub use token_store::MySqlTokenStore;
