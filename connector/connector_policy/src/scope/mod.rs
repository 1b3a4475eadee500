//! Policy scoping.
//!
//! Target binding lives on the model (`Policy::with_target`,
//! `Policy::retain_target`); this module adds registry-driven filtering.

mod filter;

pub use filter::ScopeFilter;
