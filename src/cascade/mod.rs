//! Cascading selector chains
//!
//! A chain is an ordered set of selection fields where each field's options
//! depend on the values chosen in earlier fields. Choosing a value clears
//! everything downstream of it and fetches options for whichever dependents
//! became ready; responses that arrive after a newer request was issued are
//! dropped.
//!
//! # Pieces
//!
//! - [`chain`]: field declarations and validated dependency edges
//! - [`gate`]: may a field fetch with the current context?
//! - [`fetcher`]: issue fetches and reconcile results against races
//! - [`selection`]: apply a value and cascade invalidation
//! - [`controller`]: owns the state and wires the above together

pub mod chain;
pub mod context;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod field;
pub mod gate;
pub mod option;
pub mod selection;


pub use chain::{Chain, FieldSpec};
pub use context::{DependencyContext, FieldKey};
pub use controller::ChainController;
pub use error::{ChainError, FetchError};
pub use fetcher::{FetchCompletion, OptionFuture, OptionSource};
pub use field::FieldPhase;
pub use option::SelectOption;
