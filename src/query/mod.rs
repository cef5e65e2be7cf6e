//! Row predicates used by the storage collaborator interface

mod filter;

pub use filter::{CompareOp, Filter};
