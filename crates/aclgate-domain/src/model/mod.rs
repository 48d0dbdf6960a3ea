//! Data model shared by the translator and the resolvers.
//!
//! This module contains:
//! - The relationship tuple and its text grammar
//! - The typed configuration document and its decode rules
//! - The resource tree node returned by the resolvers
//! - Resource type and relation names

mod document;
mod node;
mod tuple;
mod vocabulary;
#[cfg(test)]
mod tuple_proptest;

pub use document::*;
pub use node::{Node, SYNTHETIC_ROOT_ID};
pub use tuple::{ObjectRef, Tuple, TupleParseError, WILDCARD};
pub use vocabulary::{relation, resource_type};
