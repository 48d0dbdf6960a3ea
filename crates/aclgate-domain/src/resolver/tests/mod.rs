//! Tests for the resolver module.
//!
//! Organized by functionality:
//! - Hierarchy reconstruction
//! - Subtree path pruning


#[cfg(test)]
mod subtree_tests;
