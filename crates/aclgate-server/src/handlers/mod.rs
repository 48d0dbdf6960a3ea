//! Request handlers orchestrating the domain layer and the store.

pub mod load;

pub use load::{DocumentLoad, LoadHandler, LoadReport};
