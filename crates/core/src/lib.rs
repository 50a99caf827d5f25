//! Provider-independent contract for the monotable object-persistence layer.
//!
//! This crate defines the pieces that do not depend on any particular
//! provider binding: the error taxonomy, the neutral query parameter model,
//! the stream record/option/progress types, and the `DataStore` trait that
//! storage backends implement.

pub mod storage;
