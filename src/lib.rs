//! Declarative parameter specs for validating and reshaping structured input.
//!
//! Build a [`ParameterSpec`] tree (in code or from a [`SchemaDoc`]), then call
//! [`ParameterSpec::evaluate`] with a `serde_json::Value`. The result is the
//! output key and the renamed, checked, processed value, or a [`ParamError`]
//! naming the node that rejected the input.

pub mod builtin;
pub mod diagnostics;
pub mod error;
pub mod name;
pub mod param;
pub mod processor;
pub mod schema;

pub use error::{ErrorKind, ParamError};
pub use param::{DefaultPolicy, ParameterSpec, Variant};
pub use processor::{DocWriter, ProcessorSpec, Transform, register_docs};
pub use schema::SchemaDoc;

pub type Result<T> = anyhow::Result<T>;
