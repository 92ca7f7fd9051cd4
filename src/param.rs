//! Parameter specs: the tree that describes expected input and how to turn it
//! into output.
//!
//! A [`ParameterSpec`] is built once with the fluent builder methods and then
//! evaluated against many values:
//!
//! ```
//! use serde_json::json;
//! use smartify::ParameterSpec;
//!
//! let user = ParameterSpec::mapping("user").set_fields([
//!     ParameterSpec::atom("name->n"),
//!     ParameterSpec::atom("age->a").null(true),
//! ]);
//!
//! let (key, out) = user.evaluate(json!({ "n": "Bob" })).unwrap();
//! assert_eq!(key, "user");
//! assert_eq!(out, json!({ "name": "Bob", "age": null }));
//! ```
//!
//! Evaluation order per node: null/default handling, shape check (recursing
//! into mapping fields or sequence elements), then the processor chain.

use crate::error::{ParamError, Result};
use crate::name::arrow_extract;
use crate::processor::{ProcessorSpec, Transform, kind_name};

use serde_json::{Map, Value};
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Structural kind a node expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Atomic,
    Sequence,
    Mapping,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Atomic => "atom",
            Variant::Sequence => "list",
            Variant::Mapping => "dict",
        })
    }
}

/// What to do when a node receives null and is not nullable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultPolicy {
    #[default]
    NoDefault,
    Default {
        value: Value,
        through_processors: bool,
    },
}

/// One node of a specification tree.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    name: String,
    read_name: String,
    yield_name: String,
    variant: Variant,
    nullable: bool,
    default: DefaultPolicy,
    processors: Vec<ProcessorSpec>,
    fields: Vec<ParameterSpec>,
    // Shared on clone: element specs are treated as reusable schema fragments.
    child: Option<Arc<ParameterSpec>>,
}

impl ParameterSpec {
    /// An atomic spec. `name` may use the `"yield->canonical"` form.
    pub fn new(name: &str) -> Self {
        Self::with_names(name, None, None, Variant::Atomic)
    }

    pub fn atom(name: &str) -> Self {
        Self::new(name)
    }

    pub fn sequence(name: &str) -> Self {
        Self::with_names(name, None, None, Variant::Sequence)
    }

    pub fn mapping(name: &str) -> Self {
        Self::with_names(name, None, None, Variant::Mapping)
    }

    /// Full constructor. An explicit `yield_name` beats the arrow form.
    pub fn with_names(
        name: &str,
        read_name: Option<&str>,
        yield_name: Option<&str>,
        variant: Variant,
    ) -> Self {
        let (arrow_yield, name) = arrow_extract(name);
        let read_name = read_name.map_or_else(|| name.clone(), str::to_string);
        let yield_name = yield_name
            .map(str::to_string)
            .or(arrow_yield)
            .unwrap_or_else(|| name.clone());

        Self {
            name,
            read_name,
            yield_name,
            variant,
            nullable: false,
            default: DefaultPolicy::NoDefault,
            processors: Vec::new(),
            fields: Vec::new(),
            child: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_name(&self) -> &str {
        &self.read_name
    }

    /// Output key before any processor override.
    pub fn yield_name(&self) -> &str {
        &self.yield_name
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn is_atom(&self) -> bool {
        self.variant == Variant::Atomic
    }

    pub fn is_sequence(&self) -> bool {
        self.variant == Variant::Sequence
    }

    pub fn is_mapping(&self) -> bool {
        self.variant == Variant::Mapping
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_policy(&self) -> &DefaultPolicy {
        &self.default
    }

    pub fn has_default(&self) -> bool {
        !matches!(self.default, DefaultPolicy::NoDefault)
    }

    pub fn processors(&self) -> &[ProcessorSpec] {
        &self.processors
    }

    pub fn fields(&self) -> &[ParameterSpec] {
        &self.fields
    }

    pub fn element(&self) -> Option<&Arc<ParameterSpec>> {
        self.child.as_ref()
    }

    /// Change the canonical name.
    ///
    /// Read and yield names follow the new name unless given explicitly, or
    /// kept as they were when `stay_origin` is set.
    pub fn rename(
        mut self,
        name: &str,
        read_name: Option<&str>,
        yield_name: Option<&str>,
        stay_origin: bool,
    ) -> Self {
        self.name = name.to_string();
        self.read_name = match read_name {
            Some(r) => r.to_string(),
            None if stay_origin => self.read_name,
            None => name.to_string(),
        };
        self.yield_name = match yield_name {
            Some(y) => y.to_string(),
            None if stay_origin => self.yield_name,
            None => name.to_string(),
        };
        self
    }

    pub fn null(mut self, allow: bool) -> Self {
        self.nullable = allow;
        self
    }

    /// Install (`allow`) or clear a default value.
    pub fn set_default(mut self, value: Value, allow: bool, through_processors: bool) -> Self {
        self.default = if allow {
            DefaultPolicy::Default {
                value,
                through_processors,
            }
        } else {
            DefaultPolicy::NoDefault
        };
        self
    }

    /// Default returned as-is when the input is null.
    pub fn default(self, value: Value) -> Self {
        self.set_default(value, true, false)
    }

    /// Default that still goes through shape checks and processors.
    pub fn default_through_processors(self, value: Value) -> Self {
        self.set_default(value, true, true)
    }

    pub fn no_default(self) -> Self {
        self.set_default(Value::Null, false, false)
    }

    /// Insert a step at the front (`prepend`) or the back of the chain.
    pub fn add_processor(mut self, processor: impl Into<ProcessorSpec>, prepend: bool) -> Self {
        let processor = processor.into();
        if prepend {
            self.processors.insert(0, processor);
        } else {
            self.processors.push(processor);
        }
        self
    }

    pub fn process<F>(self, func: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.add_processor(Transform::new(func), false)
    }

    pub fn process_first<F>(self, func: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.add_processor(Transform::new(func), true)
    }

    /// Append a validate-only step; its return value is ignored.
    pub fn validate<F>(self, func: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.add_processor(ProcessorSpec::validator(Transform::new(func)), false)
    }

    pub fn validate_first<F>(self, func: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.add_processor(ProcessorSpec::validator(Transform::new(func)), true)
    }

    /// Replace the field list of a mapping spec.
    pub fn set_fields(mut self, fields: impl IntoIterator<Item = ParameterSpec>) -> Self {
        debug_assert!(self.is_mapping(), "set_fields on non-mapping spec {}", self);
        self.fields = fields.into_iter().collect();
        self
    }

    /// Append fields to a mapping spec.
    pub fn add_fields(mut self, fields: impl IntoIterator<Item = ParameterSpec>) -> Self {
        debug_assert!(self.is_mapping(), "add_fields on non-mapping spec {}", self);
        self.fields.extend(fields);
        self
    }

    pub fn field(self, field: ParameterSpec) -> Self {
        self.add_fields([field])
    }

    /// Replace the element spec of a sequence spec; `None` lets elements through.
    pub fn set_child(mut self, child: Option<ParameterSpec>) -> Self {
        debug_assert!(self.is_sequence(), "set_child on non-sequence spec {}", self);
        self.child = child.map(Arc::new);
        self
    }

    pub fn child(self, child: ParameterSpec) -> Self {
        self.set_child(Some(child))
    }

    /// Evaluate `value` against this spec, returning `(output key, output value)`.
    pub fn evaluate(&self, value: Value) -> Result<(String, Value)> {
        let mut yield_name = self.yield_name.clone();
        let mut value = value;

        if value.is_null() {
            if self.nullable {
                return Ok((yield_name, Value::Null));
            }
            match &self.default {
                DefaultPolicy::Default {
                    value: default,
                    through_processors,
                } => {
                    tracing::trace!(param = %self, through_processors, "substituting default");
                    if !through_processors {
                        return Ok((yield_name, default.clone()));
                    }
                    value = default.clone();
                }
                DefaultPolicy::NoDefault => {
                    return Err(ParamError::null_not_allowed(&self.name, &self.read_name));
                }
            }
        }

        value = match self.variant {
            Variant::Atomic => value,
            Variant::Sequence => self.evaluate_elements(value)?,
            Variant::Mapping => self.evaluate_fields(value)?,
        };

        for processor in &self.processors {
            let result = processor.call(&value).map_err(|err| {
                match err.downcast::<ParamError>() {
                    Ok(typed) => typed,
                    Err(err) => {
                        tracing::debug!(param = %self, error = %err, "processor failed");
                        ParamError::crushed(
                            processor.only_validate(),
                            &self.name,
                            &self.read_name,
                            err.to_string(),
                        )
                    }
                }
            })?;

            if processor.only_validate() {
                continue;
            }
            if let Some(name) = processor.yield_name() {
                tracing::trace!(param = %self, yield_name = name, "output key overridden");
                yield_name = name.to_string();
            }
            value = result;
        }

        Ok((yield_name, value))
    }

    fn evaluate_elements(&self, value: Value) -> Result<Value> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                tracing::debug!(param = %self, got = kind_name(&other), "expected list");
                return Err(ParamError::require_sequence(&self.name, &self.read_name));
            }
        };
        let Some(child) = &self.child else {
            return Ok(Value::Array(items));
        };

        let items = items
            .into_iter()
            .map(|item| child.evaluate(item).map(|(_, v)| v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    fn evaluate_fields(&self, value: Value) -> Result<Value> {
        let entries = match value {
            Value::Object(entries) => entries,
            other => {
                tracing::debug!(param = %self, got = kind_name(&other), "expected dict");
                return Err(ParamError::require_mapping(&self.name, &self.read_name));
            }
        };

        let mut out = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let raw = entries.get(&field.name).cloned().unwrap_or(Value::Null);
            let (key, v) = field.evaluate(raw)?;
            if out.insert(key.clone(), v).is_some() {
                tracing::debug!(param = %self, key = %key, "duplicate output key overwritten");
            }
        }
        Ok(Value::Object(out))
    }

    /// Indented outline of the tree, one node per line, processors below.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        let _ = write!(out, "{}{} [{}]", pad, self, self.variant);
        if self.yield_name != self.name {
            let _ = write!(out, " -> {}", self.yield_name);
        }
        if self.nullable {
            out.push_str(" nullable");
        }
        if let DefaultPolicy::Default {
            value,
            through_processors,
        } = &self.default
        {
            let _ = write!(out, " default={}", value);
            if *through_processors {
                out.push_str(" (processed)");
            }
        }
        out.push('\n');

        for (i, p) in self.processors.iter().enumerate() {
            let role = if p.only_validate() { "validate" } else { "process" };
            let _ = write!(out, "{}  {}. {}: {}", pad, i + 1, role, p.doc());
            if let Some(y) = p.yield_name() {
                let _ = write!(out, " -> {}", y);
            }
            out.push('\n');
        }

        match self.variant {
            Variant::Atomic => {}
            Variant::Sequence => {
                if let Some(child) = &self.child {
                    child.describe_into(out, depth + 1);
                }
            }
            Variant::Mapping => {
                for field in &self.fields {
                    field.describe_into(out, depth + 1);
                }
            }
        }
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.read_name)
    }
}
