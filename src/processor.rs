//! Processor steps: one transformation or validation applied to a value.
//!
//! A [`Transform`] is the callable plus enough identity to look up its
//! documentation. A [`ProcessorSpec`] wraps a transform with the flags the
//! evaluator cares about (validate-only, output key override) and a resolved
//! description.

use crate::error::ParamError;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::RegexBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

pub type TransformFn = dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync;

/// Attached doc for transforms built by [`re_searcher`].
const PATTERN_DOC: &str = "Extract/Validate information using RegExp";

/// A value-to-value function with an optional registry key and doc.
#[derive(Clone)]
pub struct Transform {
    key: Option<String>,
    doc: Option<String>,
    func: Arc<TransformFn>,
}

impl Transform {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            key: None,
            doc: None,
            func: Arc::new(func),
        }
    }

    /// A transform with a registry key, used to resolve registered docs.
    pub fn named<F>(key: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            key: Some(key.into()),
            ..Self::new(func)
        }
    }

    /// Attach the transform's own documentation.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn call(&self, value: &Value) -> anyhow::Result<Value> {
        (self.func)(value)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("key", &self.key)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Registered description for a transform key.
#[derive(Clone)]
pub enum DocWriter {
    Text(String),
    Writer(fn(&Transform) -> String),
}

impl fmt::Debug for DocWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocWriter::Text(text) => f.debug_tuple("Text").field(text).finish(),
            DocWriter::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

static DOC_WRITERS: Lazy<RwLock<HashMap<String, DocWriter>>> = Lazy::new(|| {
    let seeded = [
        ("str", "Convert type to string"),
        ("int", "Convert type to integer"),
        ("float", "Convert type to float"),
        ("bool", "Convert type to boolean"),
    ];
    RwLock::new(
        seeded
            .into_iter()
            .map(|(k, v)| (k.to_string(), DocWriter::Text(v.to_string())))
            .collect(),
    )
});

/// Register (or replace) descriptions for transform keys.
///
/// Only processors constructed after the call see the new descriptions.
pub fn register_docs<I, K>(writers: I)
where
    I: IntoIterator<Item = (K, DocWriter)>,
    K: Into<String>,
{
    let mut table = DOC_WRITERS.write().unwrap_or_else(|e| e.into_inner());
    for (key, writer) in writers {
        table.insert(key.into(), writer);
    }
}

fn registered_doc(transform: &Transform) -> Option<String> {
    let key = transform.key()?;
    let table = DOC_WRITERS.read().unwrap_or_else(|e| e.into_inner());
    match table.get(key)? {
        DocWriter::Text(text) => Some(text.clone()),
        DocWriter::Writer(write) => Some(write(transform)),
    }
}

/// Short name of a value's JSON type, for diagnostics.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Compile `pattern` into a search transform.
///
/// `.` matches line breaks. The result is `[whole, group1, ...]` with `null`
/// for groups that did not take part in the match.
pub fn re_searcher(pattern: &str) -> Result<Transform, regex::Error> {
    let re = RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .build()?;

    let transform = Transform::new(move |value| {
        let text = value
            .as_str()
            .ok_or_else(|| anyhow!("expected string, got {}", kind_name(value)))?;
        let caps = re.captures(text).ok_or(ParamError::PatternNotMatch)?;
        Ok(Value::Array(
            caps.iter()
                .map(|m| m.map_or(Value::Null, |m| Value::String(m.as_str().to_string())))
                .collect(),
        ))
    });
    Ok(transform.with_doc(PATTERN_DOC))
}

/// One step of a parameter's processor chain.
#[derive(Debug, Clone)]
pub struct ProcessorSpec {
    transform: Transform,
    only_validate: bool,
    yield_name: Option<String>,
    doc: String,
}

impl ProcessorSpec {
    /// Build a step. `doc` wins over any registered or attached description.
    pub fn new(
        transform: Transform,
        only_validate: bool,
        yield_name: Option<String>,
        doc: Option<String>,
    ) -> Self {
        let doc = doc
            .or_else(|| registered_doc(&transform))
            .or_else(|| transform.doc().map(str::to_string))
            .unwrap_or_else(|| {
                let fallback = if only_validate { "Validator" } else { "Processor" };
                fallback.to_string()
            });

        Self {
            transform,
            only_validate,
            yield_name,
            doc,
        }
    }

    pub fn processor(transform: Transform) -> Self {
        Self::new(transform, false, None, None)
    }

    pub fn validator(transform: Transform) -> Self {
        Self::new(transform, true, None, None)
    }

    /// A processing step from a pattern string (see [`re_searcher`]).
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::processor(re_searcher(pattern)?))
    }

    /// Emit the value under `name` from this step onward.
    pub fn with_yield_name(mut self, name: impl Into<String>) -> Self {
        self.yield_name = Some(name.into());
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn only_validate(&self) -> bool {
        self.only_validate
    }

    pub fn yield_name(&self) -> Option<&str> {
        self.yield_name.as_deref()
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub(crate) fn call(&self, value: &Value) -> anyhow::Result<Value> {
        self.transform.call(value)
    }
}

impl From<Transform> for ProcessorSpec {
    fn from(transform: Transform) -> Self {
        Self::processor(transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn identity() -> Transform {
        Transform::new(|v| Ok(v.clone()))
    }

    #[test]
    fn doc_falls_back_by_role() {
        assert_eq!(ProcessorSpec::processor(identity()).doc(), "Processor");
        assert_eq!(ProcessorSpec::validator(identity()).doc(), "Validator");
    }

    #[test]
    fn explicit_doc_wins() {
        let p = ProcessorSpec::new(
            Transform::named("int", |v| Ok(v.clone())).with_doc("attached"),
            false,
            None,
            Some("explicit".into()),
        );
        assert_eq!(p.doc(), "explicit");
    }

    #[test]
    fn registered_doc_beats_attached_doc() {
        let p = ProcessorSpec::processor(
            Transform::named("float", |v| Ok(v.clone())).with_doc("attached"),
        );
        assert_eq!(p.doc(), "Convert type to float");
    }

    #[test]
    fn writer_function_is_called_with_transform() {
        fn write(t: &Transform) -> String {
            format!("custom {}", t.key().unwrap_or("?"))
        }
        register_docs([("processor_test_writer", DocWriter::Writer(write))]);
        let p = ProcessorSpec::processor(Transform::named("processor_test_writer", |v| {
            Ok(v.clone())
        }));
        assert_eq!(p.doc(), "custom processor_test_writer");
    }

    #[test]
    fn attached_doc_used_when_unregistered() {
        let p = ProcessorSpec::processor(identity().with_doc("Doubles it"));
        assert_eq!(p.doc(), "Doubles it");
    }

    #[test]
    fn pattern_matches_across_lines() {
        let p = ProcessorSpec::pattern(r"a(.+)c").unwrap();
        assert_eq!(p.doc(), PATTERN_DOC);
        let out = p.call(&json!("xa\nbcx")).unwrap();
        assert_eq!(out, json!(["a\nbc", "\nb"]));
    }

    #[test]
    fn pattern_reports_unmatched_optional_group_as_null() {
        let p = ProcessorSpec::pattern(r"(\d+)(px)?").unwrap();
        assert_eq!(p.call(&json!("w=12")).unwrap(), json!(["12", "12", null]));
    }

    #[test]
    fn pattern_miss_is_typed() {
        let p = ProcessorSpec::pattern(r"^\d+$").unwrap();
        let err = p.call(&json!("abc")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParamError>(),
            Some(&ParamError::PatternNotMatch)
        );
    }

    #[test]
    fn pattern_on_non_string_is_untyped() {
        let p = ProcessorSpec::pattern(r"\d").unwrap();
        let err = p.call(&json!(5)).unwrap_err();
        assert!(err.downcast_ref::<ParamError>().is_none());
        assert!(err.to_string().contains("got number"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(ProcessorSpec::pattern("(").is_err());
    }
}
