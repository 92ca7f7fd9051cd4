//! Schema documents: JSON descriptions of a parameter spec tree.
//!
//! JSON shape:
//! ```text
//! {
//!   "name": "user",                    // "yield->canonical" allowed
//!   "read_name": "User",               // optional
//!   "yield_name": "account",           // optional, beats the arrow form
//!   "kind": "dict",                    // atom (default) | list | dict
//!   "null": false,
//!   "default": "guest",                // present => default configured, even null
//!   "through_processors": false,
//!   "processors": [
//!     "trim",                                          // built-in by name
//!     { "pattern": "^\\d+$", "validate": true },       // pattern step
//!     { "builtin": "int", "yield_name": "age", "doc": "..." }
//!   ],
//!   "fields": [ ... ],                 // dict only
//!   "child": { ... }                   // list only
//! }
//! ```
//!
//! `SchemaDoc` is the serde-facing form; `validate_and_build` checks it and
//! turns it into a `ParameterSpec`.

use crate::Result;
use crate::builtin;
use crate::diagnostics;
use crate::param::{ParameterSpec, Variant};
use crate::processor::ProcessorSpec;

use anyhow::{Context, bail};
use serde::de::Deserializer;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;

/// Raw node shape as it appears in a schema document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub read_name: Option<String>,

    #[serde(default)]
    pub yield_name: Option<String>,

    #[serde(default)]
    pub kind: Kind,

    #[serde(default)]
    pub null: bool,

    /// `None` when the key is absent; `Some(Value::Null)` for `"default": null`.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub default: Option<Value>,

    #[serde(default)]
    pub through_processors: bool,

    #[serde(default)]
    pub processors: Vec<RawProcessor>,

    #[serde(default)]
    pub fields: Vec<SchemaDoc>,

    #[serde(default)]
    pub child: Option<Box<SchemaDoc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Atom,
    List,
    Dict,
}

impl From<Kind> for Variant {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Atom => Variant::Atomic,
            Kind::List => Variant::Sequence,
            Kind::Dict => Variant::Mapping,
        }
    }
}

/// Processor entries in a schema document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawProcessor {
    // Short form: "int"
    Builtin(String),
    Explicit(RawProcessorSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProcessorSpec {
    #[serde(default)]
    pub builtin: Option<String>,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub validate: bool,

    #[serde(default)]
    pub yield_name: Option<String>,

    #[serde(default)]
    pub doc: Option<String>,
}

impl SchemaDoc {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .with_context(|| diagnostics::error_message("schema document is not valid"))
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| diagnostics::error_message(format!("read schema file {}", path)))?;
        Self::from_json_str(&text)
            .with_context(|| diagnostics::error_message(format!("parse schema file {}", path)))
    }

    /// Check the document and build the spec tree it describes.
    pub fn validate_and_build(&self) -> Result<ParameterSpec> {
        self.build_node("$", true)
    }

    fn build_node(&self, path: &str, is_root: bool) -> Result<ParameterSpec> {
        if !is_root && self.name.trim().is_empty() {
            bail!(
                "{}",
                diagnostics::error_message(format!("{}: field name cannot be empty", path))
            );
        }

        if self.kind != Kind::Dict && !self.fields.is_empty() {
            bail!(
                "{}",
                diagnostics::error_message(format!(
                    "{}: 'fields' is only allowed on dict params (kind is {:?})",
                    path, self.kind
                ))
            );
        }
        if self.kind != Kind::List && self.child.is_some() {
            bail!(
                "{}",
                diagnostics::error_message(format!(
                    "{}: 'child' is only allowed on list params (kind is {:?})",
                    path, self.kind
                ))
            );
        }

        let mut spec = ParameterSpec::with_names(
            &self.name,
            self.read_name.as_deref(),
            self.yield_name.as_deref(),
            self.kind.into(),
        )
        .null(self.null);

        if let Some(value) = &self.default {
            spec = spec.set_default(value.clone(), true, self.through_processors);
        }

        for (i, raw) in self.processors.iter().enumerate() {
            let processor = build_processor(raw)
                .with_context(|| format!("{}: processor #{}", path, i + 1))?;
            spec = spec.add_processor(processor, false);
        }

        match self.kind {
            Kind::Atom => {}
            Kind::List => {
                if let Some(child) = &self.child {
                    let child = child.build_node(&format!("{}[]", path), false)?;
                    spec = spec.set_child(Some(child));
                }
            }
            Kind::Dict => {
                let mut seen: BTreeSet<String> = BTreeSet::new();
                let mut fields = Vec::with_capacity(self.fields.len());
                for doc in &self.fields {
                    let field = doc.build_node(&format!("{}.{}", path, doc.name.trim()), false)?;
                    if !seen.insert(field.yield_name().to_string()) {
                        diagnostics::warn(format!(
                            "{}: output key '{}' is produced by more than one field; the later one wins",
                            path,
                            field.yield_name()
                        ));
                    }
                    fields.push(field);
                }
                spec = spec.set_fields(fields);
            }
        }

        Ok(spec)
    }
}

fn build_processor(raw: &RawProcessor) -> Result<ProcessorSpec> {
    let spec = match raw {
        RawProcessor::Builtin(name) => RawProcessorSpec {
            builtin: Some(name.clone()),
            pattern: None,
            validate: false,
            yield_name: None,
            doc: None,
        },
        RawProcessor::Explicit(spec) => spec.clone(),
    };

    let transform = match (&spec.builtin, &spec.pattern) {
        (Some(name), None) => builtin::lookup(name).with_context(|| {
            diagnostics::error_message(format!(
                "unknown builtin '{}' (expected one of: {})",
                name,
                builtin::NAMES.join(", ")
            ))
        })?,
        (None, Some(pattern)) => crate::processor::re_searcher(pattern).with_context(|| {
            diagnostics::error_message(format!("invalid pattern {:?}", pattern))
        })?,
        (Some(_), Some(_)) => bail!(
            "{}",
            diagnostics::error_message("processor sets both 'builtin' and 'pattern'")
        ),
        (None, None) => bail!(
            "{}",
            diagnostics::error_message("processor needs one of 'builtin' or 'pattern'")
        ),
    };

    Ok(ProcessorSpec::new(
        transform,
        spec.validate,
        spec.yield_name,
        spec.doc,
    ))
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    // Only called when the key is present, so an explicit null stays a value.
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::param::DefaultPolicy;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(doc: Value) -> Result<ParameterSpec> {
        SchemaDoc::from_json_str(&doc.to_string())?.validate_and_build()
    }

    #[test]
    fn builds_nested_tree() {
        let spec = build(json!({
            "name": "user",
            "kind": "dict",
            "fields": [
                { "name": "name->n", "processors": ["trim"] },
                { "name": "age->a", "null": true, "processors": ["int"] },
                { "name": "tags", "kind": "list", "child": { "name": "tag", "processors": ["lower"] } },
                { "name": "role", "default": "guest" }
            ]
        }))
        .unwrap();

        let (key, out) = spec
            .evaluate(json!({ "n": " Bob ", "a": "41", "tags": ["X", "Y"] }))
            .unwrap();
        assert_eq!(key, "user");
        assert_eq!(
            out,
            json!({ "name": "Bob", "age": 41, "tags": ["x", "y"], "role": "guest" })
        );
    }

    #[test]
    fn explicit_null_default_is_kept() {
        let spec = build(json!({ "name": "x", "default": null })).unwrap();
        assert_eq!(
            spec.default_policy(),
            &DefaultPolicy::Default {
                value: Value::Null,
                through_processors: false
            }
        );

        let spec = build(json!({ "name": "x" })).unwrap();
        assert!(!spec.has_default());
    }

    #[test]
    fn pattern_processor_with_yield_name() {
        let spec = build(json!({
            "name": "version",
            "processors": [
                { "pattern": "v(\\d+)", "yield_name": "major" },
                "group1",
                "int"
            ]
        }))
        .unwrap();
        assert_eq!(
            spec.evaluate(json!("release v12")).unwrap(),
            ("major".to_string(), json!(12))
        );

        let err = spec.evaluate(json!("none")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PatternNotMatch);
    }

    #[test]
    fn validator_docs_resolve() {
        let spec = build(json!({
            "name": "code",
            "processors": [
                { "pattern": "^[A-Z]+$", "validate": true },
                { "builtin": "str", "doc": "Stringify" },
                "int"
            ]
        }))
        .unwrap();
        let docs: Vec<&str> = spec.processors().iter().map(ProcessorSpec::doc).collect();
        assert_eq!(
            docs,
            vec![
                "Extract/Validate information using RegExp",
                "Stringify",
                "Convert type to integer"
            ]
        );
        assert!(spec.processors()[0].only_validate());
    }

    #[test]
    fn fields_on_atom_rejected() {
        let err = build(json!({ "name": "x", "fields": [{ "name": "y" }] })).unwrap_err();
        assert!(format!("{:#}", err).contains("'fields' is only allowed on dict"));
    }

    #[test]
    fn child_on_dict_rejected() {
        let err = build(json!({ "name": "x", "kind": "dict", "child": { "name": "y" } })).unwrap_err();
        assert!(format!("{:#}", err).contains("'child' is only allowed on list"));
    }

    #[test]
    fn unknown_builtin_rejected() {
        let err = build(json!({ "name": "x", "processors": ["nope"] })).unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.contains("processor #1"));
        assert!(text.contains("unknown builtin 'nope'"));
    }

    #[test]
    fn ambiguous_processor_rejected() {
        let err = build(json!({
            "name": "x",
            "processors": [{ "builtin": "int", "pattern": "\\d" }]
        }))
        .unwrap_err();
        assert!(format!("{:#}", err).contains("both 'builtin' and 'pattern'"));

        let err = build(json!({ "name": "x", "processors": [{ "validate": true }] })).unwrap_err();
        assert!(format!("{:#}", err).contains("needs one of"));
    }

    #[test]
    fn invalid_pattern_rejected() {
        let err = build(json!({ "name": "x", "processors": [{ "pattern": "(" }] })).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid pattern"));
    }

    #[test]
    fn empty_field_name_rejected() {
        let err = build(json!({ "kind": "dict", "fields": [{ "name": " " }] })).unwrap_err();
        assert!(format!("{:#}", err).contains("field name cannot be empty"));
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(SchemaDoc::from_json_str(r#"{ "name": "x", "nullable": true }"#).is_err());
    }
}
