//! JSON Schema validation with tool-contract friendly violation reports.
//!
//! Schemas are compiled with `jsonschema` (draft 7 unless the schema says
//! otherwise), so `$ref`, `anyOf`/`oneOf`/`allOf` and `not` are honoured.
//! Each error becomes a [`Violation`] whose path uses dotted member names and
//! `[i]` array indices (`args.revenue`, `results[0].title`).
//!
//! Violations follow schema keyword declaration order, then array index order.
//! The same value and schema always produce the same list.

use jsonschema::error::{ValidationError, ValidationErrorKind};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationReason {
    WrongType,
    MissingRequired,
    UnexpectedProperty,
    EnumMismatch,
    ConstMismatch,
    PatternMismatch,
    FormatMismatch,
    TooShort,
    TooLong,
    BelowMinimum,
    AboveMaximum,
    TooFewItems,
    TooManyItems,
    /// `anyOf`, `oneOf` or `not` rejected the value.
    CompositionMismatch,
    NotAllowed,
    /// Any other keyword (`multipleOf`, `uniqueItems`, ...).
    ConstraintViolation,
    InvalidSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted path to the offending value, `""` for the root.
    pub path: String,
    pub reason: ViolationReason,
    pub message: String,
}

impl Violation {
    fn new(path: &str, reason: ViolationReason, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A schema compiled once, ready to check any number of values.
pub struct CompiledSchema {
    inner: JSONSchema,
}

impl CompiledSchema {
    /// Fails with an `InvalidSchema` violation when `schema` is not a usable JSON Schema.
    pub fn compile(schema: &Value) -> Result<Self, Violation> {
        JSONSchema::compile(schema)
            .map(|inner| Self { inner })
            .map_err(|e| {
                let location = e.instance_path.to_string();
                let message = if location.is_empty() {
                    format!("invalid schema: {}", e)
                } else {
                    format!("invalid schema at {}: {}", location, e)
                };
                Violation::new("", ViolationReason::InvalidSchema, message)
            })
    }

    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        if let Err(errors) = self.inner.validate(value) {
            for error in errors {
                push_violations(error, value, &mut violations);
            }
        }
        violations
    }
}

/// Validates `value` against `schema`. An empty list means the value conforms.
pub fn validate(value: &Value, schema: &Value) -> Vec<Violation> {
    match CompiledSchema::compile(schema) {
        Ok(compiled) => compiled.validate(value),
        Err(violation) => vec![violation],
    }
}

/// Renders violations as one human-readable line.
pub fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn push_violations(error: ValidationError<'_>, value: &Value, out: &mut Vec<Violation>) {
    let path = member_path(value, &error.instance_path.to_string());
    let message = error.to_string();

    match error.kind {
        ValidationErrorKind::Required { property } => {
            let name = match property {
                Value::String(name) => name,
                other => other.to_string(),
            };
            out.push(Violation::new(
                &child_path(&path, &name),
                ViolationReason::MissingRequired,
                "missing required property",
            ));
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            for name in unexpected {
                out.push(Violation::new(
                    &child_path(&path, &name),
                    ViolationReason::UnexpectedProperty,
                    "property is not allowed",
                ));
            }
        }
        kind => out.push(Violation::new(&path, reason_for(&kind), message)),
    }
}

fn reason_for(kind: &ValidationErrorKind) -> ViolationReason {
    match kind {
        ValidationErrorKind::Type { .. } => ViolationReason::WrongType,
        ValidationErrorKind::Required { .. } => ViolationReason::MissingRequired,
        ValidationErrorKind::AdditionalProperties { .. } => ViolationReason::UnexpectedProperty,
        ValidationErrorKind::Enum { .. } => ViolationReason::EnumMismatch,
        ValidationErrorKind::Constant { .. } => ViolationReason::ConstMismatch,
        ValidationErrorKind::Pattern { .. } => ViolationReason::PatternMismatch,
        ValidationErrorKind::Format { .. } => ViolationReason::FormatMismatch,
        ValidationErrorKind::MinLength { .. } => ViolationReason::TooShort,
        ValidationErrorKind::MaxLength { .. } => ViolationReason::TooLong,
        ValidationErrorKind::Minimum { .. } | ValidationErrorKind::ExclusiveMinimum { .. } => {
            ViolationReason::BelowMinimum
        }
        ValidationErrorKind::Maximum { .. } | ValidationErrorKind::ExclusiveMaximum { .. } => {
            ViolationReason::AboveMaximum
        }
        ValidationErrorKind::MinItems { .. } => ViolationReason::TooFewItems,
        ValidationErrorKind::MaxItems { .. } | ValidationErrorKind::AdditionalItems { .. } => {
            ViolationReason::TooManyItems
        }
        ValidationErrorKind::AnyOf { .. }
        | ValidationErrorKind::OneOfNotValid { .. }
        | ValidationErrorKind::OneOfMultipleValid { .. }
        | ValidationErrorKind::Not { .. } => ViolationReason::CompositionMismatch,
        ValidationErrorKind::FalseSchema { .. } => ViolationReason::NotAllowed,
        _ => ViolationReason::ConstraintViolation,
    }
}

/// Turns a JSON pointer into the dotted form, using `value` to tell array
/// indices from member names.
fn member_path(value: &Value, pointer: &str) -> String {
    let mut path = String::new();
    let mut current = Some(value);

    for token in pointer.split('/').skip(1) {
        let token = token.replace("~1", "/").replace("~0", "~");
        match current {
            Some(Value::Array(items)) => {
                path.push_str(&format!("[{}]", token));
                current = token.parse::<usize>().ok().and_then(|index| items.get(index));
            }
            other => {
                current = other.and_then(|node| node.get(token.as_str()));
                path = child_path(&path, &token);
            }
        }
    }

    path
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string", "minLength": 1},
                "args": {
                    "type": "object",
                    "properties": {
                        "revenue": {"type": "number", "minimum": 0},
                        "currency": {"type": "string", "enum": ["EUR", "USD"]}
                    },
                    "required": ["revenue"]
                },
                "tags": {"type": "array", "items": {"type": "string", "pattern": "^[a-z]+$"}}
            },
            "required": ["prompt"],
            "additionalProperties": false
        })
    }

    fn reasons(violations: &[Violation]) -> Vec<(&str, ViolationReason)> {
        violations
            .iter()
            .map(|v| (v.path.as_str(), v.reason))
            .collect()
    }

    #[test]
    fn should_accept_conforming_value() {
        let value = json!({
            "prompt": "summarize",
            "args": {"revenue": 12.5, "currency": "EUR"},
            "tags": ["finance", "quarterly"]
        });

        assert!(validate(&value, &report_schema()).is_empty());
    }

    #[test]
    fn should_report_pattern_mismatch_with_array_index() {
        let value = json!({"prompt": "summarize", "tags": ["finance", "q3"]});

        let violations = validate(&value, &report_schema());

        assert_eq!(
            reasons(&violations),
            vec![("tags[1]", ViolationReason::PatternMismatch)]
        );
    }

    #[test]
    fn should_report_missing_required_field_at_its_name() {
        let violations = validate(&json!({}), &report_schema());

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "prompt");
        assert_eq!(violations[0].reason, ViolationReason::MissingRequired);
        assert_eq!(violations[0].message, "missing required property");
    }

    #[test]
    fn should_use_dotted_paths_for_nested_objects() {
        let value = json!({"prompt": "p", "args": {"revenue": "lots"}});

        let violations = validate(&value, &report_schema());

        assert_eq!(
            reasons(&violations),
            vec![("args.revenue", ViolationReason::WrongType)]
        );
        assert!(violations[0].message.contains("number"));
    }

    #[test]
    fn should_keep_numeric_member_names_as_members() {
        let schema = json!({
            "type": "object",
            "properties": {"0": {"type": "string"}}
        });

        let violations = validate(&json!({"0": 5}), &schema);

        assert_eq!(reasons(&violations), vec![("0", ViolationReason::WrongType)]);
    }

    #[test]
    fn should_reject_unexpected_properties() {
        let value = json!({"prompt": "p", "temperature": 0.3, "top_k": 4});

        let violations = validate(&value, &report_schema());

        assert_eq!(
            reasons(&violations),
            vec![
                ("temperature", ViolationReason::UnexpectedProperty),
                ("top_k", ViolationReason::UnexpectedProperty),
            ]
        );
    }

    #[test]
    fn should_validate_additional_properties_against_schema() {
        let schema = json!({"type": "object", "additionalProperties": {"type": "integer"}});

        let violations = validate(&json!({"a": 1, "b": "two"}), &schema);

        assert_eq!(reasons(&violations), vec![("b", ViolationReason::WrongType)]);
    }

    #[test]
    fn should_report_enum_and_minimum_violations() {
        let value = json!({"prompt": "p", "args": {"revenue": -1, "currency": "GBP"}});

        let violations = validate(&value, &report_schema());

        assert_eq!(
            reasons(&violations),
            vec![
                ("args.revenue", ViolationReason::BelowMinimum),
                ("args.currency", ViolationReason::EnumMismatch),
            ]
        );
    }

    #[test]
    fn should_report_every_problem_deterministically() {
        let value = json!({
            "extra": true,
            "tags": ["ok", 7, "BAD"],
            "args": {}
        });

        let violations = validate(&value, &report_schema());
        let mut found = reasons(&violations);
        found.sort_by(|a, b| a.0.cmp(b.0));

        assert_eq!(
            found,
            vec![
                ("args.revenue", ViolationReason::MissingRequired),
                ("extra", ViolationReason::UnexpectedProperty),
                ("prompt", ViolationReason::MissingRequired),
                ("tags[1]", ViolationReason::WrongType),
                ("tags[2]", ViolationReason::PatternMismatch),
            ]
        );

        let tag_paths: Vec<&str> = violations
            .iter()
            .map(|v| v.path.as_str())
            .filter(|p| p.starts_with("tags"))
            .collect();
        assert_eq!(tag_paths, vec!["tags[1]", "tags[2]"]);
        assert_eq!(violations, validate(&value, &report_schema()));
    }

    #[test]
    fn should_stop_at_root_type_mismatch() {
        let violations = validate(&json!(["not", "an", "object"]), &report_schema());

        assert_eq!(reasons(&violations), vec![("", ViolationReason::WrongType)]);
        assert!(violations[0].to_string().starts_with("(root): "));
    }

    #[test]
    fn should_accept_union_types() {
        let schema = json!({"type": ["string", "null"]});

        assert!(validate(&json!(null), &schema).is_empty());
        assert!(validate(&json!("x"), &schema).is_empty());
        assert_eq!(
            reasons(&validate(&json!(1), &schema)),
            vec![("", ViolationReason::WrongType)]
        );
    }

    #[test]
    fn should_distinguish_integers_from_fractions() {
        let schema = json!({"type": "integer"});

        assert!(validate(&json!(4), &schema).is_empty());
        assert_eq!(
            reasons(&validate(&json!(4.5), &schema)),
            vec![("", ViolationReason::WrongType)]
        );
    }

    #[test]
    fn should_enforce_string_and_array_bounds() {
        let schema = json!({
            "type": "object",
            "properties": {
                "code": {"type": "string", "minLength": 2, "maxLength": 3},
                "items": {"type": "array", "minItems": 1, "maxItems": 2}
            }
        });

        let violations = validate(&json!({"code": "abcd", "items": []}), &schema);

        assert_eq!(
            reasons(&violations),
            vec![
                ("code", ViolationReason::TooLong),
                ("items", ViolationReason::TooFewItems),
            ]
        );
    }

    #[test]
    fn should_resolve_local_references() {
        let schema = json!({
            "type": "object",
            "properties": {
                "score": {"$ref": "#/$defs/score"}
            },
            "$defs": {"score": {"type": "number"}}
        });

        assert!(validate(&json!({"score": 0.4}), &schema).is_empty());
        assert_eq!(
            reasons(&validate(&json!({"score": "high"}), &schema)),
            vec![("score", ViolationReason::WrongType)]
        );
    }

    #[test]
    fn should_apply_composition_keywords() {
        let schema = json!({
            "type": "object",
            "properties": {
                "label": {"anyOf": [{"type": "string"}, {"type": "null"}]},
                "mode": {"oneOf": [{"const": "fast"}, {"const": "slow"}]},
                "name": {"not": {"const": ""}},
                "size": {"allOf": [{"type": "integer"}, {"minimum": 1}]}
            }
        });

        assert!(validate(
            &json!({"label": null, "mode": "fast", "name": "n", "size": 2}),
            &schema
        )
        .is_empty());

        let violations = validate(
            &json!({"label": 42, "mode": "medium", "name": "", "size": 0}),
            &schema,
        );

        assert_eq!(
            reasons(&violations),
            vec![
                ("label", ViolationReason::CompositionMismatch),
                ("mode", ViolationReason::CompositionMismatch),
                ("name", ViolationReason::CompositionMismatch),
                ("size", ViolationReason::BelowMinimum),
            ]
        );
    }

    #[test]
    fn should_treat_empty_and_true_schemas_as_permissive() {
        assert!(validate(&json!({"anything": [1, 2]}), &json!({})).is_empty());
        assert!(validate(&json!(null), &json!(true)).is_empty());
    }

    #[test]
    fn should_reject_everything_under_false_schema() {
        let violations = validate(&json!(1), &json!(false));
        assert_eq!(reasons(&violations), vec![("", ViolationReason::NotAllowed)]);
    }

    #[test]
    fn should_flag_invalid_schema_documents() {
        let schemas = [
            json!({"type": "string", "pattern": "("}),
            json!({"type": "text"}),
            json!({"type": []}),
            json!({"type": ["string", 1]}),
            json!("string"),
        ];

        for schema in schemas {
            assert_eq!(
                reasons(&validate(&json!("x"), &schema)),
                vec![("", ViolationReason::InvalidSchema)],
                "{}",
                schema
            );
        }
    }

    #[test]
    fn should_compile_once_and_reuse() {
        let compiled = CompiledSchema::compile(&report_schema()).unwrap();

        assert!(compiled.validate(&json!({"prompt": "p"})).is_empty());
        assert_eq!(compiled.validate(&json!({})).len(), 1);
        assert!(CompiledSchema::compile(&json!({"type": "text"})).is_err());
    }

    #[test]
    fn should_check_const_values() {
        let schema = json!({"const": "v1"});

        assert!(validate(&json!("v1"), &schema).is_empty());
        assert_eq!(
            reasons(&validate(&json!("v2"), &schema)),
            vec![("", ViolationReason::ConstMismatch)]
        );
    }

    #[test]
    fn should_summarize_violations() {
        let violations = vec![
            Violation::new("prompt", ViolationReason::MissingRequired, "missing required property"),
            Violation::new("", ViolationReason::WrongType, "expected object"),
        ];

        assert_eq!(
            summarize(&violations),
            "prompt: missing required property; (root): expected object"
        );
    }

    #[test]
    fn should_serialize_violation_reason_by_name() {
        let violation = Violation::new(
            "query",
            ViolationReason::MissingRequired,
            "missing required property",
        );
        let json = serde_json::to_value(&violation).unwrap();

        assert_eq!(json["path"], "query");
        assert_eq!(json["reason"], "MissingRequired");
    }
}
