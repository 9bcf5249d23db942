//! Schema documents: JSON files declaring a schema plus its parse options.
//!
//! ```json
//! {
//!   "name": "cfg",
//!   "shape": "closed",
//!   "options": { "strict": true },
//!   "fields": [
//!     {
//!       "name": "verbose",
//!       "type": "optional<int>",
//!       "argument": { "shortcut": "-v", "action": "count" }
//!     },
//!     { "name": "mode", "type": "str", "default": "fast" }
//!   ]
//! }
//! ```
use serde::Deserialize;
use serde_json::Value;

use super::{Binding, Schema, SchemaError, Shape};
use crate::descriptor::ArgumentDescriptor;
use crate::parser::ParseOptions;
use crate::path_de;

/// A loaded schema document.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub schema: Schema,
    pub options: ParseOptions,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    name: String,
    #[serde(default)]
    shape: Shape,
    #[serde(default)]
    options: ParseOptions,
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: Option<String>,
    default: Option<Value>,
    argument: Option<ArgumentDescriptor>,
}

impl SchemaDocument {
    pub fn from_json_str(src: &str) -> Result<Self, SchemaError> {
        let raw: RawDocument = path_de::from_str_with_path(src)?;
        let mut builder = Schema::builder(raw.name).shape(raw.shape);
        for (index, field) in raw.fields.into_iter().enumerate() {
            let binding = match (field.argument, field.default) {
                (Some(_), Some(_)) => {
                    return Err(SchemaError::Malformed {
                        path: format!("fields[{index}].default"),
                        message: "a field with an argument takes its default from the argument"
                            .into(),
                    });
                }
                (Some(argument), None) => Binding::Argument(argument),
                (None, default) => Binding::Unbound { default: default.unwrap_or(Value::Null) },
            };
            builder = match field.ty {
                Some(ty) => builder.field(field.name, &ty, binding),
                None => builder.untyped(field.name, binding),
            };
        }
        Ok(SchemaDocument { schema: builder.build()?, options: raw.options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Action;
    use crate::types::TypeExpr;
    use serde_json::json;

    #[test]
    fn loads_fields_and_options() {
        let doc = SchemaDocument::from_json_str(
            r#"{
                "name": "cfg",
                "shape": "open",
                "options": {"strict": true, "skip_unknowns": true},
                "fields": [
                    {
                        "name": "verbose",
                        "type": "optional<int>",
                        "argument": {"shortcut": "-v", "action": "count"}
                    },
                    {"name": "mode", "type": "str", "default": "fast"},
                    {"name": "loose"}
                ]
            }"#,
        )
        .unwrap();
        assert!(doc.options.strict);
        assert!(doc.options.skip_unknowns);
        assert!(doc.options.coerce);
        assert_eq!(doc.schema.shape(), Shape::Open);

        let verbose = doc.schema.field("verbose").unwrap();
        assert_eq!(verbose.declared_type(), &TypeExpr::optional(TypeExpr::INT));
        assert_eq!(verbose.binding().descriptor().unwrap().action_kind(), Action::Count);
        assert_eq!(doc.schema.field("mode").unwrap().default(), json!("fast"));
        assert!(!doc.schema.field("loose").unwrap().is_annotated());
    }

    #[test]
    fn malformed_documents_carry_a_path() {
        let err = SchemaDocument::from_json_str(
            r#"{"name": "cfg", "fields": [{"name": "a", "argument": {"nargs": "many"}}]}"#,
        )
        .unwrap_err();
        match err {
            SchemaError::Malformed { path, .. } => assert_eq!(path, "fields[0].argument.nargs"),
            other => panic!("unexpected error: {other}"),
        }

        let err = SchemaDocument::from_json_str(
            r#"{"name": "cfg", "fields": [{"name": "a", "default": 1, "argument": {}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { path, .. } if path == "fields[0].default"));
    }

    #[test]
    fn bad_type_names_the_field() {
        let raw = r#"{"name": "cfg", "fields": [{"name": "a", "type": "list<"}]}"#;
        let err = Schema::from_json_str(raw).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidType { field, .. } if field == "a"));
    }
}
