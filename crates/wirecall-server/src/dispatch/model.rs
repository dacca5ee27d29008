//! Schema collaborators for action parameters and client-action returns.
//!
//! A `Model` turns untrusted JSON into a normalized value or a list of
//! per-field issues. Two implementations ship with the server:
//! `TypedModel<T>` delegates to serde, `ObjectModel` checks a flat object
//! shape and reports every offending field at once.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use wirecall_core::Issue;

pub trait Model: Send + Sync {
    /// Validate and normalize.
    fn parse(&self, data: &Value) -> Result<Value, Vec<Issue>>;

    /// Issues only; empty when valid.
    fn validate(&self, data: &Value) -> Vec<Issue> {
        self.parse(data).err().unwrap_or_default()
    }

    /// Self-description, JSON-schema flavoured.
    fn schema(&self) -> Value;
}

/// Model backed by a serde type: parse = deserialize then reserialize.
pub struct TypedModel<T> {
    _ty: PhantomData<fn() -> T>,
}

impl<T> TypedModel<T> {
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<T> Default for TypedModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Model for TypedModel<T>
where
    T: DeserializeOwned + Serialize,
{
    fn parse(&self, data: &Value) -> Result<Value, Vec<Issue>> {
        let typed: T = serde_json::from_value(data.clone())
            .map_err(|e| vec![Issue::new("", e.to_string())])?;
        serde_json::to_value(typed).map_err(|e| vec![Issue::new("", e.to_string())])
    }

    fn schema(&self) -> Value {
        json!({ "type": std::any::type_name::<T>() })
    }
}

/// JSON type of an object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "any",
        }
    }

    fn accepts(self, v: &Value) -> bool {
        match self {
            FieldType::String => v.is_string(),
            FieldType::Integer => v.is_i64() || v.is_u64(),
            FieldType::Number => v.is_number(),
            FieldType::Boolean => v.is_boolean(),
            FieldType::Object => v.is_object(),
            FieldType::Array => v.is_array(),
            FieldType::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    ty: FieldType,
    required: bool,
}

/// Flat object model built field by field.
///
/// Unknown fields are dropped from the normalized value unless
/// `allow_extra` is set.
#[derive(Debug, Clone, Default)]
pub struct ObjectModel {
    fields: Vec<Field>,
    allow_extra: bool,
}

impl ObjectModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty,
            required: false,
        });
        self
    }

    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }
}

impl Model for ObjectModel {
    fn parse(&self, data: &Value) -> Result<Value, Vec<Issue>> {
        let Some(obj) = data.as_object() else {
            return Err(vec![Issue::new("", "expected object")]);
        };

        let mut issues = Vec::new();
        let mut out = if self.allow_extra { obj.clone() } else { Map::new() };

        for f in &self.fields {
            match obj.get(&f.name) {
                None | Some(Value::Null) if f.required => {
                    issues.push(Issue::new(format!("/{}", f.name), "required"));
                }
                None | Some(Value::Null) => {}
                Some(v) if !f.ty.accepts(v) => {
                    issues.push(Issue::new(
                        format!("/{}", f.name),
                        format!("expected {}", f.ty.name()),
                    ));
                }
                Some(v) => {
                    out.insert(f.name.clone(), v.clone());
                }
            }
        }

        if issues.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(issues)
        }
    }

    fn schema(&self) -> Value {
        let props: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), json!({ "type": f.ty.name() })))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": props,
            "required": required,
            "additionalProperties": self.allow_extra,
        })
    }
}
