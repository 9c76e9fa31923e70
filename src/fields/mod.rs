//! Declarative output fields.
//!
//! A [`Schema`] maps output keys to [`Field`]s. Each field knows where its
//! value comes from (the output key, or an explicit [`Accessor`]) and how to
//! shape it (a [`FieldKind`]). Applying a schema to a JSON value is a pure,
//! read-only projection:
//!
//! ```rust
//! use serde_json::json;
//! use tsu_restful::fields::{DateFormat, Field, Schema};
//!
//! let schema = Schema::new()
//!     .field("name", Field::string())
//!     .field("id", Field::integer())
//!     .field("created", Field::datetime(DateFormat::Rfc822).attribute("created_at"))
//!     .field("greeting", Field::formatted("Hello {name}"));
//!
//! let out = schema.apply(&json!({
//!     "name": "bot",
//!     "id": "01",
//!     "created_at": "2019-01-01T00:00:00",
//! })).unwrap();
//!
//! assert_eq!(out, json!({
//!     "name": "bot",
//!     "id": 1,
//!     "created": "Tue, 01 Jan 2019 00:00:00 -0000",
//!     "greeting": "Hello bot",
//! }));
//! ```

mod format;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

// ── Schema ────────────────────────────────────────────────────────────────────

/// Ordered mapping from output key to [`Field`].
#[derive(Clone, Debug, Default)]
pub struct Schema {
    fields: IndexMap<String, Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the field emitted under `key`.
    pub fn field(mut self, key: impl Into<String>, field: Field) -> Self {
        self.fields.insert(key.into(), field);
        self
    }

    /// Emits `schema` under `key`, reading from the same source object.
    /// Shorthand for `.field(key, Field::inline(schema))`.
    pub fn nest(self, key: impl Into<String>, schema: Schema) -> Self {
        self.field(key, Field::inline(schema))
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Projects `source` into an object with this schema's keys, in
    /// declaration order.
    pub fn apply(&self, source: &Value) -> Result<Value, MarshalError> {
        let mut out = Map::with_capacity(self.fields.len());
        for (key, field) in &self.fields {
            if let Some(value) = field.output(key, source)? {
                out.insert(key.clone(), value);
            }
        }
        Ok(Value::Object(out))
    }
}

impl<K: Into<String>> FromIterator<(K, Field)> for Schema {
    fn from_iter<I: IntoIterator<Item = (K, Field)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(k, f)| (k.into(), f)).collect() }
    }
}

// ── Accessor ──────────────────────────────────────────────────────────────────

/// Where a field reads its value from, when not from its own output key.
#[derive(Clone)]
pub enum Accessor {
    /// A key in the source object. Dots walk into nested objects and
    /// array indices (`"owner.emails.0"`); a key that exists verbatim,
    /// dots included, wins over the walk.
    Key(String),
    /// Computes the value from the whole source object.
    Func(Arc<dyn Fn(&Value) -> Value + Send + Sync>),
}

impl Accessor {
    pub fn func(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::Func(Arc::new(f))
    }

    fn resolve<'a>(&self, source: &'a Value) -> Cow<'a, Value> {
        match self {
            Self::Key(key) => Cow::Borrowed(lookup(source, key).unwrap_or(&Value::Null)),
            Self::Func(f) => Cow::Owned(f(source)),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for Accessor {
    fn from(key: &str) -> Self { Self::Key(key.to_owned()) }
}

impl From<String> for Accessor {
    fn from(key: String) -> Self { Self::Key(key) }
}

/// Resolves `key` against `source`: the verbatim key first, then a dotted
/// walk. `None` means the key is absent, as opposed to present and null.
pub(crate) fn lookup<'a>(source: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(hit) = source.as_object().and_then(|o| o.get(key)) {
        return Some(hit);
    }
    if !key.contains('.') {
        return None;
    }
    key.split('.').try_fold(source, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

// ── Field ─────────────────────────────────────────────────────────────────────

/// Output timestamp layouts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DateFormat {
    /// `Tue, 01 Jan 2019 00:00:00 -0000`, always in UTC.
    Rfc822,
    /// `2019-01-01T00:00:00`, with the offset when the input carries one.
    Iso8601,
}

/// How a field shapes its value.
#[derive(Clone, Debug)]
pub enum FieldKind {
    Raw,
    String,
    Integer,
    Float,
    Boolean,
    /// Exact decimal string, no float rounding.
    Arbitrary,
    /// Decimal string with a fixed number of places.
    Fixed(u32),
    DateTime(DateFormat),
    /// `{key}` template rendered against the source object.
    Formatted(String),
    List(Box<Field>),
    /// Marshals the sub-object found at the field's key.
    Nested(Schema),
    /// Marshals the same source object into a nested output object.
    Inline(Schema),
}

/// One output field: a kind, an optional accessor and an optional default.
#[derive(Clone, Debug)]
pub struct Field {
    kind: FieldKind,
    attribute: Option<Accessor>,
    default: Option<Value>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self { kind, attribute: None, default: None }
    }

    pub fn raw() -> Self { Self::new(FieldKind::Raw) }
    pub fn string() -> Self { Self::new(FieldKind::String) }
    pub fn integer() -> Self { Self::new(FieldKind::Integer) }
    pub fn float() -> Self { Self::new(FieldKind::Float) }
    pub fn boolean() -> Self { Self::new(FieldKind::Boolean) }
    pub fn arbitrary() -> Self { Self::new(FieldKind::Arbitrary) }
    pub fn datetime(format: DateFormat) -> Self { Self::new(FieldKind::DateTime(format)) }
    pub fn nested(schema: Schema) -> Self { Self::new(FieldKind::Nested(schema)) }
    pub fn inline(schema: Schema) -> Self { Self::new(FieldKind::Inline(schema)) }

    /// Five decimal places.
    pub fn fixed() -> Self { Self::fixed_places(5) }

    pub fn fixed_places(decimals: u32) -> Self {
        Self::new(FieldKind::Fixed(decimals))
    }

    pub fn formatted(template: impl Into<String>) -> Self {
        Self::new(FieldKind::Formatted(template.into()))
    }

    pub fn list(inner: Field) -> Self {
        Self::new(FieldKind::List(Box::new(inner)))
    }

    /// Reads the value through `accessor` instead of the output key.
    /// Ignored by formatted and inline fields, which see the whole source.
    pub fn attribute(mut self, accessor: impl Into<Accessor>) -> Self {
        self.attribute = Some(accessor.into());
        self
    }

    /// Value formatted in place of a missing or null source value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Produces the value emitted under `key` for `source`, or `None` when
    /// the field is to be left out of the output.
    pub fn output(&self, key: &str, source: &Value) -> Result<Option<Value>, MarshalError> {
        let produced = match &self.kind {
            FieldKind::Inline(schema) => schema.apply(source).map(Some),
            FieldKind::Formatted(template) => {
                format::template(template, source).map(|s| s.map(Value::String))
            }
            _ => {
                let value = match &self.attribute {
                    Some(accessor) => accessor.resolve(source),
                    None => Cow::Borrowed(lookup(source, key).unwrap_or(&Value::Null)),
                };
                self.format_or_default(&value).map(Some)
            }
        };
        produced.map_err(|e| e.within(key))
    }

    /// Shapes an already-resolved value.
    pub fn format(&self, value: &Value) -> Result<Value, MarshalError> {
        match &self.kind {
            FieldKind::Raw => Ok(value.clone()),
            FieldKind::Inline(schema) => schema.apply(value),
            FieldKind::Formatted(template) => {
                Ok(format::template(template, value)?.map_or(Value::Null, Value::String))
            }
            _ if value.is_null() => Ok(Value::Null),
            FieldKind::String => Ok(format::string(value)),
            FieldKind::Integer => format::integer(value),
            FieldKind::Float => format::float(value),
            FieldKind::Boolean => Ok(Value::Bool(format::truthy(value))),
            FieldKind::Arbitrary => format::arbitrary(value),
            FieldKind::Fixed(decimals) => format::fixed(value, *decimals),
            FieldKind::DateTime(layout) => format::datetime(value, *layout),
            FieldKind::Nested(schema) => schema.apply(value),
            FieldKind::List(inner) => {
                let Value::Array(items) = value else {
                    return Err(MarshalError::new(format!("expected a list, got {}", type_name(value))));
                };
                items.iter()
                    .enumerate()
                    .map(|(i, item)| inner.format_item(item).map_err(|e| e.within(&i.to_string())))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }

    fn format_or_default(&self, value: &Value) -> Result<Value, MarshalError> {
        match (&self.default, value.is_null()) {
            (Some(default), true) => self.format(default),
            _ => self.format(value),
        }
    }

    /// Shapes one list element. Object elements are read through the
    /// field's accessor when it has one.
    fn format_item(&self, item: &Value) -> Result<Value, MarshalError> {
        match (&self.attribute, &self.kind) {
            (_, FieldKind::Inline(_) | FieldKind::Formatted(_)) => self.format(item),
            (Some(accessor), _) if item.is_object() => self.format_or_default(&accessor.resolve(item)),
            _ => self.format_or_default(item),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ── MarshalError ──────────────────────────────────────────────────────────────

/// A source value that does not fit its field.
///
/// This is a server-side failure: the handler produced data its own schema
/// cannot represent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarshalError {
    path: String,
    reason: String,
}

impl MarshalError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self { path: String::new(), reason: reason.into() }
    }

    /// Prefixes the error path with the enclosing key.
    pub(crate) fn within(mut self, key: &str) -> Self {
        self.path = if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{key}.{}", self.path)
        };
        self
    }

    /// Dotted path of the failing field, e.g. `"items.2.price"`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "cannot marshal value: {}", self.reason)
        } else {
            write!(f, "cannot marshal `{}`: {}", self.path, self.reason)
        }
    }
}

impl std::error::Error for MarshalError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn missing_typed_values_stay_null() {
        let schema = Schema::new()
            .field("none_int", Field::integer())
            .field("missing_str", Field::string())
            .field("missing_list", Field::list(Field::integer()))
            .field("missing_nested", Field::nested(Schema::new().field("a", Field::raw())));
        let out = schema.apply(&json!({ "none_int": null })).unwrap();
        assert_eq!(out, json!({
            "none_int": null,
            "missing_str": null,
            "missing_list": null,
            "missing_nested": null,
        }));
    }

    #[test]
    fn attribute_overrides_output_key() {
        let schema = Schema::new().field("line 1", Field::string().attribute("addr1"));
        let out = schema.apply(&json!({ "addr1": "fake street", "line 1": "ignored" })).unwrap();
        assert_eq!(out, json!({ "line 1": "fake street" }));
    }

    #[test]
    fn dotted_keys_walk_objects_and_arrays() {
        let source = json!({ "owner": { "emails": ["a@x", "b@x"] }, "a.b": "verbatim" });
        assert_eq!(lookup(&source, "owner.emails.1"), Some(&json!("b@x")));
        assert_eq!(lookup(&source, "a.b"), Some(&json!("verbatim")));
        assert_eq!(lookup(&source, "owner.phone"), None);
    }

    #[test]
    fn function_accessor_sees_whole_source() {
        let schema = Schema::new().field(
            "full",
            Field::string().attribute(Accessor::func(|src| {
                json!(format!("{} {}", src["first"].as_str().unwrap_or(""), src["last"].as_str().unwrap_or("")))
            })),
        );
        let out = schema.apply(&json!({ "first": "Emile", "last": "Raoul" })).unwrap();
        assert_eq!(out, json!({ "full": "Emile Raoul" }));
    }

    #[test]
    fn inline_schema_reads_the_parent_source() {
        let schema = Schema::new().nest(
            "address",
            Schema::new()
                .field("line 1", Field::string().attribute("addr1"))
                .field("line 2", Field::string().attribute("addr2")),
        );
        let out = schema.apply(&json!({ "addr1": "fake street", "addr2": "fake block" })).unwrap();
        assert_eq!(out, json!({ "address": { "line 1": "fake street", "line 2": "fake block" } }));
    }

    #[test]
    fn nested_schema_reads_the_sub_object() {
        let address = Schema::new().field("country", Field::string()).field("city", Field::string());
        let schema = Schema::new().field("region", Field::nested(address).attribute("address"));
        let out = schema.apply(&json!({ "address": { "country": "China", "city": 1 } })).unwrap();
        assert_eq!(out, json!({ "region": { "country": "China", "city": "1" } }));
    }

    #[test]
    fn list_of_nested_objects_keeps_order() {
        let item = Schema::new().field("id", Field::integer());
        let schema = Schema::new().field("items", Field::list(Field::nested(item)));
        let out = schema.apply(&json!({ "items": [{ "id": "2" }, { "id": 1 }] })).unwrap();
        assert_eq!(out, json!({ "items": [{ "id": 2 }, { "id": 1 }] }));
    }

    #[test]
    fn list_items_use_inner_accessor_on_objects() {
        let schema = Schema::new().field("names", Field::list(Field::string().attribute("name")));
        let out = schema.apply(&json!({ "names": [{ "name": "a" }, { "name": "b" }] })).unwrap();
        assert_eq!(out, json!({ "names": ["a", "b"] }));
    }

    #[test]
    fn formatted_field_is_omitted_when_a_reference_is_missing() {
        let schema = Schema::new()
            .field("greeting", Field::formatted("Hello {name}"))
            .field("farewell", Field::formatted("Bye {nickname}"));
        let out = schema.apply(&json!({ "name": "bot" })).unwrap();
        assert_eq!(out, json!({ "greeting": "Hello bot" }));
    }

    #[test]
    fn defaults_fill_missing_values() {
        let schema = Schema::new()
            .field("count", Field::integer().default(0))
            .field("label", Field::string().default("n/a"));
        let out = schema.apply(&json!({ "label": null })).unwrap();
        assert_eq!(out, json!({ "count": 0, "label": "n/a" }));
    }

    #[test]
    fn errors_carry_the_field_path() {
        let item = Schema::new().field("price", Field::integer());
        let schema = Schema::new().field("items", Field::list(Field::nested(item)));
        let err = schema.apply(&json!({ "items": [{ "price": 1 }, { "price": "lots" }] })).unwrap_err();
        assert_eq!(err.path(), "items.1.price");
    }

    #[test]
    fn non_list_value_for_list_field_is_an_error() {
        let schema = Schema::new().field("tags", Field::list(Field::string()));
        let err = schema.apply(&json!({ "tags": "one" })).unwrap_err();
        assert_eq!(err.to_string(), "cannot marshal `tags`: expected a list, got a string");
    }
}
