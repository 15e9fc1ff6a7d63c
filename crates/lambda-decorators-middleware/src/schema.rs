//! JSON Schema validation used by [`JsonSchemaValidator`](crate::stages::JsonSchemaValidator).
//!
//! Schemas are compiled once from a [`serde_json::Value`] and then checked
//! against any number of instances. Compilation rejects malformed keywords
//! (an invalid `pattern`, a `required` that is not a list of strings, ...)
//! and any keyword that is neither supported nor a pure annotation, so a
//! schema is never silently weaker than it reads.
//!
//! Supported keywords:
//!
//! | Applies to | Keywords |
//! |------------|----------|
//! | any | `type`, `enum`, `const`, `$ref`, `allOf`, `anyOf`, `oneOf`, `not`, `if`/`then`/`else` |
//! | numbers | `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`, `multipleOf` |
//! | strings | `minLength`, `maxLength`, `pattern`, `format` |
//! | arrays | `items`, `prefixItems`, `additionalItems`, `minItems`, `maxItems`, `uniqueItems`, `contains`, `minContains`, `maxContains` |
//! | objects | `properties`, `patternProperties`, `additionalProperties`, `required`, `propertyNames`, `minProperties`, `maxProperties`, `dependencies`, `dependentRequired`, `dependentSchemas` |
//!
//! Annotations (`$schema`, `$id`, `title`, `description`, `default`,
//! `examples`, ...) are accepted and ignored. `definitions` and `$defs`
//! hold targets for `$ref`, which must be a local pointer such as
//! `#/definitions/price`.
//!
//! `format` checks `date-time`, `date`, `time`, `email`, `idn-email`,
//! `hostname`, `ipv4`, `ipv6`, `uri`, `uuid` and `regex`; other formats
//! are rejected at compile time.
//!
//! `true` and `false` are accepted as schemas matching everything and
//! nothing respectively.
//!
//! # Example
//!
//! ```
//! use lambda_decorators_middleware::JsonSchema;
//! use serde_json::json;
//!
//! let schema = JsonSchema::compile(&json!({
//!     "type": "object",
//!     "properties": {"price": {"$ref": "#/definitions/price"}},
//!     "required": ["price"],
//!     "definitions": {"price": {"type": "number"}}
//! }))
//! .unwrap();
//!
//! assert!(schema.validate(&json!({"price": 9.5})).is_ok());
//!
//! let error = schema.validate(&json!({"price": "foo"})).unwrap_err();
//! assert_eq!(error.message, "'foo' is not of type 'number'");
//! assert_eq!(error.path, "$.price");
//! ```

use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use thiserror::Error;

/// Keywords with validation semantics.
const SUPPORTED: &[&str] = &[
    "type",
    "enum",
    "const",
    "$ref",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "format",
    "items",
    "prefixItems",
    "additionalItems",
    "minItems",
    "maxItems",
    "uniqueItems",
    "contains",
    "minContains",
    "maxContains",
    "properties",
    "patternProperties",
    "additionalProperties",
    "required",
    "propertyNames",
    "minProperties",
    "maxProperties",
    "dependencies",
    "dependentRequired",
    "dependentSchemas",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
];

/// Keywords that never change whether an instance is valid.
const ANNOTATIONS: &[&str] = &[
    "$schema",
    "$id",
    "id",
    "$comment",
    "title",
    "description",
    "default",
    "examples",
    "readOnly",
    "writeOnly",
    "deprecated",
    "definitions",
    "$defs",
    "contentMediaType",
    "contentEncoding",
];

/// Errors raised while compiling or loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A keyword has the wrong shape or is not supported.
    #[error("invalid schema at {path}: {message}")]
    Invalid {
        /// Location of the offending keyword.
        path: String,
        /// What is wrong with it.
        message: String,
    },

    /// The schema file could not be read.
    #[error("failed to read schema file {path}: {source}")]
    Io {
        /// The file that was read.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The schema file is not valid JSON.
    #[error("failed to parse schema file {path}: {source}")]
    Parse {
        /// The file that was parsed.
        path: String,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}

impl SchemaError {
    fn invalid(path: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// A validation failure: where it happened and what was wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path of the offending value, `$` being the instance root.
    pub path: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ValidationError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Compiled `$ref` targets keyed by their pointer.
type Refs = HashMap<String, Node>;

/// A compiled schema.
#[derive(Debug, Clone)]
pub struct JsonSchema {
    root: Node,
    refs: Refs,
    source: Value,
}

impl JsonSchema {
    /// Compiles a schema document.
    pub fn compile(schema: &Value) -> Result<Self, SchemaError> {
        let mut compiler = Compiler::new(schema);
        let root = compiler.node(schema, "#")?;
        Ok(Self {
            root,
            refs: compiler.refs,
            source: schema.clone(),
        })
    }

    /// Reads and compiles a JSON schema file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: display.clone(),
            source,
        })?;
        let document: Value = serde_json::from_str(&content).map_err(|source| SchemaError::Parse {
            path: display,
            source,
        })?;
        Self::compile(&document)
    }

    /// Validates an instance, reporting the first failure found.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidationError> {
        self.root.validate(instance, "$", &self.refs)
    }

    /// Returns `true` if the instance is valid.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_ok()
    }

    /// Returns the document this schema was compiled from.
    #[must_use]
    pub fn source(&self) -> &Value {
        &self.source
    }
}

impl TryFrom<Value> for JsonSchema {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::compile(&value)
    }
}

/// Compiles nodes and collects the targets of every `$ref` reached.
struct Compiler<'a> {
    document: &'a Value,
    refs: Refs,
    pending: HashSet<String>,
}

impl<'a> Compiler<'a> {
    fn new(document: &'a Value) -> Self {
        Self {
            document,
            refs: Refs::new(),
            pending: HashSet::new(),
        }
    }

    fn node(&mut self, schema: &Value, path: &str) -> Result<Node, SchemaError> {
        match schema {
            Value::Bool(b) => Ok(Node::Bool(*b)),
            Value::Object(map) => Ok(Node::Keywords(Box::new(self.keywords(map, path)?))),
            _ => Err(SchemaError::invalid(path, "schema must be an object or a boolean")),
        }
    }

    fn optional(&mut self, map: &Map<String, Value>, keyword: &str, path: &str) -> Result<Option<Node>, SchemaError> {
        map.get(keyword)
            .map(|schema| self.node(schema, &format!("{path}/{keyword}")))
            .transpose()
    }

    fn list(&mut self, value: &Value, path: &str) -> Result<Vec<Node>, SchemaError> {
        let list = value
            .as_array()
            .filter(|list| !list.is_empty())
            .ok_or_else(|| SchemaError::invalid(path, "expected a non-empty array of schemas"))?;
        list.iter()
            .enumerate()
            .map(|(i, schema)| self.node(schema, &format!("{path}/{i}")))
            .collect()
    }

    fn named(&mut self, value: &Value, path: &str) -> Result<Vec<(String, Node)>, SchemaError> {
        let map = value
            .as_object()
            .ok_or_else(|| SchemaError::invalid(path, "expected an object"))?;
        map.iter()
            .map(|(name, schema)| Ok((name.clone(), self.node(schema, &format!("{path}/{name}"))?)))
            .collect()
    }

    /// Compiles the target of a local reference once, tolerating cycles.
    fn reference(&mut self, value: &Value, path: &str) -> Result<String, SchemaError> {
        let pointer = value
            .as_str()
            .ok_or_else(|| SchemaError::invalid(path, "expected a string"))?;
        if !pointer.starts_with('#') {
            return Err(SchemaError::invalid(
                path,
                format!("only local references are supported, got '{pointer}'"),
            ));
        }

        if !self.refs.contains_key(pointer) && self.pending.insert(pointer.to_string()) {
            let document: &'a Value = self.document;
            let target = resolve_pointer(document, pointer)
                .ok_or_else(|| SchemaError::invalid(path, format!("unresolvable reference '{pointer}'")))?;
            let node = self.node(target, pointer)?;
            self.pending.remove(pointer);
            self.refs.insert(pointer.to_string(), node);
        }

        Ok(pointer.to_string())
    }

    fn keywords(&mut self, map: &Map<String, Value>, path: &str) -> Result<Keywords, SchemaError> {
        if let Some(keyword) = map
            .keys()
            .find(|key| !SUPPORTED.contains(&key.as_str()) && !ANNOTATIONS.contains(&key.as_str()))
        {
            return Err(SchemaError::invalid(
                &format!("{path}/{keyword}"),
                format!("unsupported keyword '{keyword}'"),
            ));
        }

        let mut keywords = Keywords::default();

        if let Some(types) = map.get("type") {
            keywords.types = Some(compile_types(types, &format!("{path}/type"))?);
        }
        if let Some(values) = map.get("enum") {
            let values = values
                .as_array()
                .ok_or_else(|| SchemaError::invalid(&format!("{path}/enum"), "expected an array"))?;
            keywords.enum_values = Some(values.clone());
        }
        keywords.const_value = map.get("const").cloned();
        if let Some(reference) = map.get("$ref") {
            keywords.reference = Some(self.reference(reference, &format!("{path}/$ref"))?);
        }

        keywords.minimum = compile_bound(map, "minimum", "exclusiveMinimum", path)?;
        keywords.maximum = compile_bound(map, "maximum", "exclusiveMaximum", path)?;
        keywords.exclusive_minimum = compile_exclusive(map, "exclusiveMinimum", path)?;
        keywords.exclusive_maximum = compile_exclusive(map, "exclusiveMaximum", path)?;
        if let Some(divisor) = map.get("multipleOf") {
            keywords.multiple_of = match divisor {
                Value::Number(n) if n.as_f64().is_some_and(|f| f > 0.0) => Some(n.clone()),
                _ => {
                    return Err(SchemaError::invalid(
                        &format!("{path}/multipleOf"),
                        "expected a number greater than 0",
                    ))
                }
            };
        }

        keywords.min_length = compile_count(map, "minLength", path)?;
        keywords.max_length = compile_count(map, "maxLength", path)?;
        if let Some(pattern) = map.get("pattern") {
            keywords.pattern = Some(compile_regex(pattern, &format!("{path}/pattern"))?);
        }
        if let Some(format) = map.get("format") {
            let format_path = format!("{path}/format");
            let name = format
                .as_str()
                .ok_or_else(|| SchemaError::invalid(&format_path, "expected a string"))?;
            keywords.format = Some(Format::compile(name, &format_path)?);
        }

        self.array_keywords(&mut keywords, map, path)?;
        self.object_keywords(&mut keywords, map, path)?;

        if let Some(list) = map.get("allOf") {
            keywords.all_of = self.list(list, &format!("{path}/allOf"))?;
        }
        if let Some(list) = map.get("anyOf") {
            keywords.any_of = self.list(list, &format!("{path}/anyOf"))?;
        }
        if let Some(list) = map.get("oneOf") {
            keywords.one_of = self.list(list, &format!("{path}/oneOf"))?;
        }
        if let Some(not) = map.get("not") {
            keywords.not = Some((self.node(not, &format!("{path}/not"))?, not.clone()));
        }
        if let Some(condition) = self.optional(map, "if", path)? {
            keywords.conditional = Some(Conditional {
                condition,
                then: self.optional(map, "then", path)?,
                otherwise: self.optional(map, "else", path)?,
            });
        }

        Ok(keywords)
    }

    fn array_keywords(&mut self, keywords: &mut Keywords, map: &Map<String, Value>, path: &str) -> Result<(), SchemaError> {
        if let Some(prefix) = map.get("prefixItems") {
            keywords.prefix_items = self.list(prefix, &format!("{path}/prefixItems"))?;
            keywords.items = self.optional(map, "items", path)?;
        } else if let Some(items) = map.get("items").filter(|items| items.is_array()) {
            keywords.prefix_items = self.list(items, &format!("{path}/items"))?;
            keywords.items = self.optional(map, "additionalItems", path)?;
        } else {
            keywords.items = self.optional(map, "items", path)?;
        }

        keywords.min_items = compile_count(map, "minItems", path)?;
        keywords.max_items = compile_count(map, "maxItems", path)?;
        if let Some(unique) = map.get("uniqueItems") {
            keywords.unique_items = unique
                .as_bool()
                .ok_or_else(|| SchemaError::invalid(&format!("{path}/uniqueItems"), "expected a boolean"))?;
        }
        keywords.contains = self.optional(map, "contains", path)?;
        keywords.min_contains = compile_count(map, "minContains", path)?;
        keywords.max_contains = compile_count(map, "maxContains", path)?;

        Ok(())
    }

    fn object_keywords(&mut self, keywords: &mut Keywords, map: &Map<String, Value>, path: &str) -> Result<(), SchemaError> {
        if let Some(properties) = map.get("properties") {
            keywords.properties = self.named(properties, &format!("{path}/properties"))?;
        }
        if let Some(patterns) = map.get("patternProperties") {
            let patterns_path = format!("{path}/patternProperties");
            for (source, node) in self.named(patterns, &patterns_path)? {
                let regex = compile_regex(&Value::String(source), &patterns_path)?;
                keywords.pattern_properties.push((regex, node));
            }
        }
        keywords.additional_properties = self.optional(map, "additionalProperties", path)?;
        if let Some(required) = map.get("required") {
            keywords.required = compile_names(required, &format!("{path}/required"))?;
        }
        keywords.property_names = self.optional(map, "propertyNames", path)?;
        keywords.min_properties = compile_count(map, "minProperties", path)?;
        keywords.max_properties = compile_count(map, "maxProperties", path)?;

        if let Some(dependencies) = map.get("dependencies") {
            let dependencies_path = format!("{path}/dependencies");
            let dependencies = dependencies
                .as_object()
                .ok_or_else(|| SchemaError::invalid(&dependencies_path, "expected an object"))?;
            for (property, dependency) in dependencies {
                let dependency_path = format!("{dependencies_path}/{property}");
                if dependency.is_array() {
                    let names = compile_names(dependency, &dependency_path)?;
                    keywords.dependent_required.push((property.clone(), names));
                } else {
                    let node = self.node(dependency, &dependency_path)?;
                    keywords.dependent_schemas.push((property.clone(), node));
                }
            }
        }
        if let Some(dependencies) = map.get("dependentRequired") {
            let dependencies_path = format!("{path}/dependentRequired");
            let dependencies = dependencies
                .as_object()
                .ok_or_else(|| SchemaError::invalid(&dependencies_path, "expected an object"))?;
            for (property, names) in dependencies {
                let names = compile_names(names, &format!("{dependencies_path}/{property}"))?;
                keywords.dependent_required.push((property.clone(), names));
            }
        }
        if let Some(dependencies) = map.get("dependentSchemas") {
            let schemas = self.named(dependencies, &format!("{path}/dependentSchemas"))?;
            keywords.dependent_schemas.extend(schemas);
        }

        Ok(())
    }
}

/// Resolves `#` or `#/json/pointer` against the whole document.
fn resolve_pointer<'v>(document: &'v Value, reference: &str) -> Option<&'v Value> {
    let fragment = reference.strip_prefix('#')?;
    if fragment.is_empty() {
        Some(document)
    } else {
        document.pointer(fragment)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Bool(bool),
    Keywords(Box<Keywords>),
}

#[derive(Debug, Clone, Default)]
struct Keywords {
    types: Option<Vec<JsonType>>,
    enum_values: Option<Vec<Value>>,
    const_value: Option<Value>,
    reference: Option<String>,

    minimum: Option<Bound>,
    maximum: Option<Bound>,
    exclusive_minimum: Option<f64>,
    exclusive_maximum: Option<f64>,
    multiple_of: Option<Number>,

    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    format: Option<Format>,

    prefix_items: Vec<Node>,
    /// Applies to every item past `prefix_items`.
    items: Option<Node>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    unique_items: bool,
    contains: Option<Node>,
    min_contains: Option<usize>,
    max_contains: Option<usize>,

    properties: Vec<(String, Node)>,
    pattern_properties: Vec<(Regex, Node)>,
    additional_properties: Option<Node>,
    required: Vec<String>,
    property_names: Option<Node>,
    min_properties: Option<usize>,
    max_properties: Option<usize>,
    dependent_required: Vec<(String, Vec<String>)>,
    dependent_schemas: Vec<(String, Node)>,

    all_of: Vec<Node>,
    any_of: Vec<Node>,
    one_of: Vec<Node>,
    not: Option<(Node, Value)>,
    conditional: Option<Conditional>,
}

/// An inclusive bound, or a draft-4 bound made exclusive by a boolean flag.
#[derive(Debug, Clone, Copy)]
struct Bound {
    limit: f64,
    exclusive: bool,
}

#[derive(Debug, Clone)]
struct Conditional {
    condition: Node,
    then: Option<Node>,
    otherwise: Option<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null)
            | (Self::Boolean, Value::Bool(_))
            | (Self::Number, Value::Number(_))
            | (Self::String, Value::String(_))
            | (Self::Array, Value::Array(_))
            | (Self::Object, Value::Object(_)) => true,
            (Self::Integer, Value::Number(n)) => is_integral(n),
            _ => false,
        }
    }
}

fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
}

/// A `format` value and how strings are checked against it.
#[derive(Debug, Clone)]
struct Format {
    name: String,
    check: FormatCheck,
}

#[derive(Debug, Clone)]
enum FormatCheck {
    Pattern(Regex),
    Ipv4,
    Ipv6,
    Hostname,
    Regex,
}

const DATE: &str = r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$";
const TIME: &str = r"^([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?([Zz]|[+-]([01][0-9]|2[0-3]):[0-5][0-9])?$";
const DATE_TIME: &str = r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])[Tt ]([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?([Zz]|[+-]([01][0-9]|2[0-3]):[0-5][0-9])$";
const EMAIL: &str = r"^[^@\s]+@[^@\s]+$";
const URI: &str = r"^[A-Za-z][A-Za-z0-9+.\-]*:\S*$";
const UUID: &str = r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

impl Format {
    fn compile(name: &str, path: &str) -> Result<Self, SchemaError> {
        let pattern = |source: &str| {
            Regex::new(source)
                .map(FormatCheck::Pattern)
                .map_err(|e| SchemaError::invalid(path, e.to_string()))
        };

        let check = match name {
            "date-time" => pattern(DATE_TIME)?,
            "date" => pattern(DATE)?,
            "time" => pattern(TIME)?,
            "email" | "idn-email" => pattern(EMAIL)?,
            "uri" => pattern(URI)?,
            "uuid" => pattern(UUID)?,
            "ipv4" => FormatCheck::Ipv4,
            "ipv6" => FormatCheck::Ipv6,
            "hostname" => FormatCheck::Hostname,
            "regex" => FormatCheck::Regex,
            _ => return Err(SchemaError::invalid(path, format!("unsupported format '{name}'"))),
        };

        Ok(Self {
            name: name.to_string(),
            check,
        })
    }

    fn matches(&self, s: &str) -> bool {
        match &self.check {
            FormatCheck::Pattern(regex) => regex.is_match(s),
            FormatCheck::Ipv4 => s.parse::<Ipv4Addr>().is_ok(),
            FormatCheck::Ipv6 => s.parse::<Ipv6Addr>().is_ok(),
            FormatCheck::Hostname => is_hostname(s),
            FormatCheck::Regex => Regex::new(s).is_ok(),
        }
    }
}

fn is_hostname(s: &str) -> bool {
    let name = s.strip_suffix('.').unwrap_or(s);
    !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl Node {
    fn validate(&self, instance: &Value, path: &str, refs: &Refs) -> Result<(), ValidationError> {
        match self {
            Self::Bool(true) => Ok(()),
            Self::Bool(false) => Err(ValidationError::new(
                path,
                format!("False schema does not allow {}", repr(instance)),
            )),
            Self::Keywords(keywords) => keywords.validate(instance, path, refs),
        }
    }

    fn is_valid(&self, instance: &Value, refs: &Refs) -> bool {
        self.validate(instance, "$", refs).is_ok()
    }
}

impl Keywords {
    fn validate(&self, instance: &Value, path: &str, refs: &Refs) -> Result<(), ValidationError> {
        if let Some(types) = &self.types {
            if !types.iter().any(|t| t.matches(instance)) {
                let names: Vec<String> = types.iter().map(|t| format!("'{}'", t.name())).collect();
                return Err(ValidationError::new(
                    path,
                    format!("{} is not of type {}", repr(instance), names.join(", ")),
                ));
            }
        }

        if let Some(expected) = &self.const_value {
            if !json_equal(instance, expected) {
                return Err(ValidationError::new(path, format!("{} was expected", repr(expected))));
            }
        }

        if let Some(values) = &self.enum_values {
            if !values.iter().any(|v| json_equal(instance, v)) {
                return Err(ValidationError::new(
                    path,
                    format!("{} is not one of {}", repr(instance), repr(&Value::Array(values.clone()))),
                ));
            }
        }

        if let Some(reference) = &self.reference {
            let target = refs.get(reference).ok_or_else(|| {
                ValidationError::new(path, format!("Unresolvable reference {}", repr_str(reference)))
            })?;
            target.validate(instance, path, refs)?;
        }

        match instance {
            Value::Number(n) => self.validate_number(n, instance, path)?,
            Value::String(s) => self.validate_string(s, instance, path)?,
            Value::Array(items) => self.validate_array(items, instance, path, refs)?,
            Value::Object(map) => self.validate_object(map, instance, path, refs)?,
            Value::Null | Value::Bool(_) => {}
        }

        self.validate_combinators(instance, path, refs)
    }

    fn validate_number(&self, n: &Number, instance: &Value, path: &str) -> Result<(), ValidationError> {
        let Some(value) = n.as_f64() else {
            return Ok(());
        };

        let below = |limit: f64| {
            ValidationError::new(
                path,
                format!("{} is less than the minimum of {}", repr(instance), format_limit(limit)),
            )
        };
        let at_or_below = |limit: f64| {
            ValidationError::new(
                path,
                format!("{} is less than or equal to the minimum of {}", repr(instance), format_limit(limit)),
            )
        };
        let above = |limit: f64| {
            ValidationError::new(
                path,
                format!("{} is greater than the maximum of {}", repr(instance), format_limit(limit)),
            )
        };
        let at_or_above = |limit: f64| {
            ValidationError::new(
                path,
                format!("{} is greater than or equal to the maximum of {}", repr(instance), format_limit(limit)),
            )
        };

        if let Some(bound) = self.minimum {
            if bound.exclusive && value <= bound.limit {
                return Err(at_or_below(bound.limit));
            }
            if value < bound.limit {
                return Err(below(bound.limit));
            }
        }
        if let Some(limit) = self.exclusive_minimum {
            if value <= limit {
                return Err(at_or_below(limit));
            }
        }

        if let Some(bound) = self.maximum {
            if bound.exclusive && value >= bound.limit {
                return Err(at_or_above(bound.limit));
            }
            if value > bound.limit {
                return Err(above(bound.limit));
            }
        }
        if let Some(limit) = self.exclusive_maximum {
            if value >= limit {
                return Err(at_or_above(limit));
            }
        }

        if let Some(divisor) = &self.multiple_of {
            if !is_multiple(n, divisor) {
                return Err(ValidationError::new(
                    path,
                    format!("{} is not a multiple of {divisor}", repr(instance)),
                ));
            }
        }

        Ok(())
    }

    fn validate_string(&self, s: &str, instance: &Value, path: &str) -> Result<(), ValidationError> {
        let length = s.chars().count();

        if self.min_length.is_some_and(|min| length < min) {
            return Err(ValidationError::new(path, format!("{} is too short", repr(instance))));
        }
        if self.max_length.is_some_and(|max| length > max) {
            return Err(ValidationError::new(path, format!("{} is too long", repr(instance))));
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(s) {
                return Err(ValidationError::new(
                    path,
                    format!("{} does not match {}", repr(instance), repr_str(pattern.as_str())),
                ));
            }
        }
        if let Some(format) = &self.format {
            if !format.matches(s) {
                return Err(ValidationError::new(
                    path,
                    format!("{} is not a {}", repr(instance), repr_str(&format.name)),
                ));
            }
        }

        Ok(())
    }

    fn validate_array(&self, items: &[Value], instance: &Value, path: &str, refs: &Refs) -> Result<(), ValidationError> {
        if self.min_items.is_some_and(|min| items.len() < min) {
            return Err(ValidationError::new(path, format!("{} is too short", repr(instance))));
        }
        if self.max_items.is_some_and(|max| items.len() > max) {
            return Err(ValidationError::new(path, format!("{} is too long", repr(instance))));
        }
        if self.unique_items && has_duplicates(items) {
            return Err(ValidationError::new(path, format!("{} has non-unique elements", repr(instance))));
        }

        let prefix = self.prefix_items.len();
        if matches!(self.items, Some(Node::Bool(false))) && items.len() > prefix {
            let extra: Vec<String> = items[prefix..].iter().map(repr).collect();
            return Err(ValidationError::new(
                path,
                format!("Additional items are not allowed ({})", unexpected(&extra)),
            ));
        }
        for (i, item) in items.iter().enumerate() {
            if let Some(schema) = self.prefix_items.get(i).or(self.items.as_ref()) {
                schema.validate(item, &format!("{path}[{i}]"), refs)?;
            }
        }

        if let Some(schema) = &self.contains {
            let matched = items.iter().filter(|item| schema.is_valid(item, refs)).count();
            let min = self.min_contains.unwrap_or(1);
            if matched == 0 && min > 0 {
                return Err(ValidationError::new(
                    path,
                    format!("{} does not contain items matching the given schema", repr(instance)),
                ));
            }
            if matched < min {
                return Err(ValidationError::new(
                    path,
                    format!(
                        "Too few items match the given schema (expected at least {min} but only {matched} matched)"
                    ),
                ));
            }
            if let Some(max) = self.max_contains.filter(|max| matched > *max) {
                return Err(ValidationError::new(
                    path,
                    format!("Too many items match the given schema (expected at most {max})"),
                ));
            }
        }

        Ok(())
    }

    fn validate_object(
        &self,
        map: &Map<String, Value>,
        instance: &Value,
        path: &str,
        refs: &Refs,
    ) -> Result<(), ValidationError> {
        if self.min_properties.is_some_and(|min| map.len() < min) {
            return Err(ValidationError::new(
                path,
                format!("{} does not have enough properties", repr(instance)),
            ));
        }
        if self.max_properties.is_some_and(|max| map.len() > max) {
            return Err(ValidationError::new(path, format!("{} has too many properties", repr(instance))));
        }

        for name in &self.required {
            if !map.contains_key(name) {
                return Err(ValidationError::new(
                    path,
                    format!("{} is a required property", repr_str(name)),
                ));
            }
        }

        for (property, names) in &self.dependent_required {
            if !map.contains_key(property) {
                continue;
            }
            if let Some(missing) = names.iter().find(|name| !map.contains_key(name.as_str())) {
                return Err(ValidationError::new(
                    path,
                    format!("{} is a dependency of {}", repr_str(missing), repr_str(property)),
                ));
            }
        }

        if let Some(schema) = &self.property_names {
            for key in map.keys() {
                schema.validate(&Value::String(key.clone()), path, refs)?;
            }
        }

        for (name, schema) in &self.properties {
            if let Some(value) = map.get(name) {
                schema.validate(value, &format!("{path}.{name}"), refs)?;
            }
        }

        for (regex, schema) in &self.pattern_properties {
            for (key, value) in map.iter().filter(|(key, _)| regex.is_match(key)) {
                schema.validate(value, &format!("{path}.{key}"), refs)?;
            }
        }

        match &self.additional_properties {
            Some(Node::Bool(false)) => {
                let mut extra: Vec<&String> = map.keys().filter(|key| !self.is_declared(key)).collect();
                if !extra.is_empty() {
                    return Err(ValidationError::new(path, self.additional_message(&mut extra)));
                }
            }
            Some(schema) => {
                for (key, value) in map.iter().filter(|(key, _)| !self.is_declared(key)) {
                    schema.validate(value, &format!("{path}.{key}"), refs)?;
                }
            }
            None => {}
        }

        for (property, schema) in &self.dependent_schemas {
            if map.contains_key(property) {
                schema.validate(instance, path, refs)?;
            }
        }

        Ok(())
    }

    /// A key is declared when `properties` names it or a `patternProperties` regex matches it.
    fn is_declared(&self, key: &str) -> bool {
        self.properties.iter().any(|(name, _)| name == key)
            || self.pattern_properties.iter().any(|(regex, _)| regex.is_match(key))
    }

    fn additional_message(&self, extra: &mut [&String]) -> String {
        if self.pattern_properties.is_empty() {
            let extra: Vec<String> = extra.iter().map(|key| repr_str(key)).collect();
            return format!("Additional properties are not allowed ({})", unexpected(&extra));
        }

        extra.sort();
        let verb = if extra.len() == 1 { "does" } else { "do" };
        let keys: Vec<String> = extra.iter().map(|key| repr_str(key)).collect();
        let mut patterns: Vec<&str> = self.pattern_properties.iter().map(|(regex, _)| regex.as_str()).collect();
        patterns.sort_unstable();
        let patterns: Vec<String> = patterns.into_iter().map(repr_str).collect();
        format!(
            "{} {verb} not match any of the regexes: {}",
            keys.join(", "),
            patterns.join(", ")
        )
    }

    fn validate_combinators(&self, instance: &Value, path: &str, refs: &Refs) -> Result<(), ValidationError> {
        for schema in &self.all_of {
            schema.validate(instance, path, refs)?;
        }

        if !self.any_of.is_empty() && !self.any_of.iter().any(|s| s.is_valid(instance, refs)) {
            return Err(ValidationError::new(
                path,
                format!("{} is not valid under any of the given schemas", repr(instance)),
            ));
        }

        if !self.one_of.is_empty() {
            let matching = self.one_of.iter().filter(|s| s.is_valid(instance, refs)).count();
            if matching == 0 {
                return Err(ValidationError::new(
                    path,
                    format!("{} is not valid under any of the given schemas", repr(instance)),
                ));
            }
            if matching > 1 {
                return Err(ValidationError::new(
                    path,
                    format!("{} is valid under more than one of the given schemas", repr(instance)),
                ));
            }
        }

        if let Some((schema, source)) = &self.not {
            if schema.is_valid(instance, refs) {
                return Err(ValidationError::new(
                    path,
                    format!("{} should not be valid under {}", repr(instance), repr(source)),
                ));
            }
        }

        if let Some(conditional) = &self.conditional {
            let branch = if conditional.condition.is_valid(instance, refs) {
                &conditional.then
            } else {
                &conditional.otherwise
            };
            if let Some(schema) = branch {
                schema.validate(instance, path, refs)?;
            }
        }

        Ok(())
    }
}

fn compile_types(value: &Value, path: &str) -> Result<Vec<JsonType>, SchemaError> {
    let parse = |name: &Value| {
        name.as_str()
            .and_then(JsonType::parse)
            .ok_or_else(|| SchemaError::invalid(path, format!("unknown type {name}")))
    };

    match value {
        Value::String(_) => Ok(vec![parse(value)?]),
        Value::Array(names) if !names.is_empty() => names.iter().map(parse).collect(),
        _ => Err(SchemaError::invalid(path, "expected a type name or a non-empty list of type names")),
    }
}

fn compile_count(map: &Map<String, Value>, keyword: &str, path: &str) -> Result<Option<usize>, SchemaError> {
    map.get(keyword)
        .map(|value| {
            value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| SchemaError::invalid(&format!("{path}/{keyword}"), "expected a non-negative integer"))
        })
        .transpose()
}

fn compile_names(value: &Value, path: &str) -> Result<Vec<String>, SchemaError> {
    let names = value
        .as_array()
        .ok_or_else(|| SchemaError::invalid(path, "expected an array of strings"))?;
    names
        .iter()
        .map(|name| {
            name.as_str()
                .map(str::to_string)
                .ok_or_else(|| SchemaError::invalid(path, "expected an array of strings"))
        })
        .collect()
}

fn compile_regex(value: &Value, path: &str) -> Result<Regex, SchemaError> {
    let source = value
        .as_str()
        .ok_or_else(|| SchemaError::invalid(path, "expected a string"))?;
    Regex::new(source).map_err(|e| SchemaError::invalid(path, e.to_string()))
}

fn keyword_number(value: &Value, keyword: &str, path: &str) -> Result<f64, SchemaError> {
    value
        .as_f64()
        .ok_or_else(|| SchemaError::invalid(&format!("{path}/{keyword}"), "expected a number"))
}

/// Reads an inclusive bound, made exclusive when its counterpart is `true`.
fn compile_bound(
    map: &Map<String, Value>,
    inclusive: &str,
    exclusive: &str,
    path: &str,
) -> Result<Option<Bound>, SchemaError> {
    let Some(value) = map.get(inclusive) else {
        return Ok(None);
    };
    Ok(Some(Bound {
        limit: keyword_number(value, inclusive, path)?,
        exclusive: map.get(exclusive).and_then(Value::as_bool).unwrap_or(false),
    }))
}

/// Reads a numeric exclusive bound; the boolean form is handled by [`compile_bound`].
fn compile_exclusive(map: &Map<String, Value>, keyword: &str, path: &str) -> Result<Option<f64>, SchemaError> {
    match map.get(keyword) {
        None | Some(Value::Bool(_)) => Ok(None),
        Some(value) => keyword_number(value, keyword, path).map(Some),
    }
}

fn is_multiple(n: &Number, divisor: &Number) -> bool {
    if let (Some(value), Some(divisor)) = (n.as_i64(), divisor.as_i64()) {
        return value % divisor == 0;
    }
    match (n.as_f64(), divisor.as_f64()) {
        (Some(value), Some(divisor)) => {
            let quotient = value / divisor;
            quotient.is_finite() && quotient.fract() == 0.0
        }
        _ => true,
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, a)| items[i + 1..].iter().any(|b| json_equal(a, b)))
}

/// `'a' was unexpected` / `'a', 'b' were unexpected`.
fn unexpected(extra: &[String]) -> String {
    let verb = if extra.len() == 1 { "was" } else { "were" };
    format!("{} {verb} unexpected", extra.join(", "))
}

/// Compares JSON values, treating `1` and `1.0` as equal.
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(key, a)| y.get(key).is_some_and(|b| json_equal(a, b)))
        }
        _ => a == b,
    }
}

fn format_limit(limit: f64) -> String {
    if limit.fract() == 0.0 && limit.abs() < 1e15 {
        format!("{limit:.0}")
    } else {
        limit.to_string()
    }
}

fn repr_str(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        format!("\"{s}\"")
    } else {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Renders a value the way error messages quote instances: strings in
/// single quotes, `True`/`False`/`None` for literals.
fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => repr_str(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}: {}", repr_str(key), repr(value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}
