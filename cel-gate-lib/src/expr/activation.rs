//! Binding request, response, and claims data to the declared identifiers

use super::environment::{
    JWT, NOW, REQ_HEADERS, REQ_METHOD, REQ_PARAMS, REQ_PATH, REQ_QUERYSTRING, RESP_COMPLETED, RESP_DATA, RESP_METADATA_HEADERS,
    RESP_METADATA_STATUS,
};
use super::functions;
use crate::proxy::{Request, Response};
use cel_interpreter::{Context, Value, objects::Map};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Source of the `now` timestamp exposed to expressions.
pub type Clock = fn() -> DateTime<Utc>;

/// Render a timestamp the way expressions see it in `now`.
#[must_use]
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The identifier-to-value bindings for a single evaluation.
///
/// An activation is built from the data of one call and dropped once that call's chain
/// has been evaluated.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    bindings: Vec<(&'static str, Value)>,
}

impl Activation {
    /// Bindings for the pre phase.
    #[must_use]
    pub fn for_request(request: &Request, now: &str) -> Self {
        Self {
            bindings: vec![
                (REQ_METHOD, string(&request.method)),
                (REQ_PATH, string(&request.path)),
                (REQ_PARAMS, string_map(&request.params)),
                (REQ_HEADERS, multi_value_map(&request.headers)),
                (REQ_QUERYSTRING, multi_value_map(&request.query)),
                (NOW, string(now)),
            ],
        }
    }

    /// Bindings for the post phase.
    #[must_use]
    pub fn for_response(response: &Response, now: &str) -> Self {
        Self {
            bindings: vec![
                (RESP_COMPLETED, Value::Bool(response.is_complete)),
                (RESP_METADATA_STATUS, Value::Int(i64::from(response.metadata.status_code))),
                (RESP_METADATA_HEADERS, multi_value_map(&response.metadata.headers)),
                (RESP_DATA, object(&response.data)),
                (NOW, string(now)),
            ],
        }
    }

    /// Bindings for claims validation.
    #[must_use]
    pub fn for_claims(claims: &serde_json::Map<String, serde_json::Value>, now: &str) -> Self {
        Self {
            bindings: vec![(JWT, object(claims)), (NOW, string(now))],
        }
    }

    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.bindings.iter().find(|(name, _)| *name == identifier).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.bindings.iter().map(|(name, value)| (*name, value))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Build an interpreter context holding these bindings and the gate's extension functions.
    pub(crate) fn to_context(&self) -> Context<'static> {
        let mut context = Context::default();
        functions::register(&mut context);

        for (name, value) in &self.bindings {
            context.add_variable_from_value(*name, value.clone());
        }

        context
    }
}

/// Convert a JSON value to a CEL value.
///
/// Integers that fit in `i64` become `int`, larger ones `uint`, everything else `double`.
#[must_use]
pub fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                n.as_f64().map_or(Value::Null, Value::Float)
            }
        }
        serde_json::Value::String(s) => string(s),
        serde_json::Value::Array(items) => Value::List(Arc::new(items.iter().map(json_to_value).collect())),
        serde_json::Value::Object(fields) => object(fields),
    }
}

fn string(s: &str) -> Value {
    Value::String(Arc::new(s.to_string()))
}

fn object(fields: &serde_json::Map<String, serde_json::Value>) -> Value {
    let map: HashMap<Arc<String>, Value> = fields.iter().map(|(k, v)| (Arc::new(k.clone()), json_to_value(v))).collect();
    Value::Map(Map::from(map))
}

fn string_map(fields: &HashMap<String, String>) -> Value {
    let map: HashMap<Arc<String>, Value> = fields.iter().map(|(k, v)| (Arc::new(k.clone()), string(v))).collect();
    Value::Map(Map::from(map))
}

fn multi_value_map(fields: &HashMap<String, Vec<String>>) -> Value {
    let map: HashMap<Arc<String>, Value> = fields
        .iter()
        .map(|(k, values)| (Arc::new(k.clone()), Value::List(Arc::new(values.iter().map(|v| string(v)).collect()))))
        .collect();
    Value::Map(Map::from(map))
}
