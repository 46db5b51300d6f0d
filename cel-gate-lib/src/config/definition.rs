//! Expression definitions attached to a route's extra configuration

use serde::{Deserialize, Serialize};

/// The reserved key under which expression definitions live in a route's extra configuration.
pub const NAMESPACE: &str = "validation/cel";

/// The opaque, already-parsed configuration tree attached to an endpoint or backend.
pub type ExtraConfig = serde_json::Map<String, serde_json::Value>;

/// A single policy entry as written by the operator.
///
/// Either expression may be empty. Only the check expression is evaluated by the gate,
/// the modification expression is reserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Definition {
    #[serde(rename = "check_expr", default)]
    pub check_expression: String,

    #[serde(rename = "mod_expr", default)]
    pub mod_expression: String,
}

impl Definition {
    #[must_use]
    pub fn check(expression: impl Into<String>) -> Self {
        Self {
            check_expression: expression.into(),
            mod_expression: String::new(),
        }
    }
}

/// Extract the expression definitions stored under [`NAMESPACE`].
///
/// Returns `None` when the key is absent, and also when the value under the key does not
/// have the shape of a definition list. A malformed policy is treated exactly like a
/// missing one; compilation is where real failures get reported.
#[must_use]
pub fn load_definitions(extra: &ExtraConfig) -> Option<Vec<Definition>> {
    let value = extra.get(NAMESPACE)?;
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extra(value: serde_json::Value) -> ExtraConfig {
        let mut extra = ExtraConfig::new();
        let _ = extra.insert(NAMESPACE.to_string(), value);
        extra
    }

    #[test]
    fn test_missing_namespace() {
        let mut other = ExtraConfig::new();
        let _ = other.insert("qos/ratelimit".to_string(), json!({"max_rate": 10}));
        assert_eq!(load_definitions(&other), None);
        assert_eq!(load_definitions(&ExtraConfig::new()), None);
    }

    #[test]
    fn test_loads_definitions_in_order() {
        let defs = load_definitions(&extra(json!([
            {"check_expr": "req_method == 'GET'"},
            {"check_expr": "resp_completed", "mod_expr": "resp_data"},
        ])))
        .unwrap();

        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0], Definition::check("req_method == 'GET'"));
        assert_eq!(defs[1].check_expression, "resp_completed");
        assert_eq!(defs[1].mod_expression, "resp_data");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let defs = load_definitions(&extra(json!([{}, {"mod_expr": "x"}]))).unwrap();
        assert_eq!(defs[0], Definition::default());
        assert!(defs[1].check_expression.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let defs = load_definitions(&extra(json!([{"check_expr": "true", "comment": "always"}]))).unwrap();
        assert_eq!(defs, vec![Definition::check("true")]);
    }

    #[test]
    fn test_empty_list_is_found() {
        assert_eq!(load_definitions(&extra(json!([]))), Some(vec![]));
    }

    #[test]
    fn test_malformed_values_are_not_found() {
        for value in [
            json!("int(req_params.Id) % 2 == 0"),
            json!({"check_expr": "true"}),
            json!([{"check_expr": 42}]),
            json!([1, 2]),
            json!(null),
            json!(true),
        ] {
            assert_eq!(load_definitions(&extra(value.clone())), None, "{value} should not decode");
        }
    }
}
