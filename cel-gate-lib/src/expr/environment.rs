//! The fixed declaration environment shared by every route

use super::checker::Checker;
use cel_parser::Expression;
use cel_parser::ast::operators;
use core::fmt;
use strum::{Display, EnumIter};

pub const NOW: &str = "now";

pub const REQ_METHOD: &str = "req_method";
pub const REQ_PATH: &str = "req_path";
pub const REQ_PARAMS: &str = "req_params";
pub const REQ_HEADERS: &str = "req_headers";
pub const REQ_QUERYSTRING: &str = "req_querystring";

pub const RESP_COMPLETED: &str = "resp_completed";
pub const RESP_METADATA_STATUS: &str = "resp_metadata_status";
pub const RESP_METADATA_HEADERS: &str = "resp_metadata_headers";
pub const RESP_DATA: &str = "resp_data";

pub const JWT: &str = "JWT";

/// The pipeline phase an expression belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// Before the request reaches the wrapped handler
    Pre,

    /// After the wrapped handler produced a response
    Post,

    /// While validating an authentication token's claims
    Claims,
}

impl Phase {
    /// The reserved token whose presence routes an expression to this phase.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Pre => "req",
            Self::Post => "resp",
            Self::Claims => JWT,
        }
    }

    /// Whether an expression's text belongs to this phase.
    ///
    /// This is a plain substring test: the prefix may appear anywhere in the text,
    /// including inside a string literal.
    #[must_use]
    pub fn selects(self, expression: &str) -> bool {
        expression.contains(self.prefix())
    }
}

/// The static type of a declared identifier or of a checked subexpression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelType {
    String,
    Bool,
    Int,
    Uint,
    Double,
    Bytes,
    Null,
    Dyn,
    List(&'static CelType),
    Map(&'static CelType, &'static CelType),
}

impl CelType {
    /// Whether a runtime value inhabits this type.
    #[must_use]
    pub fn admits(&self, value: &cel_interpreter::Value) -> bool {
        use cel_interpreter::Value;
        use cel_interpreter::objects::Key;

        match (self, value) {
            (Self::Dyn, _)
            | (Self::String, Value::String(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Uint, Value::UInt(_))
            | (Self::Double, Value::Float(_))
            | (Self::Bytes, Value::Bytes(_))
            | (Self::Null, Value::Null) => true,
            (Self::List(element), Value::List(items)) => items.iter().all(|item| element.admits(item)),
            (Self::Map(key, element), Value::Map(map)) => map.map.iter().all(|(k, v)| {
                let key_ok = match k {
                    Key::String(_) => matches!(key, Self::String | Self::Dyn),
                    _ => matches!(key, Self::Dyn),
                };
                key_ok && element.admits(v)
            }),
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Uint | Self::Double)
    }

    /// Whether the type can stand where a boolean is expected.
    #[must_use]
    pub const fn is_boolean(self) -> bool {
        matches!(self, Self::Bool | Self::Dyn)
    }

    /// Whether values of the two types can meet in an equality, ordering or arithmetic
    /// operator. `dyn` and `null` meet everything, numbers meet each other.
    #[must_use]
    pub fn is_compatible_with(self, other: Self) -> bool {
        match (self, other) {
            (Self::Dyn | Self::Null, _) | (_, Self::Dyn | Self::Null) => true,
            (Self::List(a), Self::List(b)) => a.is_compatible_with(*b),
            (Self::Map(ak, av), Self::Map(bk, bv)) => ak.is_compatible_with(*bk) && av.is_compatible_with(*bv),
            (a, b) => a == b || (a.is_numeric() && b.is_numeric()),
        }
    }

    /// A list of `element`. Element types that are themselves containers widen to `dyn`.
    #[must_use]
    pub const fn list_of(element: Self) -> Self {
        Self::List(match element {
            Self::String => &Self::String,
            Self::Bool => &Self::Bool,
            Self::Int => &Self::Int,
            Self::Uint => &Self::Uint,
            Self::Double => &Self::Double,
            Self::Bytes => &Self::Bytes,
            Self::Null => &Self::Null,
            Self::Dyn | Self::List(_) | Self::Map(..) => &Self::Dyn,
        })
    }
}

impl fmt::Display for CelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Uint => write!(f, "uint"),
            Self::Double => write!(f, "double"),
            Self::Bytes => write!(f, "bytes"),
            Self::Null => write!(f, "null_type"),
            Self::Dyn => write!(f, "dyn"),
            Self::List(element) => write!(f, "list({element})"),
            Self::Map(key, value) => write!(f, "map({key}, {value})"),
        }
    }
}

const STRING_LIST: CelType = CelType::List(&CelType::String);
const STRING_MAP: CelType = CelType::Map(&CelType::String, &CelType::String);
const MULTI_VALUE_MAP: CelType = CelType::Map(&CelType::String, &STRING_LIST);
const DYN_MAP: CelType = CelType::Map(&CelType::String, &CelType::Dyn);

/// Identifiers visible to every expression, with their types.
pub static DECLARATIONS: &[(&str, CelType)] = &[
    (NOW, CelType::String),
    (REQ_METHOD, CelType::String),
    (REQ_PATH, CelType::String),
    (REQ_PARAMS, STRING_MAP),
    (REQ_HEADERS, MULTI_VALUE_MAP),
    (REQ_QUERYSTRING, MULTI_VALUE_MAP),
    (RESP_COMPLETED, CelType::Bool),
    (RESP_METADATA_STATUS, CelType::Int),
    (RESP_METADATA_HEADERS, MULTI_VALUE_MAP),
    (RESP_DATA, DYN_MAP),
    (JWT, DYN_MAP),
];

/// Functions the runtime provides, including the gate's own extensions.
///
/// Macros such as `has` or `all` are not listed: the parser expands them into field
/// tests and comprehensions before anything is checked.
pub static FUNCTIONS: &[&str] = &[
    "size",
    "contains",
    "startsWith",
    "endsWith",
    "matches",
    "int",
    "uint",
    "double",
    "string",
    "bytes",
    "timestamp",
    "duration",
    "max",
    "min",
    "getFullYear",
    "getMonth",
    "getDayOfYear",
    "getDayOfMonth",
    "getDate",
    "getDayOfWeek",
    "getHours",
    "getMinutes",
    "getSeconds",
    "getMilliseconds",
    super::functions::WEEKDAY,
];

/// Operators the interpreter evaluates itself, under their parsed function names.
pub static OPERATORS: &[&str] = &[
    operators::CONDITIONAL,
    operators::LOGICAL_AND,
    operators::LOGICAL_OR,
    operators::LOGICAL_NOT,
    operators::NOT_STRICTLY_FALSE,
    operators::EQUALS,
    operators::NOT_EQUALS,
    operators::LESS,
    operators::LESS_EQUALS,
    operators::GREATER,
    operators::GREATER_EQUALS,
    operators::ADD,
    operators::SUBSTRACT,
    operators::MULTIPLY,
    operators::DIVIDE,
    operators::MODULO,
    operators::NEGATE,
    operators::INDEX,
    operators::IN,
];

/// The declaration environment expressions are checked against.
///
/// The environment is the same for every route. Route-specific data only ever enters an
/// evaluation through an [`Activation`](super::Activation).
#[derive(Debug, Clone, Copy)]
pub struct TypeEnvironment {
    declarations: &'static [(&'static str, CelType)],
    functions: &'static [&'static str],
}

impl TypeEnvironment {
    #[must_use]
    pub fn standard() -> Self {
        Self {
            declarations: DECLARATIONS,
            functions: FUNCTIONS,
        }
    }

    /// The declared type of an identifier, if any.
    #[must_use]
    pub fn lookup(&self, identifier: &str) -> Option<CelType> {
        self.declarations.iter().find(|(name, _)| *name == identifier).map(|(_, ty)| *ty)
    }

    /// Whether a call to `name` resolves to a runtime function or a built-in operator.
    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(&name) || OPERATORS.contains(&name)
    }

    /// Check a parsed expression against the environment and infer its type.
    ///
    /// Identifiers must be declared or bound by an enclosing comprehension, calls must
    /// name a known function or operator, and operands whose types are known must fit
    /// the operator they meet.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic describing the first problem found
    pub fn check(&self, expression: &Expression, source: &str) -> Result<CelType, String> {
        Checker::new(*self)
            .check(expression)
            .map_err(|diagnostic| format!("{diagnostic} in expression '{source}'"))
    }
}

impl Default for TypeEnvironment {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cel_parser::Parser;
    use strum::IntoEnumIterator;

    fn check(source: &str) -> Result<CelType, String> {
        let expression = Parser::new().parse(source).unwrap();
        TypeEnvironment::standard().check(&expression, source)
    }

    #[test]
    fn test_phase_prefixes() {
        assert_eq!(Phase::Pre.prefix(), "req");
        assert_eq!(Phase::Post.prefix(), "resp");
        assert_eq!(Phase::Claims.prefix(), "JWT");
        assert_eq!(Phase::Claims.to_string(), "claims");
    }

    #[test]
    fn test_phase_selection_is_substring_based() {
        assert!(Phase::Pre.selects("req_method == 'GET'"));
        assert!(Phase::Pre.selects("'required' == 'required'"));
        assert!(!Phase::Pre.selects("resp_completed"));
        assert!(Phase::Post.selects("resp_completed"));
        assert!(Phase::Claims.selects("has(JWT.sub)"));
        assert!(!Phase::Claims.selects("has(jwt.sub)"));
    }

    #[test]
    fn test_every_declaration_belongs_to_a_phase_or_is_now() {
        for (name, _) in DECLARATIONS {
            let phases = Phase::iter().filter(|p| p.selects(name)).count();
            assert!(*name == NOW || phases == 1, "{name} matches {phases} phases");
        }
    }

    #[test]
    fn test_lookup() {
        let env = TypeEnvironment::standard();
        assert_eq!(env.lookup(NOW), Some(CelType::String));
        assert_eq!(env.lookup(RESP_METADATA_STATUS), Some(CelType::Int));
        assert_eq!(env.lookup(REQ_HEADERS).unwrap().to_string(), "map(string, list(string))");
        assert_eq!(env.lookup(JWT).unwrap().to_string(), "map(string, dyn)");
        assert_eq!(env.lookup("req_body"), None);
    }

    #[test]
    fn test_operators_are_known_functions() {
        let env = TypeEnvironment::standard();
        assert!(env.has_function("_==_"));
        assert!(env.has_function("_%_"));
        assert!(env.has_function("@in"));
        assert!(env.has_function("_[_]"));
        assert!(env.has_function("weekday"));
        assert!(!env.has_function("lower"));
    }

    #[test]
    fn test_check_accepts_declared_identifiers() {
        assert_eq!(check("int(req_params.Id) % 2 == 0").unwrap(), CelType::Bool);
        assert_eq!(check("'2' in req_querystring.y && req_headers['X-Id'][0] == '1'").unwrap(), CelType::Bool);
        assert_eq!(check("resp_completed && resp_metadata_status == 200 && has(resp_data.ok)").unwrap(), CelType::Bool);
        assert_eq!(check("has(JWT.user_id) && (weekday(now) in JWT.enabled_days)").unwrap(), CelType::Bool);
        assert_eq!(check("req_params.Nick.matches('^(kpacha|alombarte)$')").unwrap(), CelType::Bool);
        assert_eq!(check("int(resp_data.Id) % 2 == 0").unwrap(), CelType::Bool);
    }

    #[test]
    fn test_check_accepts_comprehension_variables() {
        let _ = check("req_headers['Accept'].all(h, h.startsWith('application/'))").unwrap();
        let _ = check("JWT.roles.exists(role, role == 'admin')").unwrap();
        let _ = check("size(req_params.filter(k, k.startsWith('x'))) == 0").unwrap();
    }

    #[test]
    fn test_comprehension_variables_do_not_leak() {
        let err = check("req_params.all(req_body, true) && req_body == 'x'").unwrap_err();
        assert!(err.contains("undeclared reference to 'req_body'"), "{err}");
    }

    #[test]
    fn test_check_rejects_undeclared_identifier() {
        let err = check("req_body.id == 1").unwrap_err();
        assert!(err.contains("'req_body'"), "{err}");
        assert!(err.ends_with("in expression 'req_body.id == 1'"), "{err}");
    }

    #[test]
    fn test_check_rejects_unknown_function() {
        let err = check("lower(req_method) == 'get'").unwrap_err();
        assert!(err.contains("function 'lower'"), "{err}");
    }

    #[test]
    fn test_check_rejects_type_mismatch() {
        let err = check("resp_metadata_status == '200'").unwrap_err();
        assert!(err.contains("'_==_' applied to '(int, string)'"), "{err}");

        let _ = check("req_method == 1").unwrap_err();
        let _ = check("resp_completed && req_path").unwrap_err();
        let _ = check("resp_metadata_status.startsWith('2')").unwrap_err();
        let _ = check("req_method.field == 'x'").unwrap_err();
        let _ = check("1 in req_headers.Accept").unwrap_err();
    }

    #[test]
    fn test_numbers_are_compatible() {
        let _ = check("resp_metadata_status >= 200.0 && resp_metadata_status < 300u").unwrap();
    }

    #[test]
    fn test_compatibility() {
        assert!(CelType::Int.is_compatible_with(CelType::Double));
        assert!(CelType::Dyn.is_compatible_with(CelType::String));
        assert!(STRING_LIST.is_compatible_with(CelType::list_of(CelType::Dyn)));
        assert!(!CelType::String.is_compatible_with(CelType::Bool));
        assert!(!STRING_LIST.is_compatible_with(CelType::list_of(CelType::Int)));
        assert_eq!(CelType::list_of(STRING_MAP).to_string(), "list(dyn)");
    }

    #[test]
    fn test_admits() {
        use cel_interpreter::Value;
        use std::collections::HashMap;
        use std::sync::Arc;

        let list = Value::List(Arc::new(vec![Value::String(Arc::new("a".to_string()))]));
        let mut fields: HashMap<Arc<String>, Value> = HashMap::new();
        let _ = fields.insert(Arc::new("k".to_string()), list.clone());
        let map = Value::Map(fields.into());

        assert!(STRING_LIST.admits(&list));
        assert!(MULTI_VALUE_MAP.admits(&map));
        assert!(DYN_MAP.admits(&map));
        assert!(!STRING_MAP.admits(&map));
        assert!(!CelType::Int.admits(&Value::Bool(true)));
        assert!(CelType::Dyn.admits(&Value::Null));
        assert!(CelType::Double.admits(&Value::Float(1.5)));
    }
}
