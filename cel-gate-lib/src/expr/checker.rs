//! Static checking of parsed expressions

use super::environment::{CelType, TypeEnvironment};
use super::functions::WEEKDAY;
use cel_parser::Expression;
use cel_parser::ast::{CallExpr, ComprehensionExpr, EntryExpr, Expr, SelectExpr, operators};
use cel_parser::reference::Val;

/// Walks a parsed expression, resolving identifiers and inferring types as far as the
/// environment allows.
///
/// Anything whose type cannot be known statically, such as claims or response body
/// fields, checks as `dyn` and is only validated at evaluation.
#[derive(Debug)]
pub struct Checker<'a> {
    environment: TypeEnvironment,

    // comprehension variables in scope, innermost last
    bound: Vec<&'a str>,
}

impl<'a> Checker<'a> {
    pub const fn new(environment: TypeEnvironment) -> Self {
        Self {
            environment,
            bound: Vec::new(),
        }
    }

    pub fn check(&mut self, expression: &'a Expression) -> Result<CelType, String> {
        match &expression.expr {
            Expr::Unspecified => Ok(CelType::Dyn),
            Expr::Literal(value) => Ok(literal_type(value)),
            Expr::Ident(name) => self.identifier(name),
            Expr::Select(select) => self.select(select),
            Expr::Call(call) => self.call(call),
            Expr::Comprehension(comprehension) => self.comprehension(comprehension),
            Expr::List(list) => {
                let mut element = None;
                for item in &list.elements {
                    let ty = self.check(item)?;
                    element = Some(match element {
                        Some(previous) if previous != ty => CelType::Dyn,
                        _ => ty,
                    });
                }
                Ok(CelType::list_of(element.unwrap_or(CelType::Dyn)))
            }
            Expr::Map(map) => {
                for entry in &map.entries {
                    let EntryExpr::MapEntry(entry) = &entry.expr else {
                        return Err("field initializers are only valid in message literals".to_string());
                    };
                    let _ = self.check(&entry.key)?;
                    let _ = self.check(&entry.value)?;
                }
                Ok(CelType::Map(&CelType::Dyn, &CelType::Dyn))
            }
            Expr::Struct(message) => Err(format!("undeclared reference to type '{}'", message.type_name)),
        }
    }

    fn identifier(&self, name: &str) -> Result<CelType, String> {
        if self.bound.iter().any(|bound| *bound == name) {
            return Ok(CelType::Dyn);
        }

        self.environment
            .lookup(name)
            .ok_or_else(|| format!("undeclared reference to '{name}'"))
    }

    fn select(&mut self, select: &'a SelectExpr) -> Result<CelType, String> {
        let field = match self.check(&select.operand)? {
            CelType::Map(_, value) => *value,
            CelType::Dyn => CelType::Dyn,
            other => return Err(format!("type '{other}' does not support field selection")),
        };

        // `has(x.f)` parses to a field test
        Ok(if select.test { CelType::Bool } else { field })
    }

    fn call(&mut self, call: &'a CallExpr) -> Result<CelType, String> {
        let name = call.func_name.as_str();
        if !self.environment.has_function(name) {
            return Err(format!("undeclared reference to function '{name}'"));
        }

        let mut operands = Vec::with_capacity(call.args.len() + 1);
        if let Some(target) = &call.target {
            operands.push(self.check(target)?);
        }
        for arg in &call.args {
            operands.push(self.check(arg)?);
        }

        result_type(name, &operands)
    }

    fn comprehension(&mut self, comprehension: &'a ComprehensionExpr) -> Result<CelType, String> {
        let range = self.check(&comprehension.iter_range)?;
        if !matches!(range, CelType::List(_) | CelType::Map(..) | CelType::Dyn) {
            return Err(format!("expression of type '{range}' cannot be the range of a comprehension"));
        }
        let _ = self.check(&comprehension.accu_init)?;

        let depth = self.bound.len();
        self.bound.push(&comprehension.iter_var);
        if let Some(second) = &comprehension.iter_var2 {
            self.bound.push(second);
        }
        self.bound.push(&comprehension.accu_var);

        let result = self.comprehension_body(comprehension);
        self.bound.truncate(depth);
        result
    }

    fn comprehension_body(&mut self, comprehension: &'a ComprehensionExpr) -> Result<CelType, String> {
        let _ = self.check(&comprehension.loop_cond)?;
        let _ = self.check(&comprehension.loop_step)?;
        self.check(&comprehension.result)
    }
}

const fn literal_type(value: &Val) -> CelType {
    match value {
        Val::String(_) => CelType::String,
        Val::Boolean(_) => CelType::Bool,
        Val::Int(_) => CelType::Int,
        Val::UInt(_) => CelType::Uint,
        Val::Double(_) => CelType::Double,
        Val::Bytes(_) => CelType::Bytes,
        Val::Null => CelType::Null,
    }
}

/// The type a call produces, or a diagnostic when its known operand types cannot work.
///
/// Receiver-style calls list the receiver as the first operand.
fn result_type(name: &str, operands: &[CelType]) -> Result<CelType, String> {
    let mismatch = || {
        let types: Vec<String> = operands.iter().map(ToString::to_string).collect();
        Err(format!("found no matching overload for '{name}' applied to '({})'", types.join(", ")))
    };

    match (name, operands) {
        (
            operators::EQUALS
            | operators::NOT_EQUALS
            | operators::LESS
            | operators::LESS_EQUALS
            | operators::GREATER
            | operators::GREATER_EQUALS,
            [left, right],
        ) => {
            if left.is_compatible_with(*right) {
                Ok(CelType::Bool)
            } else {
                mismatch()
            }
        }

        (operators::ADD | operators::SUBSTRACT | operators::MULTIPLY | operators::DIVIDE | operators::MODULO, [left, right]) => {
            if !left.is_compatible_with(*right) {
                return mismatch();
            }
            Ok(if *left == CelType::Dyn { *right } else { *left })
        }

        (operators::LOGICAL_AND | operators::LOGICAL_OR, [left, right]) => {
            if left.is_boolean() && right.is_boolean() {
                Ok(CelType::Bool)
            } else {
                mismatch()
            }
        }

        (operators::LOGICAL_NOT, [operand]) => {
            if operand.is_boolean() {
                Ok(CelType::Bool)
            } else {
                mismatch()
            }
        }

        (operators::NOT_STRICTLY_FALSE, [_]) => Ok(CelType::Bool),

        (operators::NEGATE, [operand]) => {
            if operand.is_numeric() || *operand == CelType::Dyn {
                Ok(*operand)
            } else {
                mismatch()
            }
        }

        (operators::IN, [element, container]) => {
            let fits = match container {
                CelType::List(item) => element.is_compatible_with(**item),
                CelType::Map(key, _) => element.is_compatible_with(**key),
                CelType::String => element.is_compatible_with(CelType::String),
                CelType::Dyn => true,
                _ => false,
            };
            if fits { Ok(CelType::Bool) } else { mismatch() }
        }

        (operators::INDEX, [container, index]) => match container {
            CelType::List(item) if index.is_numeric() || *index == CelType::Dyn => Ok(**item),
            CelType::Map(key, value) if key.is_compatible_with(*index) => Ok(**value),
            CelType::String if matches!(index, CelType::Int | CelType::Dyn) => Ok(CelType::String),
            CelType::Dyn => Ok(CelType::Dyn),
            _ => mismatch(),
        },

        (operators::CONDITIONAL, [condition, then, otherwise]) => {
            if !condition.is_boolean() {
                return mismatch();
            }
            Ok(if then == otherwise { *then } else { CelType::Dyn })
        }

        ("int", [_]) => Ok(CelType::Int),
        ("uint", [_]) => Ok(CelType::Uint),
        ("double", [_]) => Ok(CelType::Double),
        ("string", [_]) => Ok(CelType::String),
        ("bytes", [_]) => Ok(CelType::Bytes),

        ("size", [operand]) => {
            if matches!(operand, CelType::String | CelType::Bytes | CelType::List(_) | CelType::Map(..) | CelType::Dyn) {
                Ok(CelType::Int)
            } else {
                mismatch()
            }
        }

        ("startsWith" | "endsWith" | "matches", [receiver, pattern]) => {
            if receiver.is_compatible_with(CelType::String) && pattern.is_compatible_with(CelType::String) {
                Ok(CelType::Bool)
            } else {
                mismatch()
            }
        }

        ("contains", [_, _]) => Ok(CelType::Bool),

        (WEEKDAY, [timestamp]) => {
            if timestamp.is_compatible_with(CelType::String) {
                Ok(CelType::Int)
            } else {
                mismatch()
            }
        }

        (accessor, [_]) if accessor.starts_with("get") => Ok(CelType::Int),

        _ => Ok(CelType::Dyn),
    }
}
