//! Template evaluation over `serde_json::Value`.

use super::parser::{BinaryOp, Expr, Node};
use super::TemplateError;
use serde_json::{json, Map, Value};

/// Why an expression could not be evaluated; the caller attaches the location
enum Fault {
    Undefined(String),
    Type(String),
}

type Eval<T> = Result<T, Fault>;

/// Variable lookup: loop bindings shadow the render context
pub struct Scope<'a> {
    template: &'a str,
    globals: &'a Map<String, Value>,
    locals: Vec<(String, Value)>,
}

impl<'a> Scope<'a> {
    pub fn new(template: &'a str, globals: &'a Map<String, Value>) -> Self {
        Self {
            template,
            globals,
            locals: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.globals.get(name))
    }

    fn locate(&self, line: usize, fault: Fault) -> TemplateError {
        match fault {
            Fault::Undefined(name) => TemplateError::Undefined {
                template: self.template.to_string(),
                line,
                name,
            },
            Fault::Type(message) => TemplateError::Type {
                template: self.template.to_string(),
                line,
                message,
            },
        }
    }
}

/// Render nodes into `out`
pub fn render_nodes(nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Interpolate { expr, line } => {
                let value = eval(expr, scope).map_err(|f| scope.locate(*line, f))?;
                out.push_str(&display(&value));
            }
            Node::If {
                cond,
                line,
                then,
                otherwise,
            } => {
                let cond = eval(cond, scope).map_err(|f| scope.locate(*line, f))?;
                let body = if truthy(&cond) { then } else { otherwise };
                render_nodes(body, scope, out)?;
            }
            Node::For { var, iter, body, line } => {
                let items = eval(iter, scope)
                    .and_then(iterate)
                    .map_err(|f| scope.locate(*line, f))?;
                let length = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    scope.locals.push((var.clone(), item));
                    scope.locals.push((
                        "loop".to_string(),
                        json!({
                            "index": index,
                            "first": index == 0,
                            "last": index + 1 == length,
                            "length": length,
                        }),
                    ));
                    let result = render_nodes(body, scope, out);
                    scope.locals.truncate(scope.locals.len() - 2);
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn iterate(value: Value) -> Eval<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Fault::Type(format!("cannot iterate over {}", type_name(&other)))),
    }
}

/// Text form of a value inside rendered output
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "none",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn eval(expr: &Expr, scope: &Scope<'_>) -> Eval<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| Fault::Undefined(name.clone())),
        Expr::Attr(target, attr) => {
            let target = eval(target, scope)?;
            match target {
                Value::Object(mut map) => map
                    .remove(attr)
                    .ok_or_else(|| Fault::Undefined(format!("attribute `{}`", attr))),
                other => Err(Fault::Type(format!(
                    "cannot read attribute `{}` of {}",
                    attr,
                    type_name(&other)
                ))),
            }
        }
        Expr::Index(target, index) => {
            let target = eval(target, scope)?;
            let index = eval(index, scope)?;
            index_value(target, &index)
        }
        Expr::Call(function, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Eval<Vec<Value>>>()?;
            call(function, args)
        }
        Expr::Not(operand) => Ok(Value::Bool(!truthy(&eval(operand, scope)?))),
        Expr::Binary(op, left, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            binary(*op, &left, &right)
        }
    }
}

fn index_value(target: Value, index: &Value) -> Eval<Value> {
    match (target, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            let len = items.len();
            match n.as_u64().and_then(|i| usize::try_from(i).ok()) {
                Some(i) if i < len => Ok(items.swap_remove(i)),
                _ => Err(Fault::Type(format!("list index {} out of range (length {})", n, len))),
            }
        }
        (Value::Object(mut map), Value::String(key)) => map
            .remove(key)
            .ok_or_else(|| Fault::Undefined(format!("key `{}`", key))),
        (target, index) => Err(Fault::Type(format!(
            "cannot index {} with {}",
            type_name(&target),
            type_name(index)
        ))),
    }
}

fn call(function: &str, args: Vec<Value>) -> Eval<Value> {
    match function {
        "range" => {
            let (start, end) = match args.as_slice() {
                [end] => (0, as_int(end)?),
                [start, end] => (as_int(start)?, as_int(end)?),
                _ => return Err(Fault::Type("range() takes 1 or 2 arguments".to_string())),
            };
            Ok(Value::Array((start..end).map(Value::from).collect()))
        }
        other => Err(Fault::Undefined(format!("function `{}`", other))),
    }
}

fn as_int(value: &Value) -> Eval<i64> {
    value
        .as_i64()
        .ok_or_else(|| Fault::Type(format!("expected an integer, found {}", type_name(value))))
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Eval<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!loose_eq(left, right))),
        BinaryOp::In => contains(right, left).map(Value::Bool),
        BinaryOp::NotIn => contains(right, left).map(|found| Value::Bool(!found)),
        BinaryOp::Add => match (left, right) {
            (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, display(b)))),
            _ => arithmetic(op, left, right),
        },
        BinaryOp::Mul => arithmetic(op, left, right),
    }
}

/// Equality where numbers compare by value regardless of representation
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn contains(haystack: &Value, needle: &Value) -> Eval<bool> {
    match (haystack, needle) {
        (Value::Array(items), needle) => Ok(items.iter().any(|item| loose_eq(item, needle))),
        (Value::String(s), Value::String(sub)) => Ok(s.contains(sub.as_str())),
        (Value::Object(map), Value::String(key)) => Ok(map.contains_key(key)),
        _ => Err(Fault::Type(format!(
            "cannot test membership of {} in {}",
            type_name(needle),
            type_name(haystack)
        ))),
    }
}

/// Checked integer `+` and `*`
fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Eval<Value> {
    let (a, b) = left.as_i64().zip(right.as_i64()).ok_or_else(|| {
        Fault::Type(format!(
            "unsupported operands for {:?}: {} and {}",
            op,
            type_name(left),
            type_name(right)
        ))
    })?;
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        _ => a.checked_mul(b),
    };
    result
        .map(Value::from)
        .ok_or_else(|| Fault::Type(format!("integer overflow in {:?}", op)))
}
