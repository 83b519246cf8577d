#![forbid(unsafe_code)]

pub mod ast {
    use std::sync::Arc;

    use serde::Serialize;

    /// Compiled spec-lang expression.
    ///
    /// Children are shared through `Arc` so compiled trees can be cloned
    /// cheaply and cached across threads.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub enum Expr {
        /// Self-evaluating literal: a scalar or `lit`-wrapped JSON data.
        Lit(serde_json::Value),
        Var(String),
        Fn {
            params: Vec<String>,
            body: Arc<Expr>,
        },
        Let {
            bindings: Vec<Binding>,
            body: Arc<Expr>,
        },
        /// Operator application: `if`, `call`, or a builtin symbol.
        Op {
            head: String,
            args: Vec<Arc<Expr>>,
        },
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Binding {
        pub name: String,
        pub value: Arc<Expr>,
    }

    impl Expr {
        pub fn lit(value: impl Into<serde_json::Value>) -> Self {
            Expr::Lit(value.into())
        }

        pub fn var(name: impl Into<String>) -> Self {
            Expr::Var(name.into())
        }

        pub fn op(head: impl Into<String>, args: Vec<Expr>) -> Self {
            Expr::Op {
                head: head.into(),
                args: args.into_iter().map(Arc::new).collect(),
            }
        }

        pub fn func(params: Vec<String>, body: Expr) -> Self {
            Expr::Fn {
                params,
                body: Arc::new(body),
            }
        }

        /// Head symbol when this node is an operator application.
        pub fn head(&self) -> Option<&str> {
            match self {
                Expr::Op { head, .. } => Some(head),
                _ => None,
            }
        }
    }

    /// True for JSON values that need no `lit` wrapper.
    pub fn is_scalar(value: &serde_json::Value) -> bool {
        !matches!(
            value,
            serde_json::Value::Array(_) | serde_json::Value::Object(_)
        )
    }
}

/// Internal S-expression form used by tooling and parity fixtures.
///
/// `["op", args...]`, `["var", "x"]`, `["lit", v]`, `["fn", [params], body]`,
/// `["let", [["x", expr]...], body]`; scalars stand for themselves.
pub mod sexpr {
    use std::collections::HashSet;
    use std::fmt;
    use std::sync::Arc;

    use serde_json::Value;

    use crate::ast::{is_scalar, Binding, Expr};

    #[derive(Debug, Clone, PartialEq)]
    pub struct SexprError(pub String);

    impl fmt::Display for SexprError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "invalid s-expression: {}", self.0)
        }
    }

    impl std::error::Error for SexprError {}

    pub fn to_sexpr(expr: &Expr) -> Value {
        match expr {
            Expr::Lit(v) if is_scalar(v) => v.clone(),
            Expr::Lit(v) => Value::Array(vec![Value::from("lit"), v.clone()]),
            Expr::Var(name) => Value::Array(vec![Value::from("var"), Value::from(name.as_str())]),
            Expr::Fn { params, body } => Value::Array(vec![
                Value::from("fn"),
                Value::Array(params.iter().map(|p| Value::from(p.as_str())).collect()),
                to_sexpr(body),
            ]),
            Expr::Let { bindings, body } => Value::Array(vec![
                Value::from("let"),
                Value::Array(
                    bindings
                        .iter()
                        .map(|b| Value::Array(vec![Value::from(b.name.as_str()), to_sexpr(&b.value)]))
                        .collect(),
                ),
                to_sexpr(body),
            ]),
            Expr::Op { head, args } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(Value::from(head.as_str()));
                out.extend(args.iter().map(|a| to_sexpr(a)));
                Value::Array(out)
            }
        }
    }

    /// Decode the internal form. Lists without a string head and raw maps
    /// are read as literal data.
    pub fn from_sexpr(value: &Value) -> Result<Expr, SexprError> {
        let items = match value {
            Value::Array(items) => items,
            other => return Ok(Expr::Lit(other.clone())),
        };
        let head = match items.first() {
            Some(Value::String(h)) => h.as_str(),
            _ => return Ok(Expr::Lit(value.clone())),
        };
        let rest = &items[1..];
        match head {
            "lit" => match rest {
                [v] => Ok(Expr::Lit(v.clone())),
                _ => Err(SexprError("lit expects exactly one argument".into())),
            },
            "var" => match rest {
                [Value::String(name)] if !name.is_empty() => Ok(Expr::Var(name.clone())),
                _ => Err(SexprError("var expects a non-empty name".into())),
            },
            "fn" => {
                let (params, body) = match rest {
                    [Value::Array(params), body] => (params, body),
                    _ => return Err(SexprError("fn expects [params] and a body".into())),
                };
                let mut seen = HashSet::new();
                let params = params
                    .iter()
                    .map(|p| match p {
                        Value::String(s) if s.is_empty() => {
                            Err(SexprError("fn param must be non-empty string".into()))
                        }
                        Value::String(s) if !seen.insert(s.as_str()) => {
                            Err(SexprError(format!("duplicate fn param: {s}")))
                        }
                        Value::String(s) => Ok(s.clone()),
                        _ => Err(SexprError("fn param must be non-empty string".into())),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Fn {
                    params,
                    body: Arc::new(from_sexpr(body)?),
                })
            }
            "let" => {
                let (bindings, body) = match rest {
                    [Value::Array(bindings), body] => (bindings, body),
                    _ => return Err(SexprError("let expects [bindings] and a body".into())),
                };
                let mut seen = HashSet::new();
                let bindings = bindings
                    .iter()
                    .map(|b| match b.as_array().map(Vec::as_slice) {
                        Some([Value::String(name), _]) if !name.is_empty() && !seen.insert(name.as_str()) => {
                            Err(SexprError(format!("duplicate let binding: {name}")))
                        }
                        Some([Value::String(name), v]) if !name.is_empty() => Ok(Binding {
                            name: name.clone(),
                            value: Arc::new(from_sexpr(v)?),
                        }),
                        _ => Err(SexprError("let binding must be [name, expr]".into())),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Let {
                    bindings,
                    body: Arc::new(from_sexpr(body)?),
                })
            }
            _ => Ok(Expr::Op {
                head: head.to_string(),
                args: rest
                    .iter()
                    .map(|a| from_sexpr(a).map(Arc::new))
                    .collect::<Result<Vec<_>, _>>()?,
            }),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn op_and_literals_decode() {
            let e = from_sexpr(&json!(["and", ["contains", "hello"], true])).unwrap();
            assert_eq!(e.head(), Some("and"));
            assert_eq!(to_sexpr(&e), json!(["and", ["contains", "hello"], true]));
        }

        #[test]
        fn compound_literal_is_rewrapped() {
            let e = from_sexpr(&json!(["len", ["lit", [1, 2]]])).unwrap();
            assert_eq!(to_sexpr(&e), json!(["len", ["lit", [1, 2]]]));
        }

        #[test]
        fn fn_and_let_keep_shape() {
            let src = json!(["let", [["f", ["fn", ["x"], ["var", "x"]]]], ["call", ["var", "f"], 1]]);
            let e = from_sexpr(&src).unwrap();
            assert!(matches!(e, Expr::Let { .. }));
            assert_eq!(to_sexpr(&e), src);
        }

        #[test]
        fn bad_var_rejected() {
            assert!(from_sexpr(&json!(["var", ""])).is_err());
            assert!(from_sexpr(&json!(["lit", 1, 2])).is_err());
        }

        #[test]
        fn duplicate_names_rejected() {
            let err = from_sexpr(&json!(["call", ["fn", ["x", "x"], ["var", "x"]], 1, 2])).unwrap_err();
            assert_eq!(err.to_string(), "invalid s-expression: duplicate fn param: x");

            let err = from_sexpr(&json!(["let", [["a", 1], ["a", 2]], ["var", "a"]])).unwrap_err();
            assert_eq!(err.to_string(), "invalid s-expression: duplicate let binding: a");

            assert!(from_sexpr(&json!(["fn", ["x", "y"], ["var", "x"]])).is_ok());
        }
    }
}
