//! Pluggable expression evaluation
//!
//! The engine resolves expression segments and block header expressions
//! through the [`Evaluator`] trait, so callers can bring a full scripting
//! engine if they need one. [`ExprEvaluator`] is the built-in default: a
//! small infix language with literals, variables, arithmetic, comparisons,
//! boolean logic, list literals, indexing and a handful of builtin calls
//! (`range`, `len`, `str`, `int`).

use crate::error::{Error, Result};
use crate::runtime::{Environment, Value};

/// Capability that resolves expressions and statements against an environment
pub trait Evaluator {
    /// Evaluates an expression to a value
    fn eval(&mut self, expr: &str, env: &mut Environment) -> Result<Value>;

    /// Executes one statement for its side effects
    fn exec(&mut self, stmt: &str, env: &mut Environment) -> Result<()>;
}

/// The built-in default expression evaluator
#[derive(Debug, Default)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    /// Creates the default evaluator
    pub fn new() -> Self {
        ExprEvaluator
    }
}

impl Evaluator for ExprEvaluator {
    fn eval(&mut self, expr: &str, env: &mut Environment) -> Result<Value> {
        let tokens = tokenize(expr)?;
        let mut parser = ExprParser::new(tokens);
        let ast = parser.parse_complete()?;
        eval_expr(&ast, env)
    }

    fn exec(&mut self, stmt: &str, env: &mut Environment) -> Result<()> {
        let tokens = tokenize(stmt)?;

        // "name = expr" assigns; anything else evaluates for effect
        if tokens.len() >= 2 && matches!(tokens[1], Tok::Assign) {
            if let Tok::Ident(name) = tokens[0].clone() {
                let mut parser = ExprParser::new(tokens[2..].to_vec());
                let ast = parser.parse_complete()?;
                let value = eval_expr(&ast, env)?;
                env.define(name, value);
                return Ok(());
            }
        }

        let mut parser = ExprParser::new(tokens);
        let ast = parser.parse_complete()?;
        eval_expr(&ast, env)?;
        Ok(())
    }
}

// --- tokens ---

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    In,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Tok>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,

            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Tok::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Tok::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Tok::Comma);
                i += 1;
            }
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Tok::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Tok::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Tok::Percent);
                i += 1;
            }

            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::EqEq);
                    i += 2;
                } else {
                    tokens.push(Tok::Assign);
                    i += 1;
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ne);
                    i += 2;
                } else {
                    tokens.push(Tok::Not);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Le);
                    i += 2;
                } else {
                    tokens.push(Tok::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ge);
                    i += 2;
                } else {
                    tokens.push(Tok::Gt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Tok::And);
                    i += 2;
                } else {
                    return Err(Error::eval("unexpected '&'"));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Tok::Or);
                    i += 2;
                } else {
                    return Err(Error::eval("unexpected '|'"));
                }
            }

            '"' | '\'' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(Error::eval("unterminated string literal")),
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let escaped = chars.get(i + 1).copied().ok_or_else(|| {
                                Error::eval("unterminated escape in string literal")
                            })?;
                            s.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '\\' => '\\',
                                '\'' => '\'',
                                '"' => '"',
                                other => {
                                    return Err(Error::eval(format!(
                                        "unknown escape '\\{}'",
                                        other
                                    )))
                                }
                            });
                            i += 2;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Tok::Str(s));
            }

            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let mut is_float = false;
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    is_float = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    let f = text
                        .parse()
                        .map_err(|_| Error::eval(format!("invalid number '{}'", text)))?;
                    tokens.push(Tok::Float(f));
                } else {
                    let n = text
                        .parse()
                        .map_err(|_| Error::eval(format!("invalid number '{}'", text)))?;
                    tokens.push(Tok::Int(n));
                }
            }

            // ${name} is accepted as a plain variable reference, so block
            // headers can use the same spelling as substitution spans
            '$' => {
                if chars.get(i + 1) != Some(&'{') {
                    return Err(Error::eval("expected '{' after '$'"));
                }
                i += 2;
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if i == start || chars.get(i) != Some(&'}') {
                    return Err(Error::eval("expected '${name}' variable reference"));
                }
                let name: String = chars[start..i].iter().collect();
                i += 1;
                tokens.push(Tok::Ident(name));
            }

            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    "in" => Tok::In,
                    "true" | "True" => Tok::True,
                    "false" | "False" => Tok::False,
                    "null" | "none" | "None" => Tok::Null,
                    _ => Tok::Ident(word),
                });
            }

            other => return Err(Error::eval(format!("unexpected character '{}'", other))),
        }
    }

    Ok(tokens)
}

// --- ast ---

#[derive(Debug, Clone, PartialEq)]
enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    List(Vec<Expr>),
}

// --- parser (recursive descent, lowest precedence first) ---

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl ExprParser {
    fn new(tokens: Vec<Tok>) -> Self {
        ExprParser { tokens, pos: 0 }
    }

    fn parse_complete(&mut self) -> Result<Expr> {
        if self.tokens.is_empty() {
            return Err(Error::eval("empty expression"));
        }
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(tok) => Err(Error::eval(format!("unexpected trailing token {:?}", tok))),
        }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> Result<()> {
        match self.peek() {
            Some(tok) if tok == expected => {
                self.pos += 1;
                Ok(())
            }
            other => Err(Error::eval(format!(
                "expected {:?}, got {:?}",
                expected, other
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Tok::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Tok::Not) {
            self.pos += 1;
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::EqEq) => BinaryOp::Eq,
                Some(Tok::Ne) => BinaryOp::Ne,
                Some(Tok::Lt) => BinaryOp::Lt,
                Some(Tok::Le) => BinaryOp::Le,
                Some(Tok::Gt) => BinaryOp::Gt,
                Some(Tok::Ge) => BinaryOp::Ge,
                Some(Tok::In) => BinaryOp::In,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinaryOp::Add,
                Some(Tok::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinaryOp::Mul,
                Some(Tok::Slash) => BinaryOp::Div,
                Some(Tok::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Tok::Minus) {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.peek() == Some(&Tok::LBracket) {
            self.pos += 1;
            let index = self.parse_or()?;
            self.eat(&Tok::RBracket)?;
            expr = Expr::Index {
                base: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Tok::Int(n)) => Ok(Expr::Literal(Value::Int(n))),
            Some(Tok::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Tok::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Tok::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Tok::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Tok::Null) => Ok(Expr::Literal(Value::Null)),

            Some(Tok::Ident(name)) => {
                if self.peek() == Some(&Tok::LParen) {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if self.peek() != Some(&Tok::RParen) {
                        loop {
                            args.push(self.parse_or()?);
                            if self.peek() == Some(&Tok::Comma) {
                                self.pos += 1;
                            } else {
                                break;
                            }
                        }
                    }
                    self.eat(&Tok::RParen)?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }

            Some(Tok::LParen) => {
                let expr = self.parse_or()?;
                self.eat(&Tok::RParen)?;
                Ok(expr)
            }

            Some(Tok::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Tok::RBracket) {
                    loop {
                        items.push(self.parse_or()?);
                        if self.peek() == Some(&Tok::Comma) {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.eat(&Tok::RBracket)?;
                Ok(Expr::List(items))
            }

            other => Err(Error::eval(format!("unexpected token {:?}", other))),
        }
    }
}

// --- evaluation ---

fn eval_expr(expr: &Expr, env: &mut Environment) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => env.get(name),

        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, env)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(n) => checked_int(n.checked_neg(), "-"),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(Error::TypeError {
                        expected: "int or float".to_string(),
                        got: other.type_name(),
                    }),
                },
            }
        }

        Expr::Binary { op, left, right } => eval_binary(*op, left, right, env),

        Expr::Index { base, index } => {
            let base = eval_expr(base, env)?;
            let index = eval_expr(index, env)?;
            base.get_index(&index)
        }

        Expr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, env)?);
            }
            eval_call(name, &values)
        }

        Expr::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, env)?);
            }
            Ok(Value::array(values))
        }
    }
}

fn eval_binary(op: BinaryOp, left: &Expr, right: &Expr, env: &mut Environment) -> Result<Value> {
    // Boolean operators short-circuit and yield the deciding operand
    if op == BinaryOp::And {
        let l = eval_expr(left, env)?;
        return if l.is_truthy() {
            eval_expr(right, env)
        } else {
            Ok(l)
        };
    }
    if op == BinaryOp::Or {
        let l = eval_expr(left, env)?;
        return if l.is_truthy() {
            Ok(l)
        } else {
            eval_expr(right, env)
        };
    }

    let l = eval_expr(left, env)?;
    let r = eval_expr(right, env)?;

    match op {
        BinaryOp::Add => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => checked_int(a.checked_add(*b), "+"),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::Array(a), Value::Array(b)) => {
                let mut items = a.as_ref().clone();
                items.extend(b.iter().cloned());
                Ok(Value::array(items))
            }
            _ => numeric_op(&l, &r, "+", |a, b| a + b),
        },
        BinaryOp::Sub => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => checked_int(a.checked_sub(*b), "-"),
            _ => numeric_op(&l, &r, "-", |a, b| a - b),
        },
        BinaryOp::Mul => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => checked_int(a.checked_mul(*b), "*"),
            _ => numeric_op(&l, &r, "*", |a, b| a * b),
        },
        BinaryOp::Div => match (&l, &r) {
            (Value::Int(_), Value::Int(0)) => Err(Error::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => checked_int(a.checked_div(*b), "/"),
            _ => {
                if r.as_float().unwrap_or(1.0) == 0.0 {
                    Err(Error::DivisionByZero)
                } else {
                    numeric_op(&l, &r, "/", |a, b| a / b)
                }
            }
        },
        BinaryOp::Mod => match (&l, &r) {
            (Value::Int(_), Value::Int(0)) => Err(Error::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => checked_int(a.checked_rem(*b), "%"),
            _ => numeric_op(&l, &r, "%", |a, b| a % b),
        },

        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &l, &r),

        BinaryOp::In => membership(&l, &r),

        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// Integer arithmetic stays within i64 or fails; it never wraps or panics
fn checked_int(result: Option<i64>, op: &str) -> Result<Value> {
    result
        .map(Value::Int)
        .ok_or_else(|| Error::eval(format!("integer overflow in '{}'", op)))
}

fn numeric_op(l: &Value, r: &Value, op: &str, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    let numeric = |v: &Value| matches!(v, Value::Int(_) | Value::Float(_));
    if !numeric(l) || !numeric(r) {
        return Err(Error::eval(format!(
            "unsupported operand types for '{}': {} and {}",
            op,
            l.type_name(),
            r.type_name()
        )));
    }
    Ok(Value::Float(f(l.as_float()?, r.as_float()?)))
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            l.as_float()?.partial_cmp(&r.as_float()?)
        }
        _ => {
            return Err(Error::eval(format!(
                "cannot compare {} and {}",
                l.type_name(),
                r.type_name()
            )))
        }
    };
    let ordering = ordering.ok_or_else(|| Error::eval("incomparable values"))?;
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn membership(item: &Value, collection: &Value) -> Result<Value> {
    match collection {
        Value::Array(items) => Ok(Value::Bool(items.iter().any(|v| v == item))),
        Value::String(s) => {
            let needle = item.as_str()?;
            Ok(Value::Bool(s.contains(needle)))
        }
        Value::Range { start, end } => {
            let n = item.as_int()?;
            Ok(Value::Bool(*start <= n && n < *end))
        }
        _ => Err(Error::TypeError {
            expected: "array, string or range".to_string(),
            got: collection.type_name(),
        }),
    }
}

fn eval_call(name: &str, args: &[Value]) -> Result<Value> {
    match (name, args) {
        ("range", [end]) => Ok(Value::Range {
            start: 0,
            end: end.as_int()?,
        }),
        ("range", [start, end]) => Ok(Value::Range {
            start: start.as_int()?,
            end: end.as_int()?,
        }),
        ("len", [value]) => {
            let len = match value {
                Value::String(s) => s.chars().count() as i64,
                Value::Array(items) => items.len() as i64,
                Value::Range { start, end } => (end - start).max(0),
                other => {
                    return Err(Error::TypeError {
                        expected: "string, array or range".to_string(),
                        got: other.type_name(),
                    })
                }
            };
            Ok(Value::Int(len))
        }
        ("str", [value]) => Ok(Value::String(value.to_output_string())),
        ("int", [value]) => Ok(Value::Int(value.as_int()?)),
        ("range" | "len" | "str" | "int", _) => Err(Error::eval(format!(
            "wrong number of arguments for {}()",
            name
        ))),
        _ => Err(Error::UnknownFunction {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<Value> {
        ExprEvaluator::new().eval(expr, &mut Environment::new())
    }

    fn eval_with(expr: &str, env: &mut Environment) -> Result<Value> {
        ExprEvaluator::new().eval(expr, env)
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("42").unwrap(), Value::Int(42));
        assert_eq!(eval("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(eval("\"hi\"").unwrap(), Value::String("hi".to_string()));
        assert_eq!(eval("'hi'").unwrap(), Value::String("hi".to_string()));
        assert_eq!(eval("true").unwrap(), Value::Bool(true));
        assert_eq!(eval("None").unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Int(9));
        assert_eq!(eval("7 / 2").unwrap(), Value::Int(3));
        assert_eq!(eval("7.0 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(eval("10 % 3").unwrap(), Value::Int(1));
        assert_eq!(eval("-4 + 1").unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        assert!(matches!(
            eval("9223372036854775807 + 1"),
            Err(Error::EvalError(_))
        ));
        assert!(matches!(
            eval("0 - 9223372036854775807 - 2"),
            Err(Error::EvalError(_))
        ));
        assert!(matches!(
            eval("9223372036854775807 * 2"),
            Err(Error::EvalError(_))
        ));
        // Negating i64::MIN overflows both through unary minus and division
        assert!(matches!(
            eval("-(-9223372036854775807 - 1)"),
            Err(Error::EvalError(_))
        ));
        assert!(matches!(
            eval("(-9223372036854775807 - 1) / -1"),
            Err(Error::EvalError(_))
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(eval("1 / 0"), Err(Error::DivisionByZero)));
        assert!(matches!(eval("1 % 0"), Err(Error::DivisionByZero)));
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(
            eval("\"a\" + \"b\"").unwrap(),
            Value::String("ab".to_string())
        );
        assert!(eval("\"a\" + 1").is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1 < 2").unwrap(), Value::Bool(true));
        assert_eq!(eval("2 <= 1").unwrap(), Value::Bool(false));
        assert_eq!(eval("1.5 > 1").unwrap(), Value::Bool(true));
        assert_eq!(eval("\"a\" < \"b\"").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 == 1.0").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 != 2").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_boolean_logic_short_circuits() {
        // The right side would be an undefined-variable error if evaluated
        assert_eq!(eval("false and missing").unwrap(), Value::Bool(false));
        assert_eq!(eval("1 or missing").unwrap(), Value::Int(1));
        assert_eq!(eval("not 0").unwrap(), Value::Bool(true));
        assert_eq!(
            eval("null or \"fallback\"").unwrap(),
            Value::String("fallback".to_string())
        );
    }

    #[test]
    fn test_variables() {
        let mut env = Environment::new();
        env.define("x", Value::Int(5));
        assert_eq!(eval_with("x > 0", &mut env).unwrap(), Value::Bool(true));
        assert!(matches!(
            eval_with("y", &mut env),
            Err(Error::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_dollar_brace_variable_reference() {
        let mut env = Environment::new();
        env.define("x", Value::Int(5));
        assert_eq!(eval_with("${x} > 0", &mut env).unwrap(), Value::Bool(true));
        assert_eq!(eval_with("${x} + x", &mut env).unwrap(), Value::Int(10));
        assert!(eval_with("${} > 0", &mut env).is_err());
        assert!(eval_with("$x", &mut env).is_err());
    }

    #[test]
    fn test_lists_and_indexing() {
        assert_eq!(eval("[1, 2, 3][1]").unwrap(), Value::Int(2));
        assert_eq!(eval("len([1, 2, 3])").unwrap(), Value::Int(3));
        assert_eq!(eval("2 in [1, 2, 3]").unwrap(), Value::Bool(true));
        assert_eq!(eval("\"el\" in \"hello\"").unwrap(), Value::Bool(true));
        assert_eq!(eval("5 in range(3)").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_builtins() {
        assert_eq!(eval("range(2, 5)").unwrap(), Value::Range { start: 2, end: 5 });
        assert_eq!(eval("str(12)").unwrap(), Value::String("12".to_string()));
        assert_eq!(eval("int(\"7\")").unwrap(), Value::Int(7));
        assert!(matches!(
            eval("frob(1)"),
            Err(Error::UnknownFunction { .. })
        ));
        assert!(eval("len()").is_err());
    }

    #[test]
    fn test_exec_assignment() {
        let mut env = Environment::new();
        let mut evaluator = ExprEvaluator::new();
        evaluator.exec("x = 2 + 3", &mut env).unwrap();
        assert_eq!(env.get("x").unwrap(), Value::Int(5));

        evaluator.exec("x = x * 2", &mut env).unwrap();
        assert_eq!(env.get("x").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_exec_bare_expression() {
        let mut env = Environment::new();
        env.define("x", Value::Int(1));
        ExprEvaluator::new().exec("x + 1", &mut env).unwrap();
        assert_eq!(env.get("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_parse_errors() {
        assert!(eval("").is_err());
        assert!(eval("1 +").is_err());
        assert!(eval("(1").is_err());
        assert!(eval("\"unterminated").is_err());
        assert!(eval("1 2").is_err());
    }
}
