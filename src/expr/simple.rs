//! Default expression language
//!
//! A small arithmetic and boolean language sufficient for field conditions,
//! sizes and formulas:
//!
//! * literals: integers (`42`, `0x2a`, `0b101010`), floats (`1.5e3`), strings
//!   (`'abc'` or `"abc"`), `true`, `false`, `null`;
//! * references: `name`, `a.b.c`, `root.a`, `#param`;
//! * operators, loosest first: `?:`, `||`, `&&`, `|`, `^`, `&`, `== !=`,
//!   `< <= > >=`, `<< >>`, `+ -`, `* / %`, then unary `- ! ~`;
//! * builtins: `len(x)`, `min(a, ...)`, `max(a, ...)`, `abs(x)`.
//!
//! Integer arithmetic is exact (arbitrary precision); any float operand
//! makes the operation floating-point. `+` concatenates when either side is
//! text.

use std::cmp::Ordering;
use std::collections::HashMap;

use lazy_static::lazy_static;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use super::{Evaluator, ExpressionError, Scope};
use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(Value),
    Str(String),
    Ident(String),
    Param(String),
    Op(&'static str),
    End,
}

const OPERATORS: [&str; 25] = [
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+", "-", "*", "/", "%", "&", "|", "^", "~",
    "!", "<", ">", "?", ":", "(", ")", ",",
];

fn syntax(src: &str, at: usize, reason: impl Into<String>) -> ExpressionError {
    ExpressionError::Syntax {
        expr: src.to_owned(),
        at,
        reason: reason.into(),
    }
}

/// Normalizes an exact integer to the narrowest native variant.
fn from_big(b: BigInt) -> Value {
    if let Some(i) = b.to_i64() {
        Value::Int(i)
    } else if let Some(u) = b.to_u64() {
        Value::UInt(u)
    } else {
        Value::Big(b)
    }
}

fn lex(src: &str) -> Result<Vec<(usize, Token)>, ExpressionError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    'outer: while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c.is_ascii_digit() {
            let (radix, skip) = match bytes.get(i + 1) {
                Some(b'x' | b'X') if c == b'0' => (16, 2),
                Some(b'b' | b'B') if c == b'0' => (2, 2),
                _ => (10, 0),
            };
            i += skip;
            let digits_from = i;
            while i < bytes.len() && (bytes[i].is_ascii_hexdigit() || bytes[i] == b'_') {
                if radix == 10 && !bytes[i].is_ascii_digit() {
                    break;
                }
                i += 1;
            }
            let mut is_float = false;
            if radix == 10 {
                if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).map_or(false, u8::is_ascii_digit) {
                    is_float = true;
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if matches!(bytes.get(i), Some(b'e' | b'E')) {
                    is_float = true;
                    i += 1;
                    if matches!(bytes.get(i), Some(b'+' | b'-')) {
                        i += 1;
                    }
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = src[digits_from..i].chars().filter(|c| *c != '_').collect();
            let value = if is_float {
                text.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| syntax(src, start, "malformed float literal"))?
            } else {
                BigInt::parse_bytes(text.as_bytes(), radix)
                    .map(from_big)
                    .ok_or_else(|| syntax(src, start, "malformed integer literal"))?
            };
            out.push((start, Token::Num(value)));
            continue;
        }
        if c.is_ascii_alphabetic() || c == b'_' || c == b'#' {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let tok = if c == b'#' {
                if i == start + 1 {
                    return Err(syntax(src, start, "empty parameter name"));
                }
                Token::Param(src[start + 1..i].to_owned())
            } else {
                Token::Ident(src[start..i].to_owned())
            };
            out.push((start, tok));
            continue;
        }
        if c == b'\'' || c == b'"' {
            let mut s = String::new();
            let mut chars = src[i + 1..].char_indices();
            while let Some((k, ch)) = chars.next() {
                match ch {
                    ch if ch as u32 == c as u32 => {
                        i += 1 + k + 1;
                        out.push((start, Token::Str(s)));
                        continue 'outer;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => s.push('\n'),
                        Some((_, 't')) => s.push('\t'),
                        Some((_, '0')) => s.push('\0'),
                        Some((_, other)) => s.push(other),
                        None => break,
                    },
                    ch => s.push(ch),
                }
            }
            return Err(syntax(src, start, "unterminated string literal"));
        }
        if c == b'.' {
            out.push((start, Token::Op(".")));
            i += 1;
            continue;
        }
        for op in OPERATORS {
            if src[i..].starts_with(op) {
                out.push((start, Token::Op(op)));
                i += op.len();
                continue 'outer;
            }
        }
        return Err(syntax(src, start, format!("unexpected character {:?}", c as char)));
    }
    out.push((src.len(), Token::End));
    Ok(out)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    /// Operator and its left binding power
    fn infix(op: &str) -> Option<(BinOp, u8)> {
        Some(match op {
            "||" => (BinOp::Or, 2),
            "&&" => (BinOp::And, 3),
            "|" => (BinOp::BitOr, 4),
            "^" => (BinOp::BitXor, 5),
            "&" => (BinOp::BitAnd, 6),
            "==" => (BinOp::Eq, 7),
            "!=" => (BinOp::Ne, 7),
            "<" => (BinOp::Lt, 8),
            "<=" => (BinOp::Le, 8),
            ">" => (BinOp::Gt, 8),
            ">=" => (BinOp::Ge, 8),
            "<<" => (BinOp::Shl, 9),
            ">>" => (BinOp::Shr, 9),
            "+" => (BinOp::Add, 10),
            "-" => (BinOp::Sub, 10),
            "*" => (BinOp::Mul, 11),
            "/" => (BinOp::Div, 11),
            "%" => (BinOp::Rem, 11),
            _ => return None,
        })
    }
}

const TERNARY_BP: u8 = 1;
const PREFIX_BP: u8 = 12;

/// Compiled expression tree
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Lit(Value),
    Path { root: bool, segments: Vec<String> },
    Param(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn at(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Token::Op(o) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &'static str) -> Result<(), ExpressionError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(syntax(self.src, self.at(), format!("expected `{op}`")))
        }
    }

    fn ident(&mut self) -> Result<String, ExpressionError> {
        match self.bump() {
            Token::Ident(name) => Ok(name),
            _ => Err(syntax(self.src, self.at(), "expected a field name")),
        }
    }

    fn expr(&mut self, min_bp: u8) -> Result<Expr, ExpressionError> {
        let mut lhs = self.prefix()?;
        loop {
            let op = match self.peek() {
                Token::Op(op) => *op,
                _ => break,
            };
            if op == "?" {
                if min_bp > TERNARY_BP {
                    break;
                }
                self.pos += 1;
                let then = self.expr(0)?;
                self.expect_op(":")?;
                let otherwise = self.expr(TERNARY_BP)?;
                lhs = Expr::Cond(Box::new(lhs), Box::new(then), Box::new(otherwise));
                continue;
            }
            let (bin, bp) = match BinOp::infix(op) {
                Some(pair) => pair,
                None => break,
            };
            if bp < min_bp {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(bp + 1)?;
            lhs = Expr::Binary(bin, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Expr, ExpressionError> {
        let at = self.at();
        match self.bump() {
            Token::Num(v) => Ok(Expr::Lit(v)),
            Token::Str(s) => Ok(Expr::Lit(Value::Text(s))),
            Token::Param(name) => Ok(Expr::Param(name)),
            Token::Op("-") => Ok(Expr::Unary(UnOp::Neg, Box::new(self.expr(PREFIX_BP)?))),
            Token::Op("!") => Ok(Expr::Unary(UnOp::Not, Box::new(self.expr(PREFIX_BP)?))),
            Token::Op("~") => Ok(Expr::Unary(UnOp::BitNot, Box::new(self.expr(PREFIX_BP)?))),
            Token::Op("(") => {
                let inner = self.expr(0)?;
                self.expect_op(")")?;
                Ok(inner)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Lit(Value::Bool(true))),
                "false" => Ok(Expr::Lit(Value::Bool(false))),
                "null" => Ok(Expr::Lit(Value::Null)),
                _ if self.eat_op("(") => {
                    let mut args = Vec::new();
                    if !self.eat_op(")") {
                        loop {
                            args.push(self.expr(0)?);
                            if self.eat_op(")") {
                                break;
                            }
                            self.expect_op(",")?;
                        }
                    }
                    Ok(Expr::Call(name, args))
                }
                _ => {
                    let root = name == "root" && self.peek() == &Token::Op(".");
                    let mut segments = if root { Vec::new() } else { vec![name] };
                    while self.eat_op(".") {
                        segments.push(self.ident()?);
                    }
                    Ok(Expr::Path { root, segments })
                }
            },
            Token::End => Err(syntax(self.src, at, "unexpected end of expression")),
            Token::Op(op) => Err(syntax(self.src, at, format!("unexpected `{op}`"))),
        }
    }
}

/// Parses expression text into an [`Expr`] tree.
pub fn compile(src: &str) -> Result<Expr, ExpressionError> {
    let tokens = lex(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
    };
    let expr = parser.expr(0)?;
    match parser.peek() {
        Token::End => Ok(expr),
        _ => Err(syntax(src, parser.at(), "unexpected trailing input")),
    }
}

enum Num {
    I(BigInt),
    F(f64),
}

impl Num {
    fn of(op: &'static str, v: &Value) -> Result<Num, ExpressionError> {
        match v {
            Value::Float(f) => Ok(Num::F(*f)),
            Value::Int(_) | Value::UInt(_) | Value::Big(_) => {
                Ok(Num::I(v.as_bigint().unwrap_or_default()))
            }
            other => Err(ExpressionError::Type {
                op,
                found: other.kind_name(),
            }),
        }
    }

    fn to_f64(&self) -> f64 {
        match self {
            Num::I(i) => i.to_f64().unwrap_or(f64::NAN),
            Num::F(f) => *f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::I(i) => from_big(i),
            Num::F(f) => Value::Float(f),
        }
    }

    fn compare(&self, other: &Num) -> Option<Ordering> {
        match (self, other) {
            (Num::I(a), Num::I(b)) => Some(a.cmp(b)),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

type Builtin = fn(&[Value]) -> Result<Value, ExpressionError>;

lazy_static! {
    /// Builtin functions with their minimum and maximum argument counts
    static ref BUILTINS: HashMap<&'static str, (usize, Option<usize>, Builtin)> = {
        let mut m: HashMap<&'static str, (usize, Option<usize>, Builtin)> = HashMap::new();
        m.insert("len", (1, Some(1), builtin_len));
        m.insert("min", (1, None, builtin_min));
        m.insert("max", (1, None, builtin_max));
        m.insert("abs", (1, Some(1), builtin_abs));
        m
    };
}

fn builtin_len(args: &[Value]) -> Result<Value, ExpressionError> {
    let n = match &args[0] {
        Value::Null => 0,
        Value::Text(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::Bits(b) => b.len(),
        Value::List(xs) => xs.len(),
        Value::Record(r) => r.len(),
        other => {
            return Err(ExpressionError::Type {
                op: "len",
                found: other.kind_name(),
            })
        }
    };
    Ok(Value::UInt(n as u64))
}

fn builtin_abs(args: &[Value]) -> Result<Value, ExpressionError> {
    Ok(match Num::of("abs", &args[0])? {
        Num::I(i) => from_big(i.abs()),
        Num::F(f) => Value::Float(f.abs()),
    })
}

fn builtin_min(args: &[Value]) -> Result<Value, ExpressionError> {
    extremum(args, "min", Ordering::Less)
}

fn builtin_max(args: &[Value]) -> Result<Value, ExpressionError> {
    extremum(args, "max", Ordering::Greater)
}

fn extremum(args: &[Value], op: &'static str, keep: Ordering) -> Result<Value, ExpressionError> {
    let mut best = Num::of(op, &args[0])?;
    for arg in &args[1..] {
        let n = Num::of(op, arg)?;
        if n.compare(&best) == Some(keep) {
            best = n;
        }
    }
    Ok(best.into_value())
}

fn truth(op: &'static str, v: &Value) -> Result<bool, ExpressionError> {
    v.truthy().ok_or(ExpressionError::Type {
        op,
        found: v.kind_name(),
    })
}

fn shift_amount(n: &BigInt) -> Result<usize, ExpressionError> {
    n.to_usize()
        .filter(|s| *s <= 4096)
        .ok_or(ExpressionError::Type {
            op: "<<",
            found: "out-of-range shift amount",
        })
}

fn binary(op: BinOp, a: Value, b: Value) -> Result<Value, ExpressionError> {
    let sym = op.symbol();
    match op {
        BinOp::Add if matches!(a, Value::Text(_)) || matches!(b, Value::Text(_)) => {
            let text = |v: Value| match v {
                Value::Text(s) => s,
                other => other.to_string(),
            };
            Ok(Value::Text(text(a) + &text(b)))
        }
        BinOp::Eq | BinOp::Ne => {
            let same = match (Num::of(sym, &a), Num::of(sym, &b)) {
                (Ok(x), Ok(y)) => x.compare(&y) == Some(Ordering::Equal),
                _ => a == b,
            };
            Ok(Value::Bool(same == (op == BinOp::Eq)))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = match (&a, &b) {
                (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
                _ => Num::of(sym, &a)?.compare(&Num::of(sym, &b)?),
            };
            let holds = match ord {
                None => false,
                Some(ord) => match op {
                    BinOp::Lt => ord == Ordering::Less,
                    BinOp::Le => ord != Ordering::Greater,
                    BinOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                },
            };
            Ok(Value::Bool(holds))
        }
        _ => match (Num::of(sym, &a)?, Num::of(sym, &b)?) {
            (Num::I(x), Num::I(y)) => {
                let r = match op {
                    BinOp::Add => x + y,
                    BinOp::Sub => x - y,
                    BinOp::Mul => x * y,
                    BinOp::Div | BinOp::Rem if y.is_zero() => {
                        return Err(ExpressionError::DivisionByZero)
                    }
                    BinOp::Div => x / y,
                    BinOp::Rem => x % y,
                    BinOp::Shl => x << shift_amount(&y)?,
                    BinOp::Shr => x >> shift_amount(&y)?,
                    BinOp::BitAnd => x & y,
                    BinOp::BitOr => x | y,
                    BinOp::BitXor => x ^ y,
                    _ => unreachable!("logical and comparison operators handled above"),
                };
                Ok(from_big(r))
            }
            (x, y) => {
                let (x, y) = (x.to_f64(), y.to_f64());
                let r = match op {
                    BinOp::Add => x + y,
                    BinOp::Sub => x - y,
                    BinOp::Mul => x * y,
                    BinOp::Div | BinOp::Rem if y == 0.0 => {
                        return Err(ExpressionError::DivisionByZero)
                    }
                    BinOp::Div => x / y,
                    BinOp::Rem => x % y,
                    _ => {
                        return Err(ExpressionError::Type {
                            op: sym,
                            found: "float",
                        })
                    }
                };
                Ok(Value::Float(r))
            }
        },
    }
}

/// Evaluates a compiled expression against `scope`.
pub fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Path { root, segments } => {
            let found = if *root {
                scope.resolve_root(segments)
            } else {
                scope.resolve(segments)
            };
            Ok(found.cloned().unwrap_or(Value::Null))
        }
        Expr::Param(name) => Ok(scope.param(name).cloned().unwrap_or(Value::Null)),
        Expr::Unary(op, inner) => {
            let v = eval(inner, scope)?;
            match op {
                UnOp::Not => Ok(Value::Bool(!truth("!", &v)?)),
                UnOp::Neg => Ok(match Num::of("-", &v)? {
                    Num::I(i) => from_big(-i),
                    Num::F(f) => Value::Float(-f),
                }),
                UnOp::BitNot => match Num::of("~", &v)? {
                    Num::I(i) => Ok(from_big(!i)),
                    Num::F(_) => Err(ExpressionError::Type {
                        op: "~",
                        found: "float",
                    }),
                },
            }
        }
        Expr::Binary(BinOp::And, a, b) => {
            Ok(Value::Bool(truth("&&", &eval(a, scope)?)? && truth("&&", &eval(b, scope)?)?))
        }
        Expr::Binary(BinOp::Or, a, b) => {
            Ok(Value::Bool(truth("||", &eval(a, scope)?)? || truth("||", &eval(b, scope)?)?))
        }
        Expr::Binary(op, a, b) => binary(*op, eval(a, scope)?, eval(b, scope)?),
        Expr::Cond(c, then, otherwise) => {
            if truth("?:", &eval(c, scope)?)? {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Call(name, args) => {
            let (min, max, f) = BUILTINS
                .get(name.as_str())
                .ok_or_else(|| ExpressionError::UnknownFunction(name.clone()))?;
            if args.len() < *min || max.map_or(false, |max| args.len() > max) {
                return Err(ExpressionError::Arity {
                    function: name.clone(),
                    expected: if max.is_some() { "exactly 1" } else { "at least 1" },
                    found: args.len(),
                });
            }
            let args = args
                .iter()
                .map(|a| eval(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            f(&args)
        }
    }
}

/// The default [`Evaluator`]: compiles and evaluates expression text on
/// every call
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleEvaluator;

impl Evaluator for SimpleEvaluator {
    fn evaluate(&self, expr: &str, scope: &Scope<'_>) -> Result<Value, ExpressionError> {
        eval(&compile(expr)?, scope)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Record;

    fn run(src: &str) -> Value {
        SimpleEvaluator.evaluate(src, &Scope::empty()).unwrap()
    }

    #[test]
    fn precedence() {
        assert_eq!(run("1 + 2 * 3"), Value::Int(7));
        assert_eq!(run("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(run("1 << 2 + 1"), Value::Int(8));
        assert_eq!(run("0xf0 | 0x0f & 0x3"), Value::Int(0xf3));
        assert_eq!(run("-2 * -3"), Value::Int(6));
        assert_eq!(run("7 / 2"), Value::Int(3));
        assert_eq!(run("7.0 / 2"), Value::Float(3.5));
    }

    #[test]
    fn logic_and_ternary() {
        assert_eq!(run("1 < 2 && 2 <= 2"), Value::Bool(true));
        assert_eq!(run("!(3 == 3) || 0"), Value::Bool(false));
        assert_eq!(run("1 > 2 ? 'a' : 2 > 1 ? 'b' : 'c'"), Value::from("b"));
        assert_eq!(run("'ab' + 1"), Value::from("ab1"));
        assert_eq!(run("null == 0"), Value::Bool(false));
    }

    #[test]
    fn wide_integers() {
        assert_eq!(run("0xffffffffffffffff"), Value::UInt(u64::MAX));
        assert_eq!(
            run("1 << 70"),
            Value::Big(BigInt::from(1) << 70usize)
        );
        assert_eq!(run("~0"), Value::Int(-1));
    }

    #[test]
    fn references() {
        let stack = [
            Record::new("Outer").with("kind", 3u8),
            Record::new("Inner")
                .with("len", 5u8)
                .with("sub", Record::new("Sub").with("x", 2u8)),
        ];
        let params = [("prefix".to_owned(), Value::UInt(0x1f))];
        let scope = Scope::new(&stack, &params);
        let ev = SimpleEvaluator;
        assert_eq!(ev.evaluate("len * sub.x", &scope), Ok(Value::Int(10)));
        assert_eq!(ev.evaluate("root.kind + kind", &scope), Ok(Value::Int(6)));
        assert_eq!(ev.evaluate("#prefix == 31", &scope), Ok(Value::Bool(true)));
        assert_eq!(ev.evaluate("nothing", &scope), Ok(Value::Null));
    }

    #[test]
    fn builtins() {
        assert_eq!(run("len('héllo')"), Value::UInt(5));
        assert_eq!(run("min(4, -2, 9)"), Value::Int(-2));
        assert_eq!(run("max(1, 2.5)"), Value::Float(2.5));
        assert_eq!(run("abs(-7)"), Value::Int(7));
        assert!(matches!(
            SimpleEvaluator.evaluate("abs(1, 2)", &Scope::empty()),
            Err(ExpressionError::Arity { .. })
        ));
        assert!(matches!(
            SimpleEvaluator.evaluate("nope(1)", &Scope::empty()),
            Err(ExpressionError::UnknownFunction(_))
        ));
    }

    #[test]
    fn errors() {
        let ev = SimpleEvaluator;
        let scope = Scope::empty();
        assert!(matches!(ev.evaluate("1 +", &scope), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(ev.evaluate("(1", &scope), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(ev.evaluate("1 2", &scope), Err(ExpressionError::Syntax { .. })));
        assert!(matches!(ev.evaluate("'abc", &scope), Err(ExpressionError::Syntax { .. })));
        assert_eq!(ev.evaluate("1 / 0", &scope), Err(ExpressionError::DivisionByZero));
        assert!(matches!(ev.evaluate("'a' * 2", &scope), Err(ExpressionError::Type { .. })));
    }
}
