// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Wrangle expression parser and evaluator

use crate::error::ExpressionError;
use ahash::AHashMap;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[grammar = "sop/wrangle/wrangle.pest"]
struct WrangleParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(String),
    Channel(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign {
        target: String,
        op: AssignOp,
        value: Expr,
    },
    Eval(Expr),
}

/// Built-in functions with fixed arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Exp,
    Log,
    Pow,
    Min,
    Max,
    Clamp,
    Lerp,
    Fit,
    Sign,
    Frac,
    Rand,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "atan2" => Self::Atan2,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "pow" => Self::Pow,
            "min" => Self::Min,
            "max" => Self::Max,
            "clamp" => Self::Clamp,
            "lerp" => Self::Lerp,
            "fit" => Self::Fit,
            "sign" => Self::Sign,
            "frac" => Self::Frac,
            "rand" => Self::Rand,
            _ => return None,
        };
        Some(f)
    }

    fn arity(self) -> usize {
        match self {
            Self::Atan2 | Self::Pow | Self::Min | Self::Max => 2,
            Self::Clamp | Self::Lerp => 3,
            Self::Fit => 5,
            _ => 1,
        }
    }
}

/// Maps `@name` / `@name.component` onto scalar variable names.
fn attribute_variable(name: &str, component: Option<&str>) -> Result<String, ExpressionError> {
    let Some(component) = component else {
        return Ok(name.to_string());
    };
    let axis = match component {
        "x" | "r" => 0,
        "y" | "g" => 1,
        "z" | "b" => 2,
        _ => return Err(ExpressionError::UnsupportedAttribute(format!("{name}.{component}"))),
    };
    let prefix = match name {
        "P" => ["Px", "Py", "Pz"],
        "N" => ["Nx", "Ny", "Nz"],
        "Cd" => ["Cr", "Cg", "Cb"],
        _ => return Err(ExpressionError::UnsupportedAttribute(format!("{name}.{component}"))),
    };
    Ok(prefix[axis].to_string())
}

/// A compiled wrangle program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    pub fn compile(source: &str) -> Result<Self, ExpressionError> {
        let program = WrangleParser::parse(Rule::program, source)
            .map_err(|e| ExpressionError::Syntax(e.to_string()))?
            .next()
            .ok_or_else(|| ExpressionError::Syntax("empty parse".into()))?;
        let mut statements = Vec::new();
        for pair in program.into_inner() {
            match pair.as_rule() {
                Rule::assignment => statements.push(build_assignment(pair)?),
                Rule::expr => statements.push(Statement::Eval(build_expr(pair)?)),
                _ => {}
            }
        }
        Ok(Self { statements })
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Names referenced through `ch("...")`.
    pub fn channels(&self) -> Vec<String> {
        fn walk(expr: &Expr, out: &mut Vec<String>) {
            match expr {
                Expr::Channel(name) if !out.contains(name) => out.push(name.clone()),
                Expr::Unary(_, e) => walk(e, out),
                Expr::Binary(_, a, b) => {
                    walk(a, out);
                    walk(b, out);
                }
                Expr::Ternary(c, a, b) => {
                    walk(c, out);
                    walk(a, out);
                    walk(b, out);
                }
                Expr::Call(_, args) => args.iter().for_each(|a| walk(a, out)),
                _ => {}
            }
        }
        let mut out = Vec::new();
        for statement in &self.statements {
            match statement {
                Statement::Assign { value, .. } => walk(value, &mut out),
                Statement::Eval(e) => walk(e, &mut out),
            }
        }
        out
    }

    /// Runs every statement against `scope`; the value of the last one.
    pub fn run(&self, scope: &mut Scope) -> f64 {
        let mut last = 0.0;
        for statement in &self.statements {
            last = match statement {
                Statement::Assign { target, op, value } => {
                    let rhs = scope.eval(value);
                    let current = scope.get(target);
                    let result = match op {
                        AssignOp::Set => rhs,
                        AssignOp::Add => current + rhs,
                        AssignOp::Sub => current - rhs,
                        AssignOp::Mul => current * rhs,
                        AssignOp::Div => current / rhs,
                    };
                    scope.set(target, result);
                    result
                }
                Statement::Eval(expr) => scope.eval(expr),
            };
        }
        last
    }
}

fn build_assignment(pair: Pair<Rule>) -> Result<Statement, ExpressionError> {
    let mut inner = pair.into_inner();
    let target = inner
        .next()
        .ok_or_else(|| ExpressionError::Syntax("missing assignment target".into()))?;
    let target = match target.as_rule() {
        Rule::attribute => build_attribute(target)?,
        _ => target.as_str().to_string(),
    };
    let op = match inner.next().map(|p| p.as_str().trim()) {
        Some("+=") => AssignOp::Add,
        Some("-=") => AssignOp::Sub,
        Some("*=") => AssignOp::Mul,
        Some("/=") => AssignOp::Div,
        _ => AssignOp::Set,
    };
    let value = inner
        .next()
        .ok_or_else(|| ExpressionError::Syntax("missing assigned value".into()))
        .and_then(build_expr)?;
    Ok(Statement::Assign { target, op, value })
}

fn build_attribute(pair: Pair<Rule>) -> Result<String, ExpressionError> {
    let mut inner = pair.into_inner();
    let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
    let component = inner.next().map(|p| p.as_str());
    attribute_variable(name, component)
}

/// Folds `operand (op operand)*` left to right.
fn build_chain(
    pair: Pair<Rule>,
    op_for: impl Fn(&str) -> BinaryOp,
) -> Result<Expr, ExpressionError> {
    let mut inner = pair.into_inner();
    let mut lhs = match inner.next() {
        Some(first) => build_expr(first)?,
        None => return Err(ExpressionError::Syntax("empty expression".into())),
    };
    while let Some(next) = inner.next() {
        let (op, rhs) = match next.as_rule() {
            Rule::cmp_op | Rule::sum_op | Rule::product_op => {
                let op = op_for(next.as_str());
                let rhs = inner
                    .next()
                    .ok_or_else(|| ExpressionError::Syntax("missing operand".into()))?;
                (op, rhs)
            }
            // `||` and `&&` are literals, so operands follow directly
            _ => (op_for(""), next),
        };
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(build_expr(rhs)?));
    }
    Ok(lhs)
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, ExpressionError> {
    match pair.as_rule() {
        Rule::expr => {
            let mut inner = pair.into_inner();
            let condition = inner
                .next()
                .ok_or_else(|| ExpressionError::Syntax("empty expression".into()))
                .and_then(build_expr)?;
            match (inner.next(), inner.next()) {
                (Some(a), Some(b)) => Ok(Expr::Ternary(
                    Box::new(condition),
                    Box::new(build_expr(a)?),
                    Box::new(build_expr(b)?),
                )),
                _ => Ok(condition),
            }
        }
        Rule::or_expr => build_chain(pair, |_| BinaryOp::Or),
        Rule::and_expr => build_chain(pair, |_| BinaryOp::And),
        Rule::cmp_expr => build_chain(pair, |op| match op {
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "<" => BinaryOp::Lt,
            _ => BinaryOp::Gt,
        }),
        Rule::sum => build_chain(pair, |op| {
            if op == "-" {
                BinaryOp::Sub
            } else {
                BinaryOp::Add
            }
        }),
        Rule::product => build_chain(pair, |op| match op {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            _ => BinaryOp::Rem,
        }),
        Rule::unary => {
            let mut ops = Vec::new();
            let mut operand = None;
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::unary_op => ops.push(p.as_str().to_string()),
                    _ => operand = Some(build_expr(p)?),
                }
            }
            let mut expr =
                operand.ok_or_else(|| ExpressionError::Syntax("missing operand".into()))?;
            for op in ops.iter().rev() {
                expr = match op.as_str() {
                    "-" => Expr::Unary(UnaryOp::Neg, Box::new(expr)),
                    "!" => Expr::Unary(UnaryOp::Not, Box::new(expr)),
                    _ => expr,
                };
            }
            Ok(expr)
        }
        Rule::power => {
            let mut inner = pair.into_inner();
            let base = inner
                .next()
                .ok_or_else(|| ExpressionError::Syntax("missing operand".into()))
                .and_then(build_expr)?;
            match inner.next() {
                Some(exponent) => Ok(Expr::Binary(
                    BinaryOp::Pow,
                    Box::new(base),
                    Box::new(build_expr(exponent)?),
                )),
                None => Ok(base),
            }
        }
        Rule::number => pair
            .as_str()
            .parse()
            .map(Expr::Number)
            .map_err(|_| ExpressionError::Syntax(format!("bad number '{}'", pair.as_str()))),
        Rule::ident => Ok(Expr::Var(pair.as_str().to_string())),
        Rule::attribute => build_attribute(pair).map(Expr::Var),
        Rule::channel => {
            let name = pair
                .into_inner()
                .flat_map(|s| s.into_inner())
                .next()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default();
            Ok(Expr::Channel(name))
        }
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
            let function =
                Function::lookup(name).ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))?;
            let args = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
            if args.len() != function.arity() {
                return Err(ExpressionError::Arity {
                    name: name.to_string(),
                    expected: function.arity(),
                    found: args.len(),
                });
            }
            Ok(Expr::Call(function, args))
        }
        rule => Err(ExpressionError::Syntax(format!("unexpected {rule:?}"))),
    }
}

fn truth(value: f64) -> bool {
    value != 0.0
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Variable bindings, channel values and the random stream of one run.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: AHashMap<String, f64>,
    channels: AHashMap<String, f64>,
    seed: u64,
}

impl Scope {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> f64 {
        self.variables.get(name).copied().unwrap_or(0.0)
    }

    /// Assigns `name`, creating it as a local when unknown.
    pub fn set(&mut self, name: &str, value: f64) {
        match self.variables.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.variables.insert(name.to_string(), value);
            }
        }
    }

    pub fn set_channel(&mut self, name: &str, value: f64) {
        self.channels.insert(name.to_string(), value);
    }

    /// Same `seed` and `x` always give the same value in [0, 1).
    fn random(&self, x: f64) -> f64 {
        let mixed = self.seed ^ x.to_bits().wrapping_mul(0x9E37_79B9_7F4A_7C15);
        StdRng::seed_from_u64(mixed).gen::<f64>()
    }

    pub fn eval(&self, expr: &Expr) -> f64 {
        match expr {
            Expr::Number(n) => *n,
            Expr::Var(name) => self.get(name),
            Expr::Channel(name) => self.channels.get(name).copied().unwrap_or(0.0),
            Expr::Unary(UnaryOp::Neg, e) => -self.eval(e),
            Expr::Unary(UnaryOp::Not, e) => flag(!truth(self.eval(e))),
            Expr::Binary(op, a, b) => {
                let (x, y) = (self.eval(a), self.eval(b));
                match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Sub => x - y,
                    BinaryOp::Mul => x * y,
                    BinaryOp::Div => x / y,
                    BinaryOp::Rem => x % y,
                    BinaryOp::Pow => x.powf(y),
                    BinaryOp::Eq => flag(x == y),
                    BinaryOp::Ne => flag(x != y),
                    BinaryOp::Lt => flag(x < y),
                    BinaryOp::Le => flag(x <= y),
                    BinaryOp::Gt => flag(x > y),
                    BinaryOp::Ge => flag(x >= y),
                    BinaryOp::And => flag(truth(x) && truth(y)),
                    BinaryOp::Or => flag(truth(x) || truth(y)),
                }
            }
            Expr::Ternary(c, a, b) => {
                if truth(self.eval(c)) {
                    self.eval(a)
                } else {
                    self.eval(b)
                }
            }
            Expr::Call(function, args) => {
                let v: Vec<f64> = args.iter().map(|a| self.eval(a)).collect();
                match function {
                    Function::Sin => v[0].sin(),
                    Function::Cos => v[0].cos(),
                    Function::Tan => v[0].tan(),
                    Function::Asin => v[0].asin(),
                    Function::Acos => v[0].acos(),
                    Function::Atan => v[0].atan(),
                    Function::Atan2 => v[0].atan2(v[1]),
                    Function::Sqrt => v[0].sqrt(),
                    Function::Abs => v[0].abs(),
                    Function::Floor => v[0].floor(),
                    Function::Ceil => v[0].ceil(),
                    Function::Round => v[0].round(),
                    Function::Exp => v[0].exp(),
                    Function::Log => v[0].ln(),
                    Function::Pow => v[0].powf(v[1]),
                    Function::Min => v[0].min(v[1]),
                    Function::Max => v[0].max(v[1]),
                    Function::Clamp => v[0].max(v[1]).min(v[2]),
                    Function::Lerp => v[0] + (v[1] - v[0]) * v[2],
                    Function::Fit => {
                        let span = v[2] - v[1];
                        let t = if span == 0.0 {
                            0.0
                        } else {
                            ((v[0] - v[1]) / span).clamp(0.0, 1.0)
                        };
                        v[3] + (v[4] - v[3]) * t
                    }
                    Function::Sign => {
                        if v[0] == 0.0 {
                            0.0
                        } else {
                            v[0].signum()
                        }
                    }
                    Function::Frac => v[0] - v[0].floor(),
                    Function::Rand => self.random(v[0]),
                }
            }
        }
    }
}
