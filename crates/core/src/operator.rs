//! Operator table for the four supported binary operations.
//!
//! Dispatch goes through an immutable [`OperatorTable`] built once and shared
//! read-only. Arithmetic anomalies never fail: division by zero and unknown
//! operator codes both collapse into `f64::NAN` at the call sites that need
//! the sentinel form.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use thiserror::Error;

pub type BinaryOp = fn(f64, f64) -> f64;

pub fn sum(a: f64, b: f64) -> f64 {
    a + b
}

pub fn sub(a: f64, b: f64) -> f64 {
    a - b
}

pub fn mul(a: f64, b: f64) -> f64 {
    a * b
}

/// Division yielding `NaN` instead of an infinity when the divisor is zero.
pub fn division(a: f64, b: f64) -> f64 {
    if b == 0.0 { f64::NAN } else { a / b }
}

/// Symbolic operator code carried by an `operation` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCode {
    Sum,
    Sub,
    Mul,
    Div,
}

impl OperatorCode {
    pub const ALL: [OperatorCode; 4] =
        [OperatorCode::Sum, OperatorCode::Sub, OperatorCode::Mul, OperatorCode::Div];

    pub fn as_str(self) -> &'static str {
        match self {
            OperatorCode::Sum => "SUM",
            OperatorCode::Sub => "SUB",
            OperatorCode::Mul => "MUL",
            OperatorCode::Div => "DIV",
        }
    }
}

impl fmt::Display for OperatorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator code outside of `SUM | SUB | MUL | DIV`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized operator code '{0}'")]
pub struct UnrecognizedOperator(pub String);

impl FromStr for OperatorCode {
    type Err = UnrecognizedOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUM" => Ok(OperatorCode::Sum),
            "SUB" => Ok(OperatorCode::Sub),
            "MUL" => Ok(OperatorCode::Mul),
            "DIV" => Ok(OperatorCode::Div),
            other => Err(UnrecognizedOperator(other.to_owned())),
        }
    }
}

static GLOBAL_TABLE: LazyLock<OperatorTable> = LazyLock::new(OperatorTable::standard);

/// Mapping from operator code to its pure binary function.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    ops: HashMap<OperatorCode, BinaryOp>,
}

impl OperatorTable {
    fn standard() -> Self {
        let ops = OperatorCode::ALL
            .into_iter()
            .map(|code| {
                let op: BinaryOp = match code {
                    OperatorCode::Sum => sum,
                    OperatorCode::Sub => sub,
                    OperatorCode::Mul => mul,
                    OperatorCode::Div => division,
                };
                (code, op)
            })
            .collect();
        Self { ops }
    }

    /// Shared table, constructed on first use.
    pub fn global() -> &'static OperatorTable {
        &GLOBAL_TABLE
    }

    pub fn get(&self, code: OperatorCode) -> BinaryOp {
        // The standard table is total over OperatorCode.
        self.ops.get(&code).copied().unwrap_or(|_, _| f64::NAN)
    }

    pub fn apply(&self, code: &str, left: f64, right: f64) -> Result<f64, UnrecognizedOperator> {
        let code = code.parse::<OperatorCode>()?;
        Ok(self.get(code)(left, right))
    }

    /// Like [`apply`](Self::apply) but folds an unknown code into `NaN`.
    pub fn evaluate(&self, code: &str, left: f64, right: f64) -> f64 {
        self.apply(code, left, right).unwrap_or(f64::NAN)
    }
}
