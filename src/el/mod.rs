//! Expression language for coordinator and bundle definitions
//!
//! Definitions embed `${...}` expressions. Each resolution step evaluates
//! them against a [`Phase`] that decides which functions and constants are
//! visible. Configuration properties are always visible as variables.
//!
//! The split follows the usual pipeline: [`tokenizer`] produces tokens,
//! [`parser`] builds an [`Expr`](parser::Expr) tree and the [`Evaluator`]
//! walks it.

pub mod functions;
pub mod parser;
pub mod tokenizer;
pub mod value;

use std::collections::HashMap;

use crate::config::JobConf;
use crate::coord::events::DataNameMap;
use crate::error::{ErrorCode, Result, SubmitError};
use crate::time::TimeUnit;
use functions::{CallSite, FunctionError, FunctionTable};
use parser::{parse_expression, split_template, BinaryOp, Expr, Segment};
pub use value::Value;

/// The only function namespace definitions may use
pub const COORD_NAMESPACE: &str = "coord";

/// Resolution phase, selecting the visible function table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// `frequency` attribute: `coord:days(n)` and friends
    Frequency,
    /// Plain attributes: no functions, time-unit constants only
    NoFunctions,
    /// `<instance>`, `<start-instance>`, `<end-instance>` contents
    Instances,
    /// Action configuration values, echoed for materialization
    DataEcho,
    /// SLA blocks
    Sla,
    /// Bundle definitions: configuration variables only
    Bundle,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Frequency => "coord-job-submit-freq",
            Phase::NoFunctions => "coord-job-submit-nofuncs",
            Phase::Instances => "coord-job-submit-instances",
            Phase::DataEcho => "coord-job-submit-data",
            Phase::Sla => "coord-sla-submit",
            Phase::Bundle => "bundle-submit",
        }
    }
}

/// Mutable state visible to function bodies
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    pub variables: HashMap<String, Value>,
    pub time_unit: Option<TimeUnit>,
    pub end_of_duration: Option<TimeUnit>,
    pub data_names: DataNameMap,
    pub user: Option<String>,
}

/// Evaluates templates for one phase
pub struct Evaluator {
    phase: Phase,
    functions: &'static FunctionTable,
    context: EvalContext,
}

impl Evaluator {
    /// Evaluator seeded with every property of `conf` as a string variable
    /// plus the phase's built-in constants
    pub fn new(phase: Phase, conf: &JobConf) -> Self {
        let mut variables: HashMap<String, Value> = conf
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Str(v.to_string())))
            .collect();
        for (name, value) in functions::constants_for(phase) {
            variables.insert(name.to_string(), value);
        }
        Self {
            phase,
            functions: functions::table_for(phase),
            context: EvalContext {
                variables,
                user: conf.get(crate::config::USER_NAME).map(str::to_string),
                ..EvalContext::default()
            },
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn with_data_names(mut self, names: DataNameMap) -> Self {
        self.context.data_names = names;
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.context.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.context.variables.get(name)
    }

    /// Forget the unit recorded by a previous frequency evaluation
    pub fn reset_frequency(&mut self) {
        self.context.time_unit = None;
        self.context.end_of_duration = None;
    }

    /// Unit recorded by the last frequency function, `MINUTE` if none ran
    pub fn time_unit(&self) -> TimeUnit {
        self.context.time_unit.unwrap_or(TimeUnit::Minute)
    }

    pub fn end_of_duration(&self) -> TimeUnit {
        self.context.end_of_duration.unwrap_or(TimeUnit::None)
    }

    /// Evaluate `text`, substituting every `${...}` expression
    pub fn evaluate(&mut self, text: &str) -> Result<String> {
        let segments = split_template(text).map_err(|message| {
            SubmitError::expression(ErrorCode::EXPRESSION_SYNTAX, message, text)
        })?;

        let mut out = String::with_capacity(text.len());
        for segment in segments {
            match segment {
                Segment::Literal(literal) => out.push_str(&literal),
                Segment::Expression(body) => {
                    let expr = parse_expression(&body).map_err(|message| {
                        SubmitError::expression(ErrorCode::EXPRESSION_SYNTAX, message, text)
                    })?;
                    let value = self.eval(&expr).map_err(|failure| {
                        SubmitError::expression(failure.code, failure.message, text)
                    })?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }

    fn eval(&mut self, expr: &Expr) -> std::result::Result<Value, FunctionError> {
        match expr {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Variable(name) => {
                self.context.variables.get(name).cloned().ok_or_else(|| FunctionError {
                    code: ErrorCode::EXPRESSION_UNDEFINED_VARIABLE,
                    message: format!("variable [{}] cannot be resolved", name),
                })
            }
            Expr::Neg(inner) => {
                let value = self.eval(inner)?;
                value
                    .as_int()
                    .and_then(i64::checked_neg)
                    .map(Value::Int)
                    .ok_or_else(|| FunctionError {
                        code: ErrorCode::EXPRESSION_TYPE_MISMATCH,
                        message: format!("cannot negate '{}'", value),
                    })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, left, right)
            }
            Expr::Call {
                namespace,
                name,
                args,
            } => {
                let qualified = match namespace {
                    Some(ns) => format!("{}:{}", ns, name),
                    None => name.clone(),
                };
                let function = match namespace.as_deref() {
                    None | Some(COORD_NAMESPACE) => self.functions.get(name),
                    Some(_) => None,
                }
                .ok_or_else(|| FunctionError {
                    code: ErrorCode::EXPRESSION_UNDEFINED_FUNCTION,
                    message: format!(
                        "function [{}] is not available in {}",
                        qualified,
                        self.phase.name()
                    ),
                })?;

                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let call = CallSite {
                    namespace: namespace.as_deref(),
                    name,
                    args: &values,
                };
                function(&mut self.context, &call)
            }
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> std::result::Result<Value, FunctionError> {
    let overflow = || FunctionError {
        code: ErrorCode::EXPRESSION_EVALUATION,
        message: "integer overflow".to_string(),
    };

    let (l, r) = match (left.as_int(), right.as_int()) {
        (Some(l), Some(r)) => (l, r),
        _ if op == BinaryOp::Add => return Ok(Value::Str(format!("{}{}", left, right))),
        _ => {
            return Err(FunctionError {
                code: ErrorCode::EXPRESSION_TYPE_MISMATCH,
                message: format!("arithmetic on non-integer operands '{}' and '{}'", left, right),
            })
        }
    };

    let result = match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Sub => l.checked_sub(r),
        BinaryOp::Mul => l.checked_mul(r),
        BinaryOp::Div | BinaryOp::Rem if r == 0 => {
            return Err(FunctionError {
                code: ErrorCode::EXPRESSION_EVALUATION,
                message: "division by zero".to_string(),
            })
        }
        BinaryOp::Div => l.checked_div(r),
        BinaryOp::Rem => l.checked_rem(r),
    };
    result.map(Value::Int).ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::events::EventDirection;

    fn conf() -> JobConf {
        let mut conf = JobConf::new();
        conf.set("nameNode", "hdfs://nn:8020");
        conf.set("freq", "15");
        conf.set("user.name", "alice");
        conf
    }

    #[test]
    fn test_frequency_records_unit() {
        let mut ev = Evaluator::new(Phase::Frequency, &conf());
        assert_eq!(ev.evaluate("${coord:hours(1)}").unwrap(), "60");
        assert_eq!(ev.time_unit(), TimeUnit::Minute);

        ev.reset_frequency();
        assert_eq!(ev.evaluate("${coord:endOfMonths(2)}").unwrap(), "2");
        assert_eq!(ev.time_unit(), TimeUnit::Month);
        assert_eq!(ev.end_of_duration(), TimeUnit::EndOfMonth);
    }

    #[test]
    fn test_variables_and_arithmetic() {
        let mut ev = Evaluator::new(Phase::Frequency, &conf());
        assert_eq!(ev.evaluate("${freq * 2}").unwrap(), "30");
        assert_eq!(ev.evaluate("${nameNode}/data").unwrap(), "hdfs://nn:8020/data");
        assert_eq!(ev.evaluate("no expressions").unwrap(), "no expressions");

        let err = ev.evaluate("${missing}").unwrap_err();
        assert_eq!(err.code(), ErrorCode::EXPRESSION_UNDEFINED_VARIABLE);
        let err = ev.evaluate("${1 / 0}").unwrap_err();
        assert_eq!(err.code(), ErrorCode::EXPRESSION_EVALUATION);
    }

    #[test]
    fn test_no_functions_phase() {
        let mut ev = Evaluator::new(Phase::NoFunctions, &conf());
        assert_eq!(ev.evaluate("${2 * HOURS}").unwrap(), "120");
        assert_eq!(ev.evaluate("/logs/${YEAR}/${MONTH}").unwrap(), "/logs/${YEAR}/${MONTH}");
        let err = ev.evaluate("${coord:days(1)}").unwrap_err();
        assert_eq!(err.code(), ErrorCode::EXPRESSION_UNDEFINED_FUNCTION);
    }

    #[test]
    fn test_instances_echo() {
        let mut ev = Evaluator::new(Phase::Instances, &conf());
        assert_eq!(
            ev.evaluate("${coord:current(-1)}").unwrap(),
            "${coord:current(-1)}"
        );
        assert_eq!(
            ev.evaluate("${coord:future(0, 3)}").unwrap(),
            "${coord:future(0, 3)}"
        );
        assert!(ev.evaluate("${coord:latest(1)}").is_err());
        assert!(ev.evaluate("${other:current(0)}").is_err());
    }

    #[test]
    fn test_data_echo_checks_names() {
        let mut names = DataNameMap::default();
        names.insert("input", EventDirection::In);
        let mut ev = Evaluator::new(Phase::DataEcho, &conf()).with_data_names(names);

        assert_eq!(
            ev.evaluate("${coord:dataIn('input')}").unwrap(),
            "${coord:dataIn('input')}"
        );
        assert!(ev.evaluate("${coord:dataOut('input')}").is_err());
        assert_eq!(ev.evaluate("${coord:user()}").unwrap(), "alice");
        assert_eq!(
            ev.evaluate("${coord:formatTime(coord:nominalTime(), 'yyyyMMdd')}")
                .unwrap(),
            "${coord:formatTime(coord:nominalTime(), 'yyyyMMdd')}"
        );
    }

    #[test]
    fn test_bundle_phase_has_no_functions() {
        let mut ev = Evaluator::new(Phase::Bundle, &conf());
        assert_eq!(ev.evaluate("${nameNode}").unwrap(), "hdfs://nn:8020");
        assert!(ev.evaluate("${coord:days(1)}").is_err());
        assert!(ev.evaluate("${HOURS}").is_err());
    }
}
