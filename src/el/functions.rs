//! Function tables for each resolution phase
//!
//! Functions that can only be answered at materialization time (instance
//! offsets, nominal time, dataset URIs) are validated and echoed back as
//! their own canonical expression text.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::value::Value;
use super::{EvalContext, Phase};
use crate::coord::events::EventDirection;
use crate::error::ErrorCode;
use crate::time::TimeUnit;

/// Failure raised inside a function body
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionError {
    pub code: u16,
    pub message: String,
}

impl FunctionError {
    fn eval(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::EXPRESSION_EVALUATION,
            message: message.into(),
        }
    }

    fn type_mismatch(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::EXPRESSION_TYPE_MISMATCH,
            message: message.into(),
        }
    }
}

/// Arguments and identity of one call
pub struct CallSite<'a> {
    pub namespace: Option<&'a str>,
    pub name: &'a str,
    pub args: &'a [Value],
}

impl CallSite<'_> {
    fn arity(&self, expected: usize) -> Result<(), FunctionError> {
        if self.args.len() == expected {
            Ok(())
        } else {
            Err(FunctionError::type_mismatch(format!(
                "{}() expects {} argument(s), got {}",
                self.name,
                expected,
                self.args.len()
            )))
        }
    }

    fn int_arg(&self, index: usize) -> Result<i64, FunctionError> {
        self.args
            .get(index)
            .and_then(Value::as_int)
            .ok_or_else(|| {
                FunctionError::type_mismatch(format!(
                    "{}() argument {} must be an integer",
                    self.name,
                    index + 1
                ))
            })
    }

    fn str_arg(&self, index: usize) -> Result<&str, FunctionError> {
        self.args
            .get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FunctionError::type_mismatch(format!(
                    "{}() argument {} must be a string",
                    self.name,
                    index + 1
                ))
            })
    }

    /// The call rendered back as `${ns:name(args)}`
    pub fn echo(&self) -> Value {
        let args: Vec<String> = self.args.iter().map(Value::as_argument).collect();
        let qualified = match self.namespace {
            Some(ns) => format!("{}:{}", ns, self.name),
            None => self.name.to_string(),
        };
        Value::Str(format!("${{{}({})}}", qualified, args.join(", ")))
    }
}

pub type ElFunction = fn(&mut EvalContext, &CallSite) -> Result<Value, FunctionError>;

/// Functions available to one phase, keyed by local name
pub struct FunctionTable {
    functions: HashMap<&'static str, ElFunction>,
}

impl FunctionTable {
    fn new(entries: &[(&'static str, ElFunction)]) -> Self {
        Self {
            functions: entries.iter().copied().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<ElFunction> {
        self.functions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn set_frequency_unit(ctx: &mut EvalContext, unit: TimeUnit, end_of_duration: TimeUnit) {
    ctx.time_unit = Some(unit);
    ctx.end_of_duration = Some(end_of_duration);
}

fn minutes(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    let n = call.int_arg(0)?;
    set_frequency_unit(ctx, TimeUnit::Minute, TimeUnit::None);
    Ok(Value::Int(n))
}

fn hours(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    let n = call.int_arg(0)?;
    set_frequency_unit(ctx, TimeUnit::Minute, TimeUnit::None);
    n.checked_mul(60)
        .map(Value::Int)
        .ok_or_else(|| FunctionError::eval("hours() overflow"))
}

fn days(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    let n = call.int_arg(0)?;
    set_frequency_unit(ctx, TimeUnit::Day, TimeUnit::None);
    Ok(Value::Int(n))
}

fn months(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    let n = call.int_arg(0)?;
    set_frequency_unit(ctx, TimeUnit::Month, TimeUnit::None);
    Ok(Value::Int(n))
}

fn end_of_days(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    let n = call.int_arg(0)?;
    set_frequency_unit(ctx, TimeUnit::Day, TimeUnit::EndOfDay);
    Ok(Value::Int(n))
}

fn end_of_months(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    let n = call.int_arg(0)?;
    set_frequency_unit(ctx, TimeUnit::Month, TimeUnit::EndOfMonth);
    Ok(Value::Int(n))
}

fn current(_: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    call.int_arg(0)?;
    Ok(call.echo())
}

fn latest(_: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    if call.int_arg(0)? > 0 {
        return Err(FunctionError::eval(
            "latest() offset must be zero or negative",
        ));
    }
    Ok(call.echo())
}

fn future(_: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(2)?;
    if call.int_arg(0)? < 0 {
        return Err(FunctionError::eval("future() offset must be zero or positive"));
    }
    if call.int_arg(1)? <= 0 {
        return Err(FunctionError::eval("future() limit must be positive"));
    }
    Ok(call.echo())
}

fn int_echo(_: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(1)?;
    call.int_arg(0)?;
    Ok(call.echo())
}

fn nullary_echo(_: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(0)?;
    Ok(call.echo())
}

fn date_offset(_: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(3)?;
    call.int_arg(1)?;
    call.str_arg(2)?;
    Ok(call.echo())
}

fn format_time(_: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(2)?;
    call.str_arg(1)?;
    Ok(call.echo())
}

fn data_event_echo(
    ctx: &EvalContext,
    call: &CallSite,
    direction: EventDirection,
) -> Result<Value, FunctionError> {
    call.arity(1)?;
    let name = call.str_arg(0)?;
    if !ctx.data_names.contains(name, direction) {
        return Err(FunctionError::eval(format!(
            "{} name [{}] is not defined",
            direction.element_name(),
            name
        )));
    }
    Ok(call.echo())
}

fn data_in(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    data_event_echo(ctx, call, EventDirection::In)
}

fn data_out(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    data_event_echo(ctx, call, EventDirection::Out)
}

fn user(ctx: &mut EvalContext, call: &CallSite) -> Result<Value, FunctionError> {
    call.arity(0)?;
    ctx.user
        .clone()
        .map(Value::Str)
        .ok_or_else(|| FunctionError::eval("user() is unavailable: no submitting user"))
}

static FREQUENCY_FUNCTIONS: Lazy<FunctionTable> = Lazy::new(|| {
    FunctionTable::new(&[
        ("minutes", minutes as ElFunction),
        ("hours", hours),
        ("days", days),
        ("months", months),
        ("endOfDays", end_of_days),
        ("endOfMonths", end_of_months),
    ])
});

static INSTANCE_FUNCTIONS: Lazy<FunctionTable> = Lazy::new(|| {
    FunctionTable::new(&[
        ("current", current as ElFunction),
        ("latest", latest),
        ("future", future),
        ("hoursInDay", int_echo),
        ("daysInMonth", int_echo),
        ("tzOffset", nullary_echo),
    ])
});

static DATA_ECHO_FUNCTIONS: Lazy<FunctionTable> = Lazy::new(|| {
    FunctionTable::new(&[
        ("dataIn", data_in as ElFunction),
        ("dataOut", data_out),
        ("nominalTime", nullary_echo),
        ("actualTime", nullary_echo),
        ("dateOffset", date_offset),
        ("formatTime", format_time),
        ("user", user),
    ])
});

static SLA_FUNCTIONS: Lazy<FunctionTable> = Lazy::new(|| {
    FunctionTable::new(&[
        ("nominalTime", nullary_echo as ElFunction),
        ("actualTime", nullary_echo),
    ])
});

static NO_FUNCTIONS: Lazy<FunctionTable> = Lazy::new(|| FunctionTable::new(&[]));

/// Function table for a phase
pub fn table_for(phase: Phase) -> &'static FunctionTable {
    match phase {
        Phase::Frequency => &FREQUENCY_FUNCTIONS,
        Phase::Instances => &INSTANCE_FUNCTIONS,
        Phase::DataEcho => &DATA_ECHO_FUNCTIONS,
        Phase::Sla => &SLA_FUNCTIONS,
        Phase::NoFunctions | Phase::Bundle => &NO_FUNCTIONS,
    }
}

/// Built-in constants for a phase, applied after configuration variables
pub fn constants_for(phase: Phase) -> Vec<(&'static str, Value)> {
    let echo = |name: &str| Value::Str(format!("${{{}}}", name));
    let units = [
        ("MINUTES", Value::Int(1)),
        ("HOURS", Value::Int(60)),
        ("DAYS", Value::Int(24 * 60)),
    ];
    match phase {
        Phase::NoFunctions => {
            let mut constants: Vec<(&'static str, Value)> = ["YEAR", "MONTH", "DAY", "HOUR", "MINUTE"]
                .into_iter()
                .map(|name| (name, echo(name)))
                .collect();
            constants.extend(units);
            constants
        }
        Phase::Sla => units.to_vec(),
        Phase::Frequency | Phase::Instances | Phase::DataEcho | Phase::Bundle => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_tables_are_disjoint_where_expected() {
        assert!(table_for(Phase::NoFunctions).is_empty());
        assert!(table_for(Phase::Frequency).get("days").is_some());
        assert!(table_for(Phase::Frequency).get("current").is_none());
        assert!(table_for(Phase::Instances).get("current").is_some());
        assert!(table_for(Phase::DataEcho).get("dataIn").is_some());
        assert_eq!(table_for(Phase::Sla).len(), 2);
    }

    #[test]
    fn test_echo_rendering() {
        let args = [Value::Int(0), Value::Int(5)];
        let call = CallSite {
            namespace: Some("coord"),
            name: "future",
            args: &args,
        };
        assert_eq!(call.echo(), Value::from("${coord:future(0, 5)}"));
    }

    #[test]
    fn test_no_function_constants_echo_themselves() {
        let constants = constants_for(Phase::NoFunctions);
        assert!(constants.contains(&("YEAR", Value::from("${YEAR}"))));
        assert!(constants.contains(&("HOURS", Value::Int(60))));
        assert!(constants_for(Phase::Bundle).is_empty());
    }
}
