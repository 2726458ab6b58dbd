use std::fmt;

use mlua::Value;
use thiserror::Error;

/// Errors raised while bringing the interpreter up, before any guest code
/// has been given control.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to create interpreter: {0}")]
    CreateInterpreter(String),
    #[error("interpreter error: {0}")]
    Lua(#[from] mlua::Error),
    #[error("module `{0}` is already registered")]
    DuplicateModule(String),
    #[error("no native module named `{0}`")]
    UnknownModule(String),
    #[error(transparent)]
    Start(#[from] StartFault),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// The guest module could not be loaded. Holds the message exactly as it
/// will be shown to the user, trace included when one was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadFailure {
    pub message: String,
}

impl LoadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        Self::new(render_error_value(value))
    }
}

/// An error that escaped the guest's `start` operation.
///
/// The host never reports these itself. `Debug` forwards to the interpreter's
/// own message so that returning the fault from `main` prints it unchanged.
#[derive(Error)]
#[error("{0}")]
pub struct StartFault(#[from] pub mlua::Error);

impl fmt::Debug for StartFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Renders an interpreter error value the way `lua_tostring` would,
/// falling back to a type description for values with no string form.
pub fn render_error_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string_lossy().to_string(),
        Value::Integer(n) => format_number(*n as f64),
        Value::Number(n) => format_number(*n),
        Value::Error(err) => err.to_string(),
        other => format!("(error object is a {} value)", type_name(other)),
    }
}

/// Lua's own name for the type of `value`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) | Value::Number(_) => "number",
        other => other.type_name(),
    }
}

/// Lua's `%.14g` conversion.
fn format_number(n: f64) -> String {
    let sign = if n.is_sign_negative() { "-" } else { "" };
    if n.is_nan() {
        return format!("{sign}nan");
    }
    if n.is_infinite() {
        return format!("{sign}inf");
    }
    if n == 0.0 {
        return format!("{sign}0");
    }

    let scientific = format!("{n:.13e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..14).contains(&exponent) {
        let decimals = usize::try_from(13 - exponent).unwrap_or(0);
        trim_fraction(&format!("{n:.decimals$}")).to_string()
    } else {
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{exponent_sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}
