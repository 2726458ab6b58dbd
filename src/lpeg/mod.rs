//! Native `lpeg` module: parsing expression grammar matching in the style of
//! LPeg, covering patterns, sequence and choice operators, predicates,
//! repetition, and substring and position captures.

mod pattern;

use std::rc::Rc;

use mlua::{AnyUserData, Lua, MetaMethod, MultiValue, UserData, UserDataMethods, Value};

pub use pattern::{ByteSet, Capture, Match, Pattern};

pub const MODULE_NAME: &str = "lpeg";
pub const VERSION: &str = "1.1.0";

/// Deepest pattern tree Lua code may build. Matching recurses once per level.
pub const MAX_DEPTH: usize = 200;

/// A pattern as held by Lua code.
#[derive(Clone)]
pub struct LuaPattern {
    pattern: Rc<Pattern>,
    depth: usize,
}

impl LuaPattern {
    fn leaf(pattern: Pattern) -> Self {
        Self {
            pattern: Rc::new(pattern),
            depth: 1,
        }
    }

    fn nest(pattern: Pattern, depth: usize) -> mlua::Result<Self> {
        if depth > MAX_DEPTH {
            return Err(mlua::Error::RuntimeError("pattern too complex".to_string()));
        }
        Ok(Self {
            pattern: Rc::new(pattern),
            depth,
        })
    }

    fn unary(inner: Value, build: impl FnOnce(Rc<Pattern>) -> Pattern) -> mlua::Result<Self> {
        let inner = coerce(inner)?;
        Self::nest(build(inner.pattern), inner.depth + 1)
    }

    fn binary(
        left: Value,
        right: Value,
        build: impl FnOnce(Rc<Pattern>, Rc<Pattern>) -> Pattern,
    ) -> mlua::Result<Self> {
        let (left, right) = (coerce(left)?, coerce(right)?);
        let depth = left.depth.max(right.depth) + 1;
        Self::nest(build(left.pattern, right.pattern), depth)
    }
}

impl UserData for LuaPattern {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method(
            "match",
            |lua, this, (subject, init): (mlua::String, Option<i64>)| {
                run_match(lua, &this.pattern, &subject, init)
            },
        );

        methods.add_meta_function(MetaMethod::Mul, |_, (left, right): (Value, Value)| {
            LuaPattern::binary(left, right, Pattern::Sequence)
        });
        methods.add_meta_function(MetaMethod::Add, |_, (left, right): (Value, Value)| {
            LuaPattern::binary(left, right, Pattern::Choice)
        });
        methods.add_meta_function(MetaMethod::Sub, |_, (left, right): (Value, Value)| {
            // `difference` wraps the right operand in an extra `Not`.
            let (left, right) = (coerce(left)?, coerce(right)?);
            let depth = left.depth.max(right.depth + 1) + 1;
            LuaPattern::nest(Pattern::difference(left.pattern, right.pattern), depth)
        });
        methods.add_meta_function(MetaMethod::Unm, |_, operand: Value| {
            LuaPattern::unary(operand, Pattern::Not)
        });
        methods.add_meta_function(MetaMethod::Len, |_, operand: Value| {
            LuaPattern::unary(operand, Pattern::And)
        });
        methods.add_meta_function(MetaMethod::Pow, |_, (base, count): (Value, i64)| {
            LuaPattern::unary(base, |inner| Pattern::repeat(inner, count))
        });
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("pattern: {:p}", Rc::as_ptr(&this.pattern)))
        });
    }
}

/// Converts anything `lpeg.P` accepts into a pattern.
fn coerce(value: Value) -> mlua::Result<LuaPattern> {
    match value {
        Value::UserData(ud) => pattern_of(&ud),
        Value::String(s) => Ok(LuaPattern::leaf(Pattern::literal(s.as_bytes().to_vec()))),
        Value::Integer(n) => Ok(LuaPattern::leaf(Pattern::integer(n))),
        Value::Number(n) if n.fract() == 0.0 && n.is_finite() => {
            Ok(LuaPattern::leaf(Pattern::integer(n as i64)))
        }
        Value::Boolean(true) => Ok(LuaPattern::leaf(Pattern::True)),
        Value::Boolean(false) => Ok(LuaPattern::leaf(Pattern::False)),
        other => Err(mlua::Error::RuntimeError(format!(
            "pattern expected, got {}",
            other.type_name()
        ))),
    }
}

fn pattern_of(ud: &AnyUserData) -> mlua::Result<LuaPattern> {
    let pattern = ud.borrow::<LuaPattern>().map_err(|_| {
        mlua::Error::RuntimeError("pattern expected, got userdata".to_string())
    })?;
    Ok(pattern.clone())
}

/// Converts a 1-based, possibly negative `init` to a byte offset.
fn start_offset(len: usize, init: Option<i64>) -> usize {
    match init.unwrap_or(1) {
        i if i > 0 => usize::try_from(i - 1).unwrap_or(usize::MAX).min(len),
        0 => 0,
        i => len.saturating_sub(usize::try_from(i.unsigned_abs()).unwrap_or(usize::MAX)),
    }
}

fn run_match(
    lua: &Lua,
    pattern: &Pattern,
    subject: &mlua::String,
    init: Option<i64>,
) -> mlua::Result<MultiValue> {
    let bytes = subject.as_bytes();
    let offset = start_offset(bytes.len(), init);
    let Some(found) = pattern.matches(&bytes, offset) else {
        return Ok(MultiValue::from_iter([Value::Nil]));
    };
    if found.captures.is_empty() {
        return Ok(MultiValue::from_iter([Value::Integer(found.end as i64 + 1)]));
    }
    found
        .captures
        .iter()
        .map(|capture| match *capture {
            Capture::Substring { start, end } => {
                lua.create_string(&bytes[start..end]).map(Value::String)
            }
            Capture::Position(at) => Ok(Value::Integer(at as i64 + 1)),
        })
        .collect()
}

/// Builds the module table handed to `require "lpeg"`.
pub fn open(lua: &Lua) -> mlua::Result<Value> {
    let module = lua.create_table()?;

    module.set("P", lua.create_function(|_, value: Value| coerce(value))?)?;
    module.set(
        "S",
        lua.create_function(|_, set: mlua::String| {
            Ok(LuaPattern::leaf(Pattern::Set(ByteSet::from_bytes(&set.as_bytes()))))
        })?,
    )?;
    module.set(
        "R",
        lua.create_function(|_, ranges: MultiValue| {
            let mut set = ByteSet::empty();
            for range in ranges {
                let range = match range {
                    Value::String(range) => range,
                    other => {
                        return Err(mlua::Error::RuntimeError(format!(
                            "range must be a string, got {}",
                            other.type_name()
                        )));
                    }
                };
                match range.as_bytes()[..] {
                    [low, high] => set.insert_range(low, high),
                    _ => {
                        return Err(mlua::Error::RuntimeError(
                            "range must have two characters".to_string(),
                        ));
                    }
                }
            }
            Ok(LuaPattern::leaf(Pattern::Set(set)))
        })?,
    )?;
    module.set(
        "C",
        lua.create_function(|_, value: Value| LuaPattern::unary(value, Pattern::Capture))?,
    )?;
    module.set(
        "Cp",
        lua.create_function(|_, ()| Ok(LuaPattern::leaf(Pattern::Position)))?,
    )?;
    module.set(
        "match",
        lua.create_function(
            |lua, (pattern, subject, init): (Value, mlua::String, Option<i64>)| {
                let pattern = coerce(pattern)?;
                run_match(lua, &pattern.pattern, &subject, init)
            },
        )?,
    )?;
    module.set(
        "type",
        lua.create_function(|_, value: Value| {
            let is_pattern = matches!(&value, Value::UserData(ud) if ud.is::<LuaPattern>());
            Ok(is_pattern.then_some("pattern"))
        })?,
    )?;
    module.set("version", lua.create_function(|_, ()| Ok(VERSION))?)?;

    Ok(Value::Table(module))
}
