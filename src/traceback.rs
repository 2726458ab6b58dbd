//! Message handler for the protected guest load.

use mlua::{Function, Lua, Value};

/// Frames `debug.traceback` skips: itself and this handler.
pub const TRACEBACK_LEVEL: i64 = 2;

/// Appends `debug.traceback` output to `message` when the debug library is
/// reachable. Any lookup or call failure yields `message` unchanged.
pub fn enrich(lua: &Lua, message: Value) -> Value {
    let Ok(Value::Table(debug)) = lua.globals().get::<Value>("debug") else {
        return message;
    };
    let Ok(Value::Function(traceback)) = debug.get::<Value>("traceback") else {
        return message;
    };
    traceback
        .call::<Value>((message.clone(), TRACEBACK_LEVEL))
        .unwrap_or(message)
}

/// Wraps [`enrich`] as a Lua function suitable for `xpcall`. It never raises.
pub fn handler(lua: &Lua) -> mlua::Result<Function> {
    lua.create_function(|lua, message: Value| Ok(enrich(lua, message)))
}
