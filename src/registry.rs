//! Pre-load registry installation.
//!
//! Lua's `require` consults the `_PRELOAD` registry table (visible to guests
//! as `package.preload`) before searching the filesystem. Native modules are
//! made available by placing a loader there ahead of any guest code.

use indexmap::IndexMap;
use log::debug;
use mlua::{Function, Lua, MultiValue, Table, Value};

use crate::{
    diagnostics::{HostError, Result},
    lpeg,
};

pub const PRELOAD_TABLE: &str = "_PRELOAD";

/// Builds a native module's value inside the given interpreter.
pub type ModuleConstructor = fn(&Lua) -> mlua::Result<Value>;

/// A source of native modules, looked up by the name guests `require`.
pub trait ModuleProvider {
    fn resolve(&self, name: &str) -> Option<ModuleConstructor>;
}

/// The native modules compiled into the host.
pub struct NativeExtensions {
    modules: IndexMap<&'static str, ModuleConstructor>,
}

impl NativeExtensions {
    pub fn new() -> Self {
        let mut modules: IndexMap<&'static str, ModuleConstructor> = IndexMap::new();
        modules.insert(lpeg::MODULE_NAME, lpeg::open);
        Self { modules }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.keys().copied()
    }
}

impl Default for NativeExtensions {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleProvider for NativeExtensions {
    fn resolve(&self, name: &str) -> Option<ModuleConstructor> {
        self.modules.get(name).copied()
    }
}

/// Returns the pre-load table, creating it if the package library has not.
pub fn preload_table(lua: &Lua) -> Result<Table> {
    if let Some(table) = lua.named_registry_value::<Option<Table>>(PRELOAD_TABLE)? {
        return Ok(table);
    }
    let table = lua.create_table()?;
    lua.set_named_registry_value(PRELOAD_TABLE, table.clone())?;
    Ok(table)
}

/// Registers a Lua-callable loader under `name`. Fails if the name is taken.
pub fn register_loader(lua: &Lua, name: &str, loader: Function) -> Result<()> {
    let preload = preload_table(lua)?;
    if !matches!(preload.raw_get::<Value>(name)?, Value::Nil) {
        return Err(HostError::DuplicateModule(name.to_string()));
    }
    preload.raw_set(name, loader)?;
    debug!("registered native module `{name}`");
    Ok(())
}

pub fn register(lua: &Lua, name: &str, constructor: ModuleConstructor) -> Result<()> {
    // `require` passes the module name and loader data; neither is needed.
    let loader = lua.create_function(move |lua, _: MultiValue| constructor(lua))?;
    register_loader(lua, name, loader)
}

/// Resolves `name` through `provider` and registers what it yields.
pub fn install(lua: &Lua, provider: &dyn ModuleProvider, name: &str) -> Result<()> {
    let constructor = provider
        .resolve(name)
        .ok_or_else(|| HostError::UnknownModule(name.to_string()))?;
    register(lua, name, constructor)
}
