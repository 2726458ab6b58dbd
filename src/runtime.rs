use std::{
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
};

use log::{debug, trace};
use mlua::{Lua, LuaOptions, StdLib, Table};

use crate::diagnostics::{HostError, Result};

/// The process's single Lua state.
///
/// Owning the handle is owning the interpreter: dropping it closes the state,
/// so every path out of the scope that created it tears it down exactly once.
pub struct Interpreter {
    lua: Lua,
}

impl Interpreter {
    /// Allocates a bare state with no libraries loaded.
    pub fn create() -> Result<Self> {
        // mlua panics if the allocator cannot produce a state.
        // SAFETY: the state starts without the `debug` and `ffi` libraries.
        // They are only loaded afterwards, by `install_standard_library`, and
        // guest code is trusted with them the same way `luajit` trusts scripts.
        let created = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            Lua::unsafe_new_with(StdLib::NONE, LuaOptions::default())
        }));

        let lua = created.map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "state allocation failed".to_string());
            HostError::CreateInterpreter(reason)
        })?;
        debug!("created interpreter");
        Ok(Self { lua })
    }

    pub fn install_standard_library(&self, libraries: StdLib) -> Result<()> {
        self.lua.load_std_libs(libraries)?;
        debug!("installed standard libraries ({})", version(&self.lua));
        Ok(())
    }

    /// Puts `dirs` ahead of the default guest module search path.
    pub fn prepend_module_dirs(&self, dirs: &[PathBuf]) -> Result<()> {
        if dirs.is_empty() {
            return Ok(());
        }
        let package: Table = self.lua.globals().get("package")?;
        let current: String = package.get("path")?;
        let mut templates: Vec<String> = dirs
            .iter()
            .flat_map(|dir| {
                let dir = dir.to_string_lossy();
                let dir = dir.trim_end_matches(['/', '\\']);
                [format!("{dir}/?.lua"), format!("{dir}/?/init.lua")]
            })
            .collect();
        templates.push(current);
        let path = templates.join(";");
        debug!("package.path = {path}");
        package.set("path", path)?;
        Ok(())
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        trace!("tearing down interpreter");
    }
}

fn version(lua: &Lua) -> String {
    lua.globals()
        .get::<String>("_VERSION")
        .unwrap_or_else(|_| "Lua".to_string())
}
