use std::ffi::{OsStr, OsString};

use mlua::Lua;

use crate::diagnostics::Result;

/// Name of the guest-visible global holding the arguments.
pub const ARG_GLOBAL: &str = "arg";
/// Occupies index 0, where a standalone interpreter would put the script.
pub const HOST_SENTINEL: &str = "shinec";

/// The host's arguments as the guest sees them: the sentinel first, then
/// every argument after the program path, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentVector {
    args: Vec<OsString>,
}

impl ArgumentVector {
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of entries including the sentinel.
    pub fn len(&self) -> usize {
        self.args.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Option<&OsStr> {
        match index {
            0 => Some(OsStr::new(HOST_SENTINEL)),
            n => self.args.get(n - 1).map(OsString::as_os_str),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OsStr> {
        std::iter::once(OsStr::new(HOST_SENTINEL)).chain(self.args.iter().map(OsString::as_os_str))
    }

    /// Publishes the vector as the `arg` global.
    pub fn export(&self, lua: &Lua) -> Result<()> {
        let table = lua.create_table_with_capacity(self.args.len(), 1)?;
        for (index, arg) in self.iter().enumerate() {
            table.raw_set(index, lua.create_string(arg.as_encoded_bytes())?)?;
        }
        lua.globals().set(ARG_GLOBAL, table)?;
        Ok(())
    }
}
