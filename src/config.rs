use std::{env, path::PathBuf};

use mlua::StdLib;

/// Environment variable holding the log filter (`env_logger` syntax).
pub const LOG_ENV: &str = "SHINEC_LOG";
/// Environment variable listing extra directories searched for guest modules.
pub const PATH_ENV: &str = "SHINEC_PATH";

const DEFAULT_LOG_FILTER: &str = "warn";

/// Host-side settings. The command line is never consulted here: every
/// argument belongs to the guest.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub module_dirs: Vec<PathBuf>,
    pub libraries: StdLib,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_dirs: Vec::new(),
            libraries: StdLib::ALL,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        let module_dirs = env::var_os(PATH_ENV)
            .map(|paths| {
                env::split_paths(&paths)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            module_dirs,
            ..Self::default()
        }
    }

    pub fn with_module_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.module_dirs.push(dir.into());
        self
    }

    pub fn with_libraries(mut self, libraries: StdLib) -> Self {
        self.libraries = libraries;
        self
    }
}

pub fn init_logging() {
    let env = env_logger::Env::new().filter_or(LOG_ENV, DEFAULT_LOG_FILTER);
    // A logger may already be installed when embedded in tests.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
