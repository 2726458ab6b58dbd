//! Host process for the Shine compiler. Boots a Lua interpreter, preloads
//! the native `lpeg` extension, exports the command line as `arg`, then
//! loads the `shinec` guest module and calls its `start` operation.

pub mod args;
pub mod bootstrap;
pub mod config;
pub mod diagnostics;
pub mod lpeg;
pub mod registry;
pub mod runtime;
pub mod traceback;

pub use args::ArgumentVector;
pub use bootstrap::{Bootstrap, Completion, GuestModule, Stage};
pub use config::HostConfig;
pub use diagnostics::{HostError, LoadFailure, StartFault};
pub use runtime::Interpreter;
