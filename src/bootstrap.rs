//! The start-up sequence: bring the interpreter up, load the top-level guest
//! module under protection, then hand control to its `start` operation.

use log::{debug, info};
use mlua::{Function, MultiValue, Value};

use crate::{
    args::ArgumentVector,
    config::HostConfig,
    diagnostics::{LoadFailure, Result, StartFault, type_name},
    registry::{self, NativeExtensions},
    runtime::Interpreter,
    traceback,
};

/// The only module the host ever requests.
pub const ENTRY_MODULE: &str = "shinec";
/// Field of the entry module invoked once it has loaded.
pub const ENTRY_OPERATION: &str = "start";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Load,
    Dispatch,
    Done,
    Failed,
}

/// How a run ended, when it ended without a host error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Done,
    Failed(LoadFailure),
}

/// Called with a load failure while the interpreter is still open.
pub type FailureReporter = Box<dyn FnMut(&LoadFailure)>;

pub struct Bootstrap {
    config: HostConfig,
    extensions: NativeExtensions,
    reporter: Option<FailureReporter>,
    stage: Stage,
}

impl Bootstrap {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            extensions: NativeExtensions::new(),
            reporter: None,
            stage: Stage::Init,
        }
    }

    /// Reports a load failure before teardown, so the message precedes
    /// anything the guest's finalizers print while the interpreter closes.
    pub fn with_failure_reporter(mut self, reporter: impl FnMut(&LoadFailure) + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Runs the whole sequence. The interpreter lives only inside this call,
    /// so it is closed on every way out, including a faulting `start`.
    /// A fault in `start` leaves the stage at [`Stage::Failed`] and is
    /// returned as [`crate::HostError::Start`].
    pub fn run(&mut self, args: ArgumentVector) -> Result<Completion> {
        self.stage = Stage::Init;
        let interpreter = self.init(&args)?;

        self.advance(Stage::Load);
        let module = match load(&interpreter, ENTRY_MODULE) {
            Ok(module) => module,
            Err(failure) => {
                if let Some(report) = self.reporter.as_mut() {
                    report(&failure);
                }
                self.advance(Stage::Failed);
                return Ok(Completion::Failed(failure));
            }
        };

        self.advance(Stage::Dispatch);
        if let Err(fault) = module.start() {
            self.advance(Stage::Failed);
            return Err(fault.into());
        }

        self.advance(Stage::Done);
        Ok(Completion::Done)
    }

    fn init(&self, args: &ArgumentVector) -> Result<Interpreter> {
        let interpreter = Interpreter::create()?;
        interpreter.install_standard_library(self.config.libraries)?;
        interpreter.prepend_module_dirs(&self.config.module_dirs)?;
        for name in self.extensions.names() {
            registry::install(interpreter.lua(), &self.extensions, name)?;
        }
        args.export(interpreter.lua())?;
        Ok(interpreter)
    }

    fn advance(&mut self, stage: Stage) {
        debug!("bootstrap {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}

/// Requires `name` through `xpcall`, with the traceback handler attached.
pub fn load(
    interpreter: &Interpreter,
    name: &str,
) -> std::result::Result<GuestModule, LoadFailure> {
    let lua = interpreter.lua();
    let attempt = || -> mlua::Result<std::result::Result<Value, Value>> {
        let globals = lua.globals();
        let xpcall: Function = globals.get("xpcall")?;
        let require: Value = globals.get("require")?;
        let handler = traceback::handler(lua)?;
        let mut results: MultiValue = xpcall.call((require, handler, name))?;
        let ok = matches!(results.pop_front(), Some(Value::Boolean(true)));
        let value = results.pop_front().unwrap_or(Value::Nil);
        Ok(if ok { Ok(value) } else { Err(value) })
    };

    match attempt() {
        Ok(Ok(value)) => {
            info!("loaded guest module `{name}`");
            Ok(GuestModule { value })
        }
        Ok(Err(error)) => Err(LoadFailure::from_value(&error)),
        Err(err) => Err(LoadFailure::new(err.to_string())),
    }
}

/// The value `require` returned for the entry module.
pub struct GuestModule {
    value: Value,
}

impl GuestModule {
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Hands control to the guest. Nothing here is protected on the guest's
    /// behalf: a missing or failing `start` comes back as a [`StartFault`]
    /// carrying the interpreter's own message, for the caller to let escape.
    pub fn start(self) -> std::result::Result<(), StartFault> {
        let entry = match &self.value {
            Value::Table(module) => module.get::<Value>(ENTRY_OPERATION)?,
            other => {
                return Err(StartFault(mlua::Error::RuntimeError(format!(
                    "attempt to index a {} value (module '{ENTRY_MODULE}')",
                    type_name(other)
                ))));
            }
        };
        match entry {
            Value::Function(start) => {
                debug!("handing off to `{ENTRY_OPERATION}`");
                start.call::<()>(())?;
                Ok(())
            }
            other => Err(StartFault(mlua::Error::RuntimeError(format!(
                "attempt to call a {} value (field '{ENTRY_OPERATION}')",
                type_name(&other)
            )))),
        }
    }
}
