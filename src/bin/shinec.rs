use std::{env, process::ExitCode};

use shinec::{ArgumentVector, Bootstrap, Completion, HostConfig, HostError, StartFault, config};

/// A fault escaping the guest's `start` is returned from `main` as-is, so the
/// Rust runtime reports it and exits with a failure status.
fn main() -> Result<ExitCode, StartFault> {
    config::init_logging();
    let args = ArgumentVector::from_args(env::args_os().skip(1));
    let mut bootstrap = Bootstrap::new(HostConfig::from_env())
        .with_failure_reporter(|failure| eprintln!("Error: {failure}"));
    match bootstrap.run(args) {
        Ok(Completion::Done) => Ok(ExitCode::SUCCESS),
        Ok(Completion::Failed(_)) => Ok(ExitCode::FAILURE),
        Err(HostError::Start(fault)) => Err(fault),
        Err(err) => {
            eprintln!("error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
