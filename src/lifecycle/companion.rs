//! Companion process launching.
//!
//! The relay exists to serve one client program (the remailer). It starts
//! that program with the relay configured as its HTTP proxy, hands it the
//! terminal, and lives exactly as long as it does.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("could not determine executable directory: {0}")]
    ExeDir(#[source] io::Error),

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The program launched alongside the relay.
#[derive(Debug, Clone)]
pub struct Companion {
    program: PathBuf,
    args: Vec<OsString>,
    listen_address: String,
}

impl Companion {
    pub fn new(program: PathBuf, args: Vec<OsString>, listen_address: &str) -> Self {
        Self {
            program,
            args,
            listen_address: listen_address.to_string(),
        }
    }

    /// Resolve `program` against the directory holding the running
    /// executable.
    pub fn locate(program: &str) -> Result<PathBuf, CompanionError> {
        let exe = std::env::current_exe().map_err(CompanionError::ExeDir)?;
        let dir = exe.parent().unwrap_or(Path::new("."));
        Ok(resolve(program, dir))
    }

    /// The command that starts the companion, with proxy variables set.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("HTTP_PROXY", format!("http://{}", self.listen_address))
            .env("NO_PROXY", "")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Run the companion to completion.
    pub async fn run(&self) -> Result<ExitStatus, CompanionError> {
        tracing::info!(program = %self.program.display(), args = ?self.args, "Launching companion");

        let status = self
            .command()
            .status()
            .await
            .map_err(|source| CompanionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        tracing::info!(%status, "Companion exited");
        Ok(status)
    }
}

/// Bare program names live next to the relay; anything with a directory
/// component is used as given.
fn resolve(program: &str, exe_dir: &Path) -> PathBuf {
    let path = Path::new(program);
    if path.components().count() > 1 || path.is_absolute() {
        return path.to_path_buf();
    }

    let suffix = std::env::consts::EXE_SUFFIX;
    let name = if suffix.is_empty() || program.ends_with(suffix) {
        program.to_string()
    } else {
        format!("{program}{suffix}")
    };
    exe_dir.join(name)
}

/// Process exit code mirroring the companion's. A companion killed by a
/// signal maps to 1.
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
