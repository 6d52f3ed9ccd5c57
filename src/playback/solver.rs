use crate::playback::PlaybackError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Running,
    Exited { code: Option<i32> },
}

/// The narrow view of the external solver process that playback needs.
pub trait SolverHandle: Send {
    fn status(&mut self) -> SolverStatus;

    /// Requests termination. Safe to call on a process that already exited.
    fn kill(&mut self);

    /// What the solver has written to its diagnostic stream so far.
    fn diagnostics(&self) -> String;

    fn is_alive(&mut self) -> bool {
        self.status() == SolverStatus::Running
    }
}

/// Arguments agreed with the solver before it starts.
#[derive(Debug, Clone)]
pub struct SolverCommand {
    pub program: PathBuf,
    pub script: Option<PathBuf>,
    pub params_path: PathBuf,
    pub out_path: PathBuf,
    pub levels_dir: PathBuf,
}

impl SolverCommand {
    pub fn args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(script) = &self.script {
            args.push(script.clone().into_os_string());
        }
        args.push("--params-path".into());
        args.push(self.params_path.clone().into_os_string());
        args.push("--out-path".into());
        args.push(self.out_path.clone().into_os_string());
        args.push("--levels-path".into());
        args.push(self.levels_dir.clone().into_os_string());
        args
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.args());
        command
    }
}

/// A running solver spawned through tokio.
pub struct SolverProcess {
    child: Child,
    diagnostics: Arc<Mutex<String>>,
}

impl SolverProcess {
    /// Removes output left over from an earlier run, then spawns the solver with its stderr
    /// captured.
    pub async fn launch(command: &SolverCommand) -> Result<SolverProcess, PlaybackError> {
        match tokio::fs::remove_file(&command.out_path).await {
            Ok(()) => debug!(path = %command.out_path.display(), "removed stale solver output"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(PlaybackError::Launch(err)),
        }

        info!(program = %command.program.display(), args = ?command.args(), "starting solver");
        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(PlaybackError::Launch)?;

        let diagnostics = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let sink = Arc::clone(&diagnostics);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "solver", "{}", line);
                    if let Ok(mut buffer) = sink.lock() {
                        buffer.push_str(&line);
                        buffer.push('\n');
                    }
                }
            });
        }

        Ok(SolverProcess { child, diagnostics })
    }
}

impl SolverHandle for SolverProcess {
    fn status(&mut self) -> SolverStatus {
        match self.child.try_wait() {
            Ok(None) => SolverStatus::Running,
            Ok(Some(status)) => SolverStatus::Exited {
                code: status.code(),
            },
            Err(err) => {
                warn!("could not query solver status: {}", err);
                SolverStatus::Exited { code: None }
            }
        }
    }

    fn kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            debug!("solver kill: {}", err);
        }
    }

    fn diagnostics(&self) -> String {
        self.diagnostics
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }
}
