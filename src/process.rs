//! Running the native engines.
//!
//! Each stage spawns one executable in the operation directory, writes the
//! protocol to its standard input and streams its output into the stage log
//! as it arrives. A shared cancel flag stops a running stage. Failures of the
//! runner itself never escape as errors: they end the stage as
//! [`StageStatus::Failed`].

use crate::config::ExecutableConfig;
use crate::paths::{OperationPaths, PathResolver};
use crate::protocol::ProtocolWriter;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Microstructure,
    AggregatePacking,
    /// Statistics pass over the microstructure image
    MicrostructureStatistics,
    /// Statistics pass over the packed aggregate image
    AggregateStatistics,
}

impl Stage {
    /// Base name of the stage's protocol and log files
    pub fn file_stem(self) -> &'static str {
        match self {
            Stage::Microstructure => "genmic",
            Stage::AggregatePacking => "genaggpack",
            Stage::MicrostructureStatistics => "stat3d",
            Stage::AggregateStatistics => "stat3d_aggregate",
        }
    }

    pub fn executable(self, executables: &ExecutableConfig) -> &str {
        match self {
            Stage::Microstructure => &executables.genmic,
            Stage::AggregatePacking => &executables.genaggpack,
            Stage::MicrostructureStatistics | Stage::AggregateStatistics => &executables.stat3d,
        }
    }

    /// The statistics pass that follows an image-producing stage.
    pub fn statistics(self) -> Option<Stage> {
        match self {
            Stage::Microstructure => Some(Stage::MicrostructureStatistics),
            Stage::AggregatePacking => Some(Stage::AggregateStatistics),
            Stage::MicrostructureStatistics | Stage::AggregateStatistics => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write the protocol: {0}")]
    Input(io::Error),

    #[error("failed to read engine output: {0}")]
    Output(io::Error),

    #[error("failed to wait for the engine: {0}")]
    Wait(io::Error),

    #[error("{0} stream was not captured")]
    MissingPipe(&'static str),
}

#[derive(Debug)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    pub exit_code: Option<i32>,
    pub log_file: PathBuf,
    pub error: Option<ExecutionError>,
}

pub trait ProcessRunner {
    fn run(&self, stage: Stage, stdin_text: &str, cancel: &AtomicBool) -> StageOutcome;

    /// Run a stage and, when it finished and produced `output`, its
    /// statistics pass over that image.
    fn run_with_statistics(
        &self,
        stage: Stage,
        stdin_text: &str,
        output: &Path,
        cancel: &AtomicBool,
    ) -> Vec<StageOutcome> {
        let primary = self.run(stage, stdin_text, cancel);
        let statistics = stage
            .statistics()
            .filter(|_| primary.status == StageStatus::Finished && output.exists());
        let mut outcomes = vec![primary];
        match statistics {
            Some(statistics) => {
                outcomes.push(self.run(statistics, &statistics_protocol(output), cancel));
            }
            None => debug!("no statistics pass after {:?}", stage),
        }
        outcomes
    }
}

/// Runs the engines as child processes of this one.
pub struct ChildProcessRunner {
    executables: ExecutableConfig,
    paths: OperationPaths,
    statuses: Mutex<HashMap<Stage, StageStatus>>,
}

impl ChildProcessRunner {
    pub fn new(executables: ExecutableConfig, paths: OperationPaths) -> Self {
        Self {
            executables,
            paths,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    /// Last known status of a stage; stages never run are `Queued`.
    pub fn status(&self, stage: Stage) -> StageStatus {
        self.lock_statuses().get(&stage).copied().unwrap_or(StageStatus::Queued)
    }

    fn lock_statuses(&self) -> std::sync::MutexGuard<'_, HashMap<Stage, StageStatus>> {
        self.statuses.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_status(&self, stage: Stage, status: StageStatus) {
        self.lock_statuses().insert(stage, status);
    }

    fn execute(
        &self,
        stage: Stage,
        stdin_text: &str,
        cancel: &AtomicBool,
        log_path: &Path,
    ) -> Result<(StageStatus, Option<i32>), ExecutionError> {
        let log = File::create(log_path).map_err(|source| ExecutionError::Log {
            path: log_path.to_path_buf(),
            source,
        })?;
        let stderr_log = log.try_clone().map_err(|source| ExecutionError::Log {
            path: log_path.to_path_buf(),
            source,
        })?;

        let program = stage.executable(&self.executables);
        let mut child = Command::new(program)
            .current_dir(self.paths.operation_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_log))
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                program: program.to_string(),
                source,
            })?;
        self.set_status(stage, StageStatus::Running);
        info!("{} started (pid {})", program, child.id());

        let (mut stdin, stdout) = take_pipes(&mut child)?;

        let input = stdin_text.to_string();
        // dropping stdin at the end closes the pipe
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));
        let reader = thread::spawn(move || stream_lines(stdout, log));

        let waited = loop {
            if cancel.load(Ordering::SeqCst) {
                kill(&mut child);
                break Ok(None);
            }
            match child.try_wait() {
                Ok(Some(status)) => break Ok(Some(status)),
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    kill(&mut child);
                    break Err(ExecutionError::Wait(e));
                }
            }
        };

        let written = writer.join().unwrap_or(Ok(()));
        let streamed = reader.join().unwrap_or(Ok(()));

        let Some(status) = waited? else {
            return Ok((StageStatus::Cancelled, None));
        };
        // an engine may exit without reading all of its input
        if let Err(e) = written {
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(ExecutionError::Input(e));
            }
        }
        streamed.map_err(ExecutionError::Output)?;

        let result = if status.success() {
            StageStatus::Finished
        } else {
            StageStatus::Failed
        };
        Ok((result, status.code()))
    }
}

impl ProcessRunner for ChildProcessRunner {
    fn run(&self, stage: Stage, stdin_text: &str, cancel: &AtomicBool) -> StageOutcome {
        let log_file = self.paths.log_file(stage);
        if cancel.load(Ordering::SeqCst) {
            self.set_status(stage, StageStatus::Cancelled);
            return StageOutcome {
                stage,
                status: StageStatus::Cancelled,
                exit_code: None,
                log_file,
                error: None,
            };
        }

        let (status, exit_code, error) = match self.execute(stage, stdin_text, cancel, &log_file) {
            Ok((status, exit_code)) => (status, exit_code, None),
            Err(e) => {
                error!("{:?} stage failed: {}", stage, e);
                (StageStatus::Failed, None, Some(e))
            }
        };
        match status {
            StageStatus::Finished => info!("{:?} stage finished", stage),
            StageStatus::Cancelled => warn!("{:?} stage cancelled", stage),
            StageStatus::Failed if error.is_none() => {
                warn!("{:?} stage exited with {:?}", stage, exit_code)
            }
            _ => {}
        }
        self.set_status(stage, status);
        StageOutcome {
            stage,
            status,
            exit_code,
            log_file,
            error,
        }
    }
}

/// Protocol of the statistics pass: the image to analyse.
pub fn statistics_protocol(image: &Path) -> String {
    let mut w = ProtocolWriter::new();
    w.path(image);
    w.finish()
}

fn stream_lines(stdout: impl io::Read, mut log: File) -> io::Result<()> {
    for line in BufReader::new(stdout).lines() {
        writeln!(log, "{}", line?)?;
        log.flush()?;
    }
    Ok(())
}

/// Take the child's stdin and stdout; a child missing either is killed.
fn take_pipes(child: &mut Child) -> Result<(ChildStdin, ChildStdout), ExecutionError> {
    match (child.stdin.take(), child.stdout.take()) {
        (Some(stdin), Some(stdout)) => Ok((stdin, stdout)),
        (stdin, _) => {
            kill(child);
            let missing = if stdin.is_none() { "stdin" } else { "stdout" };
            Err(ExecutionError::MissingPipe(missing))
        }
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("failed to kill engine process: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap engine process: {}", e);
    }
}

/// Create the operation directory before the first stage writes into it.
pub fn prepare_operation_dir(paths: &OperationPaths) -> io::Result<()> {
    fs::create_dir_all(paths.operation_dir())
}
