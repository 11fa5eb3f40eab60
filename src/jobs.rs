//! Sequential external-process batches.
//!
//! A batch is a FIFO of [`Job`]s run one at a time by a [`BatchDriver`]. The process
//! itself is started through the [`ProcessRunner`] trait so batches can be driven by a
//! fake runner in tests. Tool-specific behaviour (progress parsing, temp-file handling)
//! plugs in through a [`BatchObserver`].
//!
//! A failed job never aborts the batch: it is recorded in its [`JobReport`] and the next
//! job starts.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, error, info, warn};

/// One external process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Human-readable label (usually the input file name)
    pub label: String,
    /// Program to run
    pub program: PathBuf,
    /// Arguments, passed as-is (no shell)
    pub args: Vec<OsString>,
}

impl Job {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The invocation as a single display string
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed(String),
    /// Dropped from the queue by a cancel before it started
    Cancelled,
}

impl JobStatus {
    /// Whether the job has finished, one way or another
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Succeeded => write!(f, "OK"),
            JobStatus::Failed(reason) => write!(f, "ERROR ({})", reason),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Outcome of one job in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub label: String,
    pub status: JobStatus,
    /// Process exit code, when the process ran to completion
    pub exit_code: Option<i32>,
}

/// Starts a job's process and streams its output
pub trait ProcessRunner {
    /// Run `job` to completion, passing every output line to `sink`.
    ///
    /// Returns the exit code (`-1` when the process was killed by a signal). Failing to
    /// start the process is an [`Error::Process`].
    fn run(&mut self, job: &Job, sink: &mut dyn FnMut(&str)) -> Result<i32>;
}

/// [`ProcessRunner`] backed by [`std::process::Command`].
///
/// Stdout and stderr are both captured and merged. Lines are split on `\n` and also on a
/// bare `\r`, which is how ffmpeg-style tools redraw their progress line.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

impl ProcessRunner for CommandRunner {
    fn run(&mut self, job: &Job, sink: &mut dyn FnMut(&str)) -> Result<i32> {
        let program = job.program.display().to_string();
        debug!(command = %job.command_line(), "spawning");

        let mut child = Command::new(&job.program)
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::process(&program, e.to_string()))?;

        let (tx, rx) = mpsc::channel::<String>();
        let mut pumps = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            pumps.push(thread::spawn(move || pump_lines(stdout, tx)));
        }
        if let Some(stderr) = child.stderr.take() {
            let tx = tx.clone();
            pumps.push(thread::spawn(move || pump_lines(stderr, tx)));
        }
        drop(tx);

        for line in rx {
            sink(&line);
        }
        for pump in pumps {
            let _ = pump.join();
        }

        let status = child
            .wait()
            .map_err(|e| Error::process(&program, e.to_string()))?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// Forward `reader` to `tx` as lines split on `\r` and `\n`, skipping empty ones
fn pump_lines(mut reader: impl Read, tx: mpsc::Sender<String>) {
    let mut buf = [0u8; 4096];
    let mut pending = Vec::new();

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        for &byte in &buf[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    if tx.send(line).is_err() {
                        return;
                    }
                }
            } else {
                pending.push(byte);
            }
        }
    }

    if !pending.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
    }
}

/// FIFO of pending jobs plus the one currently running
#[derive(Debug, Default)]
pub struct JobQueue {
    pending: VecDeque<Job>,
    current: Option<Job>,
    total: usize,
    done: usize,
}

impl JobQueue {
    pub fn new(jobs: impl IntoIterator<Item = Job>) -> Self {
        let pending = jobs.into_iter().collect::<VecDeque<_>>();
        Self {
            total: pending.len(),
            pending,
            current: None,
            done: 0,
        }
    }

    /// Add a job to the back of the queue
    pub fn push(&mut self, job: Job) {
        self.total += 1;
        self.pending.push_back(job);
    }

    /// Move the next pending job into the current slot.
    ///
    /// Returns `None` while a job is still current or when the queue is empty.
    pub fn start_next(&mut self) -> Option<&Job> {
        if self.current.is_some() {
            return None;
        }
        self.current = self.pending.pop_front();
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&Job> {
        self.current.as_ref()
    }

    /// Finish the current job and return it
    pub fn complete(&mut self) -> Option<Job> {
        let job = self.current.take()?;
        self.done += 1;
        Some(job)
    }

    /// Drop every pending job, returning them. The current job is kept.
    pub fn clear_pending(&mut self) -> Vec<Job> {
        self.pending.drain(..).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// No job pending or running
    pub fn is_finished(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// Completed jobs as a percentage of all jobs queued (0 for an empty queue)
    pub fn progress(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.done * 100) / self.total).min(100) as u8
    }
}

/// Hooks a tool attaches to a batch
pub trait BatchObserver {
    /// Called before the job's process starts. An error fails the job without running it.
    fn job_started(&mut self, _job: &Job) -> Result<()> {
        Ok(())
    }

    /// One line of process output
    fn output(&mut self, _job: &Job, _line: &str) {}

    /// Decide the final status from the process outcome
    fn job_finished(&mut self, _job: &Job, outcome: &Result<i32>) -> JobStatus {
        default_status(outcome)
    }

    /// Overall batch progress after each job
    fn batch_progress(&mut self, _percent: u8) {}
}

/// Observer that ignores everything
impl BatchObserver for () {}

/// Exit code 0 succeeds; anything else fails with the code or the launch error
pub fn default_status(outcome: &Result<i32>) -> JobStatus {
    match outcome {
        Ok(0) => JobStatus::Succeeded,
        Ok(code) => JobStatus::Failed(format!("code {}", code)),
        Err(e) => JobStatus::Failed(e.to_string()),
    }
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLING: u8 = 2;

/// Runs batches one at a time.
///
/// Share it behind an `Arc` to cancel from another thread while `run` is in progress.
#[derive(Debug, Default)]
pub struct BatchDriver {
    /// `IDLE`, `RUNNING` or `CANCELLING`
    state: AtomicU8,
}

/// Returns the driver to idle when a batch ends, including on panic
struct BusyGuard<'a>(&'a AtomicU8);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(IDLE, Ordering::Release);
    }
}

impl BatchDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a batch is running
    pub fn is_busy(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    /// Drop the jobs that have not started yet; the running job finishes normally.
    ///
    /// Does nothing while no batch is running.
    pub fn cancel(&self) {
        if self
            .state
            .compare_exchange(RUNNING, CANCELLING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("cancelling pending jobs");
        }
    }

    /// Run `jobs` in order, returning one report per job.
    ///
    /// Fails with [`Error::Busy`] if another batch is running on this driver.
    pub fn run(
        &self,
        jobs: impl IntoIterator<Item = Job>,
        runner: &mut dyn ProcessRunner,
        observer: &mut dyn BatchObserver,
    ) -> Result<Vec<JobReport>> {
        if self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        let _guard = BusyGuard(&self.state);

        let mut queue = JobQueue::new(jobs);
        let mut reports = Vec::new();
        info!(jobs = queue.pending_len(), "starting batch");

        loop {
            if self
                .state
                .compare_exchange(CANCELLING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                for job in queue.clear_pending() {
                    reports.push(JobReport {
                        label: job.label,
                        status: JobStatus::Cancelled,
                        exit_code: None,
                    });
                }
            }

            let Some(job) = queue.start_next().cloned() else {
                break;
            };

            let (status, exit_code) = match observer.job_started(&job) {
                Err(e) => {
                    warn!(job = %job.label, error = %e, "job not started");
                    (JobStatus::Failed(e.to_string()), None)
                }
                Ok(()) => {
                    debug!(job = %job.label, "job running");
                    let outcome = runner.run(&job, &mut |line: &str| observer.output(&job, line));
                    let status = observer.job_finished(&job, &outcome);
                    (status, outcome.ok())
                }
            };

            match &status {
                JobStatus::Succeeded => info!(job = %job.label, "job succeeded"),
                other => error!(job = %job.label, status = %other, "job failed"),
            }

            queue.complete();
            observer.batch_progress(queue.progress());
            reports.push(JobReport {
                label: job.label,
                status,
                exit_code,
            });
        }

        let failed = reports.iter().filter(|r| !r.status.is_success()).count();
        info!(total = reports.len(), failed, "batch finished");
        Ok(reports)
    }
}
