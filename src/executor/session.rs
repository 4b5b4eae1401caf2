//! Worker session
//!
//! Owns a worker for the life of the process: loads the environment, warms
//! the runtime with the engine's minimal file, then serves run requests.

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::protocol::{Request, Response};
use crate::models::RunOutcome;
use crate::runtime::Runtime;
use crate::worker::{Worker, WorkerError};

/// A loaded worker ready to take run requests
pub struct WorkerSession<R: Runtime> {
    worker: Worker<R>,
    runs: u64,
}

impl<R: Runtime> WorkerSession<R> {
    /// Load the environment. Failure is fatal: a broken runtime cannot run
    /// anything.
    pub fn start(mut worker: Worker<R>) -> Result<Self> {
        worker
            .load_environment()
            .with_context(|| format!("Failed to start {} worker", worker.kind()))?;
        Ok(Self { worker, runs: 0 })
    }

    pub fn worker(&self) -> &Worker<R> {
        &self.worker
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Warm the runtime by running the engine's minimal file
    pub fn preload(&mut self) -> Result<RunOutcome> {
        let engine = self.worker.kind().engine();
        let dir = tempfile::tempdir().context("Failed to create preload directory")?;
        let path = dir.path().join(engine.preload_file_name());
        std::fs::write(&path, engine.minimal_file())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let outcome = self
            .worker
            .run_file(&path.to_string_lossy(), true, 1)
            .context("Preload run failed")?;

        match outcome.record() {
            Some(record) if record.failure => {
                warn!("Preload of {} reported a failure: {}", engine.name(), record)
            }
            _ => info!("Preloaded {} runtime", engine.name()),
        }
        Ok(outcome)
    }

    /// Run one file for the coordinator
    pub fn run(&mut self, filename: &str, preloading: bool, attempt: u32) -> Response {
        if !self.worker.filename_match(filename) {
            return Response::error(WorkerError::UnsupportedFile {
                engine: self.worker.kind().name(),
                filename: filename.to_string(),
            });
        }

        self.runs += 1;
        match self.worker.run_file(filename, preloading, attempt) {
            Ok(outcome) => Response::from(outcome),
            Err(e) => Response::error(e),
        }
    }

    /// Handle one decoded request; `None` asks the caller to stop serving
    pub fn handle(&mut self, request: Request) -> Option<Response> {
        match request {
            Request::Run {
                filename,
                preloading,
                attempt,
            } => Some(self.run(&filename, preloading, attempt)),
            Request::Shutdown => {
                self.worker.clean_up();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::engine::EngineKind;
    use crate::models::ResultRecord;
    use crate::runtime::{Invocation, RunOutput, RuntimeError, RuntimeState};

    #[derive(Default)]
    struct EchoRuntime {
        state: RuntimeState,
        fail_load: bool,
        targets: Vec<String>,
    }

    impl Runtime for EchoRuntime {
        fn load(&mut self) -> Result<(), RuntimeError> {
            if self.fail_load {
                return Err(RuntimeError::LoadFailed {
                    engine: "rspec",
                    reason: "cannot load such file -- rspec".to_string(),
                });
            }
            self.state = RuntimeState::Loaded;
            Ok(())
        }

        fn state(&self) -> RuntimeState {
            self.state
        }

        fn run(&mut self, invocation: &Invocation) -> Result<RunOutput, RuntimeError> {
            self.targets.push(invocation.target.clone());
            Ok(RunOutput {
                report: "1 example, 0 failures".to_string(),
                ..Default::default()
            })
        }

        fn reset(&mut self) {}
    }

    fn worker(runtime: EchoRuntime) -> Worker<EchoRuntime> {
        Worker::new(EngineKind::Rspec, runtime, WorkerConfig::default())
    }

    #[test]
    fn test_start_fails_when_environment_cannot_load() {
        let runtime = EchoRuntime {
            fail_load: true,
            ..Default::default()
        };
        assert!(WorkerSession::start(worker(runtime)).is_err());
    }

    #[test]
    fn test_preload_runs_minimal_file() {
        let mut session = WorkerSession::start(worker(EchoRuntime::default())).unwrap();
        let outcome = session.preload().unwrap();

        assert_eq!(outcome, RunOutcome::Ran(ResultRecord::ran(1, 0, false)));
        let targets = &session.worker().runtime().targets;
        assert_eq!(targets.len(), 1);
        assert!(targets[0].ends_with("nitra_preload_spec.rb"));
        assert_eq!(session.runs(), 0);
    }

    #[test]
    fn test_rejects_files_for_other_engines() {
        let mut session = WorkerSession::start(worker(EchoRuntime::default())).unwrap();
        let response = session.run("features/a.feature", false, 1);
        assert!(matches!(response, Response::Error { .. }));
        assert!(session.worker().runtime().targets.is_empty());
    }

    #[test]
    fn test_handle_run_and_shutdown() {
        let mut session = WorkerSession::start(worker(EchoRuntime::default())).unwrap();
        let response = session.handle(Request::Run {
            filename: "spec/a_spec.rb".to_string(),
            preloading: false,
            attempt: 1,
        });
        assert_eq!(response, Some(Response::Ran(ResultRecord::ran(1, 0, false))));
        assert_eq!(session.runs(), 1);
        assert_eq!(session.handle(Request::Shutdown), None);
    }
}
