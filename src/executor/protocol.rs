//! Coordinator protocol
//!
//! One JSON object per line in each direction. Requests are handled strictly
//! in order; a request is only read once the previous run has finished.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::session::WorkerSession;
use crate::models::{ResultRecord, RunOutcome};
use crate::runtime::Runtime;

fn first_attempt() -> u32 {
    1
}

/// Request from the coordinator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    Run {
        filename: String,
        #[serde(default)]
        preloading: bool,
        #[serde(default = "first_attempt")]
        attempt: u32,
    },
    Shutdown,
}

/// Response to the coordinator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ran(ResultRecord),
    RetryRequested { filename: String, attempt: u32 },
    Error { message: String },
}

impl Response {
    pub fn error(error: impl fmt::Display) -> Self {
        Response::Error {
            message: error.to_string(),
        }
    }
}

impl From<RunOutcome> for Response {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Ran(record) => Response::Ran(record),
            RunOutcome::RetryRequested { filename, attempt } => {
                Response::RetryRequested { filename, attempt }
            }
        }
    }
}

/// Serve requests from `input` until EOF or a shutdown request.
///
/// Runs block the calling thread, so this needs the multi-threaded runtime.
pub async fn serve<R, I, O>(session: &mut WorkerSession<R>, input: I, mut output: O) -> Result<()>
where
    R: Runtime,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read request")?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!("Request: {:?}", request);
                match tokio::task::block_in_place(|| session.handle(request)) {
                    Some(response) => response,
                    None => {
                        info!("Shutdown requested after {} runs", session.runs());
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("Invalid request: {}", e);
                Response::error(format!("Invalid request: {e}"))
            }
        };

        let mut payload = serde_json::to_string(&response).context("Failed to encode response")?;
        payload.push('\n');
        output
            .write_all(payload.as_bytes())
            .await
            .context("Failed to write response")?;
        output.flush().await.context("Failed to flush response")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use crate::engine::EngineKind;
    use crate::retry::RetryPattern;
    use crate::runtime::{Invocation, RunOutput, RuntimeError, RuntimeState};
    use crate::worker::Worker;

    /// Fails with a retryable error on the first attempt of every file
    #[derive(Default)]
    struct FlakyRuntime {
        resets: usize,
    }

    impl Runtime for FlakyRuntime {
        fn load(&mut self) -> Result<(), RuntimeError> {
            Ok(())
        }

        fn state(&self) -> RuntimeState {
            RuntimeState::Loaded
        }

        fn run(&mut self, _invocation: &Invocation) -> Result<RunOutput, RuntimeError> {
            let output = if self.resets % 2 == 0 {
                RunOutput {
                    report: "Net::ReadTimeout\n2 examples, 1 failure".to_string(),
                    failed: true,
                    ..Default::default()
                }
            } else {
                RunOutput {
                    report: "2 examples, 0 failures".to_string(),
                    ..Default::default()
                }
            };
            Ok(output)
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn session() -> WorkerSession<FlakyRuntime> {
        let config = WorkerConfig {
            exceptions_to_retry: Some(RetryPattern::new("Net::ReadTimeout").unwrap()),
            max_attempts: 2,
            ..Default::default()
        };
        WorkerSession::start(Worker::new(
            EngineKind::Rspec,
            FlakyRuntime::default(),
            config,
        ))
        .unwrap()
    }

    #[test]
    fn test_request_defaults() {
        let request: Request =
            serde_json::from_str(r#"{"command":"run","filename":"spec/a_spec.rb"}"#).unwrap();
        assert_eq!(
            request,
            Request::Run {
                filename: "spec/a_spec.rb".to_string(),
                preloading: false,
                attempt: 1
            }
        );
    }

    #[test]
    fn test_response_wire_shape() {
        let ran = serde_json::to_value(Response::Ran(ResultRecord::ran(2, 0, false))).unwrap();
        assert_eq!(
            ran,
            serde_json::json!({"status": "ran", "test_count": 2, "failure_count": 0, "failure": false})
        );

        let retry = serde_json::to_value(Response::RetryRequested {
            filename: "spec/a_spec.rb".to_string(),
            attempt: 1,
        })
        .unwrap();
        assert_eq!(
            retry,
            serde_json::json!({"status": "retry_requested", "filename": "spec/a_spec.rb", "attempt": 1})
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_serve_retry_then_success() {
        let mut session = session();
        let input = concat!(
            r#"{"command":"run","filename":"spec/a_spec.rb","attempt":1}"#,
            "\n\n",
            r#"{"command":"run","filename":"spec/a_spec.rb","attempt":2}"#,
            "\n",
            "not json\n",
            r#"{"command":"shutdown"}"#,
            "\n",
            r#"{"command":"run","filename":"spec/ignored_spec.rb"}"#,
            "\n",
        );
        let mut output = Vec::new();

        serve(&mut session, input.as_bytes(), &mut output)
            .await
            .unwrap();

        let responses: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        assert_eq!(
            responses[0],
            Response::RetryRequested {
                filename: "spec/a_spec.rb".to_string(),
                attempt: 1
            }
        );
        assert_eq!(responses[1], Response::Ran(ResultRecord::ran(2, 0, false)));
        assert!(matches!(responses[2], Response::Error { .. }));
        assert_eq!(session.runs(), 2);
        // two runs plus the shutdown clean-up
        assert_eq!(session.worker().runtime().resets, 3);
    }
}
