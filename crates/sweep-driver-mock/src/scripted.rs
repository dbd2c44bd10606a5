//! Scripted transport for adapter-level tests.

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sweep_core::transport::{ResourceClass, Transport, TransportError};

enum Step {
    /// Expect a query matching this command; reply with the response.
    Query {
        command: String,
        response: String,
    },
    /// Expect a fire-and-forget write matching this command.
    Write {
        command: String,
    },
    /// Fail the next call with a timeout, regardless of command.
    Fault,
}

/// Replays an expected command/response script in order.
///
/// A mismatch between the adapter's command and the scripted expectation
/// surfaces as an I/O fault carrying both strings, so the test failure
/// message names the divergence. Every sent command is also logged for
/// post-hoc assertions.
pub struct ScriptedTransport {
    class: ResourceClass,
    resource: String,
    script: Mutex<VecDeque<Step>>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(class: ResourceClass, resource: &str) -> Self {
        Self {
            class,
            resource: resource.to_string(),
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Script a query and its response.
    pub fn expect_query(self, command: &str, response: &str) -> Self {
        self.push(Step::Query {
            command: command.to_string(),
            response: response.to_string(),
        });
        self
    }

    /// Script a fire-and-forget write.
    pub fn expect_write(self, command: &str) -> Self {
        self.push(Step::Write {
            command: command.to_string(),
        });
        self
    }

    /// Script a transport fault on the next call.
    pub fn expect_fault(self) -> Self {
        self.push(Step::Fault);
        self
    }

    fn push(&self, step: Step) {
        // Builder runs before the transport is shared; blocking_lock is not
        // available on all runtimes, so use try_lock which cannot fail here.
        if let Ok(mut script) = self.script.try_lock() {
            script.push_back(step);
        }
    }

    /// Every command the adapter sent, in order.
    pub async fn sent_commands(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    /// Number of scripted steps not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }

    fn mismatch(expected: &str, got: &str) -> TransportError {
        TransportError::Io(io::Error::other(format!(
            "scripted transport expected {:?}, adapter sent {:?}",
            expected, got
        )))
    }

    fn exhausted(got: &str) -> TransportError {
        TransportError::Io(io::Error::other(format!(
            "scripted transport exhausted, adapter sent {:?}",
            got
        )))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn query(&self, command: &str) -> Result<String, TransportError> {
        self.sent.lock().await.push(command.to_string());
        match self.script.lock().await.pop_front() {
            Some(Step::Query {
                command: expected,
                response,
            }) => {
                if expected == command {
                    Ok(response)
                } else {
                    Err(Self::mismatch(&expected, command))
                }
            }
            Some(Step::Write { command: expected }) => Err(Self::mismatch(&expected, command)),
            Some(Step::Fault) => Err(TransportError::Timeout(std::time::Duration::from_secs(1))),
            None => Err(Self::exhausted(command)),
        }
    }

    async fn write(&self, command: &str) -> Result<(), TransportError> {
        self.sent.lock().await.push(command.to_string());
        match self.script.lock().await.pop_front() {
            Some(Step::Write { command: expected }) => {
                if expected == command {
                    Ok(())
                } else {
                    Err(Self::mismatch(&expected, command))
                }
            }
            Some(Step::Query {
                command: expected, ..
            }) => Err(Self::mismatch(&expected, command)),
            Some(Step::Fault) => Err(TransportError::Timeout(std::time::Duration::from_secs(1))),
            None => Err(Self::exhausted(command)),
        }
    }

    fn resource_class(&self) -> ResourceClass {
        self.class
    }

    fn resource_name(&self) -> &str {
        &self.resource
    }
}
