//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use search_agent_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    // Failed attempts made against the response at the front.
    front_attempts: u64,
    requests: Vec<ModelRequest>,
}

impl Script {
    fn next_response(&mut self) -> Result<ModelResponse, Error> {
        let Some(preset) = self.responses.front() else {
            return Err(Error {
                message: "no enough responses",
                kind: ErrorKind::Other,
            });
        };

        if let Some(failures) = preset.failures {
            if failures == 0 || self.front_attempts < failures {
                self.front_attempts += 1;
                let kind = preset
                    .failure_kind
                    .unwrap_or(PresetFailure::RateLimited)
                    .kind();
                return Err(Error {
                    message: "injected failure",
                    kind,
                });
            }
        }

        self.front_attempts = 0;
        let preset = self.responses.pop_front().expect("front was checked");
        Ok(preset.response)
    }
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond to each request. Responses are consumed in order,
/// one per request, no matter what the request contains. If there are no
/// enough responses in the script, an error will be returned.
///
/// Clones share the same script, so a test can keep a clone around to
/// inspect the recorded requests after handing the provider away.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.script().responses.push_back(preset);
    }

    /// Appends a plain text response to the script.
    #[inline]
    pub fn add_text_response<S: Into<String>>(&mut self, content: S) {
        self.add_response(PresetResponse::text(content));
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, including failed attempts.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.script().requests.clone()
    }

    /// Returns the number of responses that have not been consumed yet.
    pub fn remaining(&self) -> usize {
        self.script().responses.len()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        // A panicking test thread must not hide the script from the others.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let result = {
            let mut script = self.script();
            script.requests.push(req.clone());
            script.next_response()
        };
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        async move {
            sleep(delay).await;
            result
        }
    }
}
