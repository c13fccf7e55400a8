use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use search_agent_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
};
use tracing::Instrument;

use crate::retry::{RetryPolicy, retry};

/// A type-erased error from the completion service.
pub type ModelError = Box<dyn ModelProviderError>;

type SendRequestResult = Result<ModelResponse, ModelError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(&ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
///
/// Every request goes through the client's [`RetryPolicy`].
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    /// Creates a client with the default retry policy.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn =
            Arc::new(move |req: &ModelRequest| -> BoxedSendRequestFuture {
                let fut = provider.send_request(req);
                Box::pin(async move {
                    fut.await.map_err(|err| {
                        error!("got an error: {err:?}");
                        Box::new(err) as ModelError
                    })
                })
            });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sends a request and returns the complete response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. Dropping the future abandons the
    /// attempt in flight and any retries after it.
    pub async fn send_request(
        &self,
        req: &ModelRequest,
    ) -> Result<ModelResponse, ModelError> {
        let span = trace_span!(
            "model client req",
            messages = req.messages.len(),
            tools = req.tools.len()
        );
        async {
            trace!("got a request: {req:?}");
            let resp = retry(
                &self.retry_policy,
                || (self.handler_fn)(req),
                |err: &ModelError| err.kind().is_transient(),
                |limit| Box::new(TimeoutError(limit)) as ModelError,
            )
            .await?;
            trace!(
                "finished a request, {} tool call(s)",
                resp.tool_calls.len()
            );
            Ok(resp)
        }
        .instrument(span)
        .await
    }

    /// Sends a single prompt without tools and returns the completion text.
    pub async fn complete<S: Into<String>>(
        &self,
        prompt: S,
    ) -> Result<String, ModelError> {
        let resp = self.send_request(&ModelRequest::prompt(prompt)).await?;
        Ok(resp.content)
    }
}

/// Reported when an attempt exceeds the retry policy's attempt timeout.
#[derive(Debug)]
struct TimeoutError(Duration);

impl Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model request timed out after {:?}", self.0)
    }
}

impl StdError for TimeoutError {}

impl ModelProviderError for TimeoutError {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Timeout
    }
}
