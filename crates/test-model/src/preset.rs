use search_agent_model::{ErrorKind, ModelResponse, ToolCallRequest};
use serde::{Deserialize, Serialize};

/// The preset response for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// The response to return once the failures are used up.
    pub response: ModelResponse,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
    /// The kind of the injected failures.
    #[serde(skip)]
    pub failure_kind: Option<PresetFailure>,
}

/// Error kinds that can be injected by a [`PresetResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresetFailure {
    /// Fails with a transient error.
    RateLimited,
    /// Fails with a permanent error.
    Fatal,
}

impl PresetFailure {
    #[inline]
    pub(crate) fn kind(self) -> ErrorKind {
        match self {
            PresetFailure::RateLimited => ErrorKind::RateLimitExceeded,
            PresetFailure::Fatal => ErrorKind::Other,
        }
    }
}

impl PresetResponse {
    /// Creates a `PresetResponse` that answers with plain text.
    #[inline]
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self::with_response(ModelResponse::text(content))
    }

    /// Creates a `PresetResponse` that requests a single tool call.
    #[inline]
    pub fn tool_call(request: ToolCallRequest) -> Self {
        Self::with_response(ModelResponse::tool_calls([request]))
    }

    /// Creates a `PresetResponse` from a complete model response.
    #[inline]
    pub fn with_response(response: ModelResponse) -> Self {
        Self {
            response,
            failures: None,
            failure_kind: None,
        }
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    ///
    /// Failures are rate-limit errors unless [`Self::with_failure_kind`]
    /// says otherwise.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Sets the kind of the injected failures.
    #[inline]
    pub fn with_failure_kind(mut self, kind: PresetFailure) -> Self {
        self.failure_kind = Some(kind);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::tool_call(ToolCallRequest {
            id: "1".to_string(),
            name: "tavily_search_results_json".to_string(),
            arguments: json!({ "query": "capital of France" }),
        })
        .with_failures(2);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
    }
}
