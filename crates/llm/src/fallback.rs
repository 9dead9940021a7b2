use async_trait::async_trait;
use scriptorium_common::{Result, ScriptoriumError};
use tracing::warn;

use crate::client::{LlmClient, LlmRequest, LlmResponse};

/// How many times the secondary handle is tried before the chain gives up.
pub const FALLBACK_ATTEMPTS: u32 = 2;

const RETRY_DELAY_MS: u64 = 500;

/// Decorator chaining a primary model handle with a known-reliable
/// secondary. Implements [`LlmClient`] so callers never distinguish a
/// wrapped handle from a bare one.
pub struct FallbackClient {
    primary: Box<dyn LlmClient>,
    secondary: Box<dyn LlmClient>,
    secondary_attempts: u32,
}

impl FallbackClient {
    pub fn new(primary: Box<dyn LlmClient>, secondary: Box<dyn LlmClient>) -> Self {
        Self {
            primary,
            secondary,
            secondary_attempts: FALLBACK_ATTEMPTS,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.secondary_attempts = attempts.max(1);
        self
    }
}

#[async_trait]
impl LlmClient for FallbackClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let primary_error = match self.primary.complete(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        warn!(
            primary = %self.primary.model_name(),
            fallback = %self.secondary.model_name(),
            error = %primary_error,
            "Primary model failed, switching to fallback"
        );

        let mut last_error = primary_error;
        for attempt in 1..=self.secondary_attempts {
            match self.secondary.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.secondary_attempts,
                        error = %e,
                        "Fallback attempt failed"
                    );
                    last_error = e;
                    if attempt < self.secondary_attempts {
                        tokio::time::sleep(tokio::time::Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        Err(ScriptoriumError::Invocation(format!(
            "Primary ({}) and fallback ({}) models exhausted: {last_error}",
            self.primary.model_name(),
            self.secondary.model_name()
        )))
    }

    fn model_name(&self) -> &str {
        self.primary.model_name()
    }
}
