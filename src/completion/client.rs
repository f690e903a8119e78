//! Resilient completion across models and credentials.

use super::attempts::{Attempt, AttemptPlan, ModelPriorityList, RetryPolicy};
use super::credentials::CredentialPool;
use super::transport::{ChatTransport, CompletionRequest, TransportError};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Terminal result of a completion search. Failure is a value, not an error:
/// callers degrade instead of aborting.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// A model produced non-empty text.
    Completed { text: String, model: String },
    /// Every (model, credential) pair failed or returned nothing.
    Exhausted { failed_attempts: usize },
    /// The overall deadline passed before any pair succeeded.
    DeadlineExceeded,
    /// The caller went away.
    Cancelled,
}

impl CompletionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionOutcome::Completed { .. })
    }
}

/// What a single (model, credential) pair came to.
enum AttemptResult {
    Content(String),
    Failed,
    DeadlineExceeded,
    Cancelled,
}

/// Sends a prompt to the first (model, credential) pair that answers.
pub struct CompletionClient {
    transport: Arc<dyn ChatTransport>,
    pool: Arc<CredentialPool>,
    models: ModelPriorityList,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        pool: Arc<CredentialPool>,
        models: ModelPriorityList,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            pool,
            models,
            policy,
        }
    }

    pub fn models(&self) -> &ModelPriorityList {
        &self.models
    }

    pub fn credential_count(&self) -> usize {
        self.pool.len()
    }

    /// Try models in priority order, each across a full sweep of credentials.
    ///
    /// The first non-empty response wins and nothing after it is tried.
    #[instrument(skip_all, fields(models = self.models.models().len(), credentials = self.pool.len()))]
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        cancel: &CancellationToken,
    ) -> CompletionOutcome {
        let deadline = self.policy.deadline.map(|d| Instant::now() + d);
        let mut failed_attempts = 0;

        for attempt in AttemptPlan::new(&self.models, &self.pool) {
            info!(
                "Trying model {} with key #{}",
                attempt.model, attempt.credential_index
            );

            match self
                .run_attempt(&attempt, system_prompt, user_message, deadline, cancel)
                .await
            {
                AttemptResult::Content(text) => {
                    info!("Model {} answered", attempt.model);
                    return CompletionOutcome::Completed {
                        text,
                        model: attempt.model,
                    };
                }
                AttemptResult::Failed => failed_attempts += 1,
                AttemptResult::DeadlineExceeded => {
                    warn!("Completion deadline exceeded after {} failed attempts", failed_attempts);
                    return CompletionOutcome::DeadlineExceeded;
                }
                AttemptResult::Cancelled => {
                    info!("Completion cancelled by caller");
                    return CompletionOutcome::Cancelled;
                }
            }
        }

        warn!("All {} model/key combinations failed", failed_attempts);
        CompletionOutcome::Exhausted { failed_attempts }
    }

    /// Run one pair, retrying timeouts and network failures up to the ceiling.
    async fn run_attempt(
        &self,
        attempt: &Attempt,
        system_prompt: &str,
        user_message: &str,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
    ) -> AttemptResult {
        let request = CompletionRequest {
            model: &attempt.model,
            credential: &attempt.credential,
            system_prompt,
            user_message,
        };

        for try_number in 1..=self.policy.max_tries {
            let timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return AttemptResult::DeadlineExceeded;
                    }
                    remaining.min(self.policy.attempt_timeout)
                }
                None => self.policy.attempt_timeout,
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return AttemptResult::Cancelled,
                result = tokio::time::timeout(timeout, self.transport.send(&request)) => {
                    result.unwrap_or(Err(TransportError::Timeout(timeout)))
                }
            };

            match result {
                Ok(text) if !text.trim().is_empty() => return AttemptResult::Content(text),
                Ok(_) => {
                    warn!(
                        "{} returned empty content on key #{}",
                        attempt.model, attempt.credential_index
                    );
                    return AttemptResult::Failed;
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "Try {}/{} failed for {} on key #{}: {}",
                        try_number, self.policy.max_tries, attempt.model, attempt.credential_index, e
                    );
                }
                Err(e) => {
                    warn!(
                        "{} failed on key #{}: {}",
                        attempt.model, attempt.credential_index, e
                    );
                    return AttemptResult::Failed;
                }
            }
        }

        debug!(
            "Retries exhausted for {} on key #{}",
            attempt.model, attempt.credential_index
        );
        AttemptResult::Failed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::completion::credentials::Credential;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    type Responder = dyn Fn(&str, &str) -> Result<String, TransportError> + Send + Sync;

    /// Transport that answers from a closure and records every call.
    pub(crate) struct ScriptedTransport {
        respond: Box<Responder>,
        pub calls: Mutex<Vec<(String, String)>>,
        hang: bool,
    }

    impl ScriptedTransport {
        pub(crate) fn new(
            respond: impl Fn(&str, &str) -> Result<String, TransportError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                calls: Mutex::new(Vec::new()),
                hang: false,
            }
        }

        pub(crate) fn hanging() -> Self {
            Self {
                hang: true,
                ..Self::new(|_, _| Ok(String::new()))
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, request: &CompletionRequest<'_>) -> Result<String, TransportError> {
            let key = request.credential.expose().to_string();
            self.calls
                .lock()
                .unwrap()
                .push((request.model.to_string(), key.clone()));
            if self.hang {
                std::future::pending::<()>().await;
            }
            (self.respond)(request.model, &key)
        }
    }

    pub(crate) fn client(
        transport: Arc<ScriptedTransport>,
        keys: &[&str],
        models: &[&str],
        policy: RetryPolicy,
    ) -> CompletionClient {
        let pool = CredentialPool::new(keys.iter().map(|k| Credential::new(*k)).collect()).unwrap();
        let models =
            ModelPriorityList::new(models.iter().map(|m| m.to_string()).collect()).unwrap();
        CompletionClient::new(transport, Arc::new(pool), models, policy)
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| Ok("answer".to_string())));
        let client = client(transport.clone(), &["k1", "k2"], &["m1", "m2"], RetryPolicy::default());

        let outcome = client.complete("sys", "q", &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            CompletionOutcome::Completed {
                text: "answer".to_string(),
                model: "m1".to_string()
            }
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_only_last_pair_succeeds_after_empty_responses() {
        let transport = Arc::new(ScriptedTransport::new(|model, key| {
            if model == "m2" && key == "k2" {
                Ok("finally".to_string())
            } else {
                Ok("   ".to_string())
            }
        }));
        let client = client(transport.clone(), &["k1", "k2"], &["m1", "m2"], RetryPolicy::default());

        let outcome = client.complete("sys", "q", &CancellationToken::new()).await;

        assert!(outcome.is_completed());
        let calls = transport.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("m1".to_string(), "k1".to_string()),
                ("m1".to_string(), "k2".to_string()),
                ("m2".to_string(), "k1".to_string()),
                ("m2".to_string(), "k2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_network_failures_use_full_retry_ceiling() {
        let transport = Arc::new(ScriptedTransport::new(|model, key| {
            if model == "m2" && key == "k2" {
                Ok("finally".to_string())
            } else {
                Err(TransportError::Network("connection reset".to_string()))
            }
        }));
        let client = client(transport.clone(), &["k1", "k2"], &["m1", "m2"], RetryPolicy::default());

        let outcome = client.complete("sys", "q", &CancellationToken::new()).await;

        assert!(outcome.is_completed());
        // Three failing pairs at four tries each, then the winning call.
        assert_eq!(transport.call_count(), 3 * 4 + 1);
    }

    #[tokio::test]
    async fn test_rejections_are_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| {
            Err(TransportError::Rejected("invalid key".to_string()))
        }));
        let client = client(transport.clone(), &["k1", "k2"], &["m1", "m2"], RetryPolicy::default());

        let outcome = client.complete("sys", "q", &CancellationToken::new()).await;

        assert_eq!(outcome, CompletionOutcome::Exhausted { failed_attempts: 4 });
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_requests_time_out_and_retry() {
        let transport = Arc::new(ScriptedTransport::hanging());
        let policy = RetryPolicy {
            max_tries: 4,
            attempt_timeout: Duration::from_secs(50),
            deadline: None,
        };
        let client = client(transport.clone(), &["k1"], &["m1"], policy);

        let started = Instant::now();
        let outcome = client.complete("sys", "q", &CancellationToken::new()).await;

        assert_eq!(outcome, CompletionOutcome::Exhausted { failed_attempts: 1 });
        assert_eq!(transport.call_count(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_total_latency() {
        let transport = Arc::new(ScriptedTransport::hanging());
        let policy = RetryPolicy {
            max_tries: 4,
            attempt_timeout: Duration::from_secs(50),
            deadline: Some(Duration::from_secs(120)),
        };
        let client = client(transport.clone(), &["k1", "k2"], &["m1", "m2"], policy);

        let started = Instant::now();
        let outcome = client.complete("sys", "q", &CancellationToken::new()).await;

        assert_eq!(outcome, CompletionOutcome::DeadlineExceeded);
        assert_eq!(started.elapsed(), Duration::from_secs(120));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| Ok("answer".to_string())));
        let client = client(transport.clone(), &["k1"], &["m1"], RetryPolicy::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            client.complete("sys", "q", &cancel).await,
            CompletionOutcome::Cancelled
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_request() {
        let transport = Arc::new(ScriptedTransport::hanging());
        let client = client(transport.clone(), &["k1"], &["m1"], RetryPolicy::default());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let outcome = client.complete("sys", "q", &cancel).await;

        assert_eq!(outcome, CompletionOutcome::Cancelled);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rotation_continues_across_queries() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| Ok("ok".to_string())));
        let client = client(transport.clone(), &["k1", "k2", "k3"], &["m1"], RetryPolicy::default());

        for _ in 0..3 {
            client.complete("sys", "q", &CancellationToken::new()).await;
        }

        let keys: Vec<String> = transport
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, k)| k.clone())
            .collect();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);
    }
}
