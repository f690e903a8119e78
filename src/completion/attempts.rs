//! Ordered (model, credential) attempt descriptors and the retry policy.

use super::credentials::{Credential, CredentialPool};
use crate::config::CompletionSettings;
use crate::error::{LawDecoderError, Result};
use std::time::Duration;

/// One (model, credential) pair to try.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub model: String,
    pub credential: Credential,
    /// Position of the credential in the pool, for logging.
    pub credential_index: usize,
}

/// Fixed, non-empty, ordered list of candidate models.
#[derive(Debug, Clone)]
pub struct ModelPriorityList(Vec<String>);

impl ModelPriorityList {
    pub fn new(models: Vec<String>) -> Result<Self> {
        let models: Vec<String> = models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if models.is_empty() {
            return Err(LawDecoderError::Config(
                "At least one completion model must be configured".to_string(),
            ));
        }
        Ok(Self(models))
    }

    pub fn models(&self) -> &[String] {
        &self.0
    }
}

/// Lazily yields attempts: every model in priority order, each with one full
/// sweep of the credential pool.
///
/// Credentials are drawn from the pool only when the next attempt is
/// requested, so stopping early leaves the shared cursor where the last
/// real attempt put it.
pub struct AttemptPlan<'a> {
    models: &'a [String],
    pool: &'a CredentialPool,
    model_index: usize,
    issued: usize,
}

impl<'a> AttemptPlan<'a> {
    pub fn new(models: &'a ModelPriorityList, pool: &'a CredentialPool) -> Self {
        Self {
            models: models.models(),
            pool,
            model_index: 0,
            issued: 0,
        }
    }
}

impl Iterator for AttemptPlan<'_> {
    type Item = Attempt;

    fn next(&mut self) -> Option<Attempt> {
        loop {
            let model = self.models.get(self.model_index)?;
            if self.issued < self.pool.len() {
                self.issued += 1;
                let (credential_index, credential) = self.pool.next_credential();
                return Some(Attempt {
                    model: model.clone(),
                    credential,
                    credential_index,
                });
            }
            self.model_index += 1;
            self.issued = 0;
        }
    }
}

/// Timeouts and retry ceiling for the completion client.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Tries per attempt when the transport times out or fails.
    pub max_tries: u32,
    /// Upper bound for a single HTTP request.
    pub attempt_timeout: Duration,
    /// Upper bound for the whole search across models and credentials.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 4,
            attempt_timeout: Duration::from_secs(50),
            deadline: Some(Duration::from_secs(180)),
        }
    }
}

impl From<&CompletionSettings> for RetryPolicy {
    fn from(settings: &CompletionSettings) -> Self {
        Self {
            max_tries: settings.max_tries.max(1),
            attempt_timeout: settings.attempt_timeout(),
            deadline: settings.deadline(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> CredentialPool {
        CredentialPool::new(keys.iter().map(|k| Credential::new(*k)).collect()).unwrap()
    }

    fn models(names: &[&str]) -> ModelPriorityList {
        ModelPriorityList::new(names.iter().map(|m| m.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_plan_covers_models_times_credentials() {
        let pool = pool(&["k1", "k2"]);
        let models = models(&["m1", "m2"]);

        let plan: Vec<(String, String)> = AttemptPlan::new(&models, &pool)
            .map(|a| (a.model, a.credential.expose().to_string()))
            .collect();

        assert_eq!(
            plan,
            vec![
                ("m1".to_string(), "k1".to_string()),
                ("m1".to_string(), "k2".to_string()),
                ("m2".to_string(), "k1".to_string()),
                ("m2".to_string(), "k2".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_starts_from_shared_cursor() {
        let pool = pool(&["k1", "k2", "k3"]);
        let models = models(&["m1"]);

        pool.next_credential();

        let keys: Vec<usize> = AttemptPlan::new(&models, &pool)
            .map(|a| a.credential_index)
            .collect();
        assert_eq!(keys, vec![1, 2, 0]);
    }

    #[test]
    fn test_plan_is_lazy() {
        let pool = pool(&["k1", "k2"]);
        let models = models(&["m1", "m2"]);

        let first = AttemptPlan::new(&models, &pool).next().unwrap();
        assert_eq!(first.credential_index, 0);
        assert_eq!(pool.next_credential().0, 1);
    }

    #[test]
    fn test_blank_models_rejected() {
        assert!(ModelPriorityList::new(vec![" ".to_string()]).is_err());
        assert!(ModelPriorityList::new(Vec::new()).is_err());
    }

    #[test]
    fn test_policy_from_settings() {
        let mut settings = CompletionSettings::default();
        settings.max_tries = 0;
        settings.deadline_secs = 0;

        let policy = RetryPolicy::from(&settings);
        assert_eq!(policy.max_tries, 1);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(50));
        assert!(policy.deadline.is_none());
    }
}
