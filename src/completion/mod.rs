//! Chat completion with credential rotation and model fallback.
//!
//! - `credentials` - the API key pool and its round-robin cursor
//! - `attempts` - ordered (model, credential) descriptors and retry policy
//! - `transport` - the HTTP seam, with the OpenRouter implementation
//! - `client` - the search over attempts

mod attempts;
mod client;
mod credentials;
mod transport;

pub use attempts::{Attempt, AttemptPlan, ModelPriorityList, RetryPolicy};
pub use client::{CompletionClient, CompletionOutcome};
pub use credentials::{Credential, CredentialPool};
pub use transport::{ChatTransport, CompletionRequest, OpenRouterTransport, TransportError};

#[cfg(test)]
pub(crate) use client::tests::{client as scripted_client, ScriptedTransport};

use crate::config::CompletionSettings;
use crate::error::Result;
use std::sync::Arc;

/// Build the production client: OpenRouter transport, keys from the environment.
pub fn client_from_settings(settings: &CompletionSettings) -> Result<CompletionClient> {
    let pool = CredentialPool::from_env(&settings.credential_prefix)?;
    let models = ModelPriorityList::new(settings.models.clone())?;
    let transport = OpenRouterTransport::new(
        &settings.api_base,
        settings.temperature,
        settings.attempt_timeout(),
    )?;

    Ok(CompletionClient::new(
        Arc::new(transport),
        Arc::new(pool),
        models,
        RetryPolicy::from(settings),
    ))
}
