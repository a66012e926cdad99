//! ControlPlaneClient -- the executor's HTTP edge to the control plane.
//!
//! Implements two `weft-core` ports over one authenticated reqwest client:
//! [`SealedCredentialSource`] (fetch sealed credential blobs) and
//! [`TaskPublisher`] (enqueue workflow-run tasks).
//!
//! The API token is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building the Authorization header. It never appears in Debug output
//! or tracing logs.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use uuid::Uuid;

use weft_core::credential::SealedCredentialSource;
use weft_core::poll::TaskPublisher;
use weft_types::config::ControlPlaneConfig;
use weft_types::credential::SealedCredential;
use weft_types::error::{CredentialError, PublishError};
use weft_types::poll::ExecuteWorkflowTask;

/// Authenticated client for the control-plane REST API.
pub struct ControlPlaneClient {
    client: reqwest::Client,
    base_url: String,
    api_token: SecretString,
    executor_id: String,
}

impl ControlPlaneClient {
    pub fn new(config: &ControlPlaneConfig, executor_id: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            executor_id,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_token.expose_secret())
    }
}

impl std::fmt::Debug for ControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlaneClient")
            .field("base_url", &self.base_url)
            .field("executor_id", &self.executor_id)
            .finish()
    }
}

#[async_trait]
impl SealedCredentialSource for ControlPlaneClient {
    async fn fetch_sealed(
        &self,
        workspace_id: Uuid,
        credential_id: &str,
    ) -> Result<SealedCredential, CredentialError> {
        let url = format!(
            "{}/v1/executors/{}/credentials/{credential_id}",
            self.base_url, self.executor_id
        );
        debug!(%workspace_id, credential_id, "fetching sealed credential");

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .query(&[("workspace_id", workspace_id.to_string())])
            .send()
            .await
            .map_err(|e| CredentialError::Fetch {
                credential_id: credential_id.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CredentialError::Fetch {
                credential_id: credential_id.to_string(),
                message: format!("control plane returned {}", response.status()),
            });
        }

        response
            .json::<SealedCredential>()
            .await
            .map_err(|e| CredentialError::Fetch {
                credential_id: credential_id.to_string(),
                message: format!("invalid sealed credential body: {e}"),
            })
    }
}

#[async_trait]
impl TaskPublisher for ControlPlaneClient {
    async fn enqueue(
        &self,
        workspace_id: Uuid,
        task: ExecuteWorkflowTask,
    ) -> Result<(), PublishError> {
        let url = format!("{}/v1/workspaces/{workspace_id}/tasks", self.base_url);
        debug!(%workspace_id, workflow_id = %task.workflow_id, "enqueueing workflow task");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&task)
            .send()
            .await
            .map_err(|e| PublishError::new(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PublishError::new(format!(
                "control plane returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ControlPlaneClient {
        let config = ControlPlaneConfig {
            base_url: "https://cp.example.com/".to_string(),
            api_token: SecretString::from("tok-secret"),
            request_timeout_seconds: 5,
        };
        ControlPlaneClient::new(&config, "exec-1".to_string()).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(client().base_url, "https://cp.example.com");
    }

    #[test]
    fn test_debug_hides_token() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("tok-secret"), "token leaked: {rendered}");
        assert!(rendered.contains("exec-1"));
    }
}
