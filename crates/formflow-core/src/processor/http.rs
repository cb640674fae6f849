//! HTTP step processor — POSTs each request as JSON to the configured
//! endpoint and reads the response body as a [`ProcessorResponse`].

use async_trait::async_trait;

use super::types::{ExecuteRequest, ProcessorResponse};
use super::StepProcessor;
use crate::config::ProcessorConfig;
use crate::error::FlowError;

pub struct HttpStepProcessor {
    client: reqwest::Client,
    config: ProcessorConfig,
}

impl HttpStepProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout())
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }
}

#[async_trait]
impl StepProcessor for HttpStepProcessor {
    async fn process(&self, request: &ExecuteRequest) -> Result<ProcessorResponse, FlowError> {
        tracing::info!(
            "[HttpProcessor] POST {} (button: {})",
            self.config.endpoint,
            request.button_id()
        );

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .header("content-type", "application/json")
            .json(request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            tracing::warn!("[HttpProcessor] Processor returned {}: {}", status, message);
            return Err(FlowError::Processor(format!("Processor returned {}: {}", status, message)));
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;
        let parsed = ProcessorResponse::from_value(json)?;
        tracing::debug!("[HttpProcessor] Response variant: {}", parsed.kind());
        Ok(parsed)
    }
}
