//! AI instruction service client.
//!
//! Blocking reqwest client (the caller runs it on a worker thread; no async
//! runtime required). One request, one parsed response — no retry, no
//! backoff. The [`InstructionService`] trait keeps the processor testable
//! with a substitutable fake; nothing in the application holds a
//! process-wide client.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::{
    InstructionOutcome, SYSTEM_INSTRUCTION, ServiceRequest, build_prompt, parse_outcome,
};
use crate::settings::AiSettings;

/// Error type for AI service operations.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Http(u16, String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("AI service not configured: {0}")]
    NotConfigured(String),
}

/// An AI service that can resolve instructions and explain formulas.
///
/// Implementations must be shareable across the worker threads that carry
/// requests, hence `Send + Sync`.
pub trait InstructionService: Send + Sync {
    /// Resolve a natural-language instruction against a sheet snapshot.
    fn process(
        &self,
        instruction: &str,
        context_snippet: &str,
    ) -> Result<InstructionOutcome, AiError>;

    /// Explain a spreadsheet formula in plain language.
    fn explain(&self, formula: &str) -> Result<String, AiError>;
}

/// HTTP implementation of [`InstructionService`] (blocking).
pub struct HttpService {
    http: reqwest::blocking::Client,
    api_base: String,
    api_key: String,
    model: String,
    explain_model: String,
}

impl HttpService {
    pub fn new(settings: &AiSettings, api_key: String) -> Result<Self, AiError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("gridmind/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base: settings.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            explain_model: settings.explain_model.clone(),
        })
    }

    fn post(&self, url: &str, request: &ServiceRequest<'_>) -> Result<String, AiError> {
        log::debug!("POST {} (model {})", url, request.model);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| AiError::Network(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(AiError::Http(status, body));
        }

        Ok(body)
    }
}

impl InstructionService for HttpService {
    fn process(
        &self,
        instruction: &str,
        context_snippet: &str,
    ) -> Result<InstructionOutcome, AiError> {
        let prompt = build_prompt(instruction, context_snippet);
        let request = ServiceRequest {
            model: &self.model,
            system: SYSTEM_INSTRUCTION,
            prompt: &prompt,
        };

        let url = format!("{}/v1/instructions", self.api_base);
        let body = self.post(&url, &request)?;
        parse_outcome(&body)
    }

    fn explain(&self, formula: &str) -> Result<String, AiError> {
        let prompt = format!(
            "Explain what this spreadsheet formula does in simple terms: {}",
            formula
        );
        let request = ServiceRequest {
            model: &self.explain_model,
            system: "You are a helpful spreadsheet expert assistant.",
            prompt: &prompt,
        };

        let url = format!("{}/v1/explain", self.api_base);
        let body = self.post(&url, &request)?;
        let parsed: crate::protocol::ExplainResponse =
            serde_json::from_str(&body).map_err(|e| AiError::Parse(e.to_string()))?;
        Ok(parsed.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AiSettings;

    #[test]
    fn test_http_service_construction_normalizes_endpoint() {
        let settings = AiSettings {
            endpoint: "https://api.example.test/".to_string(),
            ..AiSettings::default()
        };
        let service = HttpService::new(&settings, "key".to_string()).unwrap();
        assert_eq!(service.api_base, "https://api.example.test");
    }

    #[test]
    fn test_errors_render_for_status_bar() {
        let err = AiError::Http(500, "server fell over".to_string());
        assert_eq!(err.to_string(), "HTTP 500: server fell over");

        let err = AiError::NotConfigured("set GRIDMIND_API_KEY".to_string());
        assert!(err.to_string().contains("GRIDMIND_API_KEY"));
    }
}
