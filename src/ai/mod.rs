//! AI client adapter.
//!
//! Translates the resume workflow's two external operations (entry extraction
//! and final generation) into Gemini `generateContent` calls and maps provider
//! failures onto [`AiError`].

mod gemini;
pub mod prompts;

use crate::model::{AiConfig, ExperienceEntry, ExtractedEntry};
use thiserror::Error;
use tracing::{debug, info, warn};

use gemini::{GeminiClient, GenerateRequest, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("API key is not configured. Save your Gemini API key before continuing.")]
    Configuration,

    #[error("The API key was rejected by the provider. Check the key and save it again.")]
    InvalidCredential,

    #[error("The AI returned an invalid format. Expected an array of experiences.")]
    MalformedResponse,

    #[error("Failed to extract experiences from the resume ({0}). The format might be unconventional. Please try again.")]
    Extraction(String),

    #[error("The AI returned an empty response.")]
    EmptyGeneration,

    #[error("Failed to generate the final resume ({0}). Please check your connection and try again.")]
    Generation(String),
}

/// Adapter exposing the two resume operations on top of a [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct ResumeAi {
    client: GeminiClient,
}

impl ResumeAi {
    pub fn new(cfg: &AiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: GeminiClient::new(cfg)?,
        })
    }

    /// Ask the provider for every job entry in `resume_text`, in source order.
    ///
    /// Empty or non-list payloads count as "nothing found"; a payload that
    /// looks like a list but does not parse as one is a `MalformedResponse`.
    pub async fn extract_entries(
        &self,
        resume_text: &str,
        credential: &str,
    ) -> Result<Vec<ExtractedEntry>, AiError> {
        if credential.trim().is_empty() {
            return Err(AiError::Configuration);
        }

        let request = GenerateRequest::structured(
            prompts::extraction_prompt(resume_text),
            prompts::extraction_schema(),
        );
        debug!(resume_len = resume_text.len(), "requesting entry extraction");

        let text = self
            .client
            .generate(&request, credential)
            .await
            .map_err(|e| classify(e, AiError::Extraction))?;

        let entries = parse_extracted_entries(&text)?;
        info!(count = entries.len(), "entry extraction finished");
        Ok(entries)
    }

    /// Rewrite the resume's experience section from the user's STAR details.
    pub async fn generate_final_resume(
        &self,
        resume_text: &str,
        entries: &[ExperienceEntry],
        credential: &str,
    ) -> Result<String, AiError> {
        if credential.trim().is_empty() {
            return Err(AiError::Configuration);
        }

        let request = GenerateRequest::text(prompts::generation_prompt(resume_text, entries));
        debug!(entries = entries.len(), "requesting final resume generation");

        let text = self
            .client
            .generate(&request, credential)
            .await
            .map_err(|e| classify(e, AiError::Generation))?;

        let text = text.trim();
        if text.is_empty() {
            warn!("generation returned empty text");
            return Err(AiError::EmptyGeneration);
        }
        info!(output_len = text.len(), "final resume generated");
        Ok(text.to_string())
    }
}

fn classify(err: ProviderError, generic: fn(String) -> AiError) -> AiError {
    if err.rejects_credential() {
        warn!("provider rejected the API key");
        AiError::InvalidCredential
    } else {
        warn!(error = %err, "provider call failed");
        generic(err.to_string())
    }
}

fn parse_extracted_entries(raw: &str) -> Result<Vec<ExtractedEntry>, AiError> {
    let text = strip_json_fences(raw);
    if text.is_empty() || !text.starts_with('[') {
        debug!("extraction payload is not a list; treating as zero entries");
        return Ok(Vec::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| AiError::MalformedResponse)?;
    if !value.is_array() {
        return Err(AiError::MalformedResponse);
    }
    serde_json::from_value(value).map_err(|_| AiError::MalformedResponse)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> AiConfig {
        AiConfig {
            base_url,
            model: "gemini-2.5-flash".to_string(),
            timeout: Duration::from_secs(5),
            user_agent: "star-resume-test".to_string(),
        }
    }

    fn text_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    fn invalid_key_body() -> serde_json::Value {
        json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                    "reason": "API_KEY_INVALID",
                    "domain": "googleapis.com"
                }]
            }
        })
    }

    async fn adapter(server: &MockServer) -> ResumeAi {
        ResumeAi::new(&test_config(server.uri())).unwrap()
    }

    #[test]
    fn test_parse_soft_empty_policy() {
        assert!(parse_extracted_entries("").unwrap().is_empty());
        assert!(parse_extracted_entries("   ").unwrap().is_empty());
        assert!(parse_extracted_entries("No experiences here.").unwrap().is_empty());
        assert!(parse_extracted_entries("{\"jobTitle\":\"x\"}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_list() {
        assert_eq!(
            parse_extracted_entries("[{\"jobTitle\": \"x\"").unwrap_err(),
            AiError::MalformedResponse
        );
        assert_eq!(
            parse_extracted_entries("[{\"title\": \"x\"}]").unwrap_err(),
            AiError::MalformedResponse
        );
    }

    #[test]
    fn test_parse_fenced_list() {
        let raw = "```json\n[{\"jobTitle\":\"Engineer\",\"company\":\"Acme\"}]\n```";
        let entries = parse_extracted_entries(raw).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company, "Acme");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  [1]  "), "[1]");
        assert_eq!(strip_json_fences("```\n[1]\n```"), "[1]");
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let server = MockServer::start().await;
        let ai = adapter(&server).await;

        let err = ai.extract_entries("resume", "  ").await.unwrap_err();
        assert_eq!(err, AiError::Configuration);
        let err = ai.generate_final_resume("resume", &[], "").await.unwrap_err();
        assert_eq!(err, AiError::Configuration);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_entries_sends_schema_and_parses_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_string_contains("responseSchema"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
                r#"[{"jobTitle":"Software Engineer","company":"Acme Corp"},{"jobTitle":"Intern","company":"Initech"}]"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let ai = adapter(&server).await;
        let entries = ai
            .extract_entries("John Doe, Software Engineer at Acme Corp", "test-key")
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![
                ExtractedEntry {
                    job_title: "Software Engineer".into(),
                    company: "Acme Corp".into()
                },
                ExtractedEntry {
                    job_title: "Intern".into(),
                    company: "Initech".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_extract_entries_without_candidates_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let entries = adapter(&server)
            .await
            .extract_entries("resume", "k")
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_extract_entries_invalid_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(invalid_key_body()))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .extract_entries("resume", "bad-key")
            .await
            .unwrap_err();
        assert_eq!(err, AiError::InvalidCredential);
    }

    #[tokio::test]
    async fn test_extract_entries_server_error_wraps_provider_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .extract_entries("resume", "k")
            .await
            .unwrap_err();
        match err {
            AiError::Extraction(msg) => assert!(msg.contains("overloaded"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_final_resume_trims_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Situation: Legacy billing system"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_response("\n  JOHN DOE\n- Led migration\n  ")),
            )
            .mount(&server)
            .await;

        let entry = ExperienceEntry {
            id: 0,
            job_title: "Engineer".into(),
            company: "Acme".into(),
            situation: "Legacy billing system".into(),
            task: "Migrate".into(),
            action: "Rewrote it".into(),
            result: "Cut costs 30%".into(),
        };
        let out = adapter(&server)
            .await
            .generate_final_resume("John Doe", &[entry], "k")
            .await
            .unwrap();
        assert_eq!(out, "JOHN DOE\n- Led migration");
    }

    #[tokio::test]
    async fn test_generate_final_resume_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("   ")))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .await
            .generate_final_resume("resume", &[], "k")
            .await
            .unwrap_err();
        assert_eq!(err, AiError::EmptyGeneration);
    }

    #[tokio::test]
    async fn test_generate_final_resume_invalid_key_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-goog-api-key", "bad"))
            .respond_with(ResponseTemplate::new(400).set_body_json(invalid_key_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("x-goog-api-key", "good"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let ai = adapter(&server).await;
        assert_eq!(
            ai.generate_final_resume("r", &[], "bad").await.unwrap_err(),
            AiError::InvalidCredential
        );
        assert!(matches!(
            ai.generate_final_resume("r", &[], "good").await.unwrap_err(),
            AiError::Generation(_)
        ));
    }
}
