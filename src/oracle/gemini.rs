//! Google Gemini classification oracle.
//!
//! Requires an API key (`GEMINI_API_KEY`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

use super::config::{resolve_gemini_api_key, resolve_gemini_endpoint, resolve_gemini_model};
use super::provider::OracleProvider;
use super::types::ProviderInfo;

/// Gemini `generateContent` oracle.
pub struct GeminiOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiOracle {
    /// Create a Gemini oracle with default configuration.
    ///
    /// Returns `None` if no API key is configured.
    pub fn new() -> Option<Self> {
        Self::with_config(None, None, None)
    }

    /// Create a Gemini oracle with custom configuration.
    ///
    /// Returns `None` if no API key is available.
    pub fn with_config(
        endpoint: Option<String>,
        model: Option<String>,
        api_key: Option<String>,
    ) -> Option<Self> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(resolve_gemini_api_key)?;
        let endpoint = endpoint.unwrap_or_else(resolve_gemini_endpoint);

        Some(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(resolve_gemini_model),
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|p| p.text)
    }
}

impl OracleProvider for GeminiOracle {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "gemini".to_string(),
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    async fn is_available(&self) -> bool {
        // A key is all we can check without spending a request.
        !self.api_key.is_empty()
    }

    async fn classify(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part { text: system_prompt }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: user_prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 500,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Oracle(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(Error::Oracle(format!("Gemini API error ({status}): {error}")));
        }

        let data: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Oracle(format!("Failed to parse Gemini response: {e}")))?;

        data.first_text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Oracle("Empty reply from Gemini".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_custom_config() {
        let oracle = GeminiOracle::with_config(
            Some("http://gemini.test/v1beta/".to_string()),
            Some("gemini-test".to_string()),
            Some("k".to_string()),
        )
        .unwrap();
        let info = oracle.info();
        assert_eq!(info.name, "gemini");
        assert_eq!(info.model, "gemini-test");
        assert_eq!(info.endpoint, "http://gemini.test/v1beta");
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part { text: "sys" }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: "usr" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 500,
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 500);
    }

    #[test]
    fn test_first_text() {
        let data: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"intent\":\"list_projects\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(data.first_text().as_deref(), Some(r#"{"intent":"list_projects"}"#));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.first_text().is_none());
    }
}
