//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! Sends the conversation history plus the new user turn to
//! `{base_url}/{model}:generateContent` and returns the reply text. The API
//! key travels in the `x-goog-api-key` header, never in the URL.

use async_trait::async_trait;
use cerebro_core::config::DEFAULT_API_BASE_URL;
use cerebro_core::error::{CerebroError, Result};
use cerebro_core::session::HistoryEntry;
use cerebro_core::{CompletionRequest, CompletionService};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Completion service that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiApiAgent {
    /// Creates a new agent with the provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Replaces the HTTP client, e.g. to configure proxies or TLS.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Overrides the API base URL (everything before `/{model}:generateContent`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{model}:generateContent", self.base_url)
    }

    async fn send_request(&self, model: &str, body: &GenerateContentRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                CerebroError::completion(format!("Gemini API request failed: {}", err.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| {
                CerebroError::completion(format!("Failed to parse Gemini response: {}", err.without_url()))
            })?;

        extract_text_response(parsed)
    }
}

impl std::fmt::Debug for GeminiApiAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiApiAgent")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionService for GeminiApiAgent {
    async fn send_message(&self, request: CompletionRequest) -> Result<String> {
        let user_turn = HistoryEntry::user(request.message.as_str());
        let body = build_request(&request.history, &user_turn);

        tracing::debug!(
            "[GeminiApiAgent] generateContent model={} turns={}",
            request.model,
            body.contents.len()
        );
        self.send_request(&request.model, &body).await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<&'a HistoryEntry>,
}

fn build_request<'a>(history: &'a [HistoryEntry], user_turn: &'a HistoryEntry) -> GenerateContentRequest<'a> {
    let contents = history.iter().chain(std::iter::once(user_turn)).collect();
    GenerateContentRequest { contents }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Joins the text parts of the first candidate.
fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .filter(|text| !text.is_empty())
        .ok_or_else(|| CerebroError::completion("Gemini API returned no text in the response candidates"))
}

fn map_http_error(status: StatusCode, body: String) -> CerebroError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    CerebroError::completion(format!("Gemini API returned {}: {}", status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_appends_user_turn_to_history() {
        let history = vec![HistoryEntry::user("Hi"), HistoryEntry::model("Hello!")];
        let user_turn = HistoryEntry::user("How are you?");

        let body = serde_json::to_value(build_request(&history, &user_turn)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Hi" }] },
                    { "role": "model", "parts": [{ "text": "Hello!" }] },
                    { "role": "user", "parts": [{ "text": "How are you?" }] }
                ]
            })
        );
    }

    #[test]
    fn test_endpoint_includes_model_but_not_key() {
        let agent = GeminiApiAgent::new("secret").with_base_url("http://localhost:9000/models/");

        assert_eq!(
            agent.endpoint("gemini-2.0-flash"),
            "http://localhost:9000/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let agent = GeminiApiAgent::new("super-secret");
        assert!(!format!("{:?}", agent).contains("super-secret"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "**Hello** " }, { "text": "there" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(extract_text_response(response).unwrap(), "**Hello** there");
    }

    #[test]
    fn test_extract_text_without_candidates_is_error() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).unwrap();

        assert!(extract_text_response(response).unwrap_err().is_completion());
    }

    #[test]
    fn test_map_http_error_uses_api_message() {
        let body = json!({
            "error": { "code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT" }
        })
        .to_string();

        let err = map_http_error(StatusCode::BAD_REQUEST, body);

        assert_eq!(
            err,
            CerebroError::completion("Gemini API returned 400: INVALID_ARGUMENT: API key not valid.")
        );
    }

    #[test]
    fn test_map_http_error_falls_back_to_raw_body() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert_eq!(err, CerebroError::completion("Gemini API returned 502: upstream down"));
    }
}
