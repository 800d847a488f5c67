//! Typed client for the interview-prep backend HTTP API.
//!
//! Every call is blocking and runs on a worker thread, never on the UI
//! thread. Responses are decoded into typed structs so a malformed body
//! surfaces as a decode error instead of leaking into the transcript.

use crate::config::AppConfig;
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Content categories the backend knows about. Closed set; the wire value
/// is the snake_case rendering of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    InterviewQuestions,
    StudyMaterial,
    Tips,
    MockInterview,
    CommonMistakes,
}

impl SectionType {
    pub const ALL: [SectionType; 5] = [
        SectionType::InterviewQuestions,
        SectionType::StudyMaterial,
        SectionType::Tips,
        SectionType::MockInterview,
        SectionType::CommonMistakes,
    ];

    /// Wire value sent as `section_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::InterviewQuestions => "interview_questions",
            SectionType::StudyMaterial => "study_material",
            SectionType::Tips => "tips",
            SectionType::MockInterview => "mock_interview",
            SectionType::CommonMistakes => "common_mistakes",
        }
    }

    /// Label shown in the transcript when the category is requested.
    pub fn label(self) -> &'static str {
        match self {
            SectionType::InterviewQuestions => "📌 Interview Questions",
            SectionType::StudyMaterial => "📚 Study Material",
            SectionType::Tips => "💡 Tips",
            SectionType::MockInterview => "🎯 Mock Interview",
            SectionType::CommonMistakes => "⚠️ Common Mistakes",
        }
    }
}

/// One entry from `/api/microphones`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Microphone {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct ContentRequest<'a> {
    company: &'a str,
    role: &'a str,
    section_type: SectionType,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    company: &'a str,
    role: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: Option<String>,
    error: Option<String>,
}

/// Chat reply as the backend reports it: an answer, or an
/// application-level error carried in the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Response(String),
    Error(String),
}

impl ChatResponse {
    fn into_outcome(self) -> Result<ChatOutcome> {
        if let Some(error) = self.error {
            return Ok(ChatOutcome::Error(error));
        }
        self.response
            .map(ChatOutcome::Response)
            .ok_or_else(|| anyhow!("chat response carried neither response nor error"))
    }
}

#[derive(Debug, Deserialize)]
struct SpeechToTextResponse {
    text: Option<String>,
    error: Option<String>,
}

/// Transcription result as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SttOutcome {
    Text(String),
    Error(String),
}

impl SpeechToTextResponse {
    fn into_outcome(self) -> Result<SttOutcome> {
        if let Some(error) = self.error {
            return Ok(SttOutcome::Error(error));
        }
        self.text
            .map(SttOutcome::Text)
            .ok_or_else(|| anyhow!("speech-to-text response carried neither text nor error"))
    }
}

/// Blocking client for the six backend endpoints.
pub struct ApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client with the CLI-configured timeouts and base URL.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_timeouts(
            &config.server_url,
            Duration::from_millis(config.http_timeout_ms),
            Duration::from_millis(config.connect_timeout_ms),
        )
    }

    /// Build a client with explicit timeouts (the doctor probe uses a
    /// much shorter window than interactive calls).
    pub fn with_timeouts(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `/api/microphones`.
    pub fn list_microphones(&self) -> Result<Vec<Microphone>> {
        let mics: Vec<Microphone> = self
            .client
            .get(self.url("/api/microphones"))
            .send()
            .context("microphone list request failed")?
            .error_for_status()
            .context("microphone list request rejected")?
            .json()
            .context("microphone list response was not valid JSON")?;
        debug!(count = mics.len(), "microphones fetched");
        Ok(mics)
    }

    /// GET `/api/companies`.
    pub fn list_companies(&self) -> Result<Vec<String>> {
        let companies: Vec<String> = self
            .client
            .get(self.url("/api/companies"))
            .send()
            .context("company list request failed")?
            .error_for_status()
            .context("company list request rejected")?
            .json()
            .context("company list response was not a JSON string array")?;
        debug!(count = companies.len(), "companies fetched");
        Ok(companies)
    }

    /// GET `/api/roles/{company}`. The company lands in a path segment,
    /// so it is percent-encoded.
    pub fn list_roles(&self, company: &str) -> Result<Vec<String>> {
        let url = roles_url(&self.base_url, company)?;
        let roles: Vec<String> = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("role list request for '{company}' failed"))?
            .error_for_status()
            .context("role list request rejected")?
            .json()
            .context("role list response was not a JSON string array")?;
        debug!(count = roles.len(), "roles fetched");
        Ok(roles)
    }

    /// POST `/api/content` with `{company, role, section_type}`.
    pub fn content(&self, company: &str, role: &str, section: SectionType) -> Result<String> {
        let body = ContentRequest {
            company,
            role,
            section_type: section,
        };
        let response: ContentResponse = self
            .client
            .post(self.url("/api/content"))
            .json(&body)
            .send()
            .with_context(|| format!("content request for '{}' failed", section.as_str()))?
            .error_for_status()
            .context("content request rejected")?
            .json()
            .context("content response was missing the content field")?;
        Ok(response.content)
    }

    /// POST `/api/chat` with `{message, company, role}`.
    pub fn chat(&self, message: &str, company: &str, role: &str) -> Result<ChatOutcome> {
        let body = ChatRequest {
            message,
            company,
            role,
        };
        let response: ChatResponse = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .context("chat request failed")?
            .error_for_status()
            .context("chat request rejected")?
            .json()
            .context("chat response was not valid JSON")?;
        response.into_outcome()
    }

    /// POST `/api/speech-to-text` with the recording attached as the
    /// multipart field `audio`.
    pub fn speech_to_text(&self, wav_bytes: Vec<u8>) -> Result<SttOutcome> {
        let byte_len = wav_bytes.len();
        let part = Part::bytes(wav_bytes)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .context("failed to build audio upload part")?;
        let form = Form::new().part("audio", part);
        debug!(bytes = byte_len, "uploading recording");
        let response: SpeechToTextResponse = self
            .client
            .post(self.url("/api/speech-to-text"))
            .multipart(form)
            .send()
            .context("speech-to-text request failed")?
            .error_for_status()
            .context("speech-to-text request rejected")?
            .json()
            .context("speech-to-text response was not valid JSON")?;
        response.into_outcome()
    }
}

/// Build the roles URL with the company percent-encoded as a path segment.
fn roles_url(base_url: &str, company: &str) -> Result<String> {
    let mut url = Url::parse(base_url)
        .with_context(|| format!("invalid server URL '{base_url}'"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("server URL '{base_url}' cannot hold a path"))?
        .pop_if_empty()
        .extend(["api", "roles", company]);
    Ok(url.into())
}
