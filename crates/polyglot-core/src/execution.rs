//! Remote code execution through a Judge0 server.
//!
//! Source and stdin are sent base64-encoded with `wait=true`, so a single
//! request returns the finished submission.

use crate::settings::{DEFAULT_JUDGE0_URL, Settings};
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors returned by the execution client.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The request could not be sent or the response not received.
    #[error("Execution request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("Execution service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body as sent by the service.
        body: String,
    },

    /// The response body could not be parsed.
    #[error("Invalid execution response: {0}")]
    InvalidResponse(String),

    /// A base64 field in the response could not be decoded.
    #[error("Failed to decode {field}: {message}")]
    Decode {
        /// Name of the offending field.
        field: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The value is neither a known language name nor a Judge0 id.
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Result type for execution operations.
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Languages known by name, with their Judge0 CE ids.
///
/// Any other language the server lists can be run by its numeric id, see
/// [`resolve_language_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionLanguage {
    /// C (GCC 9.2.0).
    C,
    /// C++ (GCC 9.2.0).
    Cpp,
    /// Java (OpenJDK 13.0.1).
    Java,
    /// Python (3.8.1).
    Python,
    /// JavaScript (Node.js 12.14.0).
    JavaScript,
}

impl ExecutionLanguage {
    /// Every named language.
    pub const ALL: [Self; 5] = [Self::C, Self::Cpp, Self::Java, Self::Python, Self::JavaScript];

    /// Judge0 `language_id`.
    pub const fn id(self) -> u32 {
        match self {
            Self::C => 50,
            Self::Cpp => 54,
            Self::Java => 62,
            Self::Python => 71,
            Self::JavaScript => 63,
        }
    }

    /// Lowercase name, also used as the fence tag for this language.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }

    /// Looks a language up by Judge0 id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.id() == id)
    }
}

impl fmt::Display for ExecutionLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionLanguage {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" => Ok(Self::C),
            "cpp" | "c++" => Ok(Self::Cpp),
            "java" => Ok(Self::Java),
            "python" | "py" => Ok(Self::Python),
            "javascript" | "js" => Ok(Self::JavaScript),
            _ => Err(ExecutionError::UnsupportedLanguage(s.to_string())),
        }
    }
}

/// Resolves a language name or a numeric Judge0 id to a `language_id`.
///
/// Numbers are passed through unchecked; the server rejects ids it does not
/// know.
pub fn resolve_language_id(value: &str) -> ExecutionResult<u32> {
    match value.trim().parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        Ok(_) => Err(ExecutionError::UnsupportedLanguage(value.to_string())),
        Err(_) => value.parse::<ExecutionLanguage>().map(ExecutionLanguage::id),
    }
}

/// What a finished submission produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The program ran; `stdout` may be empty.
    Success { stdout: String },
    /// The program wrote to stderr.
    RuntimeError { stderr: String },
    /// The program did not compile.
    CompileError { output: String },
}

impl ExecutionOutcome {
    /// Picks the outcome from decoded fields: stderr, then compiler output,
    /// then stdout.
    fn from_streams(stdout: String, stderr: String, compile_output: String) -> Self {
        if !stderr.is_empty() {
            Self::RuntimeError { stderr }
        } else if !compile_output.is_empty() {
            Self::CompileError { output: compile_output }
        } else {
            Self::Success { stdout }
        }
    }

    /// Text shown to the user.
    pub fn display_text(&self) -> String {
        match self {
            Self::Success { stdout } if stdout.is_empty() => "No Output".to_string(),
            Self::Success { stdout } => stdout.clone(),
            Self::RuntimeError { stderr } => format!("Error: {}", stderr),
            Self::CompileError { output } => format!("Compilation Error: {}", output),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// A finished submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub outcome: ExecutionOutcome,
    /// Judge0 status description (e.g. "Accepted", "Time Limit Exceeded").
    pub status: Option<String>,
    /// CPU time in seconds, as reported.
    pub time: Option<String>,
    /// Memory in kilobytes.
    pub memory: Option<u64>,
}

/// A language offered by the Judge0 server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judge0Language {
    pub id: u32,
    pub name: String,
}

/// Judge0 HTTP client.
#[derive(Debug, Clone)]
pub struct Judge0Client {
    base_url: String,
    api_key: Option<String>,
    host: Option<String>,
    client: Client,
}

impl Default for Judge0Client {
    fn default() -> Self {
        Self::new(DEFAULT_JUDGE0_URL)
    }
}

impl Judge0Client {
    /// A client for the server at `base_url`, without credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            host: None,
            client: Client::new(),
        }
    }

    /// A client configured from the `judge0` section of `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut client = Self::new(&settings.judge0.base_url);
        client.api_key = settings.judge0_api_key().map(str::to_string);
        client.host = settings.judge0.host.clone().filter(|h| !h.trim().is_empty());
        client
    }

    /// Sends `X-RapidAPI-Key` with every request.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sends `X-RapidAPI-Host` with every request.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.api_key {
            Some(key) => request.header("X-RapidAPI-Key", key),
            None => request,
        };
        match &self.host {
            Some(host) => request.header("X-RapidAPI-Host", host),
            None => request,
        }
    }

    /// Runs `source` as Judge0 language `language_id` with `stdin` and waits
    /// for the result.
    pub async fn submit(
        &self,
        language_id: u32,
        source: &str,
        stdin: &str,
    ) -> ExecutionResult<Submission> {
        debug!(
            language_id,
            source_len = source.len(),
            stdin_len = stdin.len(),
            "Submitting code to Judge0"
        );

        let url = format!("{}/submissions", self.base_url);
        let body = SubmissionRequest {
            language_id,
            source_code: general_purpose::STANDARD.encode(source),
            stdin: general_purpose::STANDARD.encode(stdin),
        };

        let response = self
            .authorize(self.client.post(&url))
            .query(&[("base64_encoded", "true"), ("wait", "true")])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send submission to Judge0");
                ExecutionError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %body, "Judge0 returned error status");
            return Err(ExecutionError::Api { status: status.as_u16(), body });
        }

        let result: SubmissionResponse = response
            .json()
            .await
            .map_err(|e| ExecutionError::InvalidResponse(e.to_string()))?;

        let submission = Submission {
            outcome: ExecutionOutcome::from_streams(
                decode_field("stdout", result.stdout.as_deref())?,
                decode_field("stderr", result.stderr.as_deref())?,
                decode_field("compile_output", result.compile_output.as_deref())?,
            ),
            status: result.status.map(|s| s.description),
            time: result.time,
            memory: result.memory,
        };

        info!(
            language_id,
            status = submission.status.as_deref().unwrap_or("unknown"),
            success = submission.outcome.is_success(),
            "Judge0 submission finished"
        );
        Ok(submission)
    }

    /// Lists the languages the server supports.
    pub async fn languages(&self) -> ExecutionResult<Vec<Judge0Language>> {
        let url = format!("{}/languages", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ExecutionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutionError::Api { status: status.as_u16(), body });
        }

        response.json().await.map_err(|e| ExecutionError::InvalidResponse(e.to_string()))
    }
}

/// Decodes a base64 response field, tolerating embedded line breaks.
fn decode_field(field: &'static str, value: Option<&str>) -> ExecutionResult<String> {
    let Some(value) = value else {
        return Ok(String::new());
    };
    let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ExecutionError::Decode { field, message: e.to_string() })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Serialize)]
struct SubmissionRequest {
    language_id: u32,
    source_code: String,
    stdin: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    status: Option<SubmissionStatus>,
    time: Option<String>,
    memory: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    description: String,
}
