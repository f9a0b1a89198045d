//! Text-generation seam.
//!
//! Directors that need a model (persona summarization) and orchestration code
//! that sends built prompts both go through [`TextGenerator`]. Implementations:
//!
//! - [`FnGenerator`] wraps a closure;
//! - [`MockGenerator`] answers with a canned response (cost-estimation runs
//!   and tests);
//! - [`ChatCompletionsClient`] calls an OpenAI-compatible chat-completions
//!   endpoint with the sampling settings of the `llm` resource.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

/// Synchronous prompt → text generation.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> std::result::Result<String, String>;
}

/// A [`TextGenerator`] backed by a closure.
pub struct FnGenerator<F>(pub F);

impl<F> TextGenerator for FnGenerator<F>
where
    F: Fn(&str) -> std::result::Result<String, String> + Send + Sync,
{
    fn generate(&self, prompt: &str) -> std::result::Result<String, String> {
        (self.0)(prompt)
    }
}

/// Call `generator`, mapping its failure to [`Error::Generation`].
pub fn generate(generator: &dyn TextGenerator, prompt: &str) -> Result<String> {
    generator.generate(prompt).map_err(Error::Generation)
}

/// Which canned response a [`MockGenerator`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MockResponse {
    TeacherModel,
    Feedback,
    ClassDocumentSummary,
}

impl MockResponse {
    pub fn text(&self) -> &'static str {
        match self {
            MockResponse::TeacherModel => MOCK_TEACHER_MODEL,
            MockResponse::Feedback => MOCK_FEEDBACK,
            MockResponse::ClassDocumentSummary => MOCK_CLASS_DOCUMENT_SUMMARY,
        }
    }
}

/// Returns the same canned text for every prompt and counts calls.
#[derive(Debug)]
pub struct MockGenerator {
    response: MockResponse,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new(response: MockResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of prompts answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, prompt: &str) -> std::result::Result<String, String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        trace!("[mock] {:?} for {} char prompt", self.response, prompt.len());
        Ok(self.response.text().to_string())
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for OpenAI-compatible chat-completions endpoints.
///
/// `gpt-*` models go to the OpenAI endpoint with the key named by
/// `openai_api_key`; `gemini-*` models go to Google's OpenAI-compatible
/// endpoint with the key named by `gemini_api_key`.
pub struct ChatCompletionsClient {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsClient {
    /// Build a client from the `llm` resource, reading the API key from the
    /// process environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// Like [`from_config`](Self::from_config) with an explicit environment
    /// lookup.
    pub fn from_config_with<F>(config: &LlmConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (url, key_var) = if config.model_name.starts_with("gpt-") {
            (OPENAI_URL, config.openai_api_key.as_str())
        } else if config.model_name.starts_with("gemini-") {
            (GEMINI_URL, config.gemini_api_key.as_str())
        } else {
            return Err(Error::configuration(format!(
                "LLM model '{}' is not supported",
                config.model_name
            )));
        };

        let api_key = lookup(key_var)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::configuration(format!("environment variable {key_var} is not set"))
            })?;

        Self::new(url, api_key, config)
    }

    /// Client for an explicit endpoint and key.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("feedback-lab/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            model: config.model_name.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        }
    }
}

impl TextGenerator for ChatCompletionsClient {
    fn generate(&self, prompt: &str) -> std::result::Result<String, String> {
        let body = self.request_body(prompt);
        debug!(
            "[llm] request: model={}, max_tokens={}, temp={}, prompt={} chars",
            self.model,
            self.max_tokens,
            self.temperature,
            prompt.len()
        );

        let start = Instant::now();
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            "[llm] response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("chat completions HTTP {status}: {text}"));
        }

        let completion: ChatCompletion =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| "response has no message content".to_string())
    }
}

/// The generator the `llm` resource asks for: canned `mock` responses in
/// cost-estimation mode, the chat-completions client otherwise.
pub fn generator_for(config: &LlmConfig, mock: MockResponse) -> Result<Arc<dyn TextGenerator>> {
    if config.cost_estimation_mode {
        debug!("[llm] cost estimation mode: answering with {mock:?}");
        return Ok(Arc::new(MockGenerator::new(mock)));
    }
    Ok(Arc::new(ChatCompletionsClient::from_config(config)?))
}

const MOCK_TEACHER_MODEL: &str = "MOCKED TEACHER MODEL
- **Teaching Goals:**
- Develop students' ability to craft clear, compelling, and well-organized arguments.
- Ensure students understand the fundamental components of persuasive writing.
- Build students' confidence in expressing their viewpoints effectively.

- **Teaching Style:**
- Interactive and student-centered approach.
- Emphasis on providing constructive feedback.
- Encourage class discussions, group activities, and peer reviews.

- **Feedback Approach:**
- Thorough and specific in highlighting both strengths and areas for improvement.
- Provide actionable suggestions to refine writing skills.
- Balance critiques with positive reinforcement to maintain student motivation and support.

- **Class Structure:**
- Structured lessons covering thesis statements, supporting arguments, organization, and style.
- Eight-week course with specific assignments and activities.
- Additional support available through office hours and the Writing Center.";

const MOCK_FEEDBACK: &str = "MOCKED FEEDBACK
Your introduction sets the stage for a compelling essay by clearly presenting the topic of homework and the different viewpoints surrounding it. Your thesis statement is strong and clearly outlines your stance against homework, as well as the main arguments you will discuss. To enhance your introduction, consider adding a hook that grabs the reader's attention right from the start.";

const MOCK_CLASS_DOCUMENT_SUMMARY: &str = "MOCKED CLASS DOCUMENT SUMMARY
The instructor for the Persuasive Writing class focuses on helping students develop their persuasive writing skills through structured lessons on thesis statements, supporting arguments, organization, and enhancing language and style. The course is structured over eight weeks with specific assignments and activities. Additional support is available through office hours and the Writing Center.";
