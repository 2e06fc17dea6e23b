use crate::config::AgentSettings;
use crate::error::{Error, Result};
use async_openai::{
    self,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, OutputItem,
        OutputMessageContent, Role,
    },
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

const CHUNK_PLACEHOLDER: &str = "{comments_chunk}";
const MAX_OUTPUT_TOKENS: u32 = 4096;

const ROLE: &str = "Tech Insights Analyst";

const GOAL: &str = "Generate and synthesize insights from YouTube comments on tech videos. \
Analyze the comments in {comments_chunk} ONLY, find meaningful patterns and condense them into \
insights that capture the core message of viewer feedback. Answer with JSON only.";

const BACKSTORY: &str = "You are a sharp-witted analyst with a passion for the tech sector. \
You cut through the noise in comment sections to find what viewers actually care about, and \
every conclusion you draw is grounded in, and cites, the comments that support it.";

const TASK_DESCRIPTION: &str = "Analyze the comments list {comments_chunk} ONLY and produce \
actionable insights. Look for viewer pain points, requests, what viewers loved and popular \
tech questions. For requests and troubleshooting, propose a suggested solution. \
Cite the comment text that led to each conclusion, without comment numbers. \
Use only these categories: 'Requests', 'Complaints', 'Suggestions', 'Praise', \
'Troubleshooting'. A comment that fits none of them goes under 'Other'. \
Each category maps to an array of objects with a 'comment' and an 'insight' field. \
Use double quotes for every string, escape special characters, and do not leave trailing \
commas. Do not wrap the answer in code fences and do not add notes, explanations or \
closing remarks.";

const EXPECTED_OUTPUT: &str = "A single valid JSON object whose keys are the categories above \
and whose values are arrays of {\"comment\": ..., \"insight\": ...} objects. Nothing else.";

/// Static prompt material for the insight agent. Only the chunk text varies
/// between invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub task_description: String,
    pub expected_output: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            role: ROLE.to_string(),
            goal: GOAL.to_string(),
            backstory: BACKSTORY.to_string(),
            task_description: TASK_DESCRIPTION.to_string(),
            expected_output: EXPECTED_OUTPUT.to_string(),
        }
    }
}

impl PromptConfig {
    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\n\n{}\n\n{}",
            self.role,
            self.backstory,
            self.goal.replace(CHUNK_PLACEHOLDER, "the comments you are given")
        )
    }

    pub fn user_prompt(&self, chunk_text: &str) -> String {
        format!(
            "### Task\n{}\n\n### Expected output\n{}\n\n<COMMENTS>\n{}\n</COMMENTS>\n",
            self.task_description
                .replace(CHUNK_PLACEHOLDER, "between the <COMMENTS> tags"),
            self.expected_output,
            chunk_text
        )
    }
}

/// The external analysis step: one chunk in, one raw text answer out.
#[async_trait]
pub trait InsightAgent: Send + Sync {
    async fn invoke(&self, chunk_text: &str, prompt: &PromptConfig) -> Result<String>;
}

/// Spaces consecutive requests so no more than `requests_per_minute` are sent.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / requests_per_minute
        };
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.min_interval).await;
        }
        *last = Some(Instant::now());
    }
}

/// Insight agent backed by an OpenAI compatible Responses endpoint.
pub struct OpenAiInsightAgent {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    max_iterations: u32,
}

impl OpenAiInsightAgent {
    pub fn new(settings: &AgentSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::config("GROQ_API_KEY is not set"))?;

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&settings.api_base);

        Ok(Self {
            client: async_openai::Client::with_config(config),
            model: settings.model.clone(),
            max_iterations: settings.max_iterations.max(1),
        })
    }

    async fn ask(&self, system: &str, user: &str) -> Result<String> {
        let request = CreateResponseArgs::default()
            .max_output_tokens(MAX_OUTPUT_TOKENS)
            .model(&self.model)
            .temperature(0.0)
            .input(InputParam::Items(vec![
                InputItem::EasyMessage(
                    EasyInputMessageArgs::default()
                        .role(Role::System)
                        .content(system)
                        .build()?,
                ),
                InputItem::EasyMessage(
                    EasyInputMessageArgs::default()
                        .role(Role::User)
                        .content(user)
                        .build()?,
                ),
            ]))
            .build()?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e| Error::InvocationFailure(e.to_string()))?;

        let mut content = String::new();
        for output in response.output {
            if let OutputItem::Message(out) = output {
                for c in out.content {
                    match c {
                        OutputMessageContent::OutputText(text) => content.push_str(&text.text),
                        _ => {
                            warn!(content = ?c, "Unexpected content type");
                            continue;
                        }
                    }
                }
            }
        }

        Ok(content)
    }
}

#[async_trait]
impl InsightAgent for OpenAiInsightAgent {
    async fn invoke(&self, chunk_text: &str, prompt: &PromptConfig) -> Result<String> {
        let system = prompt.system_prompt();
        let user = prompt.user_prompt(chunk_text);

        for iteration in 1..=self.max_iterations {
            let answer = self.ask(&system, &user).await?;
            if !answer.trim().is_empty() {
                debug!(iteration, model = %self.model, "Agent produced an answer");
                return Ok(answer);
            }
            warn!(iteration, max = self.max_iterations, "Agent returned no text, asking again");
        }

        Err(Error::InvocationFailure(format!(
            "no answer after {} iterations",
            self.max_iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_the_chunk_once() {
        let prompt = PromptConfig::default();
        let chunk = r#"["great video","audio is too quiet"]"#;

        let system = prompt.system_prompt();
        let user = prompt.user_prompt(chunk);

        assert!(!system.contains(CHUNK_PLACEHOLDER));
        assert!(!user.contains(CHUNK_PLACEHOLDER));
        assert!(system.contains(ROLE));
        assert_eq!(user.matches(chunk).count(), 1);
        assert!(user.contains("'Troubleshooting'"));
    }

    #[test]
    fn rate_limiter_interval() {
        assert_eq!(RateLimiter::per_minute(100).min_interval, Duration::from_millis(600));
        assert_eq!(RateLimiter::per_minute(0).min_interval, Duration::ZERO);
    }

    #[tokio::test]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::per_minute(600);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let settings = AgentSettings {
            api_key: Some("  ".to_string()),
            ..AgentSettings::default()
        };
        assert!(matches!(
            OpenAiInsightAgent::new(&settings),
            Err(Error::Config(_))
        ));
    }
}
