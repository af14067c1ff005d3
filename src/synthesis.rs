//! Synthesis gateway
//!
//! Turns an evidence summary into a narrative analyst report and a
//! structured buy/avoid verdict. The orchestrator only depends on the
//! trait; the production implementation calls the OpenAI
//! chat-completions API through a pooled reqwest::Client.

use crate::error::ResearchError;
use crate::models::{Recommendation, ResearchSummary, Subject, Verdict};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::{error, info};

/// Prompt-side cap on the flattened evidence text.
const SUMMARY_PROMPT_MAX_CHARS: usize = 50_000;
/// Prompt-side cap on the report fed back into validation.
const REPORT_PROMPT_MAX_CHARS: usize = 20_000;

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Produce the narrative analyst report from collected evidence.
    async fn synthesize(&self, subject: &Subject, summary: &ResearchSummary) -> Result<String>;

    /// Validate the buy/avoid decision against evidence and report.
    /// A Recommendation::Error in the returned verdict is treated by
    /// the orchestrator as a stage failure.
    async fn validate(
        &self,
        subject: &Subject,
        summary: &ResearchSummary,
        report: &str,
    ) -> Result<Verdict>;
}

/// OpenAI-backed synthesizer (connection-pooled)
pub struct OpenAiSynthesizer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiSynthesizer {
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ResearchError::ConfigError("OPENAI_API_KEY not set".to_string()))?;
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Ok(Self::new(api_key, model))
    }

    async fn chat(&self, request: ChatRequest) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(ResearchError::ConfigError(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        info!(model = %self.model, "Calling OpenAI API");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {}", e);
                ResearchError::SynthesisError(format!("OpenAI request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("OpenAI error response ({}): {}", status, body);
            return Err(ResearchError::SynthesisError(format!(
                "OpenAI returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ResearchError::SynthesisError(format!("OpenAI parse error: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ResearchError::SynthesisError("Empty response from OpenAI".to_string())
            })
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, subject: &Subject, summary: &ResearchSummary) -> Result<String> {
        let prompt = format!(
            "You are a strict, conservative equity research analyst. Write a \
             comprehensive markdown analyst report for {name}, starting with a bold \
             **BUY** or **AVOID** recommendation. Prioritize risks, fraud indicators, \
             governance issues and past track record; default to AVOID unless the \
             evidence is compelling. Judge whether a 40%+ return over 3 years is \
             plausible.\n\nFinancial Data:\n{facts}\n\nResearch Evidence (by \
             Category):\n{evidence}",
            name = subject.name,
            facts = flatten_facts(subject),
            evidence = flatten_summary(summary, SUMMARY_PROMPT_MAX_CHARS),
        );

        self.chat(ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a strict and critical equity research analyst. \
                              You provide evidence-based recommendations with extreme scrutiny."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature: 0.2,
            response_format: None,
        })
        .await
    }

    async fn validate(
        &self,
        subject: &Subject,
        summary: &ResearchSummary,
        report: &str,
    ) -> Result<Verdict> {
        let report_text = if report.len() > REPORT_PROMPT_MAX_CHARS {
            let cut: String = report.chars().take(REPORT_PROMPT_MAX_CHARS).collect();
            format!("{}... (truncated)", cut)
        } else {
            report.to_string()
        };

        let prompt = format!(
            "Evaluate {name} for a BUY or AVOID decision with extreme scrutiny. \
             Only choose BUY when a 40%+ return over 3 years is highly probable and \
             there are no material red flags; when in doubt choose AVOID.\n\n\
             Financial Metrics:\n{facts}\n\nResearch Evidence:\n{evidence}\n\n\
             Analyst Report:\n{report}\n\n\
             Respond with a JSON object: {{\"recommendation\": \"BUY\"|\"AVOID\", \
             \"confidence\": \"high\"|\"medium\"|\"low\", \"expected_return_3y\": string, \
             \"probability_40pct_return\": string, \"key_drivers\": [string], \
             \"key_risks\": [string], \"red_flags_found\": [string], \
             \"financial_concerns\": [string], \"reasoning\": string}}",
            name = subject.name,
            facts = flatten_facts(subject),
            evidence = flatten_summary(summary, SUMMARY_PROMPT_MAX_CHARS / 2),
            report = report_text,
        );

        let raw = self
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: "You are a strict quantitative analyst specializing in \
                                  return projections and risk assessment. You respond only \
                                  with the requested JSON object."
                            .to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: prompt,
                    },
                ],
                temperature: 0.1,
                response_format: Some(json!({"type": "json_object"})),
            })
            .await?;

        serde_json::from_str::<Verdict>(&raw).map_err(|e| {
            ResearchError::ValidationError(format!("verdict parse error: {}", e))
        })
    }
}

/// Flatten the evidence summary into bounded prompt text. Evidence is
/// limited to the top ten items per subtopic.
pub fn flatten_summary(summary: &ResearchSummary, max_chars: usize) -> String {
    let mut out = String::new();

    'outer: for bundle in &summary.categories {
        out.push_str(&format!("\n## {}\n", bundle.category.replace('_', " ")));

        for sub in &bundle.subtopics {
            out.push_str(&format!(
                "\nSubtopic: {}\nQuery: {}\nResults: {}\n",
                sub.subtopic, sub.query, sub.results_count
            ));
            if let Some(err) = &sub.error {
                out.push_str(&format!("Error: {}\n", err));
            }

            for (i, item) in sub.evidence.iter().take(10).enumerate() {
                out.push_str(&format!(
                    "{}. {} [{} | {} | {}]\n   {}\n",
                    i + 1,
                    item.title,
                    item.source_domain,
                    item.retrieval_date,
                    item.confidence,
                    item.excerpt
                ));
            }

            if out.len() >= max_chars {
                let mut cut = max_chars;
                while !out.is_char_boundary(cut) {
                    cut -= 1;
                }
                out.truncate(cut);
                out.push_str("\n... (truncated for length)");
                break 'outer;
            }
        }
    }

    out
}

fn flatten_facts(subject: &Subject) -> String {
    if subject.facts.is_empty() {
        return "- (no reference facts provided)".to_string();
    }
    subject
        .facts
        .iter()
        .map(|(k, v)| format!("- {}: {}", k.replace('_', " "), v))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

//
// ================= Test / development synthesizers =================
//

/// Mock synthesizer for development and tests: deterministic report
/// and a fixed verdict, no LLM dependency.
pub struct MockSynthesizer {
    pub recommendation: Recommendation,
}

impl MockSynthesizer {
    pub fn new(recommendation: Recommendation) -> Self {
        Self { recommendation }
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, subject: &Subject, summary: &ResearchSummary) -> Result<String> {
        Ok(format!(
            "**{}**\n\n# Analyst Report: {}\n\nEvidence items reviewed: {}\n",
            self.recommendation,
            subject.name,
            summary.evidence_count()
        ))
    }

    async fn validate(
        &self,
        _subject: &Subject,
        _summary: &ResearchSummary,
        _report: &str,
    ) -> Result<Verdict> {
        Ok(Verdict {
            recommendation: self.recommendation,
            confidence: "medium".to_string(),
            expected_return_3y: "N/A".to_string(),
            probability_40pct_return: "low".to_string(),
            key_drivers: vec!["mock driver".to_string()],
            key_risks: vec!["mock risk".to_string()],
            red_flags_found: Vec::new(),
            financial_concerns: Vec::new(),
            reasoning: "mock verdict".to_string(),
        })
    }
}
