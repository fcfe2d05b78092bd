//! Grounded answer generation.
//!
//! The model is an opaque `(system, user) → text` collaborator. Low
//! temperature and a bounded output budget keep answers anchored to the
//! retrieved context instead of free-associating.

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::Error;

const TEMPERATURE: f32 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Generate an answer from a system prompt and a context-bearing user prompt.
pub async fn generate_answer(
    http: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String, Error> {
    match config.provider.as_str() {
        "gemini" => generate_gemini(http, config, system, user).await,
        "openai" => generate_openai(http, config, system, user).await,
        other => Err(Error::Llm(format!("unknown LLM provider: {other}"))),
    }
}

// ─── Gemini ──────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiTurn>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiTurn {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiGenerateResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

async fn generate_gemini(
    http: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String, Error> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| Error::Llm("GEMINI_API_KEY is not configured".to_string()))?;

    let url = format!(
        "{}/models/{}:generateContent",
        config.base_url, config.chat_model
    );

    let req = GeminiGenerateRequest {
        system_instruction: GeminiContent {
            parts: vec![GeminiPart {
                text: system.to_string(),
            }],
        },
        contents: vec![GeminiTurn {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: user.to_string(),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    };

    let resp = http
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&req)
        .send()
        .await
        .map_err(|e| Error::Llm(format!("Gemini request failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Llm(format!("Gemini returned {status}: {body}")));
    }

    let body: GeminiGenerateResponse = resp
        .json()
        .await
        .map_err(|e| Error::Llm(format!("failed to parse Gemini response: {e}")))?;

    let answer: String = body
        .candidates
        .first()
        .map(|c| {
            c.content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if answer.is_empty() {
        return Err(Error::Llm("Gemini returned no candidates".to_string()));
    }
    Ok(answer)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

async fn generate_openai(
    http: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
) -> Result<String, Error> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            OpenAiMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            OpenAiMessage {
                role: "user".to_string(),
                content: user.to_string(),
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_OUTPUT_TOKENS,
    };

    let resp = http
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .map_err(|e| Error::Llm(format!("OpenAI request failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Llm(format!("OpenAI returned {status}: {body}")));
    }

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .map_err(|e| Error::Llm(format!("failed to parse OpenAI response: {e}")))?;

    body.choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| Error::Llm("OpenAI returned no choices".to_string()))
}
