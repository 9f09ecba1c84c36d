use anyhow::Context;
use axum::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiConfig;
use crate::images::ImagePayload;

pub const FOOD_PROMPT: &str = "Kamu adalah ahli gizi yang ramah. Lihat makanan di foto ini, \
lalu balas HANYA dengan JSON valid tanpa teks lain, dengan format persis: \
{\"deskripsi\": \"deskripsi singkat makanan dengan nada ramah dan bersahabat\", \
\"kalori\": estimasi total kalori (angka), \"karbo\": estimasi gram karbohidrat (angka), \
\"protein\": estimasi gram protein (angka), \"lemak\": estimasi gram lemak (angka)}. \
Semua nilai angka ditulis tanpa satuan.";

/// Vision model that turns a food photo into (hopefully JSON) text.
#[async_trait]
pub trait FoodAnalyzer: Send + Sync {
    async fn analyze(&self, image: &ImagePayload) -> anyhow::Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate; empty when the model returned nothing.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, cfg: &GeminiConfig) -> Self {
        Self {
            client,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl FoodAnalyzer for GeminiClient {
    async fn analyze(&self, image: &ImagePayload) -> anyhow::Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: FOOD_PROMPT },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("gemini generateContent")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("generateContent failed ({status}): {err}");
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("decode generateContent response")?;
        let text = parsed.text();
        debug!(model = %self.model, len = text.len(), "analysis text received");
        Ok(text)
    }
}
