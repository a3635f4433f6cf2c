use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::state::{Citation, MapCitation, Role, UserLocation, WebCitation};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const SYSTEM_INSTRUCTION: &str = "You are GeoGuide AI, a world-class mapping and location expert. \
Your primary tool is Google Maps. Use it to find businesses, landmarks, and geographic features. \
When users ask for \"nearby\" places, use the provided geolocation data. \
Provide detailed answers about locations, including interesting facts, history, or practical tips. \
Always ensure that if the Google Maps tool is used, the response provides high-quality grounding. \
If you mention specific places, ensure they are reflected in the grounding metadata so the user can see them as interactive cards.";

/// Shown when the model grounded its answer on places but wrote no text.
/// Whitespace-only text counts as no text here and for [`EMPTY_ANSWER_FALLBACK`].
pub const MAP_ONLY_FALLBACK: &str = "I've found some relevant locations for you on the map:";
/// Shown when the model returned neither text nor citations
pub const EMPTY_ANSWER_FALLBACK: &str =
    "I'm sorry, I couldn't find a descriptive answer for that query.";

/// One prior turn sent back to the provider as context
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTurn {
    pub role: Role,
    pub text: String,
}

/// The unwrapped result of a provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub grounding_chunks: Vec<Citation>,
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("request to Gemini failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gemini API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed Gemini response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Anything that can turn a prompt plus context into a grounded answer
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn answer(
        &self,
        prompt: &str,
        location: Option<UserLocation>,
        history: &[HistoryTurn],
    ) -> Result<Answer, AnswerError>;
}

// Request wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    tools: [Tool; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Tool {
    GoogleMaps {},
    GoogleSearch {},
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    retrieval_config: RetrievalConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfig {
    lat_lng: LatLng,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

// Response wire format

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    maps: Option<MapsChunk>,
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapsChunk {
    uri: Option<String>,
    title: Option<String>,
    place_answer_sources: Option<PlaceAnswerSources>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceAnswerSources {
    #[serde(default)]
    review_snippets: Vec<ReviewSnippet>,
}

/// Review snippets arrive either as bare strings or as review objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReviewSnippet {
    Text(String),
    Review {
        review: Option<String>,
        text: Option<String>,
        title: Option<String>,
    },
}

impl ReviewSnippet {
    fn into_text(self) -> Option<String> {
        let snippet = match self {
            ReviewSnippet::Text(text) => Some(text),
            ReviewSnippet::Review { review, text, title } => review.or(text).or(title),
        };
        snippet.filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

impl GroundingChunk {
    fn into_citation(self) -> Option<Citation> {
        if let Some(maps) = self.maps {
            let review_snippets = maps
                .place_answer_sources
                .map(|sources| {
                    sources
                        .review_snippets
                        .into_iter()
                        .filter_map(ReviewSnippet::into_text)
                        .collect()
                })
                .unwrap_or_default();
            return maps.uri.map(|uri| {
                Citation::Map(MapCitation {
                    uri,
                    title: maps.title,
                    review_snippets,
                })
            });
        }
        self.web
            .and_then(|web| web.uri.map(|uri| Citation::Web(WebCitation { uri, title: web.title })))
    }
}

fn build_request<'a>(
    prompt: &'a str,
    location: Option<UserLocation>,
    history: &'a [HistoryTurn],
) -> GenerateContentRequest<'a> {
    let mut contents: Vec<Content<'a>> = history
        .iter()
        .map(|turn| Content {
            role: turn.role.as_str(),
            parts: vec![Part { text: &turn.text }],
        })
        .collect();
    contents.push(Content {
        role: Role::User.as_str(),
        parts: vec![Part { text: prompt }],
    });

    GenerateContentRequest {
        contents,
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: SYSTEM_INSTRUCTION,
            }],
        },
        tools: [Tool::GoogleMaps {}, Tool::GoogleSearch {}],
        tool_config: location.map(|loc| ToolConfig {
            retrieval_config: RetrievalConfig {
                lat_lng: LatLng {
                    latitude: loc.latitude,
                    longitude: loc.longitude,
                },
            },
        }),
    }
}

fn into_answer(response: GenerateContentResponse) -> Answer {
    let candidate = response.candidates.into_iter().next();

    let (text, chunks) = match candidate {
        Some(candidate) => {
            let text: String = candidate
                .content
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .filter(|part| !part.thought)
                        .filter_map(|part| part.text)
                        .collect()
                })
                .unwrap_or_default();
            let chunks = candidate
                .grounding_metadata
                .map(|meta| meta.grounding_chunks)
                .unwrap_or_default();
            (text, chunks)
        }
        None => (String::new(), Vec::new()),
    };

    let grounding_chunks: Vec<Citation> = chunks
        .into_iter()
        .filter_map(GroundingChunk::into_citation)
        .collect();

    let text = if !text.trim().is_empty() {
        text
    } else if !grounding_chunks.is_empty() {
        MAP_ONLY_FALLBACK.to_string()
    } else {
        EMPTY_ANSWER_FALLBACK.to_string()
    };

    Answer {
        text,
        grounding_chunks,
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        location: Option<UserLocation>,
        history: &[HistoryTurn],
    ) -> Result<Answer, AnswerError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = build_request(prompt, location, history);

        debug!(
            model = %self.model,
            history = history.len(),
            located = location.is_some(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AnswerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)?;
        let answer = into_answer(parsed);
        debug!(citations = answer.grounding_chunks.len(), "received answer");
        Ok(answer)
    }
}

#[async_trait]
impl AnswerService for GeminiClient {
    async fn answer(
        &self,
        prompt: &str,
        location: Option<UserLocation>,
        history: &[HistoryTurn],
    ) -> Result<Answer, AnswerError> {
        self.generate(prompt, location, history).await.map_err(|e| {
            error!("Gemini API error: {}", e);
            e
        })
    }
}
