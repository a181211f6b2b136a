//! Gemini REST 客户端
//!
//! 使用 `reqwest::blocking`，只在故事线程中调用。

use std::env;
use std::time::Duration;
use dotenv::dotenv;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::types::{Story, StoryRequest};
use super::prompt::{build_narration_prompt, build_story_prompt, parse_story_response};

/// 上游生成服务错误
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Missing API key, set {0}")]
    MissingApiKey(String),

    #[error("{}", friendly_network_error(.0))]
    Network(#[from] reqwest::Error),

    #[error("Service returned {status}: {message}")]
    Api { status: u16, message: String },
}

fn friendly_network_error(e: &reqwest::Error) -> String {
    if e.is_connect() {
        return "Could not connect to the story service".to_string();
    }
    if e.is_timeout() {
        return "Story service timed out".to_string();
    }
    if e.is_decode() {
        return "Invalid response from story service".to_string();
    }
    format!("Network error: {e}")
}

/// 故事与语音生成服务
pub trait StoryService {
    fn generate_story(&self, request: &StoryRequest) -> Result<Story, UpstreamError>;

    /// 返回 base64 编码的 PCM 音频，服务未返回音频时为 `None`
    fn generate_speech(&self, text: &str) -> Result<Option<String>, UpstreamError>;
}

/// 没有可用客户端时的替身，每次调用都返回创建失败的原因
pub struct OfflineService {
    env_var: String,
}

impl OfflineService {
    pub fn new(env_var: &str) -> Self {
        Self {
            env_var: env_var.to_string(),
        }
    }
}

impl StoryService for OfflineService {
    fn generate_story(&self, _request: &StoryRequest) -> Result<Story, UpstreamError> {
        Err(UpstreamError::MissingApiKey(self.env_var.clone()))
    }

    fn generate_speech(&self, _text: &str) -> Result<Option<String>, UpstreamError> {
        Err(UpstreamError::MissingApiKey(self.env_var.clone()))
    }
}

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    config: ServiceConfig,
    api_key: String,
}

impl GeminiClient {
    /// 从环境变量（可来自 `.env`）读取 API key
    pub fn from_env(config: &ServiceConfig) -> Result<Self, UpstreamError> {
        dotenv().ok();

        let api_key = env::var(&config.api_key_env)
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| UpstreamError::MissingApiKey(config.api_key_env.clone()))?;

        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ServiceConfig, api_key: String) -> Result<Self, UpstreamError> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config: config.clone(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn generate_content(&self, model: &str, body: &GenerateContentRequest) -> Result<GenerateContentResponse, UpstreamError> {
        let url = self.endpoint(model);
        debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let message: String = resp.text().unwrap_or_default().chars().take(200).collect();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<GenerateContentResponse>()?)
    }
}

impl StoryService for GeminiClient {
    fn generate_story(&self, request: &StoryRequest) -> Result<Story, UpstreamError> {
        let body = GenerateContentRequest::story(build_story_prompt(request));
        let response = self.generate_content(&self.config.story_model, &body)?;

        let story = parse_story_response(response.text().as_deref());
        info!("Story generated: \"{}\" ({} chars)", story.title, story.content.len());
        Ok(story)
    }

    fn generate_speech(&self, text: &str) -> Result<Option<String>, UpstreamError> {
        let prompt = build_narration_prompt(text, self.config.narration_char_limit);
        let body = GenerateContentRequest::speech(prompt, &self.config.voice);
        let response = self.generate_content(&self.config.speech_model, &body)?;

        let audio = response.inline_audio();
        match &audio {
            Some(data) => info!("Speech generated: {} base64 chars", data.len()),
            None => info!("Speech service returned no audio"),
        }
        Ok(audio)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn story(prompt: String) -> Self {
        Self {
            contents: vec![Content::text(prompt)],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..GenerationConfig::default()
            },
        }
    }

    fn speech(prompt: String, voice: &str) -> Self {
        Self {
            contents: vec![Content::text(prompt)],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
                ..GenerationConfig::default()
            },
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(text: String) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text),
                inline_data: None,
            }],
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// 第一个候选中所有文本片段拼接
    fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    /// 第一个候选第一个片段中的音频数据
    fn inline_audio(&self) -> Option<String> {
        let inline = self.first_parts().first()?.inline_data.as_ref()?;
        if let Some(mime) = &inline.mime_type {
            debug!("Inline audio mime type: {}", mime);
        }
        Some(inline.data.clone())
    }
}
