use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::{info, warn};

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证

/// 主配置结构
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub audio: AudioConfig,
    pub service: ServiceConfig,
    pub channels: ChannelConfig,
}

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
}

/// 旁白音频配置（服务端不返回格式信息，只能按约定解码）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub progress_interval_ms: u64,
    pub status_channel_capacity: usize,
}

/// 生成服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub story_model: String,
    pub speech_model: String,
    pub voice: String,
    pub narration_char_limit: usize,
    pub api_key_env: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

/// 通道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub task_channel_capacity: usize,
    pub result_channel_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 820.0,
            title: "Dreamweaver".to_string(),
            resizable: true,
            vsync: true,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::audio::pcm::DEFAULT_SAMPLE_RATE,
            channels: crate::audio::pcm::DEFAULT_CHANNELS,
            progress_interval_ms: 16,
            status_channel_capacity: 64,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            story_model: "gemini-3-flash-preview".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Kore".to_string(),
            narration_char_limit: 3000,
            api_key_env: "GEMINI_API_KEY".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            task_channel_capacity: 8,
            result_channel_capacity: 8,
        }
    }
}

impl AudioConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::ValidationError("Window dimensions must be positive".to_string()));
        }

        if self.audio.sample_rate == 0 {
            return Err(ConfigError::ValidationError("Sample rate must be positive".to_string()));
        }

        if self.audio.channels == 0 {
            return Err(ConfigError::ValidationError("Channel count must be at least 1".to_string()));
        }

        if self.audio.progress_interval_ms == 0 {
            return Err(ConfigError::ValidationError("Progress interval must be positive".to_string()));
        }

        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("Service base URL must not be empty".to_string()));
        }

        if self.service.narration_char_limit == 0 {
            return Err(ConfigError::ValidationError("Narration character limit must be positive".to_string()));
        }

        if self.channels.task_channel_capacity == 0
            || self.channels.result_channel_capacity == 0
            || self.audio.status_channel_capacity == 0
        {
            return Err(ConfigError::ValidationError("Channel capacities must be positive".to_string()));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    /// 读取配置文件；文件不存在时写出默认配置，读取失败时回退到默认值
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let config = if path.exists() {
            match AppConfig::load_from_file(path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid configuration in {}, using defaults: {}", path.display(), e);
                    AppConfig::default()
                }
            }
        } else {
            let config = AppConfig::default();
            match config.save_to_file(path) {
                Ok(()) => info!("Wrote default configuration to {}", path.display()),
                Err(e) => warn!("Failed to write default configuration: {}", e),
            }
            config
        };

        Self {
            config,
            config_path: Some(path.to_path_buf()),
        }
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
