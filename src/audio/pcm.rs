use base64::{Engine as _, engine::general_purpose};
use log::warn;

/// 语音合成约定的采样率
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
/// 语音合成约定的声道数
pub const DEFAULT_CHANNELS: u16 = 1;

const I16_SCALE: f32 = 32768.0;

/// PCM 解码错误
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid base64 audio: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("Channel count must be at least 1")]
    InvalidChannelCount,
    #[error("Sample rate must be positive")]
    InvalidSampleRate,
    #[error("Not enough PCM data for one frame: {len} bytes, {channels} channel(s)")]
    InsufficientData { len: usize, channels: u16 },
}

/// 解码后的音频：按声道分开存放的归一化样本
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// 时长（秒）= 帧数 / 采样率
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    #[cfg(test)]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// 第 `frame` 帧、第 `channel` 声道的样本，越界返回静音
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.channels
            .get(channel)
            .and_then(|data| data.get(frame))
            .copied()
            .unwrap_or(0.0)
    }

    /// 将秒数换算为帧下标，超出范围时截到末尾
    pub fn frame_at(&self, secs: f64) -> usize {
        if secs <= 0.0 {
            return 0;
        }
        let frame = (secs * self.sample_rate as f64).round() as usize;
        frame.min(self.frame_count())
    }

    #[cfg(test)]
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let frames = (duration_secs * sample_rate as f64).round() as usize;
        Self {
            channels: vec![vec![0.0; frames]],
            sample_rate,
        }
    }
}

/// 标准 base64 解码（忽略首尾空白）
pub fn decode_base64(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(general_purpose::STANDARD.decode(text.trim())?)
}

/// 将小端 16 位有符号 PCM 字节解码为样本缓冲区
///
/// 奇数长度时丢弃最后一个字节，不完整的尾帧同样丢弃，两种情况都会记录警告。
pub fn decode_pcm(bytes: &[u8], sample_rate: u32, num_channels: u16) -> Result<SampleBuffer, DecodeError> {
    if num_channels == 0 {
        return Err(DecodeError::InvalidChannelCount);
    }
    if sample_rate == 0 {
        return Err(DecodeError::InvalidSampleRate);
    }

    let channels = num_channels as usize;
    if bytes.len() % 2 != 0 {
        warn!("PCM data has odd length {}, discarding trailing byte", bytes.len());
    }

    let sample_count = bytes.len() / 2;
    let frame_count = sample_count / channels;
    let used_samples = frame_count * channels;
    if used_samples != sample_count {
        warn!(
            "PCM data ends with a partial frame, discarding {} sample(s)",
            sample_count - used_samples
        );
    }

    if frame_count == 0 && !bytes.is_empty() {
        return Err(DecodeError::InsufficientData {
            len: bytes.len(),
            channels: num_channels,
        });
    }

    let mut data: Vec<Vec<f32>> = (0..channels)
        .map(|_| Vec::with_capacity(frame_count))
        .collect();

    for (i, chunk) in bytes[..used_samples * 2].chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([chunk[0], chunk[1]]);
        data[i % channels].push(value as f32 / I16_SCALE);
    }

    Ok(SampleBuffer {
        channels: data,
        sample_rate,
    })
}

/// base64 文本直接解码为样本缓冲区
pub fn decode_narration(text: &str, sample_rate: u32, num_channels: u16) -> Result<SampleBuffer, DecodeError> {
    let bytes = decode_base64(text)?;
    decode_pcm(&bytes, sample_rate, num_channels)
}
