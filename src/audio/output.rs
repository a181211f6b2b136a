use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use log::{debug, info};

use super::pcm::SampleBuffer;

/// 输出设备错误
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to open audio output: {0}")]
    Open(String),
    #[error("Failed to resume audio output: {0}")]
    Resume(String),
    #[error("Audio output context is closed")]
    Closed,
}

/// 打开输出上下文的工厂（宿主音频子系统的边界）
pub trait OutputBackend {
    fn open(&self) -> Result<Box<dyn OutputContext>, DeviceError>;
}

/// 输出上下文：提供时钟，并负责启动读取缓冲区的输出节点
pub trait OutputContext {
    /// 上下文时钟，单位秒
    fn current_time(&self) -> f64;

    fn is_suspended(&self) -> bool;

    fn resume(&mut self) -> Result<(), DeviceError>;

    /// 从 `offset_secs` 处开始播放整个缓冲区
    fn start(&mut self, buffer: Arc<SampleBuffer>, offset_secs: f64) -> Result<Box<dyn OutputNode>, DeviceError>;

    /// 释放底层设备，之后的 `start` 返回 `DeviceError::Closed`
    fn close(&mut self);
}

/// 正在驱动硬件的单个输出节点
pub trait OutputNode {
    fn stop(&mut self);

    /// 缓冲区自然播放完毕；主动 `stop` 不算
    fn has_ended(&self) -> bool;
}

/// 基于 rodio 默认输出设备的后端
pub struct RodioBackend;

impl OutputBackend for RodioBackend {
    fn open(&self) -> Result<Box<dyn OutputContext>, DeviceError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| DeviceError::Open(e.to_string()))?;
        info!("Audio output stream opened");

        Ok(Box::new(RodioContext {
            stream: Some(stream),
            epoch: Instant::now(),
        }))
    }
}

struct RodioContext {
    stream: Option<OutputStream>,
    epoch: Instant,
}

impl OutputContext for RodioContext {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    // rodio 的输出流打开后一直在运行
    fn is_suspended(&self) -> bool {
        false
    }

    fn resume(&mut self) -> Result<(), DeviceError> {
        if self.stream.is_none() {
            return Err(DeviceError::Resume("stream already released".to_string()));
        }
        Ok(())
    }

    fn start(&mut self, buffer: Arc<SampleBuffer>, offset_secs: f64) -> Result<Box<dyn OutputNode>, DeviceError> {
        let stream = self.stream.as_ref().ok_or(DeviceError::Closed)?;

        let finished = Arc::new(AtomicBool::new(false));
        let start_frame = buffer.frame_at(offset_secs);
        let source = BufferSource::new(buffer, start_frame, Arc::clone(&finished));

        let sink = Sink::connect_new(stream.mixer());
        sink.append(source);
        sink.play();
        debug!("Output node started at frame {}", start_frame);

        Ok(Box::new(RodioNode { sink, finished }))
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Audio output stream released");
        }
    }
}

struct RodioNode {
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl OutputNode for RodioNode {
    fn stop(&mut self) {
        self.sink.stop();
    }

    fn has_ended(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// 从共享缓冲区按帧交错输出样本的音频源
struct BufferSource {
    buffer: Arc<SampleBuffer>,
    frame: usize,
    channel: usize,
    finished: Arc<AtomicBool>,
}

impl BufferSource {
    fn new(buffer: Arc<SampleBuffer>, start_frame: usize, finished: Arc<AtomicBool>) -> Self {
        Self {
            buffer,
            frame: start_frame,
            channel: 0,
            finished,
        }
    }
}

impl Iterator for BufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame >= self.buffer.frame_count() {
            // 缓冲区耗尽即为完成通知
            self.finished.store(true, Ordering::Release);
            return None;
        }

        let sample = self.buffer.sample(self.frame, self.channel);
        self.channel += 1;
        if self.channel == self.buffer.channel_count() as usize {
            self.channel = 0;
            self.frame += 1;
        }
        Some(sample)
    }
}

impl Source for BufferSource {
    fn current_span_len(&self) -> Option<usize> {
        let channels = self.buffer.channel_count() as usize;
        let remaining_frames = self.buffer.frame_count().saturating_sub(self.frame);
        Some((remaining_frames * channels).saturating_sub(self.channel))
    }

    fn channels(&self) -> u16 {
        self.buffer.channel_count()
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(self.buffer.duration_secs()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::decode_pcm;

    fn stereo_buffer() -> Arc<SampleBuffer> {
        let bytes: Vec<u8> = [1000i16, -1000, 2000, -2000]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        Arc::new(decode_pcm(&bytes, 8000, 2).unwrap())
    }

    #[test]
    fn buffer_source_interleaves_frames_and_signals_completion() {
        let finished = Arc::new(AtomicBool::new(false));
        let mut source = BufferSource::new(stereo_buffer(), 0, Arc::clone(&finished));

        assert_eq!(source.current_span_len(), Some(4));
        let samples: Vec<f32> = source.by_ref().collect();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[1], -1000.0 / 32768.0);
        assert_eq!(samples[2], 2000.0 / 32768.0);
        assert!(finished.load(Ordering::Acquire));
    }

    #[test]
    fn buffer_source_starts_at_offset_frame() {
        let finished = Arc::new(AtomicBool::new(false));
        let source = BufferSource::new(stereo_buffer(), 1, Arc::clone(&finished));
        assert_eq!(source.channels(), 2);
        assert_eq!(source.sample_rate(), 8000);

        let samples: Vec<f32> = source.collect();
        assert_eq!(samples, vec![2000.0 / 32768.0, -2000.0 / 32768.0]);
    }
}
