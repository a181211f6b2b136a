use std::rc::Rc;
use crossbeam_channel::Receiver;
use log::{info, warn};

use crate::config::AudioConfig;
use super::controller::{ControllerOptions, PlaybackController, PlaybackError, PlaybackState, PlaybackStatus};
use super::output::OutputBackend;
use super::pcm::{decode_narration, SampleBuffer};
use super::ticker::Waker;

/// 当前旁白的持有者
///
/// 新旁白到来时先销毁旧的控制器（释放输出上下文），再创建新的控制器。
/// 界面读取的状态来自控制器推送的快照。
pub struct Narrator {
    backend: Box<dyn OutputBackend>,
    sample_rate: u32,
    channels: u16,
    options: ControllerOptions,
    controller: Option<PlaybackController>,
    status_receiver: Option<Receiver<PlaybackStatus>>,
    latest_status: Option<PlaybackStatus>,
    on_ended: Option<Rc<dyn Fn()>>,
}

impl Narrator {
    pub fn new(backend: Box<dyn OutputBackend>, config: &AudioConfig, waker: Option<Waker>) -> Self {
        Self {
            backend,
            sample_rate: config.sample_rate,
            channels: config.channels,
            options: ControllerOptions {
                tick_interval: config.tick_interval(),
                waker,
                status_capacity: config.status_channel_capacity,
            },
            controller: None,
            status_receiver: None,
            latest_status: None,
            on_ended: None,
        }
    }

    pub fn set_on_ended(&mut self, callback: Rc<dyn Fn()>) {
        self.on_ended = Some(callback);
    }

    /// 解码 base64 旁白并自动播放
    ///
    /// 界面走的是 `load`：故事线程已在后台解码，只把缓冲区交过来。
    /// 解码失败时保持当前控制器不变。
    pub fn initialize(&mut self, base64_audio: &str) -> Result<(), PlaybackError> {
        let buffer = decode_narration(base64_audio, self.sample_rate, self.channels)?;
        self.load(buffer)
    }

    /// 用已解码的缓冲区替换当前旁白并自动播放
    pub fn load(&mut self, buffer: SampleBuffer) -> Result<(), PlaybackError> {
        self.clear();

        let mut controller = match PlaybackController::new(self.backend.as_ref(), buffer, self.options.clone()) {
            Ok(controller) => controller,
            Err(e) => {
                warn!("Failed to start narration: {}", e);
                return Err(e);
            }
        };

        if let Some(callback) = &self.on_ended {
            let callback = Rc::clone(callback);
            controller.set_on_ended(Box::new(move || callback()));
        }

        self.status_receiver = Some(controller.subscribe());
        self.controller = Some(controller);
        self.drain_status();
        Ok(())
    }

    /// 销毁当前控制器
    pub fn clear(&mut self) {
        self.status_receiver = None;
        self.latest_status = None;
        if let Some(controller) = self.controller.take() {
            info!("Previous narration released at {:.0}%", controller.progress_percent());
        }
    }

    pub fn has_narration(&self) -> bool {
        self.controller.is_some()
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        let result = match self.controller.as_mut() {
            Some(controller) => controller.play(),
            None => Ok(()),
        };
        self.drain_status();
        result
    }

    pub fn pause(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            controller.pause();
        }
        self.drain_status();
    }

    pub fn restart(&mut self) -> Result<(), PlaybackError> {
        let result = match self.controller.as_mut() {
            Some(controller) => controller.restart(),
            None => Ok(()),
        };
        self.drain_status();
        result
    }

    /// 每帧调用：推进控制器并收取最新的状态快照
    pub fn tick(&mut self) {
        if let Some(controller) = self.controller.as_mut() {
            controller.tick();
        }
        self.drain_status();
    }

    /// 最近收到的状态快照，没有旁白时为 `None`
    pub fn status(&self) -> Option<PlaybackStatus> {
        self.latest_status
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.controller.as_ref().map(PlaybackController::state)
    }

    pub fn is_playing(&self) -> bool {
        self.controller.as_ref().is_some_and(PlaybackController::is_playing)
    }

    fn drain_status(&mut self) {
        if let Some(receiver) = &self.status_receiver {
            while let Ok(status) = receiver.try_recv() {
                self.latest_status = Some(status);
            }
        }
    }
}
