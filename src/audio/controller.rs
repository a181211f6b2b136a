use std::sync::Arc;
use std::time::Duration;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, info, warn};

use super::output::{DeviceError, OutputBackend, OutputContext, OutputNode};
use super::pcm::{DecodeError, SampleBuffer};
use super::ticker::{ProgressTicker, Waker};

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopped,
    Ended,
}

/// 推送给界面的状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub progress_percent: f64,
    pub position_secs: f64,
    pub duration_secs: f64,
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("Narration contains no audio frames")]
    EmptyBuffer,
}

/// 控制器选项
#[derive(Clone)]
pub struct ControllerOptions {
    pub tick_interval: Duration,
    /// 播放期间按 `tick_interval` 调用，为 `None` 时不启动刷新任务
    pub waker: Option<Waker>,
    pub status_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            waker: None,
            status_capacity: 64,
        }
    }
}

/// 播放控制器
///
/// 独占一个输出上下文和解码后的缓冲区。任意时刻最多只有一个输出节点，
/// 暂停时记录已播放的秒数，恢复时从该位置继续。被丢弃时停止节点、
/// 取消刷新任务并释放上下文。
pub struct PlaybackController {
    context: Box<dyn OutputContext>,
    node: Option<Box<dyn OutputNode>>,
    buffer: Arc<SampleBuffer>,
    state: PlaybackState,
    paused_offset_secs: f64,
    start_reference: f64,
    progress_percent: f64,
    on_ended: Option<Box<dyn FnMut()>>,
    subscribers: Vec<Sender<PlaybackStatus>>,
    ticker: Option<ProgressTicker>,
    options: ControllerOptions,
}

impl PlaybackController {
    /// 打开输出上下文并立即开始播放
    pub fn new(
        backend: &dyn OutputBackend,
        buffer: SampleBuffer,
        options: ControllerOptions,
    ) -> Result<Self, PlaybackError> {
        if buffer.is_empty() {
            return Err(PlaybackError::EmptyBuffer);
        }

        let context = backend.open()?;
        let mut controller = Self {
            context,
            node: None,
            buffer: Arc::new(buffer),
            state: PlaybackState::Idle,
            paused_offset_secs: 0.0,
            start_reference: 0.0,
            progress_percent: 0.0,
            on_ended: None,
            subscribers: Vec::new(),
            ticker: None,
            options,
        };

        info!(
            "Narration loaded: {} frames, {:.2}s at {} Hz",
            controller.buffer.frame_count(),
            controller.duration_secs(),
            controller.buffer.sample_rate()
        );

        // 失败时 controller 在此处被丢弃，Drop 负责释放上下文
        controller.play()?;
        Ok(controller)
    }

    /// 自然播放结束时调用，每次结束只调用一次
    pub fn set_on_ended(&mut self, callback: Box<dyn FnMut()>) {
        self.on_ended = Some(callback);
    }

    pub fn subscribe(&mut self) -> Receiver<PlaybackStatus> {
        let (sender, receiver) = bounded(self.options.status_capacity.max(1));
        let _ = sender.try_send(self.status());
        self.subscribers.push(sender);
        receiver
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Playing {
            return Ok(());
        }

        if self.context.is_suspended() {
            self.context.resume()?;
            debug!("Output context resumed");
        }

        self.release_node();

        let offset = self.paused_offset_secs.clamp(0.0, self.duration_secs());
        let node = self.context.start(Arc::clone(&self.buffer), offset)?;
        self.node = Some(node);
        self.start_reference = self.context.current_time() - offset;
        self.progress_percent = self.percent_at(offset);
        self.state = PlaybackState::Playing;
        self.start_ticker();

        info!("Playback started at {}", format_clock(offset));
        self.publish();
        Ok(())
    }

    pub fn pause(&mut self) {
        // 先处理可能已经发生的自然结束
        self.tick();
        if self.state != PlaybackState::Playing {
            return;
        }

        let elapsed = self.elapsed_secs();
        self.paused_offset_secs = elapsed;
        self.progress_percent = self.progress_percent.max(self.percent_at(elapsed));
        self.release_node();
        self.stop_ticker();
        self.state = PlaybackState::Paused;

        info!("Playback paused at {}", format_clock(elapsed));
        self.publish();
    }

    pub fn stop(&mut self) {
        self.release_node();
        self.stop_ticker();
        self.paused_offset_secs = 0.0;
        self.progress_percent = 0.0;
        if self.state != PlaybackState::Idle {
            self.state = PlaybackState::Stopped;
        }
        self.publish();
    }

    pub fn restart(&mut self) -> Result<(), PlaybackError> {
        self.stop();
        self.play()
    }

    /// 每帧调用：播放中更新进度并检测自然结束
    pub fn tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }

        if self.node.as_ref().is_some_and(|node| node.has_ended()) {
            self.finish();
            return;
        }

        let percent = self.percent_at(self.elapsed_secs());
        if percent > self.progress_percent {
            self.progress_percent = percent;
            self.publish();
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    pub fn duration_secs(&self) -> f64 {
        self.buffer.duration_secs()
    }

    /// 当前位置：播放中由进度换算，否则为暂停时记录的偏移
    pub fn position_secs(&self) -> f64 {
        if self.is_playing() {
            self.progress_percent / 100.0 * self.duration_secs()
        } else {
            self.paused_offset_secs
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            progress_percent: self.progress_percent,
            position_secs: self.position_secs(),
            duration_secs: self.duration_secs(),
        }
    }

    fn finish(&mut self) {
        // 节点已自然结束，直接丢弃
        self.node = None;
        self.stop_ticker();
        self.state = PlaybackState::Ended;
        self.paused_offset_secs = 0.0;
        self.progress_percent = 0.0;

        info!("Narration finished");
        self.publish();

        if let Some(callback) = self.on_ended.as_mut() {
            callback();
        }
    }

    fn elapsed_secs(&self) -> f64 {
        (self.context.current_time() - self.start_reference).clamp(0.0, self.duration_secs())
    }

    fn percent_at(&self, secs: f64) -> f64 {
        (secs / self.duration_secs() * 100.0).clamp(0.0, 100.0)
    }

    fn release_node(&mut self) {
        if let Some(mut node) = self.node.take() {
            node.stop();
        }
    }

    fn start_ticker(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        if let Some(waker) = &self.options.waker {
            self.ticker = Some(ProgressTicker::start(self.options.tick_interval, Arc::clone(waker)));
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn publish(&mut self) {
        let status = self.status();
        self.subscribers.retain(|sender| match sender.try_send(status) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Playback status subscriber is lagging, dropping update");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.release_node();
        self.stop_ticker();
        self.context.close();
        debug!("Playback controller torn down");
    }
}

/// 将秒数格式化为 `分:秒`，秒补齐两位
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 { secs.floor() as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use crate::audio::output::testing::MockBackend;

    fn ten_second_clip() -> SampleBuffer {
        SampleBuffer::silence(10.0, 1000)
    }

    fn controller(backend: &MockBackend) -> PlaybackController {
        PlaybackController::new(backend, ten_second_clip(), ControllerOptions::default()).unwrap()
    }

    #[test]
    fn construction_auto_plays() {
        let backend = MockBackend::new();
        let controller = controller(&backend);

        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(backend.log.borrow().opened, 1);
        assert_eq!(backend.log.borrow().started_offsets, vec![0.0]);
    }

    #[test]
    fn progress_follows_the_context_clock() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);

        backend.clock.advance(2.5);
        controller.tick();
        assert!((controller.progress_percent() - 25.0).abs() < 1e-9);
        assert!((controller.position_secs() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn pause_then_play_resumes_from_paused_position() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);

        backend.clock.advance(2.5);
        controller.pause();
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert!((controller.position_secs() - 2.5).abs() < 1e-9);

        // 暂停期间时钟前进不影响位置
        backend.clock.advance(4.0);
        controller.tick();
        assert!((controller.progress_percent() - 25.0).abs() < 1e-9);

        controller.play().unwrap();
        assert_eq!(backend.log.borrow().started_offsets, vec![0.0, 2.5]);
        assert!((controller.progress_percent() - 25.0).abs() < 1e-9);

        backend.clock.advance(1.0);
        controller.tick();
        assert!((controller.progress_percent() - 35.0).abs() < 1e-9);
    }

    #[test]
    fn pause_is_a_no_op_unless_playing() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        controller.stop();
        controller.pause();
        assert_eq!(controller.state(), PlaybackState::Stopped);
    }

    #[test]
    fn play_while_playing_changes_nothing() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        backend.clock.advance(1.0);
        controller.tick();
        let before = controller.status();

        controller.play().unwrap();
        assert_eq!(controller.status(), before);
        assert_eq!(backend.log.borrow().started_offsets.len(), 1);
    }

    #[test]
    fn restart_resets_to_zero_and_plays() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        backend.clock.advance(6.0);
        controller.pause();

        controller.restart().unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.progress_percent(), 0.0);
        assert_eq!(backend.log.borrow().started_offsets, vec![0.0, 0.0]);
    }

    #[test]
    fn stop_is_idempotent_and_resets_offset() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        backend.clock.advance(3.0);
        controller.pause();

        controller.stop();
        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(controller.position_secs(), 0.0);
        assert_eq!(controller.progress_percent(), 0.0);
    }

    #[test]
    fn natural_completion_fires_callback_once() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        let ended = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ended);
        controller.set_on_ended(Box::new(move || counter.set(counter.get() + 1)));

        backend.clock.advance(10.0);
        controller.tick();
        controller.tick();
        controller.pause();

        assert_eq!(controller.state(), PlaybackState::Ended);
        assert_eq!(ended.get(), 1);
        assert_eq!(controller.position_secs(), 0.0);

        // 结束后再次播放从头开始
        controller.play().unwrap();
        assert_eq!(backend.log.borrow().started_offsets.last(), Some(&0.0));
    }

    #[test]
    fn stopping_does_not_count_as_completion() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        let ended = Rc::new(Cell::new(0));
        let counter = Rc::clone(&ended);
        controller.set_on_ended(Box::new(move || counter.set(counter.get() + 1)));

        backend.clock.advance(4.0);
        controller.stop();
        backend.clock.advance(20.0);
        controller.tick();
        assert_eq!(ended.get(), 0);
    }

    #[test]
    fn progress_stays_within_bounds() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        let mut last = 0.0;
        for _ in 0..9 {
            backend.clock.advance(1.0);
            controller.tick();
            let progress = controller.progress_percent();
            assert!((0.0..=100.0).contains(&progress));
            assert!(progress >= last);
            last = progress;
        }
    }

    #[test]
    fn at_most_one_active_node() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        for _ in 0..3 {
            backend.clock.advance(0.5);
            controller.pause();
            controller.play().unwrap();
            controller.restart().unwrap();
        }
        assert_eq!(backend.log.borrow().max_active_nodes, 1);
    }

    #[test]
    fn suspended_context_is_resumed_on_play() {
        let backend = MockBackend {
            start_suspended: true,
            ..MockBackend::new()
        };
        let _controller = controller(&backend);
        assert_eq!(backend.log.borrow().resumed, 1);
    }

    #[test]
    fn device_failure_is_reported() {
        let backend = MockBackend {
            fail_open: true,
            ..MockBackend::new()
        };
        let result = PlaybackController::new(&backend, ten_second_clip(), ControllerOptions::default());
        assert!(matches!(result, Err(PlaybackError::Device(DeviceError::Open(_)))));
    }

    #[test]
    fn failed_resume_keeps_paused_position_without_a_node() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        backend.clock.advance(4.0);
        controller.pause();

        backend.suspend();
        backend.fail_resume.set(true);
        let result = controller.play();

        assert!(matches!(result, Err(PlaybackError::Device(DeviceError::Resume(_)))));
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.position_secs(), 4.0);
        let log = backend.log.borrow();
        assert_eq!(log.active_nodes, 0);
        assert_eq!(log.started_offsets, vec![0.0]);
    }

    #[test]
    fn empty_buffer_is_rejected_before_opening_device() {
        let backend = MockBackend::new();
        let result = PlaybackController::new(&backend, SampleBuffer::silence(0.0, 1000), ControllerOptions::default());
        assert!(matches!(result, Err(PlaybackError::EmptyBuffer)));
        assert_eq!(backend.log.borrow().opened, 0);
    }

    #[test]
    fn teardown_releases_node_and_context() {
        let backend = MockBackend::new();
        let controller = controller(&backend);
        drop(controller);

        let log = backend.log.borrow();
        assert_eq!(log.stopped, 1);
        assert_eq!(log.closed, 1);
        assert_eq!(log.active_nodes, 0);
    }

    #[test]
    fn teardown_cancels_progress_updates() {
        let backend = MockBackend::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        let options = ControllerOptions {
            tick_interval: Duration::from_millis(2),
            waker: Some(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..ControllerOptions::default()
        };

        let controller = PlaybackController::new(&backend, ten_second_clip(), options).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(wakes.load(Ordering::SeqCst) > 0);

        drop(controller);
        let after_drop = wakes.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(wakes.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn subscribers_receive_state_changes() {
        let backend = MockBackend::new();
        let mut controller = controller(&backend);
        let receiver = controller.subscribe();

        backend.clock.advance(5.0);
        controller.pause();

        let states: Vec<PlaybackState> = receiver.try_iter().map(|s| s.state).collect();
        assert_eq!(states.first(), Some(&PlaybackState::Playing));
        assert_eq!(states.last(), Some(&PlaybackState::Paused));
    }

    #[test]
    fn clock_format_pads_seconds() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(7.9), "0:07");
        assert_eq!(format_clock(65.0), "1:05");
        assert_eq!(format_clock(600.5), "10:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }
}
