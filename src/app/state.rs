use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use crossbeam_channel::{Receiver, Sender};
use rand::Rng;

use crate::audio::SampleBuffer;
use crate::types::{GeneratedStory, NarrationOutcome, StoryRequest, StoryResult, StoryTask};

/// 应用状态管理模块
/// 界面只读写这里的状态，音频引擎的状态由 Narrator 持有

pub const LOADING_MESSAGES: &[&str] = &[
    "Gathering stardust...",
    "Waking up the forest spirits...",
    "Consulting with the moon...",
    "Stretching the dragon's wings...",
    "Sprinkling fairy dust...",
    "Painting the dream clouds...",
    "Polishing the crystal ball...",
    "Humming a lullaby...",
];

const LOADING_MESSAGE_INTERVAL: Duration = Duration::from_millis(2500);

/// 正在展示的故事
#[derive(Debug, Clone)]
pub struct StoryView {
    pub title: String,
    pub content: String,
    /// 旁白不可用时的说明
    pub narration_note: Option<String>,
}

/// 生成请求状态
#[derive(Debug, Clone)]
pub struct GenerationState {
    pub is_loading: bool,
    /// 每次请求或重置都递增，旧编号的结果会被丢弃
    pub current_generation: u64,
    pub loading_message: &'static str,
    pub message_changed_at: Option<Instant>,
    pub error: Option<String>,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self {
            is_loading: false,
            current_generation: 0,
            loading_message: LOADING_MESSAGES[0],
            message_changed_at: None,
            error: None,
        }
    }
}

/// 播放相关的界面状态
#[derive(Debug, Default)]
pub struct PlaybackView {
    /// 输出设备不可用时的错误，控件禁用直到用户重试
    pub device_error: Option<String>,
    /// 用于重试的旁白
    pub last_narration: Option<SampleBuffer>,
    /// 由完成回调置位
    pub finished: Rc<Cell<bool>>,
}

/// 与故事线程通信的通道
#[derive(Debug)]
pub struct DataChannels {
    pub task_sender: Sender<StoryTask>,
    pub result_receiver: Receiver<StoryResult>,
}

/// 统一的应用状态管理
#[derive(Debug)]
pub struct AppState {
    pub request: StoryRequest,
    pub story: Option<StoryView>,
    pub generation: GenerationState,
    pub playback: PlaybackView,
    pub channels: DataChannels,
}

impl AppState {
    pub fn new(task_sender: Sender<StoryTask>, result_receiver: Receiver<StoryResult>) -> Self {
        Self {
            request: StoryRequest::default(),
            story: None,
            generation: GenerationState::default(),
            playback: PlaybackView::default(),
            channels: DataChannels {
                task_sender,
                result_receiver,
            },
        }
    }

    /// 开始新的请求，返回其编号
    pub fn begin_generation(&mut self, now: Instant) -> u64 {
        self.generation.current_generation += 1;
        self.generation.is_loading = true;
        self.generation.error = None;
        self.generation.loading_message = LOADING_MESSAGES[0];
        self.generation.message_changed_at = Some(now);
        self.generation.current_generation
    }

    /// 请求未能发出时回到选择界面
    pub fn fail_generation(&mut self, message: String) {
        self.generation.is_loading = false;
        self.generation.error = Some(message);
    }

    /// 接收故事线程的结果；过期的结果返回 `None`
    ///
    /// 成功时返回已就绪的旁白，由调用方交给 Narrator。
    pub fn accept_result(&mut self, result: StoryResult) -> Option<Option<SampleBuffer>> {
        if !self.generation.is_loading || result.generation != self.generation.current_generation {
            return None;
        }
        self.generation.is_loading = false;

        match result.outcome {
            Ok(GeneratedStory { story, narration }) => {
                let (buffer, note) = match narration {
                    NarrationOutcome::Ready(buffer) => (Some(buffer), None),
                    NarrationOutcome::Unavailable(reason) => (None, Some(reason)),
                };
                self.story = Some(StoryView {
                    title: story.title,
                    content: story.content,
                    narration_note: note,
                });
                self.playback.device_error = None;
                self.playback.last_narration = buffer.clone();
                self.playback.finished.set(false);
                Some(buffer)
            }
            Err(message) => {
                self.generation.error = Some(message);
                Some(None)
            }
        }
    }

    /// 回到选择界面，进行中的请求作废
    pub fn reset(&mut self) {
        self.generation.current_generation += 1;
        self.generation.is_loading = false;
        self.generation.error = None;
        self.story = None;
        self.playback.device_error = None;
        self.playback.last_narration = None;
        self.playback.finished.set(false);
        self.request.ingredients.clear();
    }

    /// 加载期间每隔一段时间随机切换提示语
    pub fn rotate_loading_message(&mut self, now: Instant) {
        if !self.generation.is_loading {
            return;
        }
        let due = match self.generation.message_changed_at {
            Some(changed_at) => now.duration_since(changed_at) >= LOADING_MESSAGE_INTERVAL,
            None => true,
        };
        if due {
            let index = rand::rng().random_range(0..LOADING_MESSAGES.len());
            self.generation.loading_message = LOADING_MESSAGES[index];
            self.generation.message_changed_at = Some(now);
        }
    }
}
