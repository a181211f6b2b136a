use crate::audio::SampleBuffer;
use super::{Story, StoryRequest};

/// 发送给故事线程的任务
#[derive(Debug, Clone)]
pub enum StoryTask {
    /// `generation` 用于丢弃过期的结果
    Generate {
        generation: u64,
        request: StoryRequest,
    },
    Shutdown,
}

/// 旁白生成结果
#[derive(Debug)]
pub enum NarrationOutcome {
    Ready(SampleBuffer),
    Unavailable(String),
}

/// 故事线程返回的结果
#[derive(Debug)]
pub struct StoryResult {
    pub generation: u64,
    pub outcome: Result<GeneratedStory, String>,
}

#[derive(Debug)]
pub struct GeneratedStory {
    pub story: Story,
    pub narration: NarrationOutcome,
}

impl StoryResult {
    pub fn success(generation: u64, story: Story, narration: NarrationOutcome) -> Self {
        Self {
            generation,
            outcome: Ok(GeneratedStory { story, narration }),
        }
    }

    pub fn error(generation: u64, message: String) -> Self {
        Self {
            generation,
            outcome: Err(message),
        }
    }
}
