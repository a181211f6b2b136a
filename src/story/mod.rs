pub mod prompt;
pub mod client;
pub mod worker;

pub use client::{GeminiClient, OfflineService, StoryService};
pub use worker::{run_story_worker, NARRATION_UNAVAILABLE};
