pub mod story;
pub mod tasks;

pub use story::{MagicIngredient, Story, StoryLength, StoryMood, StoryRequest, StoryTheme, TargetAge};
pub use tasks::{GeneratedStory, NarrationOutcome, StoryResult, StoryTask};
