use log::warn;
use serde_json::Value;

use crate::types::{Story, StoryRequest};

pub const DEFAULT_TITLE: &str = "A Magical Tale";
pub const DEFAULT_CONTENT: &str = "Once upon a time...";

/// 构造故事生成提示词，要求模型返回 `{title, content}` JSON
pub fn build_story_prompt(request: &StoryRequest) -> String {
    let ingredients = if request.ingredients.is_empty() {
        "None".to_string()
    } else {
        request
            .ingredients
            .iter()
            .map(|i| i.label())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Write a bedtime story for a child.\n\
         Theme: {}\n\
         Mood: {}\n\
         Target Age Group: {} (Adjust vocabulary and complexity accordingly)\n\
         Target Length: {}\n\
         Special Ingredients to include: {}\n\
         \n\
         The story should be engaging, safe for children, and follow a traditional story structure.\n\
         Return the output in the following JSON format:\n\
         {{\n  \"title\": \"A short magical title\",\n  \"content\": \"The full story text goes here...\"\n}}",
        request.theme, request.mood, request.age, request.length, ingredients
    )
}

/// 构造朗读提示词，故事正文按字符数截断
pub fn build_narration_prompt(text: &str, char_limit: usize) -> String {
    let excerpt: String = text.chars().take(char_limit).collect();
    format!(
        "Narrate this bedtime story with a soft, soothing, and warm voice: {}",
        excerpt
    )
}

/// 解析模型返回的故事 JSON，缺失或格式错误时使用占位文本
pub fn parse_story_response(text: Option<&str>) -> Story {
    let raw = text.map(str::trim).filter(|t| !t.is_empty());

    let Some(raw) = raw else {
        return Story {
            title: DEFAULT_TITLE.to_string(),
            content: DEFAULT_CONTENT.to_string(),
        };
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Story {
            title: non_empty_field(&map, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: non_empty_field(&map, "content").unwrap_or_else(|| DEFAULT_CONTENT.to_string()),
        },
        Ok(_) | Err(_) => {
            warn!("Story response is not a JSON object, using raw text");
            Story {
                title: DEFAULT_TITLE.to_string(),
                content: raw.to_string(),
            }
        }
    }
}

fn non_empty_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
