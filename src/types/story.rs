use std::fmt;

/// 为选项枚举生成 `ALL` 列表、显示文本和 `Display`
macro_rules! story_option {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

story_option!(
    /// 故事主题
    StoryTheme {
        Space => "Space Adventure",
        Fantasy => "Magical Forest",
        Animals => "Friendly Animals",
        Ocean => "Deep Sea Wonders",
        Dinosaurs => "Dino World",
        Dreams => "Dreamy Clouds",
        Candy => "Candy Kingdom",
        Toys => "Toy Factory",
        Castle => "Ancient Castle",
        Garden => "Secret Garden",
        Heroes => "Superhero City",
        Time => "Time Travel",
    }
);

story_option!(
    /// 故事氛围
    StoryMood {
        Calm => "Soothing & Calm",
        Adventure => "Exciting Adventure",
        Funny => "Silly & Funny",
        Gentle => "Gentle & Soft",
        Mystery => "Mystery & Wonder",
        Brave => "Brave & Bold",
        Learn => "Learning & Discovery",
    }
);

story_option!(
    /// 故事长度
    StoryLength {
        Short => "Short (2 mins)",
        Medium => "Medium (5 mins)",
        Long => "Long (10 mins)",
    }
);

story_option!(
    /// 听众年龄段
    TargetAge {
        Toddler => "Tiny Tot (1-3)",
        Preschool => "Little Dreamer (4-6)",
        School => "Big Explorer (7-9)",
        Teen => "Young Sage (10+)",
    }
);

story_option!(
    /// 可选的故事元素
    MagicIngredient {
        Dragon => "A Friendly Dragon",
        Friendship => "Value of Friendship",
        Magic => "A Magic Wand",
        Lesson => "A Life Lesson",
        Night => "A Starry Night",
        Music => "Magical Music",
    }
);

/// 用户选择的故事参数
#[derive(Debug, Clone, PartialEq)]
pub struct StoryRequest {
    pub theme: StoryTheme,
    pub mood: StoryMood,
    pub length: StoryLength,
    pub age: TargetAge,
    pub ingredients: Vec<MagicIngredient>,
}

impl Default for StoryRequest {
    fn default() -> Self {
        Self {
            theme: StoryTheme::Space,
            mood: StoryMood::Calm,
            length: StoryLength::Short,
            age: TargetAge::Preschool,
            ingredients: Vec::new(),
        }
    }
}

impl StoryRequest {
    /// 切换某个元素的选中状态，保持选择顺序
    pub fn toggle_ingredient(&mut self, ingredient: MagicIngredient) {
        if let Some(index) = self.ingredients.iter().position(|i| *i == ingredient) {
            self.ingredients.remove(index);
        } else {
            self.ingredients.push(ingredient);
        }
    }
}

/// 生成的故事文本
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub title: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_lists_are_complete() {
        assert_eq!(StoryTheme::ALL.len(), 12);
        assert_eq!(StoryMood::ALL.len(), 7);
        assert_eq!(StoryLength::ALL.len(), 3);
        assert_eq!(TargetAge::ALL.len(), 4);
        assert_eq!(MagicIngredient::ALL.len(), 6);
        assert_eq!(StoryTheme::Ocean.to_string(), "Deep Sea Wonders");
    }

    #[test]
    fn toggling_ingredients_keeps_selection_order() {
        let mut request = StoryRequest::default();
        request.toggle_ingredient(MagicIngredient::Music);
        request.toggle_ingredient(MagicIngredient::Dragon);
        request.toggle_ingredient(MagicIngredient::Night);
        request.toggle_ingredient(MagicIngredient::Dragon);
        assert_eq!(request.ingredients, vec![MagicIngredient::Music, MagicIngredient::Night]);
    }
}
