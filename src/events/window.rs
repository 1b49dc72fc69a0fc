use serde::{Deserialize, Serialize};
use std::fmt;

/// Информация об окне
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    pub title: String,
    pub class: String,
    pub pid: Option<u32>,
}

impl WindowInfo {
    pub fn new(title: String) -> Self {
        Self {
            title,
            class: String::new(),
            pid: None,
        }
    }

    pub fn with_class(mut self, class: String) -> Self {
        self.class = class;
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Проверить, соответствует ли окно паттерну (регистронезависимо)
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if pattern.is_empty() {
            return true;
        }
        let pattern_lower = pattern.to_lowercase();
        let title_lower = self.title.to_lowercase();
        let class_lower = self.class.to_lowercase();
        title_lower.contains(&pattern_lower) || class_lower.contains(&pattern_lower)
    }

    /// Проверить, соответствует ли окно любому из паттернов
    pub fn matches_any_pattern(&self, patterns: &[&str]) -> bool {
        patterns.iter().any(|pattern| self.matches_pattern(pattern))
    }

    /// Точное совпадение класса или заголовка (регистронезависимо)
    pub fn matches_exact(&self, name: &str) -> bool {
        self.class.eq_ignore_ascii_case(name) || self.title.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class.is_empty() {
            write!(f, "\"{}\"", self.title)
        } else {
            write!(f, "\"{}\" ({})", self.title, self.class)
        }
    }
}

/// Геометрия окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    /// Точка для клика-наводки фокуса: горизонтальный центр, нижняя часть
    /// окна, где обычно расположено поле ввода
    pub fn composer_point(&self) -> (i32, i32) {
        let x = self.x + (self.width as i32) / 2;
        let y = self.y + (self.height as i32 * 85) / 100;
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_info_creation() {
        let window = WindowInfo::new("Claude".to_string())
            .with_class("claude-desktop".to_string())
            .with_pid(1234);

        assert_eq!(window.title, "Claude");
        assert_eq!(window.class, "claude-desktop");
        assert_eq!(window.pid, Some(1234));
    }

    #[test]
    fn test_window_pattern_matching() {
        let window = WindowInfo::new("Claude - Chat".to_string())
            .with_class("claude-desktop".to_string());

        assert!(window.matches_pattern("claude"));
        assert!(window.matches_pattern("Chat"));
        assert!(!window.matches_pattern("spectacle"));

        assert!(window.matches_any_pattern(&["spectacle", "claude"]));
        assert!(!window.matches_any_pattern(&[]));

        assert!(window.matches_exact("claude-desktop"));
        assert!(!window.matches_exact("claude"));
    }

    #[test]
    fn test_composer_point_in_lower_portion() {
        let geometry = WindowGeometry {
            x: 100,
            y: 200,
            width: 800,
            height: 1000,
        };

        let (x, y) = geometry.composer_point();
        assert_eq!(x, 500);
        assert_eq!(y, 1050);
        assert!(y > geometry.y + (geometry.height as i32) / 2);
    }
}
