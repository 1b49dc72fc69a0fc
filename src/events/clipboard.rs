use serde::{Deserialize, Serialize};
use std::fmt;

/// Номер поколения буфера обмена. Монотонно растёт при каждом изменении
/// содержимого; используется как дешёвый идентификатор "вот этой конкретной
/// записи" без сравнения бинарного содержимого.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipboardGeneration(pub u64);

impl ClipboardGeneration {
    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ClipboardGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Событие "в буфере обмена появилось изображение"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEvent {
    pub generation: ClipboardGeneration,
    pub content_types: Vec<String>,
}

impl ClipboardEvent {
    pub fn new(generation: ClipboardGeneration, content_types: Vec<String>) -> Self {
        Self {
            generation,
            content_types,
        }
    }
}

impl fmt::Display for ClipboardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.generation, self.content_types.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_ordering() {
        let a = ClipboardGeneration(10);
        let b = a.next();

        assert_eq!(b.value(), 11);
        assert!(b > a);
    }

    #[test]
    fn test_event_display() {
        let event = ClipboardEvent::new(
            ClipboardGeneration(7),
            vec!["image/png".to_string()],
        );
        assert_eq!(format!("{}", event), "gen#7 [image/png]");
    }
}
