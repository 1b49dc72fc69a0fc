use super::Pasteboard;
use crate::error::{BridgeError, Result};
use crate::events::ClipboardGeneration;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Эмуляция буфера обмена для dry-run режима и тестов.
/// Позволяет тестам подкладывать содержимое и двигать поколение вручную.
pub struct DryPasteboard {
    state: Mutex<DryState>,
}

#[derive(Default)]
struct DryState {
    generation: u64,
    has_image: bool,
    has_text: bool,
    reject_images: bool,
    self_caused: HashSet<u64>,
}

impl DryPasteboard {
    pub fn new() -> Self {
        info!("Инициализация DryPasteboard (эмуляция буфера обмена)");
        Self {
            state: Mutex::new(DryState::default()),
        }
    }

    /// Эмулировать внешнюю запись изображения (чужое приложение, скриншотер)
    pub fn place_external_image(&self) -> ClipboardGeneration {
        let mut state = self.state.lock();
        state.generation += 1;
        state.has_image = true;
        state.has_text = false;
        ClipboardGeneration(state.generation)
    }

    /// Эмулировать внешнюю запись текста
    pub fn place_external_text(&self) -> ClipboardGeneration {
        let mut state = self.state.lock();
        state.generation += 1;
        state.has_image = false;
        state.has_text = true;
        ClipboardGeneration(state.generation)
    }

    /// Эмулировать смену поколения, содержимое которого ещё "не дозрело":
    /// счётчик сдвинулся, но ни изображение, ни текст пока не читаются
    pub fn place_external_pending(&self) -> ClipboardGeneration {
        let mut state = self.state.lock();
        state.generation += 1;
        state.has_image = false;
        state.has_text = false;
        ClipboardGeneration(state.generation)
    }

    /// Дозревание: содержимое текущего поколения становится изображением
    pub fn commit_pending_image(&self) {
        let mut state = self.state.lock();
        state.has_image = true;
    }

    /// Заставить write_image отклонять записи (проверка fallback-ветки)
    pub fn set_reject_images(&self, reject: bool) {
        self.state.lock().reject_images = reject;
    }
}

impl Default for DryPasteboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Pasteboard for DryPasteboard {
    fn generation(&self) -> ClipboardGeneration {
        ClipboardGeneration(self.state.lock().generation)
    }

    fn content_types(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut types = Vec::new();
        if state.has_image {
            types.push("image/png".to_string());
        }
        if state.has_text {
            types.push("text/plain;charset=utf-8".to_string());
        }
        types
    }

    fn has_image(&self) -> bool {
        self.state.lock().has_image
    }

    fn write_image(&self, image: &image::RgbaImage) -> Result<ClipboardGeneration> {
        let mut state = self.state.lock();
        if state.reject_images {
            return Err(BridgeError::PasteboardWriteFailed(
                "запись изображений отклонена".to_string(),
            ));
        }
        info!("[DRY RUN] Запись изображения {}x{} в буфер обмена", image.width(), image.height());
        state.generation += 1;
        let generation = state.generation;
        state.self_caused.retain(|g| *g >= generation);
        state.self_caused.insert(generation);
        state.has_image = true;
        state.has_text = false;
        Ok(ClipboardGeneration(generation))
    }

    fn write_file_reference(&self, path: &Path) -> Result<ClipboardGeneration> {
        let mut state = self.state.lock();
        info!("[DRY RUN] Запись ссылки на файл {:?} в буфер обмена", path);
        state.generation += 1;
        let generation = state.generation;
        state.self_caused.retain(|g| *g >= generation);
        state.self_caused.insert(generation);
        state.has_image = false;
        state.has_text = true;
        Ok(ClipboardGeneration(generation))
    }

    fn take_self_caused(&self, generation: ClipboardGeneration) -> bool {
        self.state.lock().self_caused.remove(&generation.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_writes_advance_generation() {
        let pasteboard = DryPasteboard::new();
        assert_eq!(pasteboard.generation(), ClipboardGeneration(0));

        let first = pasteboard.place_external_image();
        assert_eq!(first, ClipboardGeneration(1));
        assert!(pasteboard.has_image());

        let second = pasteboard.place_external_text();
        assert_eq!(second, ClipboardGeneration(2));
        assert!(!pasteboard.has_image());
        assert_eq!(pasteboard.content_types(), vec!["text/plain;charset=utf-8"]);
    }

    #[test]
    fn test_write_image_returns_new_generation() {
        let pasteboard = DryPasteboard::new();
        let image = image::RgbaImage::new(2, 2);

        let generation = pasteboard.write_image(&image).unwrap();
        assert_eq!(generation, ClipboardGeneration(1));
        assert_eq!(pasteboard.generation(), generation);
        assert!(pasteboard.has_image());
    }

    #[test]
    fn test_writes_are_marked_self_caused_exactly_once() {
        let pasteboard = DryPasteboard::new();
        let image = image::RgbaImage::new(2, 2);

        let generation = pasteboard.write_image(&image).unwrap();
        assert!(pasteboard.take_self_caused(generation));
        // Отметка потреблена
        assert!(!pasteboard.take_self_caused(generation));

        // Внешние изменения собственными не считаются
        let external = pasteboard.place_external_image();
        assert!(!pasteboard.take_self_caused(external));

        let reference = pasteboard
            .write_file_reference(Path::new("/tmp/shot.png"))
            .unwrap();
        assert!(pasteboard.take_self_caused(reference));
    }

    #[test]
    fn test_rejected_image_write() {
        let pasteboard = DryPasteboard::new();
        pasteboard.set_reject_images(true);

        let image = image::RgbaImage::new(2, 2);
        let err = pasteboard.write_image(&image).unwrap_err();
        assert!(matches!(err, BridgeError::PasteboardWriteFailed(_)));

        // Отклонённая запись не двигает поколение
        assert_eq!(pasteboard.generation(), ClipboardGeneration(0));
    }
}
