//! Pasteboard seam: responsibility and boundaries
//!
//! This module abstracts the shared OS clipboard behind a single trait.
//! It is the ONLY place that talks to the clipboard; the poller and the
//! image transfer service must share one instance so that the generation
//! counter returned by a write is the same counter the poller observes.
//! Writes also mark their generation as self-caused under the same lock
//! that serves `generation()`, so a poller tick can never observe a
//! self-caused generation before the mark exists.

mod dry_pasteboard;
mod system;

pub use dry_pasteboard::DryPasteboard;
pub use system::SystemPasteboard;

use crate::error::Result;
use crate::events::ClipboardGeneration;
use std::path::Path;
use std::sync::Arc;

/// Общий буфер обмена как внешний ресурс
pub trait Pasteboard: Send + Sync {
    /// Текущее поколение содержимого. Монотонно растёт при каждом изменении.
    fn generation(&self) -> ClipboardGeneration;

    /// Заявленные типы текущего содержимого (константы платформенной границы)
    fn content_types(&self) -> Vec<String>;

    /// Является ли текущее содержимое изображением
    fn has_image(&self) -> bool;

    /// Записать изображение; возвращает поколение сразу после записи
    fn write_image(&self, image: &image::RgbaImage) -> Result<ClipboardGeneration>;

    /// Записать ссылку на файл (fallback, если запись изображения отклонена)
    fn write_file_reference(&self, path: &Path) -> Result<ClipboardGeneration>;

    /// Создано ли поколение нашей же записью. Отметка выставляется
    /// атомарно с самой записью и потребляется ровно один раз.
    fn take_self_caused(&self, generation: ClipboardGeneration) -> bool;
}

/// Фабрика: реальный буфер обмена или эмуляция для dry-run
pub fn create_pasteboard(dry_run: bool) -> Result<Arc<dyn Pasteboard>> {
    if dry_run {
        Ok(Arc::new(DryPasteboard::new()))
    } else {
        Ok(Arc::new(SystemPasteboard::new()?))
    }
}
