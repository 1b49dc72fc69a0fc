pub mod clipboard;
pub mod file;
pub mod window;

pub use clipboard::{ClipboardEvent, ClipboardGeneration};
pub use file::CandidateFile;
pub use window::{WindowGeometry, WindowInfo};

/// Событие, поступающее в оркестратор от наблюдателя директории
/// или от опроса буфера обмена
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Обнаружен новый готовый файл скриншота
    FileDetected(std::path::PathBuf),
    /// Внешнее (не наше) изменение буфера обмена с изображением
    ClipboardImage(ClipboardEvent),
}
