use crate::error::{BridgeError, Result};
use crate::events::ClipboardGeneration;
use crate::services::pasteboard::Pasteboard;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Переносит файл скриншота в общий буфер обмена.
/// Возвращаемое поколение передаётся в ClipboardPoller::ignore, чтобы
/// собственная запись не была принята за внешнее изменение.
pub struct ImageTransferService {
    pasteboard: Arc<dyn Pasteboard>,
}

impl ImageTransferService {
    pub fn new(pasteboard: Arc<dyn Pasteboard>) -> Self {
        Self { pasteboard }
    }

    pub fn copy_image(&self, path: &Path) -> Result<ClipboardGeneration> {
        debug!("Загрузка изображения из {:?}", path);

        let image = image::open(path)
            .map_err(|e| BridgeError::ImageLoadFailed(format!("{:?}: {}", path, e)))?
            .to_rgba8();

        match self.pasteboard.write_image(&image) {
            Ok(generation) => {
                info!("Изображение {:?} записано в буфер обмена ({})", path, generation);
                Ok(generation)
            }
            Err(image_err) => {
                // Fallback: некоторые окружения отклоняют изображения,
                // тогда кладём ссылку на файл
                warn!("Запись изображения отклонена ({}), пробуем ссылку на файл", image_err);

                self.pasteboard.write_file_reference(path).map_err(|ref_err| {
                    BridgeError::PasteboardWriteFailed(format!(
                        "изображение: {}; ссылка на файл: {}",
                        image_err, ref_err
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pasteboard::DryPasteboard;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shotbridge-transfer-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn test_copy_image_returns_generation() {
        let dir = scratch_dir("ok");
        let path = write_png(&dir, "Screenshot 1.png");

        let pasteboard = Arc::new(DryPasteboard::new());
        let transfer = ImageTransferService::new(pasteboard.clone());

        let generation = transfer.copy_image(&path).unwrap();
        assert_eq!(generation, pasteboard.generation());
        assert!(pasteboard.has_image());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_copy_image_rejects_non_image() {
        let dir = scratch_dir("garbage");
        let path = dir.join("Screenshot 2.png");
        fs::write(&path, b"definitely not a png").unwrap();

        let pasteboard = Arc::new(DryPasteboard::new());
        let transfer = ImageTransferService::new(pasteboard);

        let err = transfer.copy_image(&path).unwrap_err();
        assert!(matches!(err, BridgeError::ImageLoadFailed(_)));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_copy_image_falls_back_to_file_reference() {
        let dir = scratch_dir("fallback");
        let path = write_png(&dir, "Screenshot 3.png");

        let pasteboard = Arc::new(DryPasteboard::new());
        pasteboard.set_reject_images(true);
        let transfer = ImageTransferService::new(pasteboard.clone());

        let generation = transfer.copy_image(&path).unwrap();
        assert_eq!(generation, pasteboard.generation());
        // Fallback записал текстовую ссылку, не изображение
        assert!(!pasteboard.has_image());

        let _ = fs::remove_dir_all(&dir);
    }
}
