use super::Pasteboard;
use crate::error::{BridgeError, Result};
use crate::events::ClipboardGeneration;
use arboard::{Clipboard, ImageData};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tracing::{debug, info};

/// Сколько байт содержимого участвует в отпечатке. Размеров, длины и
/// префикса достаточно, чтобы отличить две подряд записи буфера обмена.
const FINGERPRINT_PREFIX_LEN: usize = 4096;

/// Реальный буфер обмена поверх arboard.
///
/// У X11/Wayland нет счётчика изменений, поэтому поколение ведётся локально:
/// отпечаток содержимого сравнивается с последним увиденным, и при
/// несовпадении счётчик увеличивается. Собственные записи фиксируют отпечаток
/// синхронно, так что возвращённое из write_* поколение - ровно то, которое
/// увидит следующий опрос.
pub struct SystemPasteboard {
    inner: Mutex<PasteboardInner>,
}

struct PasteboardInner {
    clipboard: Clipboard,
    generation: ClipboardGeneration,
    fingerprint: u64,
    // Поколения наших собственных записей; пополняется под тем же локом,
    // что отдаёт generation(), поэтому окна гонки с опросом нет
    self_caused: HashSet<u64>,
}

impl SystemPasteboard {
    pub fn new() -> Result<Self> {
        info!("Инициализация SystemPasteboard");

        let mut clipboard = Clipboard::new()
            .map_err(|e| BridgeError::Internal(format!("Не удалось открыть буфер обмена: {}", e)))?;

        let fingerprint = Self::current_fingerprint(&mut clipboard);

        Ok(Self {
            inner: Mutex::new(PasteboardInner {
                clipboard,
                generation: ClipboardGeneration(0),
                fingerprint,
                self_caused: HashSet::new(),
            }),
        })
    }

    fn current_fingerprint(clipboard: &mut Clipboard) -> u64 {
        if let Ok(image) = clipboard.get_image() {
            return Self::image_fingerprint(image.width, image.height, &image.bytes);
        }
        if let Ok(text) = clipboard.get_text() {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            1u8.hash(&mut hasher);
            text.hash(&mut hasher);
            return hasher.finish();
        }
        0
    }

    fn image_fingerprint(width: usize, height: usize, bytes: &[u8]) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        2u8.hash(&mut hasher);
        width.hash(&mut hasher);
        height.hash(&mut hasher);
        bytes.len().hash(&mut hasher);
        bytes[..bytes.len().min(FINGERPRINT_PREFIX_LEN)].hash(&mut hasher);
        hasher.finish()
    }

    fn text_fingerprint(text: &str) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        1u8.hash(&mut hasher);
        text.hash(&mut hasher);
        hasher.finish()
    }

    /// Отметить текущее поколение как собственное. Поколение монотонно,
    /// поэтому отметки старше текущей уже никогда не совпадут с live
    /// и вычищаются здесь же.
    fn mark_self_caused(inner: &mut PasteboardInner) {
        let current = inner.generation.value();
        inner.self_caused.retain(|g| *g >= current);
        inner.self_caused.insert(current);
    }
}

impl Pasteboard for SystemPasteboard {
    fn generation(&self) -> ClipboardGeneration {
        let mut inner = self.inner.lock();

        let fingerprint = Self::current_fingerprint(&mut inner.clipboard);
        if fingerprint != inner.fingerprint {
            inner.fingerprint = fingerprint;
            inner.generation = inner.generation.next();
            debug!("Буфер обмена изменился: {}", inner.generation);
        }

        inner.generation
    }

    fn content_types(&self) -> Vec<String> {
        let mut inner = self.inner.lock();

        let mut types = Vec::new();
        if inner.clipboard.get_image().is_ok() {
            types.push("image/png".to_string());
        }
        if inner.clipboard.get_text().is_ok() {
            types.push("text/plain;charset=utf-8".to_string());
        }
        types
    }

    fn has_image(&self) -> bool {
        self.inner.lock().clipboard.get_image().is_ok()
    }

    fn write_image(&self, image: &image::RgbaImage) -> Result<ClipboardGeneration> {
        let mut inner = self.inner.lock();

        let (width, height) = (image.width() as usize, image.height() as usize);
        let bytes = image.as_raw();

        inner
            .clipboard
            .set_image(ImageData {
                width,
                height,
                bytes: Cow::Borrowed(bytes),
            })
            .map_err(|e| {
                BridgeError::PasteboardWriteFailed(format!("set_image отклонён: {}", e))
            })?;

        inner.fingerprint = Self::image_fingerprint(width, height, bytes);
        inner.generation = inner.generation.next();
        Self::mark_self_caused(&mut inner);
        debug!("Изображение {}x{} записано в буфер обмена: {}", width, height, inner.generation);

        Ok(inner.generation)
    }

    fn write_file_reference(&self, path: &Path) -> Result<ClipboardGeneration> {
        let mut inner = self.inner.lock();

        let reference = path.to_string_lossy().to_string();
        inner.clipboard.set_text(reference.clone()).map_err(|e| {
            BridgeError::PasteboardWriteFailed(format!("set_text отклонён: {}", e))
        })?;

        inner.fingerprint = Self::text_fingerprint(&reference);
        inner.generation = inner.generation.next();
        Self::mark_self_caused(&mut inner);
        debug!("Ссылка на файл {:?} записана в буфер обмена: {}", path, inner.generation);

        Ok(inner.generation)
    }

    fn take_self_caused(&self, generation: ClipboardGeneration) -> bool {
        self.inner.lock().self_caused.remove(&generation.value())
    }
}
