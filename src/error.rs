use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка D-Bus: {0}")]
    DBus(#[from] zbus::Error),

    #[error("Директория не существует: {0}")]
    DirectoryMissing(String),

    #[error("Не удалось открыть подписку на директорию: {0}")]
    CannotOpenDirectory(String),

    #[error("Не удалось декодировать изображение: {0}")]
    ImageLoadFailed(String),

    #[error("Не удалось записать в буфер обмена: {0}")]
    PasteboardWriteFailed(String),

    #[error("Нет разрешения на синтез ввода: {0}")]
    AccessibilityPermissionMissing(String),

    #[error("Целевое приложение не найдено: {0}")]
    TargetNotFound(String),

    #[error("Не удалось синтезировать нажатие клавиш: {0}")]
    KeyInjectionFailed(String),

    #[error("Жест создания скриншота всё ещё активен: {0}")]
    ScreenshotGestureStillActive(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn target_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(BridgeError::TargetNotFound(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! bridge_error {
    (directory_missing, $($arg:tt)*) => {
        $crate::error::BridgeError::DirectoryMissing(format!($($arg)*))
    };
    (cannot_open, $($arg:tt)*) => {
        $crate::error::BridgeError::CannotOpenDirectory(format!($($arg)*))
    };
    (image_load, $($arg:tt)*) => {
        $crate::error::BridgeError::ImageLoadFailed(format!($($arg)*))
    };
    (pasteboard_write, $($arg:tt)*) => {
        $crate::error::BridgeError::PasteboardWriteFailed(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::BridgeError::Permission(format!($($arg)*))
    };
    (key_injection, $($arg:tt)*) => {
        $crate::error::BridgeError::KeyInjectionFailed(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::BridgeError::Internal(format!($($arg)*))
    };
}
