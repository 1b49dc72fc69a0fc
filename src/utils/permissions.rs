use crate::error::{BridgeError, Result};
use std::fs;
use tracing::{info, warn};

/// Проверить права доступа к необходимым ресурсам
pub fn check_permissions() -> Result<()> {
    info!("Проверка прав доступа...");

    // Без графической сессии синтез ввода невозможен
    if !accessibility_granted() {
        return Err(BridgeError::AccessibilityPermissionMissing(
            "Графическая сессия не обнаружена (нет DISPLAY и WAYLAND_DISPLAY)".to_string(),
        ));
    }

    // Доступ к /dev/input нужен только для детекции зажатых клавиш жеста -
    // без него ожидание жеста деградирует до безусловного продолжения
    check_input_devices_access();

    // Проверка, что не запущен от root (рекомендация безопасности)
    check_not_root();

    info!("Проверка прав доступа завершена успешно");
    Ok(())
}

/// Разрешён ли синтез ввода. Единственная проверка, которую потребляет
/// первый шаг последовательности вставки.
pub fn accessibility_granted() -> bool {
    session_present(
        std::env::var("DISPLAY").ok().as_deref(),
        std::env::var("WAYLAND_DISPLAY").ok().as_deref(),
    )
}

fn session_present(display: Option<&str>, wayland_display: Option<&str>) -> bool {
    display.map(|d| !d.is_empty()).unwrap_or(false)
        || wayland_display.map(|d| !d.is_empty()).unwrap_or(false)
}

fn check_input_devices_access() {
    let input_dir = "/dev/input";

    if !std::path::Path::new(input_dir).exists() {
        warn!("Директория {} не существует - детекция жеста скриншота отключена", input_dir);
        return;
    }

    match fs::read_dir(input_dir) {
        Ok(_) => {
            info!("Доступ к {} подтвержден", input_dir);
        }
        Err(e) => {
            warn!("Нет доступа к {}: {}. Добавьте пользователя в группу 'input'", input_dir, e);
            warn!("Без него ожидание отпускания клавиш жеста будет пропускаться");
        }
    }
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Приложение запущено от имени root!");
            warn!("   Рекомендуется добавить пользователя в группу 'input'");
            warn!("   и запускать приложение от имени обычного пользователя:");
            warn!("   sudo usermod -a -G input $USER");
            warn!("   (затем перезайдите в систему)");
        }
        Ok(user) => {
            info!("Приложение запущено от имени пользователя: {}", user);
        }
        Err(_) => {
            warn!("Не удалось определить пользователя");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_present() {
        assert!(session_present(Some(":0"), None));
        assert!(session_present(None, Some("wayland-0")));
        assert!(session_present(Some(":1"), Some("wayland-0")));

        assert!(!session_present(None, None));
        assert!(!session_present(Some(""), None));
        assert!(!session_present(None, Some("")));
    }
}
