use crate::error::{BridgeError, Result};
use evdev::KeyCode;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

/// Клавиши, участвующие в жестах создания скриншота (PrtSc, Super+Shift
/// и их комбинации). Ctrl намеренно исключён: его держат и для обычных
/// операций, а вставка сама нажимает Ctrl.
const GESTURE_KEYS: &[KeyCode] = &[
    KeyCode::KEY_SYSRQ,
    KeyCode::KEY_PRINT,
    KeyCode::KEY_LEFTMETA,
    KeyCode::KEY_RIGHTMETA,
    KeyCode::KEY_LEFTSHIFT,
    KeyCode::KEY_RIGHTSHIFT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureSample {
    /// Ни одно устройство прочитать не удалось - наблюдение невозможно
    Unobservable,
    Released,
    Held,
}

fn sample_gesture_keys() -> GestureSample {
    let mut inspected = 0usize;

    for (path, device) in evdev::enumerate() {
        let keys = match device.get_key_state() {
            Ok(keys) => keys,
            Err(e) => {
                debug!("Не удалось прочитать состояние клавиш {:?}: {}", path, e);
                continue;
            }
        };
        inspected += 1;

        if GESTURE_KEYS.iter().any(|key| keys.contains(*key)) {
            return GestureSample::Held;
        }
    }

    if inspected == 0 {
        GestureSample::Unobservable
    } else {
        GestureSample::Released
    }
}

/// Дождаться отпускания всех клавиш жеста, чтобы не инъецировать вставку,
/// пока пользователь ещё держит комбинацию скриншота. Ожидание ограничено;
/// если состояние клавиш ненаблюдаемо, продолжаем с предупреждением.
pub async fn wait_for_gesture_release(timeout_ms: u64, poll_ms: u64) -> Result<()> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        match sample_gesture_keys() {
            GestureSample::Unobservable => {
                warn!("Состояние клавиш ненаблюдаемо (нет доступа к /dev/input) - продолжаем");
                return Ok(());
            }
            GestureSample::Released => return Ok(()),
            GestureSample::Held => {
                if Instant::now() >= deadline {
                    return Err(BridgeError::ScreenshotGestureStillActive(format!(
                        "клавиши жеста не отпущены за {} мс",
                        timeout_ms
                    )));
                }
                debug!("Клавиши жеста ещё зажаты - ждём");
                tokio::time::sleep(Duration::from_millis(poll_ms)).await;
            }
        }
    }
}
