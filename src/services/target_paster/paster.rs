use super::window_control::WindowControl;
use super::{focus, gesture, input, TargetPasterTrait};
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::events::WindowInfo;
use crate::utils::permissions;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Класс собственного окна - никогда не выбирается целью
const OWN_CLASS: &str = "shotbridge";

/// Идентификатор цели по умолчанию, если он не настроен и не передан
const DEFAULT_TARGET: &str = "claude";

/// Фиксированные пути установки целевого приложения
const DEFAULT_FALLBACK_PATHS: &[&str] = &[
    "/usr/bin/claude-desktop",
    "/usr/local/bin/claude-desktop",
    "/opt/claude/claude-desktop",
];

/// Классы окон системных скриншотеров - пока одно из них активно,
/// вставка откладывается
const SCREENSHOT_UI_CLASSES: &[&str] = &[
    "spectacle",
    "gnome-screenshot",
    "org.gnome.Screenshot",
    "flameshot",
    "ksnip",
    "swappy",
];

/// Фоновые/служебные процессы рабочего стола - исключаются из выбора цели
const HELPER_CLASSES: &[&str] = &[
    "plasmashell",
    "gnome-shell",
    "xdg-desktop-portal",
    "polkit-kde-authentication-agent-1",
    "Desktop",
];

pub struct RealTargetPaster {
    config: Arc<Config>,
    window_control: WindowControl,
    permission_check: fn() -> bool,
}

impl RealTargetPaster {
    pub fn new(config: Arc<Config>) -> Self {
        info!("Инициализация RealTargetPaster");
        Self {
            config,
            window_control: WindowControl::new(),
            permission_check: permissions::accessibility_granted,
        }
    }

    #[cfg(test)]
    fn with_permission_check(config: Arc<Config>, permission_check: fn() -> bool) -> Self {
        Self {
            config,
            window_control: WindowControl::new(),
            permission_check,
        }
    }

    async fn run_sequence(&self, target_identifier: Option<&str>) -> Result<()> {
        let paster = &self.config.paster;

        // Шаг 1: до этой проверки никакой активации и никакого синтеза
        if !(self.permission_check)() {
            return Err(BridgeError::AccessibilityPermissionMissing(
                "синтез ввода недоступен без графической сессии".to_string(),
            ));
        }

        // Шаг 2: дождаться отпускания клавиш жеста скриншота
        gesture::wait_for_gesture_release(paster.gesture_timeout_ms, paster.gesture_poll_ms)
            .await?;

        // Шаг 3: дождаться закрытия интерфейса скриншотера
        self.wait_screenshot_ui_closed().await?;

        // Шаг 4: найти или запустить целевое приложение
        let identifier = target_identifier.or(paster.target_app.as_deref());
        let window = self.resolve_target(identifier).await?;
        info!("Целевое окно: {}", window);

        // Шаг 5: вывести цель на передний план (best-effort)
        self.wait_foreground(&window).await;

        // Шаги 6-8, затем одна повторная попытка после верификации фокуса
        self.settle_nudge_paste().await?;

        if paster.verify_focus && !self.focus_verified(&window).await {
            info!("Фокус не в текстовом элементе - повторяем вставку один раз");
            self.settle_nudge_paste().await?;
        }

        Ok(())
    }

    /// Шаг 6 (пауза на устаканивание фокуса), шаг 7 (клик-наводка),
    /// шаг 8 (аккорд вставки)
    async fn settle_nudge_paste(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(self.config.paster.settle_delay_ms)).await;

        if self.config.paster.focus_nudge {
            match self.window_control.active_geometry().await {
                Ok(geometry) => {
                    let (x, y) = geometry.composer_point();
                    if let Err(e) = input::click_at(x, y) {
                        warn!("Клик-наводка не удался: {}", e);
                    }
                }
                Err(e) => debug!("Геометрия активного окна недоступна: {}", e),
            }
        }

        input::send_paste_chord()
    }

    async fn wait_screenshot_ui_closed(&self) -> Result<()> {
        let paster = &self.config.paster;
        let deadline = Instant::now() + Duration::from_millis(paster.ui_close_timeout_ms);

        loop {
            match self.window_control.active_window().await {
                Ok(active) => {
                    if !active.matches_any_pattern(SCREENSHOT_UI_CLASSES) {
                        return Ok(());
                    }
                    debug!("Интерфейс скриншотера ещё активен: {}", active);
                }
                // Наблюдение недоступно - не блокируем вставку
                Err(_) => return Ok(()),
            }

            if Instant::now() >= deadline {
                return Err(BridgeError::ScreenshotGestureStillActive(format!(
                    "интерфейс скриншотера не закрылся за {} мс",
                    paster.ui_close_timeout_ms
                )));
            }
            tokio::time::sleep(Duration::from_millis(paster.gesture_poll_ms)).await;
        }
    }

    async fn resolve_target(&self, identifier: Option<&str>) -> Result<WindowInfo> {
        let windows = self.window_control.list_windows().await.unwrap_or_default();

        if let Some(window) = select_running_target(&windows, identifier) {
            debug!("Целевое приложение уже запущено: {}", window);
            return Ok(window);
        }

        // Не запущено: ищем, что запускать
        let fallback_paths: Vec<PathBuf> = if self.config.paster.fallback_paths.is_empty() {
            DEFAULT_FALLBACK_PATHS.iter().map(PathBuf::from).collect()
        } else {
            self.config.paster.fallback_paths.iter().map(PathBuf::from).collect()
        };

        let program = resolve_install_path(identifier, &fallback_paths).ok_or_else(|| {
            BridgeError::TargetNotFound(format!(
                "'{}' не запущено и не найдено по путям установки",
                identifier.unwrap_or(DEFAULT_TARGET)
            ))
        })?;

        info!("Запускаем целевое приложение: {:?}", program);
        Command::new(&program)
            .spawn()
            .map_err(|e| BridgeError::TargetNotFound(format!("{:?}: {}", program, e)))?;

        // Ждём появления окна запущенного приложения
        let ident = identifier.unwrap_or(DEFAULT_TARGET);
        for _ in 0..self.config.paster.focus_attempts {
            tokio::time::sleep(Duration::from_millis(self.config.paster.focus_interval_ms * 4))
                .await;

            let windows = self.window_control.list_windows().await.unwrap_or_default();
            if let Some(window) = select_running_target(&windows, Some(ident)) {
                return Ok(window);
            }
        }

        BridgeError::target_not_found(format!("окно '{}' не появилось после запуска", ident))
    }

    /// Повторные запросы активации, пока цель не станет активным окном.
    /// Неуспех не фатален - вставка всё равно будет предпринята.
    async fn wait_foreground(&self, window: &WindowInfo) {
        let paster = &self.config.paster;

        for attempt in 0..paster.focus_attempts {
            if let Err(e) = self.window_control.activate(window).await {
                debug!("Активация не удалась (попытка {}): {}", attempt + 1, e);
            }

            match self.window_control.active_window().await {
                Ok(active)
                    if (!window.class.is_empty() && active.matches_exact(&window.class))
                        || (!window.title.is_empty() && active.matches_exact(&window.title)) =>
                {
                    return;
                }
                _ => {}
            }

            tokio::time::sleep(Duration::from_millis(paster.focus_interval_ms)).await;
        }

        debug!("Цель так и не вышла на передний план - продолжаем");
    }

    /// Шаг 9: фокус в текстовом элементе цели? Недоступность дерева
    /// доступности трактуется как "не опровергнуто"
    async fn focus_verified(&self, window: &WindowInfo) -> bool {
        match focus::focused_role(window).await {
            Ok(Some(role)) => {
                debug!("Роль сфокусированного элемента: '{}'", role);
                focus::is_text_like_role(&role)
            }
            Ok(None) => true,
            Err(e) => {
                debug!("Инспекция фокуса недоступна: {}", e);
                true
            }
        }
    }
}

#[async_trait::async_trait]
impl TargetPasterTrait for RealTargetPaster {
    async fn activate_and_paste(&self, target_identifier: Option<&str>) -> Result<()> {
        self.run_sequence(target_identifier).await
    }
}

/// Выбрать запущенное целевое окно: точный класс → точный заголовок →
/// нечёткое вхождение. Собственное окно и служебные процессы исключены.
fn select_running_target(windows: &[WindowInfo], identifier: Option<&str>) -> Option<WindowInfo> {
    let ident = identifier.unwrap_or(DEFAULT_TARGET);

    let candidates: Vec<&WindowInfo> = windows
        .iter()
        .filter(|w| !w.class.eq_ignore_ascii_case(OWN_CLASS))
        .filter(|w| {
            !HELPER_CLASSES
                .iter()
                .any(|h| w.class.eq_ignore_ascii_case(h))
        })
        .collect();

    if let Some(window) = candidates.iter().find(|w| w.class.eq_ignore_ascii_case(ident)) {
        return Some((*window).clone());
    }
    if let Some(window) = candidates.iter().find(|w| w.title.eq_ignore_ascii_case(ident)) {
        return Some((*window).clone());
    }
    candidates
        .iter()
        .find(|w| w.matches_pattern(ident))
        .map(|w| (*w).clone())
}

/// Разрешить путь запуска: явный идентификатор как путь → фиксированные
/// пути установки
fn resolve_install_path(identifier: Option<&str>, fallback_paths: &[PathBuf]) -> Option<PathBuf> {
    if let Some(ident) = identifier {
        let path = PathBuf::from(ident);
        if path.is_absolute() && path.exists() {
            return Some(path);
        }
    }

    fallback_paths.iter().find(|p| p.exists()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(title: &str, class: &str) -> WindowInfo {
        WindowInfo::new(title.to_string()).with_class(class.to_string())
    }

    #[test]
    fn test_select_prefers_exact_class() {
        let windows = vec![
            window("Claude news - Firefox", "firefox"),
            window("Chat", "claude-desktop"),
            window("Claude", "claude"),
        ];

        let selected = select_running_target(&windows, Some("claude")).unwrap();
        assert_eq!(selected.class, "claude");
    }

    #[test]
    fn test_select_falls_back_to_title_then_fuzzy() {
        let windows = vec![
            window("Claude news - Firefox", "firefox"),
            window("Claude", "electron"),
        ];
        let selected = select_running_target(&windows, Some("claude")).unwrap();
        assert_eq!(selected.title, "Claude");

        // Только нечёткое вхождение
        let windows = vec![window("Claude news - Firefox", "firefox")];
        let selected = select_running_target(&windows, Some("claude")).unwrap();
        assert_eq!(selected.class, "firefox");
    }

    #[test]
    fn test_select_excludes_own_window_and_helpers() {
        let windows = vec![
            window("shotbridge - claude", OWN_CLASS),
            window("claude helper", "gnome-shell"),
        ];

        assert!(select_running_target(&windows, Some("claude")).is_none());
    }

    #[test]
    fn test_select_uses_default_identifier() {
        let windows = vec![window("Chat", "claude-desktop")];
        let selected = select_running_target(&windows, None).unwrap();
        assert_eq!(selected.class, "claude-desktop");
    }

    #[test]
    fn test_resolve_install_path_not_found() {
        // Сценарий D: не запущено, не установлено, идентификатор не задан
        let fallback = vec![PathBuf::from("/nonexistent/claude-desktop")];
        assert!(resolve_install_path(None, &fallback).is_none());
        assert!(select_running_target(&[], None).is_none());
    }

    #[test]
    fn test_resolve_install_path_explicit_identifier() {
        // Явный абсолютный путь выигрывает у fallback-путей
        let dir = std::env::temp_dir().join(format!("shotbridge-paster-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let program = dir.join("claude-desktop");
        std::fs::write(&program, b"#!/bin/sh\n").unwrap();

        let resolved =
            resolve_install_path(Some(program.to_str().unwrap()), &[PathBuf::from("/nonexistent")]);
        assert_eq!(resolved, Some(program.clone()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_permission_gate_blocks_whole_sequence() {
        // Сценарий: разрешения нет - последовательность обрывается на
        // первом шаге, ни активации, ни запуска, ни синтеза ввода
        let paster =
            RealTargetPaster::with_permission_check(Arc::new(Config::default()), || false);

        let started = tokio::time::Instant::now();
        let err = paster.activate_and_paste(None).await.unwrap_err();
        assert!(matches!(err, BridgeError::AccessibilityPermissionMissing(_)));

        // Ни одно из ограниченных ожиданий (жест, интерфейс скриншотера,
        // передний план) не выполнялось
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_screenshot_ui_matching() {
        let shot_ui = window("Spectacle", "spectacle");
        assert!(shot_ui.matches_any_pattern(SCREENSHOT_UI_CLASSES));

        let target = window("Chat", "claude-desktop");
        assert!(!target.matches_any_pattern(SCREENSHOT_UI_CLASSES));
    }
}
