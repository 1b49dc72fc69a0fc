//! Window control backends
//!
//! Probing-based selection of a working desktop utility (xdotool, wmctrl,
//! swaymsg) for the four operations the paste sequence needs: frontmost
//! window, window listing, activation, focused-window geometry.

mod sway;
mod wmctrl;
mod xdotool;

use crate::error::{BridgeError, Result};
use crate::events::{WindowGeometry, WindowInfo};
use parking_lot::Mutex;
use tracing::{info, warn};

use sway::SwayControl;
use wmctrl::WmctrlControl;
use xdotool::XdotoolControl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkingMethod {
    Xdotool,
    Wmctrl,
    Sway,
}

pub struct WindowControl {
    working_method: Mutex<Option<WorkingMethod>>,
    xdotool: XdotoolControl,
    wmctrl: WmctrlControl,
    sway: SwayControl,
}

impl WindowControl {
    pub fn new() -> Self {
        Self {
            working_method: Mutex::new(None),
            xdotool: XdotoolControl::new(),
            wmctrl: WmctrlControl::new(),
            sway: SwayControl::new(),
        }
    }

    async fn detect_working_method(&self) -> Result<WorkingMethod> {
        info!("Определяем рабочий метод управления окнами...");

        if self.xdotool.test().await.is_ok() {
            info!("Используем xdotool");
            return Ok(WorkingMethod::Xdotool);
        }

        if self.wmctrl.test().await.is_ok() {
            info!("Используем wmctrl");
            return Ok(WorkingMethod::Wmctrl);
        }

        if self.sway.test().await.is_ok() {
            info!("Используем swaymsg");
            return Ok(WorkingMethod::Sway);
        }

        Err(BridgeError::Internal(
            "Ни один метод управления окнами не работает".to_string(),
        ))
    }

    async fn method(&self) -> Result<WorkingMethod> {
        if let Some(method) = *self.working_method.lock() {
            return Ok(method);
        }
        let method = self.detect_working_method().await?;
        *self.working_method.lock() = Some(method);
        Ok(method)
    }

    /// Сбросить выбранный метод после сбоя - при следующем вызове
    /// определение выполнится заново
    fn invalidate_method(&self) {
        warn!("Рабочий метод управления окнами перестал работать - переопределим");
        *self.working_method.lock() = None;
    }

    pub async fn active_window(&self) -> Result<WindowInfo> {
        let method = self.method().await?;
        let result = match method {
            WorkingMethod::Xdotool => self.xdotool.active_window().await,
            WorkingMethod::Wmctrl => self.wmctrl.active_window().await,
            WorkingMethod::Sway => self.sway.active_window().await,
        };
        if result.is_err() {
            self.invalidate_method();
        }
        result
    }

    pub async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let method = self.method().await?;
        let result = match method {
            WorkingMethod::Xdotool => self.xdotool.list_windows().await,
            WorkingMethod::Wmctrl => self.wmctrl.list_windows().await,
            WorkingMethod::Sway => self.sway.list_windows().await,
        };
        if result.is_err() {
            self.invalidate_method();
        }
        result
    }

    pub async fn activate(&self, window: &WindowInfo) -> Result<()> {
        let method = self.method().await?;
        match method {
            WorkingMethod::Xdotool => self.xdotool.activate(window).await,
            WorkingMethod::Wmctrl => self.wmctrl.activate(window).await,
            WorkingMethod::Sway => self.sway.activate(window).await,
        }
    }

    /// Геометрия текущего активного окна (вызывается после активации цели)
    pub async fn active_geometry(&self) -> Result<WindowGeometry> {
        let method = self.method().await?;
        match method {
            WorkingMethod::Xdotool => self.xdotool.active_geometry().await,
            WorkingMethod::Wmctrl => self.wmctrl.active_geometry().await,
            WorkingMethod::Sway => self.sway.active_geometry().await,
        }
    }
}

impl Default for WindowControl {
    fn default() -> Self {
        Self::new()
    }
}
