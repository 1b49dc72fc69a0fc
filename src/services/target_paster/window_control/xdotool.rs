use crate::error::{BridgeError, Result};
use crate::events::{WindowGeometry, WindowInfo};
use std::process::Command;
use tracing::debug;

/// Сколько окон максимум опрашивается при листинге
const LIST_LIMIT: usize = 64;

pub struct XdotoolControl;

impl XdotoolControl {
    pub fn new() -> Self {
        Self
    }

    pub async fn test(&self) -> Result<()> {
        let output = Command::new("xdotool")
            .args(["getactivewindow", "getwindowname"])
            .output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(BridgeError::Internal("xdotool failed".to_string()))
        }
    }

    pub async fn active_window(&self) -> Result<WindowInfo> {
        debug!("Получаем активное окно через xdotool");

        let title = self.query(&["getactivewindow", "getwindowname"])?;
        let class = self
            .query(&["getactivewindow", "getwindowclassname"])
            .unwrap_or_default();
        let pid = self
            .query(&["getactivewindow", "getwindowpid"])
            .ok()
            .and_then(|s| s.parse::<u32>().ok());

        let mut window = WindowInfo::new(title).with_class(class);
        if let Some(pid) = pid {
            window = window.with_pid(pid);
        }
        Ok(window)
    }

    pub async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let ids = self.query(&["search", "--onlyvisible", "--name", ""])?;

        let mut windows = Vec::new();
        for id in ids.lines().take(LIST_LIMIT) {
            let id = id.trim();
            if id.is_empty() {
                continue;
            }

            let title = match self.query(&["getwindowname", id]) {
                Ok(title) => title,
                Err(_) => continue,
            };
            let class = self.query(&["getwindowclassname", id]).unwrap_or_default();
            let pid = self
                .query(&["getwindowpid", id])
                .ok()
                .and_then(|s| s.parse::<u32>().ok());

            let mut window = WindowInfo::new(title).with_class(class);
            if let Some(pid) = pid {
                window = window.with_pid(pid);
            }
            windows.push(window);
        }

        Ok(windows)
    }

    pub async fn activate(&self, window: &WindowInfo) -> Result<()> {
        // Активация по классу надёжнее заголовка, который меняется
        let id = if !window.class.is_empty() {
            self.query(&["search", "--onlyvisible", "--class", &window.class])
        } else {
            self.query(&["search", "--onlyvisible", "--name", &window.title])
        }?;

        let id = id
            .lines()
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BridgeError::Internal(format!("Окно {} не найдено", window)))?;

        self.query(&["windowactivate", id])?;
        Ok(())
    }

    pub async fn active_geometry(&self) -> Result<WindowGeometry> {
        let output = self.query(&["getactivewindow", "getwindowgeometry", "--shell"])?;

        // Формат --shell: WINDOW=..\nX=..\nY=..\nWIDTH=..\nHEIGHT=..
        let mut x = None;
        let mut y = None;
        let mut width = None;
        let mut height = None;
        for line in output.lines() {
            if let Some(value) = line.strip_prefix("X=") {
                x = value.parse::<i32>().ok();
            } else if let Some(value) = line.strip_prefix("Y=") {
                y = value.parse::<i32>().ok();
            } else if let Some(value) = line.strip_prefix("WIDTH=") {
                width = value.parse::<u32>().ok();
            } else if let Some(value) = line.strip_prefix("HEIGHT=") {
                height = value.parse::<u32>().ok();
            }
        }

        match (x, y, width, height) {
            (Some(x), Some(y), Some(width), Some(height)) => Ok(WindowGeometry {
                x,
                y,
                width,
                height,
            }),
            _ => Err(BridgeError::Internal(format!(
                "xdotool вернул неразборную геометрию: {}",
                output
            ))),
        }
    }

    fn query(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("xdotool").args(args).output().map_err(|e| {
            debug!("xdotool не найден или не работает: {}", e);
            BridgeError::Internal(format!("xdotool не найден: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BridgeError::Internal(format!(
                "xdotool вернул ошибку: {}",
                stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
