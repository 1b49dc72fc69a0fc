use crate::error::{BridgeError, Result};
use crate::events::{WindowGeometry, WindowInfo};
use std::process::Command;

pub struct WmctrlControl;

impl WmctrlControl {
    pub fn new() -> Self {
        Self
    }

    pub async fn test(&self) -> Result<()> {
        let output = Command::new("wmctrl").args(["-l"]).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(BridgeError::Internal("wmctrl failed".to_string()))
        }
    }

    pub async fn active_window(&self) -> Result<WindowInfo> {
        // wmctrl не отмечает активное окно в -l; id берём у xprop
        let output = Command::new("xprop")
            .args(["-root", "_NET_ACTIVE_WINDOW"])
            .output()
            .map_err(|e| BridgeError::Internal(format!("xprop не найден: {}", e)))?;
        if !output.status.success() {
            return Err(BridgeError::Internal("xprop вернул ошибку".to_string()));
        }

        // Формат: "_NET_ACTIVE_WINDOW(WINDOW): window id # 0x4c00003"
        let stdout = String::from_utf8_lossy(&output.stdout);
        let active_id = stdout
            .rsplit(' ')
            .next()
            .and_then(|s| u64::from_str_radix(s.trim().trim_start_matches("0x"), 16).ok())
            .ok_or_else(|| BridgeError::Internal("Активное окно не найдено".to_string()))?;

        for (id, window) in self.list_windows_with_ids().await? {
            if id == active_id {
                return Ok(window);
            }
        }

        Err(BridgeError::Internal("Активное окно не найдено".to_string()))
    }

    pub async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(self
            .list_windows_with_ids()
            .await?
            .into_iter()
            .map(|(_, window)| window)
            .collect())
    }

    async fn list_windows_with_ids(&self) -> Result<Vec<(u64, WindowInfo)>> {
        let stdout = self.run(&["-lxp"])?;

        // Формат: <id> <desktop> <pid> <wm_class> <host> <title...>
        let mut windows = Vec::new();
        for line in stdout.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                continue;
            }

            let id = match u64::from_str_radix(parts[0].trim_start_matches("0x"), 16) {
                Ok(id) => id,
                Err(_) => continue,
            };
            let pid = parts[2].parse::<u32>().ok();
            // wm_class вида "navigator.Firefox" - имя класса после точки
            let class = parts[3]
                .rsplit('.')
                .next()
                .unwrap_or(parts[3])
                .to_string();
            let title = parts[5..].join(" ");

            let mut window = WindowInfo::new(title).with_class(class);
            if let Some(pid) = pid {
                window = window.with_pid(pid);
            }
            windows.push((id, window));
        }

        Ok(windows)
    }

    pub async fn activate(&self, window: &WindowInfo) -> Result<()> {
        if !window.class.is_empty() {
            self.run(&["-x", "-a", &window.class])?;
        } else {
            self.run(&["-a", &window.title])?;
        }
        Ok(())
    }

    pub async fn active_geometry(&self) -> Result<WindowGeometry> {
        let active = self.active_window().await?;
        let stdout = self.run(&["-lG"])?;

        // Формат: <id> <desktop> <x> <y> <w> <h> <host> <title...>
        for line in stdout.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 8 {
                continue;
            }
            let title = parts[7..].join(" ");
            if title != active.title {
                continue;
            }

            let geometry = (
                parts[2].parse::<i32>(),
                parts[3].parse::<i32>(),
                parts[4].parse::<u32>(),
                parts[5].parse::<u32>(),
            );
            if let (Ok(x), Ok(y), Ok(width), Ok(height)) = geometry {
                return Ok(WindowGeometry {
                    x,
                    y,
                    width,
                    height,
                });
            }
        }

        Err(BridgeError::Internal(
            "Геометрия активного окна не найдена".to_string(),
        ))
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("wmctrl")
            .args(args)
            .output()
            .map_err(|e| BridgeError::Internal(format!("wmctrl не найден: {}", e)))?;

        if !output.status.success() {
            return Err(BridgeError::Internal("wmctrl вернул ошибку".to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
