use crate::error::{BridgeError, Result};
use crate::events::{WindowGeometry, WindowInfo};
use std::process::Command;

pub struct SwayControl;

impl SwayControl {
    pub fn new() -> Self {
        Self
    }

    pub async fn test(&self) -> Result<()> {
        let output = Command::new("swaymsg").args(["-t", "get_tree"]).output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(BridgeError::Internal("sway failed".to_string()))
        }
    }

    pub async fn active_window(&self) -> Result<WindowInfo> {
        let tree = self.tree()?;

        if let Some(start) = tree.find("\"focused\": true").or_else(|| tree.find("\"focused\":true")) {
            let before = &tree[..start];
            let title = extract_rfind_string(before, "\"name\":")
                .ok_or_else(|| BridgeError::Internal("Активное окно в Sway не найдено".to_string()))?;
            let class = extract_rfind_string(before, "\"app_id\":").unwrap_or_default();
            return Ok(WindowInfo::new(title).with_class(class));
        }

        Err(BridgeError::Internal("Активное окно в Sway не найдено".to_string()))
    }

    pub async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let tree = self.tree()?;

        // Окна - узлы с pid; заголовок и app_id стоят в узле раньше pid
        let mut windows = Vec::new();
        let mut rest = tree.as_str();
        while let Some(pos) = rest.find("\"pid\":") {
            let before = &rest[..pos];
            if let Some(title) = extract_rfind_string(before, "\"name\":") {
                let class = extract_rfind_string(before, "\"app_id\":").unwrap_or_default();
                windows.push(WindowInfo::new(title).with_class(class));
            }
            rest = &rest[pos + 6..];
        }

        Ok(windows)
    }

    pub async fn activate(&self, window: &WindowInfo) -> Result<()> {
        let selector = if !window.class.is_empty() {
            format!("[app_id=\"{}\"] focus", window.class)
        } else {
            format!("[title=\"{}\"] focus", window.title.replace('"', "\\\""))
        };

        let output = Command::new("swaymsg")
            .arg(&selector)
            .output()
            .map_err(|e| BridgeError::Internal(format!("swaymsg не найден: {}", e)))?;
        if !output.status.success() {
            return Err(BridgeError::Internal(format!(
                "swaymsg не смог сфокусировать: {}",
                selector
            )));
        }
        Ok(())
    }

    pub async fn active_geometry(&self) -> Result<WindowGeometry> {
        let tree = self.tree()?;

        let focused = tree
            .find("\"focused\": true")
            .or_else(|| tree.find("\"focused\":true"))
            .ok_or_else(|| BridgeError::Internal("Активное окно в Sway не найдено".to_string()))?;

        // rect узла стоит раньше флага focused
        let before = &tree[..focused];
        let rect_start = before
            .rfind("\"rect\":")
            .ok_or_else(|| BridgeError::Internal("rect активного окна не найден".to_string()))?;
        let rect = &before[rect_start..];

        let geometry = (
            extract_int(rect, "\"x\":"),
            extract_int(rect, "\"y\":"),
            extract_int(rect, "\"width\":"),
            extract_int(rect, "\"height\":"),
        );
        match geometry {
            (Some(x), Some(y), Some(width), Some(height)) if width > 0 && height > 0 => {
                Ok(WindowGeometry {
                    x,
                    y,
                    width: width as u32,
                    height: height as u32,
                })
            }
            _ => Err(BridgeError::Internal("rect активного окна не разобран".to_string())),
        }
    }

    fn tree(&self) -> Result<String> {
        let output = Command::new("swaymsg")
            .args(["-t", "get_tree"])
            .output()
            .map_err(|e| BridgeError::Internal(format!("swaymsg не найден: {}", e)))?;

        if !output.status.success() {
            return Err(BridgeError::Internal("swaymsg вернул ошибку".to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Последнее строковое значение JSON-ключа перед точкой поиска
fn extract_rfind_string(haystack: &str, key: &str) -> Option<String> {
    let key_pos = haystack.rfind(key)?;
    let after = &haystack[key_pos + key.len()..];
    let quote_start = after.find('"')?;
    let value = &after[quote_start + 1..];
    let quote_end = value.find('"')?;
    let value = value[..quote_end].to_string();
    if value.is_empty() || value == "null" {
        None
    } else {
        Some(value)
    }
}

/// Первое целое значение JSON-ключа после точки поиска
fn extract_int(haystack: &str, key: &str) -> Option<i32> {
    let key_pos = haystack.find(key)?;
    let after = haystack[key_pos + key.len()..].trim_start();
    let end = after
        .find(|c: char| !c.is_ascii_digit() && c != '-')
        .unwrap_or(after.len());
    after[..end].parse::<i32>().ok()
}
