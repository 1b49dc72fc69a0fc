use crate::error::{BridgeError, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use tracing::debug;

fn new_enigo() -> Result<Enigo> {
    Enigo::new(&Settings::default()).map_err(|e| {
        BridgeError::KeyInjectionFailed(format!("не удалось создать драйвер ввода: {:?}", e))
    })
}

/// Синтезировать аккорд вставки: Ctrl down, V, Ctrl up
pub fn send_paste_chord() -> Result<()> {
    let mut enigo = new_enigo()?;

    enigo
        .key(Key::Control, Direction::Press)
        .map_err(|e| BridgeError::KeyInjectionFailed(format!("Ctrl press: {:?}", e)))?;
    let result = enigo
        .key(Key::Unicode('v'), Direction::Click)
        .map_err(|e| BridgeError::KeyInjectionFailed(format!("V click: {:?}", e)));
    // Ctrl отпускается даже если V не прошла - иначе залипший модификатор
    enigo
        .key(Key::Control, Direction::Release)
        .map_err(|e| BridgeError::KeyInjectionFailed(format!("Ctrl release: {:?}", e)))?;

    result?;
    debug!("Аккорд вставки отправлен");
    Ok(())
}

/// Клик в заданной точке экрана (наводка фокуса в поле ввода)
pub fn click_at(x: i32, y: i32) -> Result<()> {
    let mut enigo = new_enigo()?;

    enigo
        .move_mouse(x, y, Coordinate::Abs)
        .map_err(|e| BridgeError::KeyInjectionFailed(format!("move_mouse: {:?}", e)))?;
    enigo
        .button(Button::Left, Direction::Click)
        .map_err(|e| BridgeError::KeyInjectionFailed(format!("button click: {:?}", e)))?;

    debug!("Клик-наводка фокуса в ({}, {})", x, y);
    Ok(())
}
