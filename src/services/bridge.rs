use crate::config::Config;
use crate::error::Result;
use crate::events::BridgeEvent;
use crate::services::clipboard_poller::ClipboardPoller;
use crate::services::directory_watcher::DirectoryWatcher;
use crate::services::image_transfer::ImageTransferService;
use crate::services::pasteboard::Pasteboard;
use crate::services::target_paster::TargetPasterTrait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Оркестратор моста: владеет состоянием включено/выключено и разводкой.
///
/// События наблюдателя и опроса сходятся в один канал и обрабатываются
/// одной задачей - попытки вставки никогда не перекрываются.
pub struct Bridge {
    config: Arc<Config>,
    transfer: ImageTransferService,
    paster: Box<dyn TargetPasterTrait + Send>,
    poller: Arc<ClipboardPoller>,
    watcher: Arc<DirectoryWatcher>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<BridgeEvent>>>,
    enabled: AtomicBool,
}

impl Bridge {
    pub fn new(
        config: Arc<Config>,
        pasteboard: Arc<dyn Pasteboard>,
        paster: Box<dyn TargetPasterTrait + Send>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let poller = Arc::new(ClipboardPoller::new(
            Arc::clone(&config),
            Arc::clone(&pasteboard),
            events_tx.clone(),
        ));
        let watcher = Arc::new(DirectoryWatcher::new(Arc::clone(&config), events_tx));
        let transfer = ImageTransferService::new(pasteboard);

        Self {
            config,
            transfer,
            paster,
            poller,
            watcher,
            events_rx: Mutex::new(Some(events_rx)),
            enabled: AtomicBool::new(false),
        }
    }

    /// Включить мост: поднять наблюдение за директорией (если настроена)
    /// и опрос буфера обмена (если включён)
    pub async fn enable(&self) -> Result<()> {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(directory) = self.config.watcher.directory.clone() {
            self.watcher.start_watching(directory).await?;
        } else {
            info!("Директория скриншотов не настроена - только буфер обмена");
        }

        if self.config.bridge.listen_clipboard {
            self.poller.start();
        }

        info!("Мост включён");
        Ok(())
    }

    /// Выключить мост. Идемпотентно.
    pub async fn disable(&self) {
        if !self.enabled.swap(false, Ordering::SeqCst) {
            return;
        }

        self.watcher.stop_watching().await;
        self.poller.stop();
        info!("Мост выключен");
    }

    /// Цикл обработки событий. Завершается, когда все отправители закрыты.
    pub async fn run(&self) {
        let rx = self.events_rx.lock().take();
        let Some(mut rx) = rx else {
            warn!("Bridge::run уже был запущен");
            return;
        };

        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }
    }

    async fn handle_event(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::FileDetected(path) => {
                match self.transfer.copy_image(&path) {
                    Ok(generation) => {
                        // Собственная запись не должна выглядеть внешним
                        // изменением буфера обмена
                        self.poller.ignore(generation);
                        self.try_paste().await;
                    }
                    Err(e) => {
                        // Статусная строка; автоматических повторов нет -
                        // пользователь переснимет скриншот
                        error!("Скриншот {:?} не перенесён: {}", path, e);
                    }
                }
            }
            BridgeEvent::ClipboardImage(clipboard_event) => {
                info!("Изображение в буфере обмена: {}", clipboard_event);
                self.try_paste().await;
            }
        }
    }

    /// Ошибки вставки не фатальны: мост остаётся взведённым для
    /// следующего события
    async fn try_paste(&self) {
        if !self.config.bridge.auto_paste {
            info!("auto_paste выключен - изображение остаётся в буфере обмена");
            return;
        }

        if let Err(e) = self.paster.activate_and_paste(None).await {
            error!("Вставка не удалась: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pasteboard::DryPasteboard;
    use crate::services::target_paster::create_target_paster;
    use std::fs;
    use tokio::time::Duration;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shotbridge-bridge-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_file_event_lands_in_pasteboard_and_is_suppressed() {
        let dir = scratch_dir("e2e");
        let mut config = Config::default();
        config.watcher.directory = Some(dir.to_string_lossy().to_string());
        config.bridge.listen_clipboard = true;
        let config = Arc::new(config);

        let pasteboard = Arc::new(DryPasteboard::new());
        let paster = create_target_paster(Arc::clone(&config), true).unwrap();
        let bridge = Arc::new(Bridge::new(
            Arc::clone(&config),
            pasteboard.clone() as Arc<dyn Pasteboard>,
            paster,
        ));

        bridge.enable().await.unwrap();
        let runner = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.run().await })
        };

        // Появляется новый скриншот
        let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
        image.save(dir.join("Screenshot e2e.png")).unwrap();

        // Дебаунс + готовность + перенос
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(pasteboard.has_image());

        bridge.disable().await;
        runner.abort();
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_enable_and_disable_are_idempotent() {
        let config = Arc::new(Config::default());
        let pasteboard = Arc::new(DryPasteboard::new());
        let paster = create_target_paster(Arc::clone(&config), true).unwrap();
        let bridge = Bridge::new(config, pasteboard as Arc<dyn Pasteboard>, paster);

        bridge.enable().await.unwrap();
        bridge.enable().await.unwrap();
        bridge.disable().await;
        bridge.disable().await;
    }
}
