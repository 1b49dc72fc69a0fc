use super::scan;
use crate::bridge_error;
use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::events::BridgeEvent;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Состояние одной сессии наблюдения. Заменяется целиком при каждом
/// start_watching, уничтожается при stop_watching.
struct WatchSession {
    path: PathBuf,
    seen: HashSet<String>,
    // Дроп подписки - авторитетный сигнал освобождения ресурса ОС
    _subscription: RecommendedWatcher,
}

enum WatcherCommand {
    Start {
        path: PathBuf,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// Наблюдатель директории скриншотов.
///
/// Сырые уведомления ОС дебаунсятся: каждый всплеск событий от одного
/// снимка сводится к одному пересканированию через debounce_ms.
pub struct DirectoryWatcher {
    commands_tx: mpsc::UnboundedSender<WatcherCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DirectoryWatcher {
    pub fn new(config: Arc<Config>, events_tx: mpsc::UnboundedSender<BridgeEvent>) -> Self {
        info!("Инициализация DirectoryWatcher (дебаунс {} мс)", config.watcher.debounce_ms);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (pings_tx, pings_rx) = mpsc::unbounded_channel();

        let worker = WatcherWorker {
            config,
            events_tx,
            pings_tx,
            session: None,
            debounce_deadline: None,
        };
        let handle = tokio::spawn(worker.run(commands_rx, pings_rx));

        Self {
            commands_tx,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Начать наблюдение. Любая предыдущая сессия заменяется целиком.
    pub async fn start_watching(&self, path: impl Into<PathBuf>) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands_tx
            .send(WatcherCommand::Start {
                path: path.into(),
                reply: reply_tx,
            })
            .map_err(|_| BridgeError::Internal("Рабочая задача наблюдателя завершена".to_string()))?;

        reply_rx
            .await
            .map_err(|_| BridgeError::Internal("Рабочая задача наблюдателя завершена".to_string()))?
    }

    /// Остановить наблюдение. Идемпотентно.
    pub async fn stop_watching(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .commands_tx
            .send(WatcherCommand::Stop { reply: reply_tx })
            .is_ok()
        {
            let _ = reply_rx.await;
        }
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self.worker.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WatcherWorker {
    config: Arc<Config>,
    events_tx: mpsc::UnboundedSender<BridgeEvent>,
    pings_tx: mpsc::UnboundedSender<()>,
    session: Option<WatchSession>,
    debounce_deadline: Option<Instant>,
}

impl WatcherWorker {
    async fn run(
        mut self,
        mut commands_rx: mpsc::UnboundedReceiver<WatcherCommand>,
        mut pings_rx: mpsc::UnboundedReceiver<()>,
    ) {
        loop {
            let deadline = self.debounce_deadline;

            tokio::select! {
                cmd = commands_rx.recv() => {
                    match cmd {
                        Some(WatcherCommand::Start { path, reply }) => {
                            let _ = reply.send(self.start_session(path));
                        }
                        Some(WatcherCommand::Stop { reply }) => {
                            self.stop_session();
                            let _ = reply.send(());
                        }
                        None => break,
                    }
                }
                Some(()) = pings_rx.recv() => {
                    // Каждое сырое уведомление переносит дедлайн заново
                    if self.session.is_some() {
                        self.debounce_deadline = Some(
                            Instant::now()
                                + Duration::from_millis(self.config.watcher.debounce_ms),
                        );
                    }
                }
                _ = sleep_until_opt(deadline) => {
                    self.debounce_deadline = None;
                    self.rescan().await;
                }
            }
        }
    }

    fn start_session(&mut self, path: PathBuf) -> Result<()> {
        // Неявный stop: прежняя сессия и её дебаунс отменяются атомарно
        self.stop_session();

        let is_dir = fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            return Err(bridge_error!(directory_missing, "{:?}", path));
        }

        // Существующие файлы попадают в seen и никогда не доставляются
        let seen = scan::snapshot_seen(&self.config, &path)
            .map_err(|e| bridge_error!(cannot_open, "{:?}: {}", path, e))?;

        let pings_tx = self.pings_tx.clone();
        let mut subscription =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    // Create покрывает новые файлы, Modify - дозапись и
                    // переименование в подходящее имя
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        let _ = pings_tx.send(());
                    }
                }
            })
            .map_err(|e| BridgeError::CannotOpenDirectory(format!("{:?}: {}", path, e)))?;

        subscription
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| BridgeError::CannotOpenDirectory(format!("{:?}: {}", path, e)))?;

        info!("Наблюдение за {:?} запущено ({} существующих файлов скрыто)", path, seen.len());

        self.session = Some(WatchSession {
            path,
            seen,
            _subscription: subscription,
        });
        Ok(())
    }

    fn stop_session(&mut self) {
        self.debounce_deadline = None;
        if let Some(session) = self.session.take() {
            info!("Наблюдение за {:?} остановлено", session.path);
        }
    }

    async fn rescan(&mut self) {
        // Сессия могла быть остановлена, пока пинг уже был в очереди
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let candidates = match scan::scan_candidates(&self.config, &session.path) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Пересканирование {:?} не удалось: {}", session.path, e);
                return;
            }
        };

        debug!("Пересканирование {:?}: {} кандидатов", session.path, candidates.len());

        for candidate in candidates {
            let name = candidate.file_name();
            if session.seen.contains(&name) {
                continue;
            }

            // Не-файл не помечается увиденным: обычный файл с тем же
            // именем ещё может появиться позже
            if !candidate.is_regular {
                debug!("{:?} не является обычным файлом - пропускаем", candidate.path);
                continue;
            }

            // Помечаем увиденным ДО ожидания готовности: даже если файл так
            // и не дозреет, повторной доставки не будет
            session.seen.insert(name);

            let ready = scan::wait_until_readable(
                &candidate.path,
                self.config.watcher.readiness_attempts,
                self.config.watcher.readiness_interval_ms,
            )
            .await;

            // Финальная безусловная проверка как ворота доставки
            if !ready && !scan::is_readable_nonempty(&candidate.path) {
                debug!("Файл {:?} так и не стал читаемым - пропускаем", candidate.path);
                continue;
            }

            info!("Новый скриншот: {:?}", candidate.path);
            if self
                .events_tx
                .send(BridgeEvent::FileDetected(candidate.path.clone()))
                .is_err()
            {
                error!("Канал событий закрыт - доставка файла невозможна");
                return;
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "shotbridge-watch-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let image = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 128, 255, 255]));
        image.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_start_watching_missing_directory() {
        let config = Arc::new(Config::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let watcher = DirectoryWatcher::new(config, tx);

        let err = watcher
            .start_watching("/nonexistent/shotbridge-dir")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::DirectoryMissing(_)));
    }

    #[tokio::test]
    async fn test_stop_watching_is_idempotent() {
        let config = Arc::new(Config::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let watcher = DirectoryWatcher::new(config, tx);

        // Остановка без запуска и двойная остановка безопасны
        watcher.stop_watching().await;
        watcher.stop_watching().await;
    }

    #[tokio::test]
    async fn test_preexisting_file_never_delivered_new_one_once() {
        let dir = scratch_dir("scenario-a");
        write_png(&dir, "IMG_1.png");
        write_png(&dir, "Screenshot old.png");

        let config = Arc::new(Config::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = DirectoryWatcher::new(config, tx);
        watcher.start_watching(&dir).await.unwrap();

        let new_path = write_png(&dir, "Screenshot 2024-01-01 at 1.00.00 PM.png");

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("событие не пришло")
            .unwrap();
        assert_eq!(event, BridgeEvent::FileDetected(new_path));

        // Ни IMG_1.png, ни повторной доставки того же файла
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());

        watcher.stop_watching().await;
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_directory_with_qualifying_name_does_not_shadow_file() {
        let dir = scratch_dir("shadow");

        let config = Arc::new(Config::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = DirectoryWatcher::new(config, tx);
        watcher.start_watching(&dir).await.unwrap();

        // Каталог с подходящим именем: не доставляется и имя не занимает
        let trap = dir.join("Screenshot trap.png");
        fs::create_dir_all(&trap).unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(rx.try_recv().is_err());

        // Обычный файл с тем же именем доставляется как новый
        fs::remove_dir(&trap).unwrap();
        let new_path = write_png(&dir, "Screenshot trap.png");

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("событие не пришло")
            .unwrap();
        assert_eq!(event, BridgeEvent::FileDetected(new_path));

        watcher.stop_watching().await;
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_restart_replaces_session() {
        let dir_a = scratch_dir("restart-a");
        let dir_b = scratch_dir("restart-b");

        let config = Arc::new(Config::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let watcher = DirectoryWatcher::new(config, tx);

        watcher.start_watching(&dir_a).await.unwrap();
        watcher.start_watching(&dir_b).await.unwrap();

        // Файл в первой директории больше не наблюдается
        write_png(&dir_a, "Screenshot ignored.png");
        let new_path = write_png(&dir_b, "Screenshot delivered.png");

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .expect("событие не пришло")
            .unwrap();
        assert_eq!(event, BridgeEvent::FileDetected(new_path));

        watcher.stop_watching().await;
        let _ = fs::remove_dir_all(&dir_a);
        let _ = fs::remove_dir_all(&dir_b);
    }
}
