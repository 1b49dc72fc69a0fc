use crate::config::Config;
use crate::debug_if_enabled;
use crate::events::{BridgeEvent, ClipboardEvent, ClipboardGeneration};
use crate::services::pasteboard::Pasteboard;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

/// Периодический опрос счётчика поколений буфера обмена.
///
/// Собственные записи подавляются по номеру поколения, а не сравнением
/// содержимого: буфер обмена помечает поколение собственной записи
/// атомарно с самой записью, поэтому гоночного окна с тиками нет, как бы
/// они ни легли. Ignore-список дополнительно принимает упреждающие
/// подавления извне.
pub struct ClipboardPoller {
    config: Arc<Config>,
    pasteboard: Arc<dyn Pasteboard>,
    events_tx: UnboundedSender<BridgeEvent>,
    // Поколения к подавлению; каждая запись потребляется ровно один раз.
    // ignore() зовут из другого потока управления, чем тики - DashMap
    // делает вставку безопасной без общего лока.
    ignored: Arc<DashMap<u64, ()>>,
    state: Arc<Mutex<PollerState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Default)]
struct PollerState {
    last_seen: ClipboardGeneration,
    pending: Option<PendingGeneration>,
}

/// Поколение, счётчик которого уже сдвинулся, но содержимое ещё могло
/// не дозреть до изображения
#[derive(Debug, Clone, Copy)]
struct PendingGeneration {
    generation: ClipboardGeneration,
    retries: u32,
}

impl ClipboardPoller {
    pub fn new(
        config: Arc<Config>,
        pasteboard: Arc<dyn Pasteboard>,
        events_tx: UnboundedSender<BridgeEvent>,
    ) -> Self {
        info!("Инициализация ClipboardPoller (интервал {} мс)", config.poller.interval_ms);

        Self {
            config,
            pasteboard,
            events_tx,
            ignored: Arc::new(DashMap::new()),
            state: Arc::new(Mutex::new(PollerState::default())),
            task: Mutex::new(None),
        }
    }

    /// Начать опрос. Идемпотентно: повторный вызов перезапускает опрос
    /// и сбрасывает базовое поколение на текущее.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if let Some(handle) = task.take() {
            debug!("ClipboardPoller уже запущен - перезапуск");
            handle.abort();
        }

        // Базой становится текущее поколение: всё, что было в буфере
        // до запуска, не считается событием
        {
            let mut state = self.state.lock();
            state.last_seen = self.pasteboard.generation();
            state.pending = None;
        }
        self.ignored.clear();

        let pasteboard = Arc::clone(&self.pasteboard);
        let state = Arc::clone(&self.state);
        let ignored = Arc::clone(&self.ignored);
        let events_tx = self.events_tx.clone();
        let interval_ms = self.config.poller.interval_ms;
        let retry_limit = self.config.poller.retry_limit;

        *task = Some(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(interval_ms));
            info!("ClipboardPoller запущен");

            loop {
                ticker.tick().await;

                if let Some(event) =
                    Self::tick_once(pasteboard.as_ref(), &state, &ignored, retry_limit)
                {
                    info!("Внешнее изображение в буфере обмена: {}", event);
                    if events_tx.send(BridgeEvent::ClipboardImage(event)).is_err() {
                        warn!("Канал событий закрыт - остановка опроса");
                        break;
                    }
                }
            }
        }));
    }

    /// Остановить опрос и очистить учёт поколений. Идемпотентно.
    pub fn stop(&self) {
        let mut task = self.task.lock();
        if let Some(handle) = task.take() {
            handle.abort();
            info!("ClipboardPoller остановлен");
        }

        self.state.lock().pending = None;
        self.ignored.clear();
    }

    /// Подавить одно конкретное поколение, когда оно будет замечено.
    /// Безопасно звать параллельно с тиками.
    pub fn ignore(&self, generation: ClipboardGeneration) {
        debug!("Поколение {} помечено как собственное", generation);
        self.ignored.insert(generation.value(), ());
    }

    /// Один шаг опроса. Возвращает событие, если поколение внешнее
    /// и содержимое - изображение.
    fn tick_once(
        pasteboard: &dyn Pasteboard,
        state: &Mutex<PollerState>,
        ignored: &DashMap<u64, ()>,
        retry_limit: u32,
    ) -> Option<ClipboardEvent> {
        let mut state = state.lock();

        let live = pasteboard.generation();
        if live != state.last_seen {
            state.last_seen = live;
            state.pending = Some(PendingGeneration {
                generation: live,
                retries: 0,
            });

            // Поколения старше live уже никогда не станут текущими:
            // их ignore-записи вычищаются, а не копятся до перезапуска
            ignored.retain(|generation, _| *generation >= live.value());
        }

        let pending = state.pending.as_mut()?;
        let generation = pending.generation;

        // Упреждающее подавление: потребляем ignore-запись ровно один раз
        if ignored.remove(&generation.value()).is_some() {
            debug_if_enabled!("Поколение {} подавлено по ignore-списку", generation);
            state.pending = None;
            return None;
        }

        // Собственная запись буфера обмена; отметка выставлена атомарно
        // с записью, так что тик между записью и ignore() её уже видит
        if pasteboard.take_self_caused(generation) {
            debug_if_enabled!("Поколение {} подавлено как собственное", generation);
            state.pending = None;
            return None;
        }

        if pasteboard.has_image() {
            state.pending = None;
            return Some(ClipboardEvent::new(generation, pasteboard.content_types()));
        }

        // Счётчик сдвинулся, но изображения (пока) нет: обычный текст либо
        // байты ещё не закоммичены. Ждём ограниченное число тиков.
        pending.retries += 1;
        if pending.retries >= retry_limit {
            debug!("Поколение {} не дозрело до изображения - сброс", generation);
            state.pending = None;
        }

        None
    }
}

impl Drop for ClipboardPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}
