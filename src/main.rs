use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{info, error, warn};
use std::sync::Arc;
mod config;
mod error;
mod events;
mod services;
mod utils;

use config::Config;
use services::{
    create_pasteboard,
    create_target_paster,
    Bridge,
};

#[derive(Parser, Debug)]
#[command(name = "shotbridge")]
#[command(about = "Мост скриншот -> буфер обмена -> вставка в целевое приложение")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "shotbridge.toml")]
    config: String,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Инициализация системы логирования
    init_tracing(&args.log_level)?;

    info!("Запуск Shotbridge v{}", env!("CARGO_PKG_VERSION"));

    // Загрузка конфигурации
    let config = Arc::new(Config::load(&args.config)?);
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные действия отключены");
    }

    // Проверка прав доступа
    utils::permissions::check_permissions()?;

    // Инициализация компонентов (единый буфер обмена делят служба переноса и опрос)
    let pasteboard = create_pasteboard(args.dry_run)?;
    let paster = create_target_paster(config.clone(), args.dry_run)?;
    let bridge = Arc::new(Bridge::new(config.clone(), pasteboard, paster));

    info!("Все компоненты инициализированы");

    // Цикл обработки событий живёт в отдельной задаче
    let bridge_handle = {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            bridge.run().await;
        })
    };

    if config.bridge.enabled {
        if let Err(e) = bridge.enable().await {
            error!("Не удалось включить мост: {}", e);
            return Err(e.into());
        }
    } else {
        info!("Мост выключен в конфигурации - ожидание сигнала завершения");
    }

    // Ожидание сигнала завершения
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Получен сигнал завершения (Ctrl+C)");
        }
        Err(err) => {
            error!("Ошибка при ожидании сигнала завершения: {}", err);
        }
    }

    info!("Завершение работы...");

    // Корректная остановка: наблюдатель и опрос снимаются до обрыва цикла событий
    bridge.disable().await;
    bridge_handle.abort();

    // Ожидаем завершения задач (с таймаутом)
    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = bridge_handle.await;
    }).await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("Shotbridge завершил работу");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
