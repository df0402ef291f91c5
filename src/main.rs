use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, error, warn};
use std::sync::Arc;
mod config;
mod error;
mod events;
mod services;
mod utils;

use config::Config;
use services::{
    create_display_watcher,
    create_launcher,
    dbus_service,
    osd::{DBusOsd, LogOsd, NoopPostSwitchHook, OsdSink},
    CapabilityProber,
    CardInfoCache,
    FileConfigStore,
    StartupListener,
    SwitcherDeps,
    SysfsCardSource,
    SysfsPlatformProbe,
    Switcher,
};
use utils::DrmFinder;

#[derive(Parser, Debug)]
#[command(name = "wm-switcher")]
#[command(about = "Сервис переключения оконного менеджера сессии")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "wm-switcher.toml")]
    config: String,

    /// Режим сухого запуска (без реальных действий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,

    /// Окно выбора оконного менеджера уже показывалось в этой сессии
    #[arg(long)]
    wm_chooser_launched: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;

    // Инициализация системы логирования
    let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(log_level)?;

    info!("Запуск WM Switcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - реальные действия отключены");
    }

    // Сессионная шина нужна для запуска WM, OSD и сигналов deepin-wm
    let session = if args.dry_run {
        None
    } else {
        Some(zbus::Connection::session().await?)
    };

    let osd: Arc<dyn OsdSink> = match &session {
        Some(connection) => Arc::new(DBusOsd::new(connection.clone())),
        None => Arc::new(LogOsd),
    };

    let deps = SwitcherDeps {
        store: Arc::new(FileConfigStore::new(
            config.paths.system_config.clone(),
            config.paths.user_config.clone(),
        )),
        launcher: create_launcher(session.clone()),
        osd,
        hook: Arc::new(NoopPostSwitchHook),
        env_token: config.launcher.env_token.clone(),
    };

    // Проверка оборудования нужна только на время инициализации
    let prober = CapabilityProber::new(Arc::new(SysfsPlatformProbe::new(
        DrmFinder::new(),
        config.paths.platform_env.clone(),
    )));
    let cards = CardInfoCache::new(
        Box::new(SysfsCardSource::new(DrmFinder::new())),
        config.paths.card_cache.clone(),
    );

    let switcher = Arc::new(Switcher::init(deps, &prober, &cards, args.wm_chooser_launched));
    info!(
        "Switcher инициализирован: текущий WM {}, ожидание готовности: {}, выбор WM показан: {}",
        switcher.current_wm_label(),
        switcher.should_wait(),
        switcher.wm_chooser_launched()
    );

    let mut handles = Vec::new();

    // Публикация интерфейса и пересылка WMChanged
    if let Some(connection) = &session {
        let service_connection = dbus_service::serve(switcher.clone()).await?;
        let changes = switcher.subscribe_wm_changed();
        handles.push(tokio::spawn(async move {
            if let Err(e) = dbus_service::forward_wm_changed(service_connection, changes).await {
                error!("Ошибка пересылки WMChanged: {}", e);
            }
        }));

        // StartupReady: своя очередь и свой потребитель
        let (startup_tx, startup_rx) = mpsc::channel(config.watcher.queue_capacity);
        handles.push(tokio::spawn(switcher.clone().consume_events(startup_rx)));
        let listener = StartupListener::new(connection.clone(), startup_tx);
        handles.push(tokio::spawn(async move {
            if let Err(e) = listener.run().await {
                warn!("Слушатель StartupReady отключён: {}", e);
            }
        }));
    } else {
        let mut changes = switcher.subscribe_wm_changed();
        handles.push(tokio::spawn(async move {
            while let Ok(label) = changes.recv().await {
                info!("[DRY RUN] WMChanged: {}", label);
            }
        }));
    }

    // Живое отслеживание оконного менеджера
    if config.watcher.enabled {
        let (watch_tx, watch_rx) = mpsc::channel(config.watcher.queue_capacity);
        handles.push(tokio::spawn(switcher.clone().consume_events(watch_rx)));
        let watcher = create_display_watcher(watch_tx, args.dry_run);
        handles.push(tokio::spawn(async move {
            if let Err(e) = watcher.run().await {
                warn!("Отслеживание оконного менеджера отключено: {}", e);
            }
        }));
    } else {
        info!("Отслеживание оконного менеджера выключено в конфигурации");
    }

    info!("Все сервисы запущены");

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

    for handle in &handles {
        handle.abort();
    }

    // Ожидаем завершения задач (с таймаутом)
    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        for handle in handles {
            let _ = handle.await;
        }
    }).await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("WM Switcher завершил работу");

    // Поток X11 остаётся заблокирован в wait_for_event, runtime его не дождётся
    std::process::exit(0)
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
