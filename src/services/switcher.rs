use crate::debug_if_enabled;
use crate::error::{Result, SwitcherError};
use crate::events::{OsdEvent, SwitcherEvent, WindowManagerIdentity};
use crate::services::capability::CapabilityProber;
use crate::services::card_cache::CardInfoCache;
use crate::services::config_store::{ConfigStore, SystemConfig, UserConfig};
use crate::services::launcher::Launcher;
use crate::services::osd::{OsdSink, PostSwitchHook};
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Метка, когда текущий оконный менеджер не распознан
pub const UNKNOWN_LABEL: &str = "unknown";

/// Внешние зависимости Switcher
pub struct SwitcherDeps {
    pub store: Arc<dyn ConfigStore>,
    pub launcher: Arc<dyn Launcher>,
    pub osd: Arc<dyn OsdSink>,
    pub hook: Arc<dyn PostSwitchHook>,
    /// Переопределение окружения для `env` (например GDK_SCALE=1)
    pub env_token: String,
}

/// Состояние под единственной блокировкой
#[derive(Debug)]
struct SwitcherState {
    current_wm: WindowManagerIdentity,
    startup_signal_count: u32,
    wm_chooser_launched: bool,
}

pub struct Switcher {
    system_config: SystemConfig,
    user_config: Mutex<UserConfig>,
    state: Mutex<SwitcherState>,
    store: Arc<dyn ConfigStore>,
    launcher: Arc<dyn Launcher>,
    osd: Arc<dyn OsdSink>,
    hook: Arc<dyn PostSwitchHook>,
    env_token: String,
    wm_changed: broadcast::Sender<String>,
}

impl Switcher {
    /// Загрузка политики и выбор последнего рабочего оконного менеджера.
    ///
    /// Проверки оборудования выполняются только если переключение разрешено.
    /// При смене видеокарт (и если выбор WM ещё не показывался) сохранённый
    /// выбор игнорируется и значение по умолчанию пересчитывается.
    pub fn init(
        deps: SwitcherDeps,
        prober: &CapabilityProber,
        cards: &CardInfoCache,
        wm_chooser_launched: bool,
    ) -> Self {
        info!("Инициализация Switcher (wm_chooser_launched: {})", wm_chooser_launched);

        let system_config = match deps.store.load_system_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("Не удалось загрузить системную конфигурацию: {}. Переключение разрешено", e);
                SystemConfig::default()
            }
        };

        let user_config = if system_config.allow_switch {
            let card_changed = cards.is_changed();
            if !wm_chooser_launched && card_changed {
                info!("Видеокарты изменились, пересчитываем выбор оконного менеджера");
                Self::init_user_config(deps.store.as_ref(), prober)
            } else {
                match deps.store.load_user_config() {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Не удалось загрузить пользовательскую конфигурацию: {}", e);
                        Self::init_user_config(deps.store.as_ref(), prober)
                    }
                }
            }
        } else {
            info!("Переключение оконного менеджера запрещено администратором");
            UserConfig::default()
        };

        let current_wm = Self::effective_wm_for(&system_config, &user_config);
        info!(
            "Начальный оконный менеджер: {} (ожидание готовности: {})",
            current_wm,
            !system_config.allow_switch || user_config.wait
        );

        let (wm_changed, _) = broadcast::channel(16);

        Self {
            system_config,
            user_config: Mutex::new(user_config),
            state: Mutex::new(SwitcherState {
                current_wm,
                startup_signal_count: 0,
                wm_chooser_launched,
            }),
            store: deps.store,
            launcher: deps.launcher,
            osd: deps.osd,
            hook: deps.hook,
            env_token: deps.env_token,
            wm_changed,
        }
    }

    fn init_user_config(store: &dyn ConfigStore, prober: &CapabilityProber) -> UserConfig {
        let config = UserConfig::for_capability(prober.support_run_good_wm());
        info!("Новая пользовательская конфигурация: {:?}", config);

        if let Err(e) = store.save_user_config(&config) {
            warn!("Не удалось сохранить пользовательскую конфигурацию: {}", e);
        }
        config
    }

    fn effective_wm_for(system: &SystemConfig, user: &UserConfig) -> WindowManagerIdentity {
        if system.allow_switch {
            user.last_wm
        } else {
            WindowManagerIdentity::Light
        }
    }

    pub fn allow_switch(&self) -> bool {
        self.system_config.allow_switch
    }

    /// Оконный менеджер, который выбирает действующая политика
    pub fn effective_wm(&self) -> WindowManagerIdentity {
        Self::effective_wm_for(&self.system_config, &self.user_config.lock())
    }

    /// Ждать ли готовности оконного менеджера при старте сессии
    pub fn should_wait(&self) -> bool {
        if self.allow_switch() {
            self.user_config.lock().wait
        } else {
            true
        }
    }

    pub fn wm_chooser_launched(&self) -> bool {
        self.state.lock().wm_chooser_launched
    }

    /// Подписка на смену текущего оконного менеджера (метка для WMChanged)
    pub fn subscribe_wm_changed(&self) -> broadcast::Receiver<String> {
        self.wm_changed.subscribe()
    }

    pub fn current_wm(&self) -> WindowManagerIdentity {
        self.state.lock().current_wm
    }

    /// Человекочитаемое имя текущего оконного менеджера
    pub fn current_wm_label(&self) -> String {
        let state = self.state.lock();
        state.current_wm.label().unwrap_or(UNKNOWN_LABEL).to_string()
    }

    /// Перезапустить оконный менеджер, выбранный политикой, с --replace
    pub async fn restart_last_wm(&self) -> Result<()> {
        let wm = self.effective_wm();
        info!("Перезапуск оконного менеджера {}", wm);
        self.run_wm(wm, true).await
    }

    /// Запуск deepin-metacity без --replace (watchdog сессии).
    /// Выбор запоминается только в памяти, в конфигурацию не пишется.
    pub async fn start_light_wm_only(&self) -> Result<()> {
        self.run_wm(WindowManagerIdentity::Light, false).await?;
        self.user_config.lock().last_wm = WindowManagerIdentity::Light;
        info!("Запущен {} без замены", WindowManagerIdentity::Light);
        Ok(())
    }

    /// Переключить оконный менеджер на противоположный текущему
    pub async fn request_switch(&self) -> Result<()> {
        if !self.allow_switch() {
            warn!("Запрос на переключение отклонён политикой");
            self.osd.show(OsdEvent::SwitchError);
            return Err(SwitcherError::SwitchRefused);
        }

        let current = self.current_wm();
        let next = current.toggle_target();
        info!("Переключение оконного менеджера: {} -> {}", current, next);

        // Сначала запуск, и только после успеха фиксируем выбор
        self.run_wm(next, true).await?;

        self.user_config.lock().last_wm = next;
        self.save_user_config();

        if let Err(e) = self.hook.after_switch(self.effective_wm()) {
            warn!("Подстройка после переключения не удалась: {}", e);
        }

        Ok(())
    }

    /// Обновить текущий оконный менеджер; WMChanged только при реальной смене
    pub fn set_current_wm(&self, wm: WindowManagerIdentity) {
        let mut state = self.state.lock();
        if state.current_wm == wm {
            debug_if_enabled!("Оконный менеджер не изменился: {}", wm);
            return;
        }

        info!("Текущий оконный менеджер: {} -> {}", state.current_wm, wm);
        state.current_wm = wm;

        // Для нераспознанного WM сигнал несёт пустое имя
        let label = wm.label().unwrap_or("").to_string();
        // Ошибка означает лишь отсутствие подписчиков
        let _ = self.wm_changed.send(label);
    }

    /// Сигнал StartupReady: первый запуск сессии без OSD, последующие с OSD
    pub fn handle_startup_ready(&self, wm_name: &str) {
        let count = {
            let mut state = self.state.lock();
            let count = state.startup_signal_count;
            state.startup_signal_count = count.saturating_add(1);
            count
        };
        debug!("Получен сигнал StartupReady {} (счётчик {})", wm_name, count);

        if count > 0 {
            if let Some(event) = OsdEvent::for_startup(WindowManagerIdentity::from_executable(wm_name)) {
                self.osd.show(event);
            }
        }
    }

    /// Применить событие из очереди слушателя
    pub fn handle_event(&self, event: SwitcherEvent) {
        debug_if_enabled!("Обработка события: {}", event);

        match event {
            SwitcherEvent::WmObserved(wm) => self.set_current_wm(wm),
            SwitcherEvent::WmLost => debug!("Оконный менеджер завершился"),
            SwitcherEvent::StartupReady(name) => self.handle_startup_ready(&name),
        }
    }

    /// Единственный потребитель очереди слушателя: события применяются по порядку
    pub async fn consume_events(self: Arc<Self>, mut events: mpsc::Receiver<SwitcherEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        debug!("Очередь событий закрыта");
    }

    async fn run_wm(&self, wm: WindowManagerIdentity, replace: bool) -> Result<()> {
        let exe = wm
            .executable()
            .ok_or_else(|| crate::switcher_error!(launch, "Нет исполняемого файла для {}", wm))?;

        let mut args: SmallVec<[String; 3]> = smallvec![self.env_token.clone(), exe.to_string()];
        if replace {
            args.push("--replace".to_string());
        }

        self.launcher.run_command("env", &args).await
    }

    fn save_user_config(&self) {
        let config = *self.user_config.lock();
        if let Err(e) = self.store.save_user_config(&config) {
            warn!("Не удалось сохранить пользовательскую конфигурацию: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capability::tests::FakeProbe;
    use crate::services::card_cache::tests::{card, FakeSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::broadcast::error::TryRecvError;

    #[derive(Default)]
    struct FakeStore {
        system: Option<SystemConfig>,
        user: Mutex<Option<UserConfig>>,
        saves: AtomicUsize,
    }

    impl FakeStore {
        fn new(allow_switch: bool, user: Option<UserConfig>) -> Self {
            Self {
                system: Some(SystemConfig { allow_switch }),
                user: Mutex::new(user),
                saves: AtomicUsize::new(0),
            }
        }

        fn saved(&self) -> Option<UserConfig> {
            *self.user.lock()
        }
    }

    impl ConfigStore for FakeStore {
        fn load_system_config(&self) -> Result<SystemConfig> {
            self.system.ok_or_else(|| SwitcherError::ConfigLoad("нет файла".to_string()))
        }

        fn load_user_config(&self) -> Result<UserConfig> {
            self.user.lock().ok_or_else(|| SwitcherError::ConfigLoad("нет файла".to_string()))
        }

        fn save_user_config(&self, config: &UserConfig) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.user.lock() = Some(*config);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeLauncher {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Launcher for FakeLauncher {
        async fn run_command(&self, command: &str, args: &[String]) -> Result<()> {
            self.calls.lock().push((command.to_string(), args.to_vec()));
            if self.fail {
                return Err(SwitcherError::Launch("supervisor down".to_string()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeOsd {
        shown: Mutex<Vec<OsdEvent>>,
    }

    impl OsdSink for FakeOsd {
        fn show(&self, event: OsdEvent) {
            self.shown.lock().push(event);
        }
    }

    struct FailingHook;

    impl PostSwitchHook for FailingHook {
        fn after_switch(&self, _effective_wm: WindowManagerIdentity) -> Result<()> {
            Err(SwitcherError::Internal("skin file is read-only".to_string()))
        }
    }

    struct Harness {
        switcher: Switcher,
        store: Arc<FakeStore>,
        launcher: Arc<FakeLauncher>,
        osd: Arc<FakeOsd>,
        probe: Arc<FakeProbe>,
        source: FakeSource,
        _dir: tempfile::TempDir,
    }

    struct Setup {
        store: FakeStore,
        probe: FakeProbe,
        launcher: FakeLauncher,
        hardware_changed: bool,
        wm_chooser_launched: bool,
        hook: Arc<dyn PostSwitchHook>,
    }

    impl Setup {
        fn new(store: FakeStore) -> Self {
            Self {
                store,
                probe: FakeProbe::default(),
                launcher: FakeLauncher::default(),
                hardware_changed: false,
                wm_chooser_launched: false,
                hook: Arc::new(crate::services::osd::NoopPostSwitchHook),
            }
        }

        fn build(self) -> Harness {
            let dir = tempfile::tempdir().unwrap();
            let source = FakeSource::with(vec![card("card0", "0x1002")]);
            let cards = CardInfoCache::new(Box::new(source.clone()), dir.path().join("card_infos.json"));
            if !self.hardware_changed {
                // Снимок уже сохранён в прошлой сессии
                assert!(cards.is_changed());
            }
            source.calls.store(0, Ordering::SeqCst);

            let store = Arc::new(self.store);
            let launcher = Arc::new(self.launcher);
            let osd = Arc::new(FakeOsd::default());
            let probe = Arc::new(self.probe);
            let prober = CapabilityProber::new(probe.clone());

            let switcher = Switcher::init(
                SwitcherDeps {
                    store: store.clone(),
                    launcher: launcher.clone(),
                    osd: osd.clone(),
                    hook: self.hook,
                    env_token: "GDK_SCALE=1".to_string(),
                },
                &prober,
                &cards,
                self.wm_chooser_launched,
            );

            Harness {
                switcher,
                store,
                launcher,
                osd,
                probe,
                source,
                _dir: dir,
            }
        }
    }

    fn user(last_wm: WindowManagerIdentity) -> UserConfig {
        UserConfig { last_wm, wait: false }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_current_wm_is_idempotent() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light)))).build();
        let mut rx = h.switcher.subscribe_wm_changed();

        h.switcher.set_current_wm(WindowManagerIdentity::Rich);
        h.switcher.set_current_wm(WindowManagerIdentity::Rich);
        assert_eq!(rx.try_recv().unwrap(), "deepin wm");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        h.switcher.set_current_wm(WindowManagerIdentity::Unknown);
        assert_eq!(rx.try_recv().unwrap(), "");
        assert_eq!(h.switcher.current_wm_label(), UNKNOWN_LABEL);
    }

    #[test]
    fn test_unknown_wm_changed_carries_empty_name() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Rich)))).build();
        let mut rx = h.switcher.subscribe_wm_changed();

        h.switcher.handle_event(SwitcherEvent::WmObserved(WindowManagerIdentity::Unknown));
        assert_eq!(rx.try_recv().unwrap(), "");

        h.switcher.handle_event(SwitcherEvent::WmObserved(WindowManagerIdentity::Light));
        assert_eq!(rx.try_recv().unwrap(), "deepin metacity");
    }

    #[test]
    fn test_initial_wm_emits_nothing() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light)))).build();
        let mut rx = h.switcher.subscribe_wm_changed();

        h.switcher.set_current_wm(WindowManagerIdentity::Light);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(h.switcher.current_wm_label(), "deepin metacity");
    }

    #[tokio::test]
    async fn test_request_switch_refused_by_policy() {
        let h = Setup::new(FakeStore::new(false, Some(user(WindowManagerIdentity::Rich)))).build();

        let result = h.switcher.request_switch().await;
        assert!(matches!(result, Err(SwitcherError::SwitchRefused)));
        assert!(h.launcher.calls.lock().is_empty());
        assert_eq!(*h.osd.shown.lock(), vec![OsdEvent::SwitchError]);
    }

    #[tokio::test]
    async fn test_request_switch_toggles_and_persists() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Rich)))).build();
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Rich);

        h.switcher.request_switch().await.unwrap();
        assert_eq!(
            h.launcher.calls.lock()[0],
            ("env".to_string(), args(&["GDK_SCALE=1", "deepin-metacity", "--replace"]))
        );
        assert_eq!(h.store.saved().unwrap().last_wm, WindowManagerIdentity::Light);
        assert_eq!(h.switcher.effective_wm(), WindowManagerIdentity::Light);

        // Текущий WM меняется только по наблюдению X11
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Rich);

        h.switcher.set_current_wm(WindowManagerIdentity::Light);
        h.switcher.request_switch().await.unwrap();
        assert_eq!(h.launcher.calls.lock()[1].1[1], "deepin-wm");
    }

    #[tokio::test]
    async fn test_request_switch_from_unknown_targets_rich() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light)))).build();
        h.switcher.set_current_wm(WindowManagerIdentity::Unknown);

        h.switcher.request_switch().await.unwrap();
        assert_eq!(h.launcher.calls.lock()[0].1[1], "deepin-wm");
        assert_eq!(h.store.saved().unwrap().last_wm, WindowManagerIdentity::Rich);
    }

    #[tokio::test]
    async fn test_failed_launch_does_not_persist() {
        let mut setup = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light))));
        setup.launcher.fail = true;
        let h = setup.build();
        let saves_before = h.store.saves.load(Ordering::SeqCst);

        let result = h.switcher.request_switch().await;
        assert!(matches!(result, Err(SwitcherError::Launch(_))));
        assert_eq!(h.store.saves.load(Ordering::SeqCst), saves_before);
        assert_eq!(h.switcher.effective_wm(), WindowManagerIdentity::Light);
    }

    #[tokio::test]
    async fn test_hook_failure_does_not_fail_switch() {
        let mut setup = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light))));
        setup.hook = Arc::new(FailingHook);
        let h = setup.build();

        assert!(h.switcher.request_switch().await.is_ok());
        assert_eq!(h.store.saved().unwrap().last_wm, WindowManagerIdentity::Rich);
    }

    #[tokio::test]
    async fn test_start_light_wm_only_never_saves() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Rich)))).build();
        let saves_before = h.store.saves.load(Ordering::SeqCst);

        h.switcher.start_light_wm_only().await.unwrap();
        assert_eq!(
            h.launcher.calls.lock()[0],
            ("env".to_string(), args(&["GDK_SCALE=1", "deepin-metacity"]))
        );
        assert_eq!(h.store.saves.load(Ordering::SeqCst), saves_before);
        assert_eq!(h.store.saved().unwrap().last_wm, WindowManagerIdentity::Rich);
        assert_eq!(h.switcher.effective_wm(), WindowManagerIdentity::Light);
    }

    #[tokio::test]
    async fn test_restart_uses_effective_wm() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Rich)))).build();
        h.switcher.restart_last_wm().await.unwrap();
        assert_eq!(
            h.launcher.calls.lock()[0].1,
            args(&["GDK_SCALE=1", "deepin-wm", "--replace"])
        );

        let h = Setup::new(FakeStore::new(false, Some(user(WindowManagerIdentity::Rich)))).build();
        h.switcher.restart_last_wm().await.unwrap();
        assert_eq!(h.launcher.calls.lock()[0].1[1], "deepin-metacity");
        assert_eq!(h.store.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_init_switch_disabled_skips_probes() {
        let mut setup = Setup::new(FakeStore::new(false, Some(user(WindowManagerIdentity::Rich))));
        setup.hardware_changed = true;
        let h = setup.build();

        assert_eq!(h.probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.switcher.effective_wm(), WindowManagerIdentity::Light);
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Light);
        assert!(h.switcher.should_wait());
    }

    #[test]
    fn test_init_unchanged_hardware_uses_persisted_config() {
        // Проба сказала бы Rich, но сохранённый выбор важнее
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light)))).build();

        assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Light);
        assert!(!h.switcher.should_wait());
        assert_eq!(h.store.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_init_changed_hardware_recomputes_default() {
        let mut setup = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light))));
        setup.hardware_changed = true;
        let h = setup.build();

        assert_eq!(h.probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Rich);
        assert_eq!(
            h.store.saved(),
            Some(UserConfig { last_wm: WindowManagerIdentity::Rich, wait: true })
        );
    }

    #[test]
    fn test_init_changed_hardware_unsupported_defaults_to_light() {
        let mut setup = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Rich))));
        setup.hardware_changed = true;
        setup.probe.driver_broken = true;
        let h = setup.build();

        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Light);
        assert!(h.switcher.should_wait());
    }

    #[test]
    fn test_init_chooser_launched_keeps_persisted_config() {
        let mut setup = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light))));
        setup.hardware_changed = true;
        setup.wm_chooser_launched = true;
        let h = setup.build();

        assert!(h.switcher.wm_chooser_launched());
        assert_eq!(h.probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Light);
    }

    #[test]
    fn test_init_unloadable_config_falls_back_to_default() {
        let h = Setup::new(FakeStore::new(true, None)).build();

        assert_eq!(h.probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Rich);
        assert_eq!(h.store.saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_init_missing_system_config_allows_switch() {
        let mut store = FakeStore::new(true, Some(user(WindowManagerIdentity::Light)));
        store.system = None;
        let h = Setup::new(store).build();

        assert!(h.switcher.allow_switch());
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Light);
    }

    #[test]
    fn test_startup_ready_first_signal_is_silent() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Rich)))).build();

        h.switcher.handle_event(SwitcherEvent::StartupReady("deepin-wm".to_string()));
        assert!(h.osd.shown.lock().is_empty());

        h.switcher.handle_event(SwitcherEvent::StartupReady("deepin-metacity".to_string()));
        h.switcher.handle_event(SwitcherEvent::StartupReady("deepin-wm".to_string()));
        h.switcher.handle_event(SwitcherEvent::StartupReady("kwin".to_string()));
        assert_eq!(*h.osd.shown.lock(), vec![OsdEvent::Switch2D, OsdEvent::Switch3D]);
    }

    #[test]
    fn test_startup_counter_saturates() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Rich)))).build();
        h.switcher.state.lock().startup_signal_count = u32::MAX - 1;

        h.switcher.handle_startup_ready("deepin-wm");
        h.switcher.handle_startup_ready("deepin-wm");
        h.switcher.handle_startup_ready("deepin-metacity");

        assert_eq!(h.switcher.state.lock().startup_signal_count, u32::MAX);
        assert_eq!(
            *h.osd.shown.lock(),
            vec![OsdEvent::Switch3D, OsdEvent::Switch3D, OsdEvent::Switch2D]
        );
    }

    #[tokio::test]
    async fn test_queue_applies_events_in_order() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light)))).build();
        let switcher = Arc::new(h.switcher);
        let mut rx = switcher.subscribe_wm_changed();

        let (tx, events) = mpsc::channel(10);
        let consumer = tokio::spawn(switcher.clone().consume_events(events));

        tx.send(SwitcherEvent::WmObserved(WindowManagerIdentity::Rich)).await.unwrap();
        tx.send(SwitcherEvent::WmObserved(WindowManagerIdentity::Rich)).await.unwrap();
        tx.send(SwitcherEvent::WmObserved(WindowManagerIdentity::Light)).await.unwrap();
        drop(tx);
        consumer.await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), "deepin wm");
        assert_eq!(rx.try_recv().unwrap(), "deepin metacity");
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(switcher.current_wm(), WindowManagerIdentity::Light);
    }

    #[test]
    fn test_wm_lost_keeps_last_known() {
        let h = Setup::new(FakeStore::new(true, Some(user(WindowManagerIdentity::Light)))).build();
        h.switcher.handle_event(SwitcherEvent::WmObserved(WindowManagerIdentity::Rich));
        h.switcher.handle_event(SwitcherEvent::WmLost);
        assert_eq!(h.switcher.current_wm(), WindowManagerIdentity::Rich);
    }
}
