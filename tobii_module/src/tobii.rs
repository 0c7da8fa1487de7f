use crate::assets::{find_static_image, MODULE_ICON};
use crate::config::{TobiiConfig, CONFIG_FILENAME};
use crate::ffi::WearableConsumerData;
use crate::mapping;
use crate::session::{Device, Session};
use crate::stream_engine::{StreamEngine, StreamEngineLibrary};
use anyhow::{bail, Context, Result};
use api::{
    Capabilities, ModuleInfo, ModuleLogger, ModuleState, TrackingModule, UnifiedTrackingData,
};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const MODULE_NAME: &str = "Tobii HTC Vive Devkit";

const SUPPORTED: Capabilities = Capabilities::new(true, false);

pub struct TobiiModule {
    engine: Option<Arc<dyn StreamEngine>>,
    config: Option<TobiiConfig>,
    // Declared before `session` so it is dropped first.
    device: Option<Device>,
    session: Option<Session>,
    logger: Option<ModuleLogger>,
    info: ModuleInfo,
    status: ModuleState,
    capabilities: Capabilities,
    update_delay: Duration,
}

impl TobiiModule {
    /// Loads the Stream Engine library and `tobii_module.json` on initialize.
    pub fn new() -> Self {
        Self {
            engine: None,
            config: None,
            device: None,
            session: None,
            logger: None,
            info: ModuleInfo::default(),
            status: ModuleState::Uninitialized,
            capabilities: Capabilities::NONE,
            update_delay: Duration::from_millis(TobiiConfig::default().update_delay_ms),
        }
    }

    /// Loads the Stream Engine library named by `config` on initialize.
    pub fn with_config(config: TobiiConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::new()
        }
    }

    /// Uses an already loaded runtime and a fixed config.
    pub fn with_engine(engine: Arc<dyn StreamEngine>, config: TobiiConfig) -> Self {
        Self {
            engine: Some(engine),
            config: Some(config),
            ..Self::new()
        }
    }

    /// Capabilities granted by the last `initialize`.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn connected_url(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.url())
    }

    /// Pauses (`Idle`) or resumes (`Active`) waiting for data. Ignored before a device is connected.
    pub fn set_status(&mut self, status: ModuleState) {
        if self.device.is_some() && status != ModuleState::Uninitialized {
            self.status = status;
        }
    }

    fn runtime(&mut self, config: &TobiiConfig) -> Result<Arc<dyn StreamEngine>> {
        if let Some(engine) = &self.engine {
            return Ok(engine.clone());
        }

        let library = StreamEngineLibrary::load(&config.library_path)?;
        let engine: Arc<dyn StreamEngine> = Arc::new(library);
        self.engine = Some(engine.clone());
        Ok(engine)
    }

    fn connect(&mut self, config: &TobiiConfig, logger: &ModuleLogger) -> Result<(Session, Device)> {
        let engine = self
            .runtime(config)
            .context("Failed to load Stream Engine runtime")?;

        let session = Session::open(engine).context("Tobii API create failed")?;
        logger.info("Tobii API created");

        let urls = session
            .discover()
            .context("Tobii device enumeration failed")?;
        if urls.is_empty() {
            bail!("No Tobii device found");
        }

        logger.info("Tobii devices found:");
        for url in &urls {
            logger.info(url);
        }

        let url = &urls[0];
        let device = session
            .connect(url)
            .with_context(|| format!("Tobii device create failed for {}", url))?;
        logger.info(&format!("Connected to Tobii device {}", url));

        Ok((session, device))
    }

    fn load_static_images(&mut self, config: &TobiiConfig, logger: &ModuleLogger) {
        match find_static_image(&config.assets_dir, MODULE_ICON) {
            Ok(Some(image)) => self.info.static_images = vec![image],
            Ok(None) => logger.debug(&format!(
                "No {} in {:?}, skipping module icon",
                MODULE_ICON, config.assets_dir
            )),
            Err(e) => logger.warn(&format!("Failed to read module icon: {}", e)),
        }
    }

    fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.disconnect() {
                if let Some(logger) = &self.logger {
                    logger.warn(&format!("Tobii device destroy failed: {}", e));
                }
            }
        }

        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close() {
                if let Some(logger) = &self.logger {
                    logger.warn(&format!("Tobii API destroy failed: {}", e));
                }
            }
        }

        self.status = ModuleState::Uninitialized;
        self.capabilities = Capabilities::NONE;
    }
}

impl Default for TobiiModule {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscribe / wait / dispatch pass. Every failure here is recoverable.
fn stream_cycle(
    device: &mut Device,
    status: ModuleState,
    logger: &ModuleLogger,
    data: &mut UnifiedTrackingData,
) {
    if let Err(e) = device.subscribe() {
        logger.warn(&format!("Tobii wearable consumer data subscribe failed: {}", e));
        return;
    }

    if status != ModuleState::Active {
        return;
    }

    match device.wait_for_callbacks() {
        Ok(()) => {}
        Err(e) if e.is_timeout() => logger.trace("Tobii wait for callbacks timed out"),
        Err(e) => logger.warn(&format!("Tobii wait for callbacks failed: {}", e)),
    }

    let mut dispatch = |sample: &WearableConsumerData| mapping::update_eye_openness(data, sample);
    if let Err(e) = device.process_callbacks(&mut dispatch) {
        logger.warn(&format!("Tobii process callbacks failed: {}", e));
    }
}

impl TrackingModule for TobiiModule {
    fn supported(&self) -> Capabilities {
        SUPPORTED
    }

    fn initialize(&mut self, requested: Capabilities, logger: ModuleLogger) -> Capabilities {
        logger.info("Initializing Tobii Module");

        if self.session.is_some() {
            logger.debug("Already initialized, releasing previous session");
            self.release();
        }

        self.info.name = MODULE_NAME.to_string();

        let config = match self.config.take() {
            Some(config) => config,
            None => TobiiConfig::load_or_default(Path::new(CONFIG_FILENAME), &logger),
        };
        self.update_delay = Duration::from_millis(config.update_delay_ms);
        self.load_static_images(&config, &logger);

        let wanted = requested.intersect(SUPPORTED);
        if !wanted.eye {
            logger.info("Eye tracking not requested, Tobii device left untouched");
        } else {
            match self.connect(&config, &logger) {
                Ok((session, device)) => {
                    self.session = Some(session);
                    self.device = Some(device);
                    self.status = ModuleState::Active;
                    self.capabilities = wanted;
                }
                Err(e) => {
                    logger.error(&format!("Failed to initialize Tobii module: {:#}", e));
                    self.capabilities = Capabilities::NONE;
                }
            }
        }

        self.config = Some(config);
        self.logger = Some(logger);
        self.capabilities
    }

    fn update(&mut self, data: &mut UnifiedTrackingData) -> Result<()> {
        if let (Some(device), Some(logger)) = (self.device.as_mut(), self.logger.as_ref()) {
            stream_cycle(device, self.status, logger, data);
        }

        thread::sleep(self.update_delay);
        Ok(())
    }

    fn unload(&mut self) {
        self.release();
        if let Some(logger) = &self.logger {
            logger.info("Tobii Module unloaded");
        }
    }

    fn status(&self) -> ModuleState {
        self.status
    }

    fn info(&self) -> ModuleInfo {
        self.info.clone()
    }
}
