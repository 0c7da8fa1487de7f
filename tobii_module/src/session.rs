use crate::ffi::{FieldOfUse, TobiiErrorCode, WearableConsumerData};
use crate::stream_engine::{ApiHandle, DeviceHandle, StreamEngine};
use crate::TobiiError;
use std::sync::Arc;

struct SessionInner {
    engine: Arc<dyn StreamEngine>,
    api: Option<ApiHandle>,
}

impl SessionInner {
    fn release(&mut self) -> Result<(), TobiiError> {
        match self.api.take() {
            Some(api) => self.engine.api_destroy(api),
            None => Ok(()),
        }
    }

    fn api(&self) -> Result<ApiHandle, TobiiError> {
        self.api.ok_or(TobiiError::NotConnected)
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Open Stream Engine API context.
///
/// Every [`Device`] keeps the context alive, so the API handle is only
/// destroyed once the session and all of its devices are gone.
pub struct Session {
    inner: Option<Arc<SessionInner>>,
}

impl Session {
    /// Single attempt at `tobii_api_create`.
    pub fn open(engine: Arc<dyn StreamEngine>) -> Result<Self, TobiiError> {
        let api = engine.api_create()?;
        Ok(Self {
            inner: Some(Arc::new(SessionInner {
                engine,
                api: Some(api),
            })),
        })
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn inner(&self) -> Result<&Arc<SessionInner>, TobiiError> {
        self.inner.as_ref().ok_or(TobiiError::NotConnected)
    }

    /// Device URLs in the order the runtime reports them.
    pub fn discover(&self) -> Result<Vec<String>, TobiiError> {
        let inner = self.inner()?;
        inner.engine.enumerate_local_device_urls(inner.api()?)
    }

    /// Creates a device for `url` with interactive field of use.
    pub fn connect(&self, url: &str) -> Result<Device, TobiiError> {
        let inner = self.inner()?;
        let handle = inner
            .engine
            .device_create(inner.api()?, url, FieldOfUse::Interactive)?;
        Ok(Device {
            session: inner.clone(),
            handle: Some(handle),
            url: url.to_string(),
            state: StreamState::Idle,
        })
    }

    /// Releases the API context. A no-op once closed.
    ///
    /// Fails with [`TobiiError::SessionInUse`] while a device is still alive;
    /// the context is then destroyed together with the last device.
    pub fn close(&mut self) -> Result<(), TobiiError> {
        match self.inner.take() {
            Some(inner) => match Arc::try_unwrap(inner) {
                Ok(mut inner) => inner.release(),
                Err(_shared) => Err(TobiiError::SessionInUse),
            },
            None => Ok(()),
        }
    }
}

/// Whether the runtime holds a consumer data subscription for the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Subscribed,
}

/// Connected eye tracker.
pub struct Device {
    session: Arc<SessionInner>,
    handle: Option<DeviceHandle>,
    url: String,
    state: StreamState,
}

impl Device {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn live_handle(&self) -> Result<DeviceHandle, TobiiError> {
        self.handle.ok_or(TobiiError::NotConnected)
    }

    /// (Re-)issues the wearable consumer data subscription.
    ///
    /// An existing subscription counts as success. A failed refresh leaves the
    /// state untouched: an earlier registration is still held by the runtime.
    pub fn subscribe(&mut self) -> Result<(), TobiiError> {
        let handle = self.live_handle()?;
        match self.session.engine.wearable_consumer_data_subscribe(handle) {
            Ok(()) => {}
            Err(e) if e.code() == Some(TobiiErrorCode::AlreadySubscribed) => {}
            Err(e) => return Err(e),
        }
        self.state = StreamState::Subscribed;
        Ok(())
    }

    /// Blocks until data is available or the runtime's internal timeout elapses.
    pub fn wait_for_callbacks(&self) -> Result<(), TobiiError> {
        let handle = self.live_handle()?;
        self.session.engine.wait_for_callbacks(&[handle])
    }

    /// Runs pending callbacks on this thread, handing each sample to `sink`.
    pub fn process_callbacks(
        &self,
        sink: &mut dyn FnMut(&WearableConsumerData),
    ) -> Result<(), TobiiError> {
        let handle = self.live_handle()?;
        self.session.engine.device_process_callbacks(handle, sink)
    }

    /// Unsubscribes if needed and destroys the device. A no-op once disconnected.
    pub fn disconnect(&mut self) -> Result<(), TobiiError> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        let engine = &self.session.engine;
        let unsubscribed = if self.state == StreamState::Subscribed {
            self.state = StreamState::Idle;
            match engine.wearable_consumer_data_unsubscribe(handle) {
                Err(e) if e.code() == Some(TobiiErrorCode::NotSubscribed) => Ok(()),
                other => other,
            }
        } else {
            Ok(())
        };
        let destroyed = engine.device_destroy(handle);

        unsubscribed.and(destroyed)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}
