use crate::ffi::{
    ApiCreateFn, ApiDestroyFn, DeviceCreateFn, DeviceDestroyFn, DeviceProcessCallbacksFn,
    EnumerateLocalDeviceUrlsFn, FieldOfUse, TobiiApi, TobiiDevice, TobiiErrorCode,
    WaitForCallbacksFn, WearableConsumerData, WearableConsumerDataSubscribeFn,
    WearableConsumerDataUnsubscribeFn,
};
use crate::TobiiError;
use libloading::{Library, Symbol};
use std::ffi::{c_char, c_void, CStr, CString};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::Mutex;

/// Vendor API context (`tobii_api_t*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiHandle(NonNull<TobiiApi>);

/// Connected device (`tobii_device_t*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHandle(NonNull<TobiiDevice>);

// SAFETY: handles are opaque tokens; the runtime is only driven from the host's update thread.
unsafe impl Send for ApiHandle {}
unsafe impl Sync for ApiHandle {}
unsafe impl Send for DeviceHandle {}
unsafe impl Sync for DeviceHandle {}

impl ApiHandle {
    /// Wraps a context pointer produced by a `StreamEngine` implementation.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a context returned by `tobii_api_create` of the
    /// engine the handle is later passed to, and the handle must not be used
    /// once that engine has destroyed it. Engines that never dereference the
    /// pointer (test doubles) may use any non-null value.
    ///
    /// Handles cannot be forged from safe code:
    ///
    /// ```compile_fail
    /// use tobii_module::ApiHandle;
    /// let _ = ApiHandle::from_raw(0x10 as *mut _);
    /// ```
    pub unsafe fn from_raw(ptr: *mut TobiiApi) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut TobiiApi {
        self.0.as_ptr()
    }
}

impl DeviceHandle {
    /// Wraps a device pointer produced by a `StreamEngine` implementation.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a device returned by `tobii_device_create` of the
    /// engine the handle is later passed to, and the handle must not be used
    /// after `device_destroy`. Engines that never dereference the pointer
    /// (test doubles) may use any non-null value.
    ///
    /// ```compile_fail
    /// use tobii_module::DeviceHandle;
    /// let _ = DeviceHandle::from_raw(0xdead as *mut _);
    /// ```
    pub unsafe fn from_raw(ptr: *mut TobiiDevice) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut TobiiDevice {
        self.0.as_ptr()
    }
}

/// Native call surface of the Stream Engine runtime.
///
/// Every call maps one-to-one onto a `tobii_*` function. Callback delivery is
/// synchronous: `device_process_callbacks` invokes `sink` on the calling thread
/// for every consumer data sample queued since the last dispatch.
pub trait StreamEngine: Send + Sync {
    fn api_create(&self) -> Result<ApiHandle, TobiiError>;
    fn api_destroy(&self, api: ApiHandle) -> Result<(), TobiiError>;
    fn enumerate_local_device_urls(&self, api: ApiHandle) -> Result<Vec<String>, TobiiError>;
    fn device_create(
        &self,
        api: ApiHandle,
        url: &str,
        field_of_use: FieldOfUse,
    ) -> Result<DeviceHandle, TobiiError>;
    fn device_destroy(&self, device: DeviceHandle) -> Result<(), TobiiError>;
    fn wearable_consumer_data_subscribe(&self, device: DeviceHandle) -> Result<(), TobiiError>;
    fn wearable_consumer_data_unsubscribe(&self, device: DeviceHandle) -> Result<(), TobiiError>;
    fn wait_for_callbacks(&self, devices: &[DeviceHandle]) -> Result<(), TobiiError>;
    fn device_process_callbacks(
        &self,
        device: DeviceHandle,
        sink: &mut dyn FnMut(&WearableConsumerData),
    ) -> Result<(), TobiiError>;
}

/// Turns a raw `tobii_error_t` into a `Result`.
pub fn check(call: &'static str, code: i32) -> Result<(), TobiiError> {
    match TobiiErrorCode::from_raw(code) {
        TobiiErrorCode::NoError => Ok(()),
        code => Err(TobiiError::Vendor { call, code }),
    }
}

type Sink = *mut (dyn FnMut(&WearableConsumerData) + 'static);

/// Target of the consumer data callback while `device_process_callbacks` runs.
struct DispatchSlot {
    sink: Mutex<Option<SinkPtr>>,
}

#[derive(Clone, Copy)]
struct SinkPtr(Sink);

// SAFETY: only set and read on the thread that is inside device_process_callbacks.
unsafe impl Send for SinkPtr {}

impl DispatchSlot {
    fn new() -> Self {
        Self {
            sink: Mutex::new(None),
        }
    }

    /// Value handed to the runtime as the callback's `user_data`.
    fn user_data(&self) -> *mut c_void {
        self as *const DispatchSlot as *mut c_void
    }

    /// Routes callbacks to `sink` for the duration of `run`.
    fn dispatch_with<R>(
        &self,
        sink: &mut dyn FnMut(&WearableConsumerData),
        run: impl FnOnce() -> R,
    ) -> R {
        let raw: *mut (dyn FnMut(&WearableConsumerData) + '_) = sink;
        // SAFETY: the guard clears the slot before `sink`'s borrow ends, also on
        // unwind, so the erased lifetime is never observed past this call.
        let erased: Sink = unsafe {
            std::mem::transmute::<*mut (dyn FnMut(&WearableConsumerData) + '_), Sink>(raw)
        };
        self.set(Some(SinkPtr(erased)));
        let _clear = ClearOnDrop(self);
        run()
    }

    fn set(&self, sink: Option<SinkPtr>) {
        let mut guard = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = sink;
    }
}

struct ClearOnDrop<'a>(&'a DispatchSlot);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.set(None);
    }
}

unsafe extern "C" fn consumer_data_trampoline(
    data: *const WearableConsumerData,
    user_data: *mut c_void,
) {
    if data.is_null() || user_data.is_null() {
        return;
    }
    let slot = &*(user_data as *const DispatchSlot);
    let sink = match slot.sink.lock() {
        Ok(guard) => *guard,
        Err(_) => return,
    };
    if let Some(SinkPtr(sink)) = sink {
        (*sink)(&*data);
    }
}

unsafe extern "C" fn url_receiver(url: *const c_char, user_data: *mut c_void) {
    if url.is_null() || user_data.is_null() {
        return;
    }
    let urls = &mut *(user_data as *mut Vec<String>);
    urls.push(CStr::from_ptr(url).to_string_lossy().into_owned());
}

/// Stream Engine resolved from its shared library at runtime.
///
/// Crate-private: its `StreamEngine` methods pass handles straight to native
/// code, so only `Session`/`Device`, which own the handles, may drive it.
pub(crate) struct StreamEngineLibrary {
    api_create: ApiCreateFn,
    api_destroy: ApiDestroyFn,
    enumerate_local_device_urls: EnumerateLocalDeviceUrlsFn,
    device_create: DeviceCreateFn,
    device_destroy: DeviceDestroyFn,
    wait_for_callbacks: WaitForCallbacksFn,
    device_process_callbacks: DeviceProcessCallbacksFn,
    wearable_consumer_data_subscribe: WearableConsumerDataSubscribeFn,
    wearable_consumer_data_unsubscribe: WearableConsumerDataUnsubscribeFn,
    dispatch: Box<DispatchSlot>,
    _lib: Library,
}

impl StreamEngineLibrary {
    /// Platform file name of the runtime library, e.g. `tobii_stream_engine.dll`.
    pub fn default_file_name() -> String {
        libloading::library_filename("tobii_stream_engine")
            .to_string_lossy()
            .into_owned()
    }

    pub fn load(path: &Path) -> Result<Self, TobiiError> {
        unsafe {
            let lib = Library::new(path).map_err(|e| TobiiError::Library {
                path: path.to_path_buf(),
                source: e,
            })?;

            let symbol_err = |e: libloading::Error| TobiiError::Library {
                path: path.to_path_buf(),
                source: e,
            };

            let api_create: Symbol<ApiCreateFn> = lib.get(b"tobii_api_create").map_err(symbol_err)?;
            let api_destroy: Symbol<ApiDestroyFn> =
                lib.get(b"tobii_api_destroy").map_err(symbol_err)?;
            let enumerate_local_device_urls: Symbol<EnumerateLocalDeviceUrlsFn> = lib
                .get(b"tobii_enumerate_local_device_urls")
                .map_err(symbol_err)?;
            let device_create: Symbol<DeviceCreateFn> =
                lib.get(b"tobii_device_create").map_err(symbol_err)?;
            let device_destroy: Symbol<DeviceDestroyFn> =
                lib.get(b"tobii_device_destroy").map_err(symbol_err)?;
            let wait_for_callbacks: Symbol<WaitForCallbacksFn> =
                lib.get(b"tobii_wait_for_callbacks").map_err(symbol_err)?;
            let device_process_callbacks: Symbol<DeviceProcessCallbacksFn> = lib
                .get(b"tobii_device_process_callbacks")
                .map_err(symbol_err)?;
            let wearable_consumer_data_subscribe: Symbol<WearableConsumerDataSubscribeFn> = lib
                .get(b"tobii_wearable_consumer_data_subscribe")
                .map_err(symbol_err)?;
            let wearable_consumer_data_unsubscribe: Symbol<WearableConsumerDataUnsubscribeFn> =
                lib.get(b"tobii_wearable_consumer_data_unsubscribe")
                    .map_err(symbol_err)?;

            log::debug!("Loaded Stream Engine from {:?}", path);

            Ok(Self {
                api_create: *api_create,
                api_destroy: *api_destroy,
                enumerate_local_device_urls: *enumerate_local_device_urls,
                device_create: *device_create,
                device_destroy: *device_destroy,
                wait_for_callbacks: *wait_for_callbacks,
                device_process_callbacks: *device_process_callbacks,
                wearable_consumer_data_subscribe: *wearable_consumer_data_subscribe,
                wearable_consumer_data_unsubscribe: *wearable_consumer_data_unsubscribe,
                dispatch: Box::new(DispatchSlot::new()),
                _lib: lib,
            })
        }
    }
}

impl StreamEngine for StreamEngineLibrary {
    fn api_create(&self) -> Result<ApiHandle, TobiiError> {
        let mut api: *mut TobiiApi = ptr::null_mut();
        check("tobii_api_create", unsafe {
            (self.api_create)(&mut api, ptr::null(), ptr::null())
        })?;
        // SAFETY: `api` was just produced by this runtime.
        unsafe { ApiHandle::from_raw(api) }.ok_or(TobiiError::NullHandle("tobii_api_create"))
    }

    fn api_destroy(&self, api: ApiHandle) -> Result<(), TobiiError> {
        check("tobii_api_destroy", unsafe { (self.api_destroy)(api.as_ptr()) })
    }

    fn enumerate_local_device_urls(&self, api: ApiHandle) -> Result<Vec<String>, TobiiError> {
        let mut urls: Vec<String> = Vec::new();
        check("tobii_enumerate_local_device_urls", unsafe {
            (self.enumerate_local_device_urls)(
                api.as_ptr(),
                url_receiver,
                &mut urls as *mut Vec<String> as *mut c_void,
            )
        })?;
        Ok(urls)
    }

    fn device_create(
        &self,
        api: ApiHandle,
        url: &str,
        field_of_use: FieldOfUse,
    ) -> Result<DeviceHandle, TobiiError> {
        let url_c = CString::new(url).map_err(|_| TobiiError::InvalidUrl(url.to_string()))?;
        let mut device: *mut TobiiDevice = ptr::null_mut();
        check("tobii_device_create", unsafe {
            (self.device_create)(api.as_ptr(), url_c.as_ptr(), field_of_use as i32, &mut device)
        })?;
        // SAFETY: `device` was just produced by this runtime.
        unsafe { DeviceHandle::from_raw(device) }
            .ok_or(TobiiError::NullHandle("tobii_device_create"))
    }

    fn device_destroy(&self, device: DeviceHandle) -> Result<(), TobiiError> {
        check("tobii_device_destroy", unsafe {
            (self.device_destroy)(device.as_ptr())
        })
    }

    fn wearable_consumer_data_subscribe(&self, device: DeviceHandle) -> Result<(), TobiiError> {
        check("tobii_wearable_consumer_data_subscribe", unsafe {
            (self.wearable_consumer_data_subscribe)(
                device.as_ptr(),
                consumer_data_trampoline,
                self.dispatch.user_data(),
            )
        })
    }

    fn wearable_consumer_data_unsubscribe(&self, device: DeviceHandle) -> Result<(), TobiiError> {
        check("tobii_wearable_consumer_data_unsubscribe", unsafe {
            (self.wearable_consumer_data_unsubscribe)(device.as_ptr())
        })
    }

    fn wait_for_callbacks(&self, devices: &[DeviceHandle]) -> Result<(), TobiiError> {
        let raw: Vec<*mut TobiiDevice> = devices.iter().map(|d| d.as_ptr()).collect();
        check("tobii_wait_for_callbacks", unsafe {
            (self.wait_for_callbacks)(raw.len() as i32, raw.as_ptr())
        })
    }

    fn device_process_callbacks(
        &self,
        device: DeviceHandle,
        sink: &mut dyn FnMut(&WearableConsumerData),
    ) -> Result<(), TobiiError> {
        let result = self.dispatch.dispatch_with(sink, || unsafe {
            (self.device_process_callbacks)(device.as_ptr())
        });
        check("tobii_device_process_callbacks", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::TOBII_VALIDITY_VALID;
    use std::cell::RefCell;

    fn sample(timestamp_us: i64) -> WearableConsumerData {
        let mut data = WearableConsumerData {
            timestamp_us,
            ..Default::default()
        };
        data.left.pupil_position_in_sensor_area_validity = TOBII_VALIDITY_VALID;
        data
    }

    #[test]
    fn test_url_receiver_keeps_runtime_order() {
        let first = CString::new("tobii-prp://dev-A").unwrap();
        let second = CString::new("tobii-prp://dev-B").unwrap();
        let mut urls: Vec<String> = Vec::new();
        let user_data = &mut urls as *mut Vec<String> as *mut c_void;

        unsafe {
            url_receiver(first.as_ptr(), user_data);
            url_receiver(second.as_ptr(), user_data);
        }

        assert_eq!(urls, vec!["tobii-prp://dev-A", "tobii-prp://dev-B"]);
    }

    #[test]
    fn test_url_receiver_ignores_null_pointers() {
        let url = CString::new("tobii-prp://dev-A").unwrap();
        let mut urls: Vec<String> = Vec::new();

        unsafe {
            url_receiver(ptr::null(), &mut urls as *mut Vec<String> as *mut c_void);
            url_receiver(url.as_ptr(), ptr::null_mut());
        }

        assert!(urls.is_empty());
    }

    #[test]
    fn test_trampoline_delivers_to_current_sink() {
        let slot = DispatchSlot::new();
        let seen = RefCell::new(Vec::new());
        let mut sink = |data: &WearableConsumerData| seen.borrow_mut().push(*data);

        let returned = slot.dispatch_with(&mut sink, || {
            let first = sample(1);
            let second = sample(2);
            unsafe {
                consumer_data_trampoline(&first, slot.user_data());
                consumer_data_trampoline(&second, slot.user_data());
            }
            7
        });

        assert_eq!(returned, 7);
        assert_eq!(*seen.borrow(), vec![sample(1), sample(2)]);
    }

    #[test]
    fn test_trampoline_is_noop_after_dispatch_returns() {
        let slot = DispatchSlot::new();
        let calls = RefCell::new(0);
        let mut sink = |_: &WearableConsumerData| *calls.borrow_mut() += 1;

        slot.dispatch_with(&mut sink, || ());
        assert!(slot.sink.lock().unwrap().is_none());

        let late = sample(3);
        unsafe { consumer_data_trampoline(&late, slot.user_data()) };

        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_trampoline_without_sink_is_noop() {
        let slot = DispatchSlot::new();
        let data = sample(4);

        unsafe { consumer_data_trampoline(&data, slot.user_data()) };

        assert!(slot.sink.lock().unwrap().is_none());
    }

    #[test]
    fn test_trampoline_ignores_null_pointers() {
        let slot = DispatchSlot::new();
        let calls = RefCell::new(0);
        let mut sink = |_: &WearableConsumerData| *calls.borrow_mut() += 1;

        slot.dispatch_with(&mut sink, || {
            let data = sample(5);
            unsafe {
                consumer_data_trampoline(ptr::null(), slot.user_data());
                consumer_data_trampoline(&data, ptr::null_mut());
            }
        });

        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_slot_is_cleared_when_dispatch_unwinds() {
        let slot = DispatchSlot::new();
        let mut sink = |_: &WearableConsumerData| {};

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            slot.dispatch_with(&mut sink, || panic!("dispatch failed"))
        }));

        assert!(outcome.is_err());
        assert!(slot.sink.lock().unwrap().is_none());
    }

    #[test]
    fn test_check_maps_codes() {
        assert!(check("tobii_api_create", 0).is_ok());
        let err = check("tobii_wait_for_callbacks", 6).unwrap_err();
        assert!(err.is_timeout());
    }
}
