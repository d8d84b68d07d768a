//! C ABI over the face detection bridge.
//!
//! Every entry point tolerates null pointers and never unwinds into the
//! host; failures come back as `NULL` / `false` and a `log::warn!`.

use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use facebridge_core::bridge::arguments::{ArgValue, ArgumentList};
use facebridge_core::bridge::context::BridgeContext;
use facebridge_core::bridge::function_table::{FunctionTable, ReturnValue};
use facebridge_core::dispatch::event_sink::EventSink;
use facebridge_core::shared::config::BridgeConfig;
use facebridge_core::shared::pixel_buffer::{ChannelOrder, PixelBuffer};

/// Receives `faceDetectionComplete` / `faceDetectionError` events. Both
/// strings are NUL-terminated UTF-8 and only valid for the duration of the
/// call. Invoked from worker threads. Must not call
/// `facebridge_set_event_callback` or `facebridge_dispose`; both wait for the
/// callback to return.
pub type EventCallback =
    unsafe extern "C" fn(user_data: *mut c_void, event: *const c_char, payload: *const c_char);

/// Opaque handle returned by [`facebridge_init`].
pub struct FaceBridgeContext {
    bridge: BridgeContext,
    functions: FunctionTable,
}

impl FaceBridgeContext {
    fn call(&self, name: &str, args: ArgumentList) -> Option<ReturnValue> {
        match self.functions.call(&self.bridge, name, args) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("{name} failed: {e}");
                None
            }
        }
    }
}

struct UserData(*mut c_void);

// The host owns user_data and promises it may be used from any thread.
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

struct CallbackSink {
    callback: EventCallback,
    user_data: UserData,
}

impl EventSink for CallbackSink {
    fn dispatch(&self, event: &str, payload: &str) {
        let (Ok(event_c), Ok(payload_c)) = (CString::new(event), CString::new(payload)) else {
            log::warn!("Event {event} contains an interior NUL, not dispatched");
            return;
        };
        unsafe { (self.callback)(self.user_data.0, event_c.as_ptr(), payload_c.as_ptr()) }
    }
}

fn guarded<T>(name: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        log::warn!("{name} panicked");
        fallback
    })
}

unsafe fn context<'a>(ctx: *const FaceBridgeContext) -> Option<&'a FaceBridgeContext> {
    let context = ctx.as_ref();
    if context.is_none() {
        log::warn!("Called with a null context");
    }
    context
}

unsafe fn load_config(config_json: *const c_char) -> Option<BridgeConfig> {
    if config_json.is_null() {
        return match BridgeConfig::load(None) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("{e}, using defaults");
                Some(BridgeConfig::default())
            }
        };
    }
    let json = CStr::from_ptr(config_json);
    let parsed = json
        .to_str()
        .map_err(|e| e.to_string())
        .and_then(|s| BridgeConfig::from_json(s).map_err(|e| e.to_string()));
    match parsed {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Invalid bridge config: {e}");
            None
        }
    }
}

/// Create a bridge context. `config_json` may be null to load the config
/// file from the user config directory. Returns null on invalid config.
///
/// # Safety
/// `config_json`, when not null, must point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn facebridge_init(config_json: *const c_char) -> *mut FaceBridgeContext {
    guarded("facebridge_init", ptr::null_mut(), || {
        let Some(config) = load_config(config_json) else {
            return ptr::null_mut();
        };
        let context = FaceBridgeContext {
            bridge: BridgeContext::new(&config),
            functions: FunctionTable::new(),
        };
        Box::into_raw(Box::new(context))
    })
}

/// Route events to `callback`. Passing a null callback detaches the
/// current one.
///
/// # Safety
/// `ctx` must come from [`facebridge_init`] and not yet be disposed.
#[no_mangle]
pub unsafe extern "C" fn facebridge_set_event_callback(
    ctx: *mut FaceBridgeContext,
    callback: Option<EventCallback>,
    user_data: *mut c_void,
) -> bool {
    guarded("facebridge_set_event_callback", false, || {
        let Some(context) = context(ctx) else {
            return false;
        };
        match callback {
            Some(callback) => context.bridge.set_event_sink(Arc::new(CallbackSink {
                callback,
                user_data: UserData(user_data),
            })),
            None => context.bridge.clear_event_sink(),
        }
        true
    })
}

/// Queue face detection on a `width`×`height` BGRA buffer. The pixels are
/// copied before returning. Returns false only when the request could not
/// be correlated; every accepted request yields one event.
///
/// # Safety
/// `ctx` must be a live context; `pixels`, when not null, must be valid for
/// `len` bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn facebridge_detect(
    ctx: *mut FaceBridgeContext,
    pixels: *const u8,
    len: usize,
    width: u32,
    height: u32,
    callback_id: i32,
    accuracy_mode: i32,
    detect_open_eyes: bool,
    detect_smile: bool,
    prominent_face_only: bool,
) -> bool {
    guarded("facebridge_detect", false, || {
        let Some(context) = context(ctx) else {
            return false;
        };
        let bitmap = if pixels.is_null() {
            ArgValue::Null
        } else {
            let data = std::slice::from_raw_parts(pixels, len).to_vec();
            match PixelBuffer::new(data, width, height, ChannelOrder::Bgra) {
                Ok(buffer) => ArgValue::Bitmap(buffer),
                Err(e) => {
                    log::warn!("Rejected bitmap for callback {callback_id}: {e}");
                    ArgValue::Null
                }
            }
        };
        let args = ArgumentList::new(vec![
            bitmap,
            ArgValue::Int(callback_id),
            ArgValue::Int(accuracy_mode),
            ArgValue::Bool(detect_open_eyes),
            ArgValue::Bool(detect_smile),
            ArgValue::Bool(prominent_face_only),
        ]);
        context.call("detect", args).is_some()
    })
}

/// # Safety
/// `ctx` must be a live context or null.
#[no_mangle]
pub unsafe extern "C" fn facebridge_set_log_enabled(ctx: *mut FaceBridgeContext, enabled: bool) {
    guarded("facebridge_set_log_enabled", (), || {
        if let Some(context) = context(ctx) {
            context.call("setLogEnabled", ArgumentList::new(vec![ArgValue::Bool(enabled)]));
        }
    })
}

unsafe fn query(ctx: *mut FaceBridgeContext, name: &str) -> bool {
    guarded(name, false, || {
        let Some(context) = context(ctx) else {
            return false;
        };
        matches!(
            context.call(name, ArgumentList::default()),
            Some(ReturnValue::Bool(true))
        )
    })
}

/// Whether a freshly built detector is ready to run.
///
/// # Safety
/// `ctx` must be a live context or null.
#[no_mangle]
pub unsafe extern "C" fn facebridge_is_operational(ctx: *mut FaceBridgeContext) -> bool {
    query(ctx, "isOperational")
}

/// Whether face detection can ever work on this device.
///
/// # Safety
/// `ctx` must be a live context or null.
#[no_mangle]
pub unsafe extern "C" fn facebridge_is_available(ctx: *mut FaceBridgeContext) -> bool {
    query(ctx, "isAvailable")
}

/// Detach the host and free the context. Requests still running finish
/// silently.
///
/// # Safety
/// `ctx` must come from [`facebridge_init`] and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn facebridge_dispose(ctx: *mut FaceBridgeContext) {
    if ctx.is_null() {
        return;
    }
    guarded("facebridge_dispose", (), || {
        let context = Box::from_raw(ctx);
        context.bridge.dispose();
    })
}
