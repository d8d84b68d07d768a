use std::collections::BTreeMap;

use crate::bridge::arguments::{ArgumentError, ArgumentList};
use crate::bridge::context::BridgeContext;
use crate::detection::domain::detection_request::{AccuracyMode, DetectionRequest};
use crate::shared::constants::BITMAP_DECODE_ERROR;

/// What a host function hands back synchronously.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnValue {
    Void,
    Bool(bool),
}

type Handler = fn(&BridgeContext, ArgumentList) -> Result<ReturnValue, ArgumentError>;

/// Functions callable by name from the host.
pub struct FunctionTable {
    handlers: BTreeMap<&'static str, Handler>,
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionTable {
    pub fn new() -> Self {
        let mut handlers: BTreeMap<&'static str, Handler> = BTreeMap::new();
        handlers.insert("detect", detect);
        handlers.insert("setLogEnabled", set_log_enabled);
        handlers.insert("isOperational", is_operational);
        handlers.insert("isAvailable", is_available);
        Self { handlers }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub fn call(
        &self,
        context: &BridgeContext,
        name: &str,
        args: ArgumentList,
    ) -> Result<ReturnValue, ArgumentError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ArgumentError::UnknownFunction(name.to_string()))?;
        handler(context, args)
    }
}

/// `detect(imageBuffer, callbackId, accuracyMode, detectOpenEyes, detectSmile, prominentFaceOnly)`
///
/// Only a missing or mistyped callback id fails synchronously; every other
/// problem is reported as an error event for that id.
fn detect(context: &BridgeContext, mut args: ArgumentList) -> Result<ReturnValue, ArgumentError> {
    let callback_id = args.get_int(1)?;

    let image = match args.take_bitmap(0) {
        Ok(image) => image,
        Err(e) => {
            log::warn!("Bad image argument for callback {callback_id}: {e}");
            context.log().info(BITMAP_DECODE_ERROR);
            context.fail(callback_id, BITMAP_DECODE_ERROR);
            return Ok(ReturnValue::Void);
        }
    };

    match decode_request(&args, callback_id) {
        Ok(request) => context.detect(request, image),
        Err(e) => {
            log::warn!("Bad detect arguments for callback {callback_id}: {e}");
            context.fail(callback_id, e.to_string());
        }
    }
    Ok(ReturnValue::Void)
}

fn decode_request(args: &ArgumentList, callback_id: i32) -> Result<DetectionRequest, ArgumentError> {
    Ok(DetectionRequest {
        callback_id,
        mode: AccuracyMode::from_code(args.get_int(2)?)?,
        detect_open_eyes: args.get_bool(3)?,
        detect_smile: args.get_bool(4)?,
        prominent_face_only: args.get_bool(5)?,
    })
}

fn set_log_enabled(context: &BridgeContext, args: ArgumentList) -> Result<ReturnValue, ArgumentError> {
    context.set_log_enabled(args.get_bool(0)?);
    Ok(ReturnValue::Void)
}

fn is_operational(context: &BridgeContext, _args: ArgumentList) -> Result<ReturnValue, ArgumentError> {
    Ok(ReturnValue::Bool(context.is_operational()))
}

fn is_available(context: &BridgeContext, _args: ArgumentList) -> Result<ReturnValue, ArgumentError> {
    Ok(ReturnValue::Bool(context.is_available()))
}
