use thiserror::Error;

use crate::shared::pixel_buffer::PixelBuffer;

/// Why an argument list could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("argument {index} missing, expected {expected}")]
    Missing { index: usize, expected: &'static str },
    #[error("argument {index} has the wrong type, expected {expected}")]
    TypeMismatch { index: usize, expected: &'static str },
    #[error("{name} out of range: {value}")]
    OutOfRange { name: &'static str, value: i32 },
    #[error("unknown function: {0}")]
    UnknownFunction(String),
}

/// A host value crossing into the bridge.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Int(i32),
    Bool(bool),
    /// Host bitmap; pixels in the host's native BGRA order.
    Bitmap(PixelBuffer),
    Null,
}

impl ArgValue {
    fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Int(_) => "int",
            ArgValue::Bool(_) => "bool",
            ArgValue::Bitmap(_) => "bitmap",
            ArgValue::Null => "null",
        }
    }
}

/// Positional arguments of one host call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgumentList {
    values: Vec<Option<ArgValue>>,
}

impl ArgumentList {
    pub fn new(values: Vec<ArgValue>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    fn slot(&self, index: usize, expected: &'static str) -> Result<&ArgValue, ArgumentError> {
        self.values
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(ArgumentError::Missing { index, expected })
    }

    pub fn get_int(&self, index: usize) -> Result<i32, ArgumentError> {
        match self.slot(index, "int")? {
            ArgValue::Int(v) => Ok(*v),
            _ => Err(ArgumentError::TypeMismatch { index, expected: "int" }),
        }
    }

    pub fn get_bool(&self, index: usize) -> Result<bool, ArgumentError> {
        match self.slot(index, "bool")? {
            ArgValue::Bool(v) => Ok(*v),
            _ => Err(ArgumentError::TypeMismatch { index, expected: "bool" }),
        }
    }

    /// Moves the bitmap out of the list so its pixels are not copied.
    pub fn take_bitmap(&mut self, index: usize) -> Result<PixelBuffer, ArgumentError> {
        let expected = "bitmap";
        let Some(slot) = self.values.get_mut(index) else {
            return Err(ArgumentError::Missing { index, expected });
        };
        match slot.take() {
            Some(ArgValue::Bitmap(buffer)) => Ok(buffer),
            Some(other) => {
                log::debug!("argument {index} is {}, expected bitmap", other.type_name());
                *slot = Some(other);
                Err(ArgumentError::TypeMismatch { index, expected })
            }
            None => Err(ArgumentError::Missing { index, expected }),
        }
    }
}
