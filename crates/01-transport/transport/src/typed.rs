//! Typed values on top of the raw word ring.
//!
//! Integers and floats occupy one word (two's complement and IEEE-754 bits
//! respectively); byte blobs and strings are length prefixed. Nothing on the
//! wire says which type a word is: readers must ask for the types in the
//! order they were written.

use crate::ring::{Batch, RingProducer};
use crate::{TransportError, TransportResult};

/// A value that can travel through the ring.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Uint(u32),
    Int(i32),
    Float(f32),
    Bytes(Vec<u8>),
    Str(String),
}

/// Writes typed values into a pending batch.
pub trait TypedWriter {
    fn push_uint(&mut self, value: u32) -> TransportResult<()>;

    fn push_bytes(&mut self, bytes: &[u8]) -> TransportResult<()>;

    fn push_int(&mut self, value: i32) -> TransportResult<()> {
        self.push_uint(value as u32)
    }

    fn push_float(&mut self, value: f32) -> TransportResult<()> {
        self.push_uint(value.to_bits())
    }

    fn push_string(&mut self, value: &str) -> TransportResult<()> {
        self.push_bytes(value.as_bytes())
    }

    fn push_value(&mut self, value: &Value) -> TransportResult<()> {
        match value {
            Value::Uint(v) => self.push_uint(*v),
            Value::Int(v) => self.push_int(*v),
            Value::Float(v) => self.push_float(*v),
            Value::Bytes(bytes) => self.push_bytes(bytes),
            Value::Str(text) => self.push_string(text),
        }
    }
}

/// Reads typed values out of a committed batch.
pub trait TypedReader {
    /// Next word, or `None` at the end of the batch.
    fn try_uint(&mut self) -> Option<u32>;

    fn bytes(&mut self) -> TransportResult<Vec<u8>>;

    fn uint(&mut self) -> TransportResult<u32> {
        self.try_uint().ok_or(TransportError::BatchExhausted)
    }

    fn int(&mut self) -> TransportResult<i32> {
        self.uint().map(|word| word as i32)
    }

    fn float(&mut self) -> TransportResult<f32> {
        self.uint().map(f32::from_bits)
    }

    fn string(&mut self) -> TransportResult<String> {
        Ok(String::from_utf8(self.bytes()?)?)
    }
}

impl TypedWriter for RingProducer {
    fn push_uint(&mut self, value: u32) -> TransportResult<()> {
        self.push_word(value)
    }

    fn push_bytes(&mut self, bytes: &[u8]) -> TransportResult<()> {
        RingProducer::push_bytes(self, bytes)
    }
}

impl TypedReader for Batch<'_> {
    fn try_uint(&mut self) -> Option<u32> {
        self.next_word()
    }

    fn bytes(&mut self) -> TransportResult<Vec<u8>> {
        self.next_blob()
    }
}
