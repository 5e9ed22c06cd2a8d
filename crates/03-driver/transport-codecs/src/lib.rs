//! Wire codecs for the rayframe channels.
//!
//! Each codec maps a closed set of domain items onto [`TypedWriter`] values
//! and back. The encoding is positional: an item starts with a `u32` tag and
//! is followed by the fields for that tag in a fixed order. Decoders never
//! guess; an unknown tag is a schema mismatch and is reported immediately.

#![allow(missing_docs)]

mod error;
mod event;
mod render;
mod resource;

pub use error::{CodecError, CodecResult};
pub use event::EventCodec;
pub use render::{RenderCodec, RenderMessage};
pub use resource::ResourceReplyCodec;

use transport::{TypedReader, TypedWriter};

/// Encodes and decodes one item family.
pub trait Codec {
    type Item;

    /// Stream name used in error messages.
    const STREAM: &'static str;

    fn encode<W: TypedWriter + ?Sized>(&self, item: &Self::Item, out: &mut W) -> CodecResult<()>;

    /// Decodes the next item, or `None` when the batch has no more values.
    fn decode_next<R: TypedReader + ?Sized>(&self, input: &mut R)
        -> CodecResult<Option<Self::Item>>;

    /// Decodes exactly one item.
    fn decode<R: TypedReader + ?Sized>(&self, input: &mut R) -> CodecResult<Self::Item> {
        self.decode_next(input)?.ok_or(CodecError::Truncated {
            stream: Self::STREAM,
        })
    }

    fn encode_batch<'a, W, I>(&self, items: I, out: &mut W) -> CodecResult<()>
    where
        W: TypedWriter + ?Sized,
        I: IntoIterator<Item = &'a Self::Item>,
        Self::Item: 'a,
    {
        for item in items {
            self.encode(item, out)?;
        }
        Ok(())
    }

    /// Decodes items until the batch is exhausted.
    fn decode_batch<R: TypedReader + ?Sized>(&self, input: &mut R) -> CodecResult<Vec<Self::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.decode_next(input)? {
            items.push(item);
        }
        Ok(items)
    }
}
