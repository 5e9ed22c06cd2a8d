//! Reply half of the synchronous resource bridge.
//!
//! `uint status` (0 loaded, 1 failed) followed by the payload bytes or the
//! failure reason.

use crate::error::field;
use crate::{Codec, CodecError, CodecResult};
use service_abi::ResourceLoad;
use transport::{TypedReader, TypedWriter};

const STATUS_LOADED: u32 = 0;
const STATUS_FAILED: u32 = 1;

#[derive(Clone, Copy, Debug, Default)]
pub struct ResourceReplyCodec;

impl Codec for ResourceReplyCodec {
    type Item = ResourceLoad;

    const STREAM: &'static str = "resource reply";

    fn encode<W: TypedWriter + ?Sized>(&self, reply: &ResourceLoad, out: &mut W) -> CodecResult<()> {
        match reply {
            ResourceLoad::Loaded(bytes) => {
                out.push_uint(STATUS_LOADED)?;
                out.push_bytes(bytes)?;
            }
            ResourceLoad::Failed(reason) => {
                out.push_uint(STATUS_FAILED)?;
                out.push_string(reason)?;
            }
        }
        Ok(())
    }

    fn decode_next<R: TypedReader + ?Sized>(
        &self,
        input: &mut R,
    ) -> CodecResult<Option<ResourceLoad>> {
        let Some(status) = input.try_uint() else {
            return Ok(None);
        };
        let reply = match status {
            STATUS_LOADED => ResourceLoad::Loaded(field(Self::STREAM, input.bytes())?),
            STATUS_FAILED => ResourceLoad::Failed(field(Self::STREAM, input.string())?),
            tag => {
                return Err(CodecError::UnknownTag {
                    stream: Self::STREAM,
                    tag,
                })
            }
        };
        Ok(Some(reply))
    }
}
