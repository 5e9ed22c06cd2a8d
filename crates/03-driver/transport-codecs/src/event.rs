//! Control-to-producer event stream.
//!
//! | kind          | tag | fields                    |
//! |---------------|-----|---------------------------|
//! | `KeyDown`     | 0   | `uint key`                |
//! | `KeyUp`       | 1   | `uint key`                |
//! | `WheelMove`   | 2   | `int direction`           |
//! | `PointerMove` | 3   | `float x`, `float y`      |
//! | `Start`       | 4   | `string path`             |
//! | `Stop`        | 5   |                           |
//! | `AddResource` | 6   | `string name`, `bytes`    |

use crate::error::field;
use crate::{Codec, CodecError, CodecResult};
use service_abi::{Event, EventKind};
use transport::{TypedReader, TypedWriter};

#[derive(Clone, Copy, Debug, Default)]
pub struct EventCodec;

impl Codec for EventCodec {
    type Item = Event;

    const STREAM: &'static str = "event";

    fn encode<W: TypedWriter + ?Sized>(&self, event: &Event, out: &mut W) -> CodecResult<()> {
        out.push_uint(event.kind().tag())?;
        match event {
            Event::KeyDown { key } | Event::KeyUp { key } => out.push_uint(*key)?,
            Event::WheelMove { direction } => out.push_int(*direction)?,
            Event::PointerMove { x, y } => {
                out.push_float(*x)?;
                out.push_float(*y)?;
            }
            Event::Start { path } => out.push_string(path)?,
            Event::Stop => {}
            Event::AddResource { name, data } => {
                out.push_string(name)?;
                out.push_bytes(data)?;
            }
        }
        Ok(())
    }

    fn decode_next<R: TypedReader + ?Sized>(&self, input: &mut R) -> CodecResult<Option<Event>> {
        let Some(tag) = input.try_uint() else {
            return Ok(None);
        };
        let kind = EventKind::from_tag(tag).ok_or(CodecError::UnknownTag {
            stream: Self::STREAM,
            tag,
        })?;
        let s = Self::STREAM;
        let event = match kind {
            EventKind::KeyDown => Event::KeyDown {
                key: field(s, input.uint())?,
            },
            EventKind::KeyUp => Event::KeyUp {
                key: field(s, input.uint())?,
            },
            EventKind::WheelMove => Event::WheelMove {
                direction: field(s, input.int())?,
            },
            EventKind::PointerMove => Event::PointerMove {
                x: field(s, input.float())?,
                y: field(s, input.float())?,
            },
            EventKind::Start => Event::Start {
                path: field(s, input.string())?,
            },
            EventKind::Stop => Event::Stop,
            EventKind::AddResource => Event::AddResource {
                name: field(s, input.string())?,
                data: field(s, input.bytes())?,
            },
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::RingBuffer;

    #[test]
    fn batch_of_events_decodes_in_order() {
        let (mut tx, mut rx) = RingBuffer::with_capacity_words(64).unwrap();
        let events = vec![
            Event::Start {
                path: "demos/ball".into(),
            },
            Event::KeyDown { key: 265 },
            Event::PointerMove { x: 10.5, y: -3.0 },
            Event::WheelMove { direction: -1 },
            Event::KeyUp { key: 265 },
            Event::Stop,
        ];
        EventCodec.encode_batch(&events, &mut tx).unwrap();
        tx.commit();

        let mut batch = rx.read().unwrap().expect("batch");
        assert_eq!(EventCodec.decode_batch(&mut batch).unwrap(), events);
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let (mut tx, mut rx) = RingBuffer::with_capacity_words(8).unwrap();
        tx.push_uint(42).unwrap();
        tx.commit();
        let mut batch = rx.read().unwrap().expect("batch");
        assert!(matches!(
            EventCodec.decode(&mut batch),
            Err(CodecError::UnknownTag { stream: "event", tag: 42 })
        ));
    }

    #[test]
    fn missing_fields_report_truncation() {
        let (mut tx, mut rx) = RingBuffer::with_capacity_words(8).unwrap();
        tx.push_uint(EventKind::PointerMove.tag()).unwrap();
        tx.push_float(1.0).unwrap();
        tx.commit();
        let mut batch = rx.read().unwrap().expect("batch");
        assert!(matches!(
            EventCodec.decode(&mut batch),
            Err(CodecError::Truncated { stream: "event" })
        ));
    }

    #[test]
    fn empty_batch_decodes_to_nothing() {
        let (mut tx, mut rx) = RingBuffer::with_capacity_words(8).unwrap();
        tx.push_uint(EventKind::Stop.tag()).unwrap();
        tx.commit();
        let mut batch = rx.read().unwrap().expect("batch");
        assert_eq!(EventCodec.decode_next(&mut batch).unwrap(), Some(Event::Stop));
        assert_eq!(EventCodec.decode_next(&mut batch).unwrap(), None);
    }
}
