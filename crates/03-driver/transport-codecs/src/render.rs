//! Producer-to-renderer frame stream.
//!
//! One committed batch carries exactly one [`RenderMessage`]: either a frame
//! (`0`, command count, commands) or the end-of-stream marker (`1`).

use crate::error::field;
use crate::{Codec, CodecError, CodecResult};
use service_abi::{Color, RenderCommand};
use transport::{TypedReader, TypedWriter};

const MSG_FRAME: u32 = 0;
const MSG_CLOSE: u32 = 1;

const CMD_RESIZE: u32 = 0;
const CMD_CLEAR: u32 = 1;
const CMD_FILL_RECT: u32 = 2;
const CMD_STROKE_RECT: u32 = 3;
const CMD_SET_FILL_COLOR: u32 = 4;
const CMD_SET_STROKE_COLOR: u32 = 5;
const CMD_SET_LINE_WIDTH: u32 = 6;
const CMD_BEGIN_PATH: u32 = 7;
const CMD_ARC: u32 = 8;
const CMD_FILL: u32 = 9;
const CMD_SET_FONT: u32 = 10;
const CMD_FILL_TEXT: u32 = 11;
const CMD_DRAW_IMAGE: u32 = 12;

/// One item of the render stream.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderMessage {
    Frame(Vec<RenderCommand>),
    /// No more frames will follow.
    Close,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RenderCodec;

impl RenderCodec {
    fn encode_command<W: TypedWriter + ?Sized>(
        &self,
        command: &RenderCommand,
        out: &mut W,
    ) -> CodecResult<()> {
        match command {
            RenderCommand::Resize { width, height } => {
                out.push_uint(CMD_RESIZE)?;
                out.push_uint(*width)?;
                out.push_uint(*height)?;
            }
            RenderCommand::Clear { color } => {
                out.push_uint(CMD_CLEAR)?;
                out.push_uint(color.to_word())?;
            }
            RenderCommand::FillRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_uint(CMD_FILL_RECT)?;
                push_floats(out, &[*x, *y, *width, *height])?;
            }
            RenderCommand::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_uint(CMD_STROKE_RECT)?;
                push_floats(out, &[*x, *y, *width, *height])?;
            }
            RenderCommand::SetFillColor { color } => {
                out.push_uint(CMD_SET_FILL_COLOR)?;
                out.push_uint(color.to_word())?;
            }
            RenderCommand::SetStrokeColor { color } => {
                out.push_uint(CMD_SET_STROKE_COLOR)?;
                out.push_uint(color.to_word())?;
            }
            RenderCommand::SetLineWidth { width } => {
                out.push_uint(CMD_SET_LINE_WIDTH)?;
                out.push_float(*width)?;
            }
            RenderCommand::BeginPath => out.push_uint(CMD_BEGIN_PATH)?,
            RenderCommand::Arc {
                x,
                y,
                radius,
                start_angle,
                end_angle,
            } => {
                out.push_uint(CMD_ARC)?;
                push_floats(out, &[*x, *y, *radius, *start_angle, *end_angle])?;
            }
            RenderCommand::Fill => out.push_uint(CMD_FILL)?,
            RenderCommand::SetFont { size, family } => {
                out.push_uint(CMD_SET_FONT)?;
                out.push_float(*size)?;
                out.push_string(family)?;
            }
            RenderCommand::FillText { text, x, y } => {
                out.push_uint(CMD_FILL_TEXT)?;
                out.push_string(text)?;
                push_floats(out, &[*x, *y])?;
            }
            RenderCommand::DrawImage { image, x, y } => {
                out.push_uint(CMD_DRAW_IMAGE)?;
                out.push_uint(*image)?;
                push_floats(out, &[*x, *y])?;
            }
        }
        Ok(())
    }

    fn decode_command<R: TypedReader + ?Sized>(&self, input: &mut R) -> CodecResult<RenderCommand> {
        let s = Self::STREAM;
        let tag = field(s, input.uint())?;
        let command = match tag {
            CMD_RESIZE => RenderCommand::Resize {
                width: field(s, input.uint())?,
                height: field(s, input.uint())?,
            },
            CMD_CLEAR => RenderCommand::Clear {
                color: Color::from_word(field(s, input.uint())?),
            },
            CMD_FILL_RECT => RenderCommand::FillRect {
                x: float(input)?,
                y: float(input)?,
                width: float(input)?,
                height: float(input)?,
            },
            CMD_STROKE_RECT => RenderCommand::StrokeRect {
                x: float(input)?,
                y: float(input)?,
                width: float(input)?,
                height: float(input)?,
            },
            CMD_SET_FILL_COLOR => RenderCommand::SetFillColor {
                color: Color::from_word(field(s, input.uint())?),
            },
            CMD_SET_STROKE_COLOR => RenderCommand::SetStrokeColor {
                color: Color::from_word(field(s, input.uint())?),
            },
            CMD_SET_LINE_WIDTH => RenderCommand::SetLineWidth { width: float(input)? },
            CMD_BEGIN_PATH => RenderCommand::BeginPath,
            CMD_ARC => RenderCommand::Arc {
                x: float(input)?,
                y: float(input)?,
                radius: float(input)?,
                start_angle: float(input)?,
                end_angle: float(input)?,
            },
            CMD_FILL => RenderCommand::Fill,
            CMD_SET_FONT => RenderCommand::SetFont {
                size: float(input)?,
                family: field(s, input.string())?,
            },
            CMD_FILL_TEXT => RenderCommand::FillText {
                text: field(s, input.string())?,
                x: float(input)?,
                y: float(input)?,
            },
            CMD_DRAW_IMAGE => RenderCommand::DrawImage {
                image: field(s, input.uint())?,
                x: float(input)?,
                y: float(input)?,
            },
            tag => return Err(CodecError::UnknownTag { stream: s, tag }),
        };
        Ok(command)
    }
}

fn float<R: TypedReader + ?Sized>(input: &mut R) -> CodecResult<f32> {
    field(RenderCodec::STREAM, input.float())
}

fn push_floats<W: TypedWriter + ?Sized>(out: &mut W, values: &[f32]) -> CodecResult<()> {
    for value in values {
        out.push_float(*value)?;
    }
    Ok(())
}

impl Codec for RenderCodec {
    type Item = RenderMessage;

    const STREAM: &'static str = "render";

    fn encode<W: TypedWriter + ?Sized>(
        &self,
        message: &RenderMessage,
        out: &mut W,
    ) -> CodecResult<()> {
        match message {
            RenderMessage::Frame(commands) => {
                out.push_uint(MSG_FRAME)?;
                out.push_uint(commands.len() as u32)?;
                for command in commands {
                    self.encode_command(command, out)?;
                }
            }
            RenderMessage::Close => out.push_uint(MSG_CLOSE)?,
        }
        Ok(())
    }

    fn decode_next<R: TypedReader + ?Sized>(
        &self,
        input: &mut R,
    ) -> CodecResult<Option<RenderMessage>> {
        let Some(tag) = input.try_uint() else {
            return Ok(None);
        };
        match tag {
            MSG_FRAME => {
                let count = field(Self::STREAM, input.uint())? as usize;
                let mut commands = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    commands.push(self.decode_command(input)?);
                }
                Ok(Some(RenderMessage::Frame(commands)))
            }
            MSG_CLOSE => Ok(Some(RenderMessage::Close)),
            tag => Err(CodecError::UnknownTag {
                stream: Self::STREAM,
                tag,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::RingBuffer;

    fn sample_frame() -> Vec<RenderCommand> {
        vec![
            RenderCommand::Resize {
                width: 800,
                height: 450,
            },
            RenderCommand::Clear {
                color: Color::RAYWHITE,
            },
            RenderCommand::SetFillColor { color: Color::MAROON },
            RenderCommand::BeginPath,
            RenderCommand::Arc {
                x: 400.0,
                y: 225.0,
                radius: 50.0,
                start_angle: 0.0,
                end_angle: std::f32::consts::TAU,
            },
            RenderCommand::Fill,
            RenderCommand::SetFont {
                size: 20.0,
                family: "monospace".into(),
            },
            RenderCommand::FillText {
                text: "move the ball".into(),
                x: 10.0,
                y: 10.0,
            },
            RenderCommand::DrawImage {
                image: 3,
                x: 1.0,
                y: 2.0,
            },
        ]
    }

    #[test]
    fn frame_then_close() {
        let (mut tx, mut rx) = RingBuffer::with_capacity_words(256).unwrap();
        let frame = RenderMessage::Frame(sample_frame());
        RenderCodec.encode(&frame, &mut tx).unwrap();
        tx.commit();
        RenderCodec.encode(&RenderMessage::Close, &mut tx).unwrap();
        tx.commit();

        let mut batch = rx.read().unwrap().expect("frame batch");
        assert_eq!(RenderCodec.decode(&mut batch).unwrap(), frame);
        assert_eq!(RenderCodec.decode_next(&mut batch).unwrap(), None);
        drop(batch);
        let mut batch = rx.read().unwrap().expect("close batch");
        assert_eq!(RenderCodec.decode(&mut batch).unwrap(), RenderMessage::Close);
    }

    #[test]
    fn short_frame_is_truncated() {
        let (mut tx, mut rx) = RingBuffer::with_capacity_words(16).unwrap();
        tx.push_uint(MSG_FRAME).unwrap();
        tx.push_uint(2).unwrap();
        tx.push_uint(CMD_FILL).unwrap();
        tx.commit();
        let mut batch = rx.read().unwrap().expect("batch");
        assert!(matches!(
            RenderCodec.decode(&mut batch),
            Err(CodecError::Truncated { stream: "render" })
        ));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let (mut tx, mut rx) = RingBuffer::with_capacity_words(16).unwrap();
        tx.push_uint(MSG_FRAME).unwrap();
        tx.push_uint(1).unwrap();
        tx.push_uint(99).unwrap();
        tx.commit();
        let mut batch = rx.read().unwrap().expect("batch");
        assert!(matches!(
            RenderCodec.decode(&mut batch),
            Err(CodecError::UnknownTag { tag: 99, .. })
        ));
    }
}
