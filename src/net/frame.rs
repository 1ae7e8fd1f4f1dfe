use std::convert::TryFrom;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const LENGTH_FIELD_LEN: usize = 4;
/// Type byte plus correlation id.
pub const HEADER_LEN: usize = 1 + 8;
const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;
pub const PROTOCOL_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Hello = 0x01,
    Auth = 0x02,
    Publish = 0x03,
    Subscribe = 0x04,
    Ack = 0x05,
    Nack = 0x06,
    Ping = 0x07,
    Pong = 0x08,
}

impl From<FrameType> for u8 {
    fn from(t: FrameType) -> Self {
        t as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = FrameDecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(FrameType::Hello),
            0x02 => Ok(FrameType::Auth),
            0x03 => Ok(FrameType::Publish),
            0x04 => Ok(FrameType::Subscribe),
            0x05 => Ok(FrameType::Ack),
            0x06 => Ok(FrameType::Nack),
            0x07 => Ok(FrameType::Ping),
            0x08 => Ok(FrameType::Pong),
            other => Err(FrameDecodeError::UnknownFrameType(other)),
        }
    }
}

/// One protocol frame: `[u32 len][u8 type][u64 correlation_id][payload]`.
///
/// For PUBLISH frames sent by the broker, `correlation_id` is the id of the
/// SUBSCRIBE request the delivery belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: FrameType,
    pub correlation_id: u64,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(msg_type: FrameType, correlation_id: u64, payload: Bytes) -> Self {
        Self {
            msg_type,
            correlation_id,
            payload,
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("invalid frame length: {0}")]
    InvalidLength(u32),

    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u32),

    #[error("unknown frame type: {0}")]
    UnknownFrameType(u8),

    #[error("field is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Error)]
pub enum FrameEncodeError {
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
}

fn put_str(buf: &mut BytesMut, value: &str) -> Result<(), FrameEncodeError> {
    let len = u16::try_from(value.len()).map_err(|_| FrameEncodeError::PayloadTooLarge(value.len()))?;
    buf.put_u16(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn get_str(slice: &mut &[u8], total: usize) -> Result<String, FrameDecodeError> {
    if slice.remaining() < 2 {
        return Err(FrameDecodeError::InvalidLength(total as u32));
    }
    let len = slice.get_u16() as usize;
    if slice.remaining() < len {
        return Err(FrameDecodeError::InvalidLength(total as u32));
    }
    let value = std::str::from_utf8(&slice[..len])
        .map_err(|_| FrameDecodeError::InvalidUtf8)?
        .to_string();
    slice.advance(len);
    Ok(value)
}

fn str_len(value: &str) -> usize {
    2 + value.len()
}

/// HELLO payload: [u16 protocol_version][str client_name]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloPayload {
    pub protocol_version: u16,
    pub client_name: String,
}

impl HelloPayload {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            client_name: client_name.into(),
        }
    }

    pub fn encode(&self) -> Result<Bytes, FrameEncodeError> {
        let mut buf = BytesMut::with_capacity(2 + str_len(&self.client_name));
        buf.put_u16(self.protocol_version);
        put_str(&mut buf, &self.client_name)?;
        Ok(buf.freeze())
    }

    pub fn decode(payload: &Bytes) -> Result<Self, FrameDecodeError> {
        if payload.len() < 2 {
            return Err(FrameDecodeError::InvalidLength(payload.len() as u32));
        }
        let mut slice = &payload[..];
        let protocol_version = slice.get_u16();
        let client_name = get_str(&mut slice, payload.len())?;
        Ok(Self {
            protocol_version,
            client_name,
        })
    }
}

/// AUTH payload: [str api_key]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPayload {
    pub api_key: String,
}

impl AuthPayload {
    pub fn encode(&self) -> Result<Bytes, FrameEncodeError> {
        let mut buf = BytesMut::with_capacity(str_len(&self.api_key));
        put_str(&mut buf, &self.api_key)?;
        Ok(buf.freeze())
    }

    pub fn decode(payload: &Bytes) -> Result<Self, FrameDecodeError> {
        let mut slice = &payload[..];
        let api_key = get_str(&mut slice, payload.len())?;
        if slice.has_remaining() {
            return Err(FrameDecodeError::InvalidLength(payload.len() as u32));
        }
        Ok(Self { api_key })
    }
}

/// NACK payload: [u16 code][str message]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NackPayload {
    pub code: u16,
    pub message: String,
}

impl NackPayload {
    pub fn encode(&self) -> Result<Bytes, FrameEncodeError> {
        let mut buf = BytesMut::with_capacity(2 + str_len(&self.message));
        buf.put_u16(self.code);
        put_str(&mut buf, &self.message)?;
        Ok(buf.freeze())
    }

    pub fn decode(payload: &Bytes) -> Result<Self, FrameDecodeError> {
        if payload.len() < 4 {
            return Err(FrameDecodeError::InvalidLength(payload.len() as u32));
        }
        let mut slice = &payload[..];
        let code = slice.get_u16();
        let message = get_str(&mut slice, payload.len())?;
        Ok(Self { code, message })
    }
}

/// PUBLISH payload: [str subject][message_bytes...]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPayload {
    pub subject: String,
    pub message: Bytes,
}

impl PublishPayload {
    pub fn encode(&self) -> Result<Bytes, FrameEncodeError> {
        let mut buf = BytesMut::with_capacity(str_len(&self.subject) + self.message.len());
        put_str(&mut buf, &self.subject)?;
        buf.put_slice(&self.message);
        Ok(buf.freeze())
    }

    pub fn decode(payload: &Bytes) -> Result<Self, FrameDecodeError> {
        let mut slice = &payload[..];
        let subject = get_str(&mut slice, payload.len())?;
        let consumed = payload.len() - slice.remaining();
        Ok(Self {
            subject,
            message: payload.slice(consumed..),
        })
    }
}

/// SUBSCRIBE payload: [str topic][str queue_group][str consumer]
///
/// An empty `queue_group` asks for every message on the topic rather than a
/// load-balanced share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribePayload {
    pub topic: String,
    pub queue_group: String,
    pub consumer: String,
}

impl SubscribePayload {
    pub fn encode(&self) -> Result<Bytes, FrameEncodeError> {
        let mut buf = BytesMut::with_capacity(
            str_len(&self.topic) + str_len(&self.queue_group) + str_len(&self.consumer),
        );
        put_str(&mut buf, &self.topic)?;
        put_str(&mut buf, &self.queue_group)?;
        put_str(&mut buf, &self.consumer)?;
        Ok(buf.freeze())
    }

    pub fn decode(payload: &Bytes) -> Result<Self, FrameDecodeError> {
        let mut slice = &payload[..];
        let topic = get_str(&mut slice, payload.len())?;
        let queue_group = get_str(&mut slice, payload.len())?;
        let consumer = get_str(&mut slice, payload.len())?;
        Ok(Self {
            topic,
            queue_group,
            consumer,
        })
    }
}

/// Encode a frame into the provided buffer.
#[inline(always)]
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<(), FrameEncodeError> {
    let payload_len = frame.payload.len();
    let total_len = HEADER_LEN
        .checked_add(payload_len)
        .ok_or(FrameEncodeError::PayloadTooLarge(payload_len))?;

    if total_len > MAX_FRAME_SIZE as usize {
        return Err(FrameEncodeError::PayloadTooLarge(payload_len));
    }

    dst.reserve(LENGTH_FIELD_LEN + total_len);
    dst.put_u32(total_len as u32);
    dst.put_u8(frame.msg_type.into());
    dst.put_u64(frame.correlation_id);
    dst.put_slice(&frame.payload);
    Ok(())
}

/// Try to decode a single frame from the buffer.
///
/// Returns `Ok(None)` if there is not yet enough data to decode a full frame.
#[inline(always)]
pub fn try_decode_frame(src: &mut BytesMut) -> Result<Option<Frame>, FrameDecodeError> {
    if src.len() < LENGTH_FIELD_LEN {
        return Ok(None);
    }

    let mut length_bytes = &src[..LENGTH_FIELD_LEN];
    let frame_len = length_bytes.get_u32();

    if frame_len > MAX_FRAME_SIZE {
        return Err(FrameDecodeError::FrameTooLarge(frame_len));
    }

    let frame_len_usize = frame_len as usize;
    if frame_len_usize < HEADER_LEN {
        return Err(FrameDecodeError::InvalidLength(frame_len));
    }

    if src.len() < LENGTH_FIELD_LEN + frame_len_usize {
        return Ok(None);
    }

    let mut frame_bytes = src.split_to(LENGTH_FIELD_LEN + frame_len_usize);
    frame_bytes.advance(LENGTH_FIELD_LEN);

    let msg_type = FrameType::try_from(frame_bytes.get_u8())?;
    let correlation_id = frame_bytes.get_u64();
    let payload = frame_bytes.freeze();

    Ok(Some(Frame {
        msg_type,
        correlation_id,
        payload,
    }))
}
