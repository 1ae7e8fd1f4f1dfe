//! Length-prefixed binary framing spoken by the middleware broker.

pub mod frame;

pub use frame::{
    encode_frame, try_decode_frame, AuthPayload, Frame, FrameDecodeError, FrameEncodeError,
    FrameType, HelloPayload, NackPayload, PublishPayload, SubscribePayload, PROTOCOL_VERSION,
};
