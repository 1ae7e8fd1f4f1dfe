use std::borrow::Cow;

use bytes::Bytes;

/// A message handed from the connection to the receive loop.
///
/// `subject` is the concrete subject the broker delivered on, which can
/// differ from the subscribed topic when wildcards or aliases are involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub subject: String,
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }

    /// Payload as text, replacing invalid UTF-8 sequences.
    #[inline]
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
