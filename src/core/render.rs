//! Output formatting for delivered messages.
//!
//! Rendering is a pure function of the mode, the subscribed topic, the
//! message and the wall-clock time handed in by the caller. Nothing is
//! carried between calls, so rendering the same input twice yields the same
//! bytes.

use chrono::NaiveTime;

use crate::core::message::InboundMessage;

/// Wall-clock format used in annotated headers.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// How each message is written to the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Payload only, one message per line.
    Raw,
    /// Timestamped header followed by the payload and a blank line.
    #[default]
    Annotated,
}

impl RenderMode {
    pub fn from_raw_flag(raw: bool) -> Self {
        if raw {
            RenderMode::Raw
        } else {
            RenderMode::Annotated
        }
    }

    pub fn is_raw(self) -> bool {
        self == RenderMode::Raw
    }
}

/// Render one message.
///
/// In annotated mode the header names the delivery subject whenever it
/// differs from `topic`.
pub fn render(mode: RenderMode, topic: &str, msg: &InboundMessage, at: NaiveTime) -> String {
    let payload = msg.payload_lossy();

    match mode {
        RenderMode::Raw => format!("{payload}\n"),
        RenderMode::Annotated if msg.subject == topic => {
            format!("---- {}\n{payload}\n\n", at.format(TIME_FORMAT))
        }
        RenderMode::Annotated => format!(
            "---- {} on topic {}\n{payload}\n\n",
            at.format(TIME_FORMAT),
            msg.subject
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_am() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn annotated_exact_topic() {
        let msg = InboundMessage::new("test.topic", &b"hello"[..]);
        let out = render(RenderMode::Annotated, "test.topic", &msg, ten_am());
        assert_eq!(out, "---- 10:00:00\nhello\n\n");
    }

    #[test]
    fn annotated_alias_subject_is_named() {
        let msg = InboundMessage::new("test.alerts", &b"warn"[..]);
        let out = render(RenderMode::Annotated, "test.>", &msg, ten_am());
        assert_eq!(out, "---- 10:00:00 on topic test.alerts\nwarn\n\n");
    }

    #[test]
    fn raw_is_payload_and_newline_only() {
        let exact = InboundMessage::new("test.topic", &b"hello"[..]);
        assert_eq!(
            render(RenderMode::Raw, "test.topic", &exact, ten_am()),
            "hello\n"
        );

        let alias = InboundMessage::new("test.alerts", &b"warn"[..]);
        assert_eq!(render(RenderMode::Raw, "test.>", &alias, ten_am()), "warn\n");
    }

    #[test]
    fn same_input_renders_identically() {
        let msg = InboundMessage::new("a.b", &b"{\"x\":1}"[..]);
        let at = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        for mode in [RenderMode::Raw, RenderMode::Annotated] {
            let first = render(mode, "a.*", &msg, at);
            let second = render(mode, "a.*", &msg, at);
            assert_eq!(first.as_bytes(), second.as_bytes());
        }
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let msg = InboundMessage::new("t", vec![b'o', b'k', 0xff]);
        assert_eq!(render(RenderMode::Raw, "t", &msg, ten_am()), "ok\u{FFFD}\n");
    }

    #[test]
    fn time_is_second_precision() {
        let msg = InboundMessage::new("t", &b"x"[..]);
        let at = NaiveTime::from_hms_milli_opt(7, 5, 3, 999).unwrap();
        assert_eq!(
            render(RenderMode::Annotated, "t", &msg, at),
            "---- 07:05:03\nx\n\n"
        );
    }

    #[test]
    fn raw_flag_maps_to_mode() {
        assert_eq!(RenderMode::from_raw_flag(true), RenderMode::Raw);
        assert_eq!(RenderMode::from_raw_flag(false), RenderMode::Annotated);
        assert_eq!(RenderMode::default(), RenderMode::Annotated);
    }
}
