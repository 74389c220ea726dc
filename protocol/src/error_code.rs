use std::fmt;

/// Application error flags carried in the payload of an error message.
///
/// The value is a bit set; the core never interprets it beyond extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u8);

impl ErrorCode {
    /// No error present.
    pub const NONE: ErrorCode = ErrorCode(0x00);
    /// The call has hung up.
    pub const HANGUP: ErrorCode = ErrorCode(0x01);
    /// The host failed to forward an audio frame.
    pub const FRAME_FORWARDING: ErrorCode = ErrorCode(0x02);
    /// The host hit a memory or allocation error.
    pub const MEMORY: ErrorCode = ErrorCode(0x04);
    /// Error message without a code byte.
    pub const UNKNOWN: ErrorCode = ErrorCode(0xff);

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns `true` if every bit of `flag` is set.
    #[must_use]
    pub const fn contains(self, flag: ErrorCode) -> bool {
        self.0 & flag.0 == flag.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorCode::NONE => return f.write_str("none"),
            ErrorCode::UNKNOWN => return f.write_str("unknown"),
            _ => {}
        }

        let flags = [
            (ErrorCode::HANGUP, "hangup"),
            (ErrorCode::FRAME_FORWARDING, "frame-forwarding"),
            (ErrorCode::MEMORY, "memory"),
        ];

        let mut first = true;
        for (flag, name) in flags {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }

        let rest = self.0 & !0x07;
        if rest != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "0x{rest:02x}")?;
        }
        Ok(())
    }
}
