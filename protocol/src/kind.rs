use std::fmt;

macro_rules! kinds {
    ($($(#[$doc:meta])* $name:ident = $val:literal),* $(,)?) => {
        /// Message type indicator carried in the first header byte.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Kind { $($(#[$doc])* $name = $val,)* }

        impl Kind {
            #[must_use]
            pub const fn as_u8(self) -> u8 { self as u8 }

            /// Classifies a raw kind byte. Unknown values map to [`Kind::Error`].
            #[must_use]
            pub const fn from_u8(value: u8) -> Self {
                match value {
                    $($val => Self::$name,)*
                    _ => Self::Error,
                }
            }

            /// Returns `true` if `value` is one of the known kind bytes.
            #[must_use]
            pub const fn is_known(value: u8) -> bool {
                matches!(value, $($val)|*)
            }
        }
    };
}

kinds! {
    /// The call hung up, or the peer asks to terminate.
    Hangup = 0x00,
    /// 16-byte call identifier, first message of a connection.
    Identity = 0x01,
    /// Silence on the line.
    Silence = 0x02,
    /// DTMF digit.
    Dtmf = 0x03,
    /// Signed linear 16-bit 8kHz mono audio.
    Audio = 0x10,
    /// Error code (payload: 0 or 1 byte).
    Error = 0xff,
}

impl Kind {
    /// Silence and DTMF messages are forwarded to the signal handler.
    #[must_use]
    pub const fn is_signal(self) -> bool {
        matches!(self, Kind::Silence | Kind::Dtmf)
    }
}

impl From<u8> for Kind {
    fn from(value: u8) -> Self {
        Kind::from_u8(value)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Hangup => "hangup",
            Kind::Identity => "identity",
            Kind::Silence => "silence",
            Kind::Dtmf => "dtmf",
            Kind::Audio => "audio",
            Kind::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_bytes_classify() {
        assert_eq!(Kind::from_u8(0x00), Kind::Hangup);
        assert_eq!(Kind::from_u8(0x01), Kind::Identity);
        assert_eq!(Kind::from_u8(0x02), Kind::Silence);
        assert_eq!(Kind::from_u8(0x03), Kind::Dtmf);
        assert_eq!(Kind::from_u8(0x10), Kind::Audio);
        assert_eq!(Kind::from_u8(0xff), Kind::Error);
    }

    #[test]
    fn unknown_bytes_are_errors() {
        assert_eq!(Kind::from_u8(0x7a), Kind::Error);
        assert_eq!(Kind::from_u8(0x11), Kind::Error);
        assert!(!Kind::is_known(0x7a));
        assert!(Kind::is_known(0x10));
    }

    #[test]
    fn signal_kinds() {
        assert!(Kind::Silence.is_signal());
        assert!(Kind::Dtmf.is_signal());
        assert!(!Kind::Audio.is_signal());
        assert!(!Kind::Error.is_signal());
    }
}
