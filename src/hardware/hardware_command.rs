//! Tokens sent by the transport panel over the serial link.

const MAX_VOLUME_TOKEN: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareCommand {
    Previous,
    Next,
    Toggle,
    Stop,
    Volume(u8),
}

impl HardwareCommand {
    /// Maps one terminator-stripped token to a command. Unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        match token {
            "P" => Some(Self::Previous),
            "N" => Some(Self::Next),
            "T" => Some(Self::Toggle),
            "S" => Some(Self::Stop),
            _ if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) => {
                // Anything too long for u32 is over the cap anyway.
                let value = token.parse::<u32>().unwrap_or(MAX_VOLUME_TOKEN);
                Some(Self::Volume(value.min(MAX_VOLUME_TOKEN) as u8))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_maps_transport_letters() {
        assert_eq!(HardwareCommand::parse("P"), Some(HardwareCommand::Previous));
        assert_eq!(HardwareCommand::parse("N"), Some(HardwareCommand::Next));
        assert_eq!(HardwareCommand::parse(" T\r\n"), Some(HardwareCommand::Toggle));
        assert_eq!(HardwareCommand::parse("S"), Some(HardwareCommand::Stop));
    }

    #[test]
    fn test_parse_numeric_token_as_volume() {
        assert_eq!(HardwareCommand::parse("0"), Some(HardwareCommand::Volume(0)));
        assert_eq!(HardwareCommand::parse("42"), Some(HardwareCommand::Volume(42)));
        assert_eq!(HardwareCommand::parse("250"), Some(HardwareCommand::Volume(100)));
        assert_eq!(
            HardwareCommand::parse("99999999999999999999"),
            Some(HardwareCommand::Volume(100))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_tokens() {
        assert_eq!(HardwareCommand::parse(""), None);
        assert_eq!(HardwareCommand::parse("p"), None);
        assert_eq!(HardwareCommand::parse("-5"), None);
        assert_eq!(HardwareCommand::parse("NT"), None);
        assert_eq!(HardwareCommand::parse("4a"), None);
    }
}
