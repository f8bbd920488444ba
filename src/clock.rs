//! Interpreting the recognized minute and second fields as a game clock.

use std::fmt;

use crate::sanitize::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockReading {
    pub minutes: u8,
    pub seconds: u8,
}

impl ClockReading {
    /// Builds a reading from the raw minute and second texts. Each field must
    /// be one or two digits once sanitized, and seconds must be below 60.
    pub fn from_digits(minutes: &str, seconds: &str) -> Option<Self> {
        let minutes = parse_field(&sanitize(minutes))?;
        let seconds = parse_field(&sanitize(seconds))?;
        (seconds < 60).then_some(Self { minutes, seconds })
    }

    pub fn total_seconds(&self) -> u32 {
        self.minutes as u32 * 60 + self.seconds as u32
    }
}

fn parse_field(text: &str) -> Option<u8> {
    if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Display for ClockReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes, self.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::ClockReading;

    #[test]
    fn parses_and_formats() {
        let reading = ClockReading::from_digits("12", "05").unwrap();
        assert_eq!(reading.total_seconds(), 725);
        assert_eq!(reading.to_string(), "12:05");
        assert_eq!(ClockReading::from_digits("0", "7").unwrap().to_string(), "0:07");
    }

    #[test]
    fn tolerates_recognition_noise() {
        assert_eq!(
            ClockReading::from_digits(" 3é", "\u{a0}41 "),
            Some(ClockReading {
                minutes: 3,
                seconds: 41
            })
        );
    }

    #[test]
    fn rejects_invalid_fields() {
        assert_eq!(ClockReading::from_digits("", "10"), None);
        assert_eq!(ClockReading::from_digits("1", "60"), None);
        assert_eq!(ClockReading::from_digits("123", "10"), None);
        assert_eq!(ClockReading::from_digits("1a", "10"), None);
        assert_eq!(ClockReading::from_digits("1", "+5"), None);
    }
}
