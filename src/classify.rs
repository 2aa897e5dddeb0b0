//! Binary/text classification of entry contents

/// Number of leading bytes inspected for control characters
pub const SNIFF_LEN: usize = 8000;

/// Configuration for binary detection
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Whether invalid UTF-8 marks data as binary
    pub validate_utf8: bool,
    /// Whether NUL and excess control bytes mark data as binary
    pub check_control_bytes: bool,
    /// Maximum share of control bytes (in percent) tolerated in text
    pub control_tolerance_percent: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            validate_utf8: true,
            check_control_bytes: true,
            control_tolerance_percent: 10,
        }
    }
}

/// Result of classifying a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// UTF-8 text, safe to hand to a text transform
    Text,
    /// Binary data, copied through untouched
    Binary { reason: BinaryReason },
}

/// Reason why data is considered binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryReason {
    /// Not valid UTF-8
    InvalidUtf8,
    /// Contains a NUL byte
    NulByte,
    /// Too many non-whitespace control bytes
    ControlBytes,
}

impl Detection {
    pub fn is_binary(&self) -> bool {
        matches!(self, Detection::Binary { .. })
    }
}

/// Classify `data` as text or binary
pub fn detect(data: &[u8], config: &DetectionConfig) -> Detection {
    if data.is_empty() {
        return Detection::Text;
    }

    if config.validate_utf8 && std::str::from_utf8(data).is_err() {
        return Detection::Binary {
            reason: BinaryReason::InvalidUtf8,
        };
    }

    if config.check_control_bytes {
        let sample = &data[..data.len().min(SNIFF_LEN)];
        if sample.contains(&0) {
            return Detection::Binary {
                reason: BinaryReason::NulByte,
            };
        }
        let control = sample.iter().filter(|&&b| is_suspicious_control(b)).count();
        if control * 100 > sample.len() * config.control_tolerance_percent {
            return Detection::Binary {
                reason: BinaryReason::ControlBytes,
            };
        }
    }

    Detection::Text
}

/// Returns true if `data` should be passed through without text processing
pub fn is_binary(data: &[u8]) -> bool {
    detect(data, &DetectionConfig::default()).is_binary()
}

fn is_suspicious_control(b: u8) -> bool {
    // tab, LF, VT, FF, CR and ESC show up in ordinary text files
    (b < 0x20 && !matches!(b, b'\t' | b'\n' | 0x0b | 0x0c | b'\r' | 0x1b)) || b == 0x7f
}
