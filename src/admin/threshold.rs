#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPreset {
    Strict,
    Standard,
    Lenient,
    Testing,
}

impl ThresholdPreset {
    pub const ALL: [ThresholdPreset; 4] = [
        ThresholdPreset::Strict,
        ThresholdPreset::Standard,
        ThresholdPreset::Lenient,
        ThresholdPreset::Testing,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "STRICT" => Some(Self::Strict),
            "STANDARD" => Some(Self::Standard),
            "LENIENT" => Some(Self::Lenient),
            "TESTING" => Some(Self::Testing),
            _ => None,
        }
    }

    pub fn value(self) -> f32 {
        match self {
            Self::Strict => 9.0,
            Self::Standard => 8.0,
            Self::Lenient => 7.0,
            Self::Testing => 5.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Strict => "STRICT",
            Self::Standard => "STANDARD",
            Self::Lenient => "LENIENT",
            Self::Testing => "TESTING",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Self::Strict => "Only excellent photos will pass.",
            Self::Standard => "Good quality photos will pass.",
            Self::Lenient => "Acceptable photos will pass.",
            Self::Testing => "Most photos will pass - for testing only!",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdDirective {
    Show,
    Preset(ThresholdPreset),
    Set(f32),
    Invalid(String),
}

impl ThresholdDirective {
    /// Parses the words following `THRESHOLD`/`STRICTNESS`.
    pub fn parse(args: &[&str]) -> Self {
        match args {
            [] => Self::Show,
            [word] => ThresholdPreset::parse(word)
                .map(Self::Preset)
                .unwrap_or_else(|| Self::Invalid(word.to_string())),
            [set, value] if set.eq_ignore_ascii_case("SET") => value
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Set)
                .unwrap_or_else(|| Self::Invalid(value.to_string())),
            other => Self::Invalid(other.join(" ")),
        }
    }
}
