use chrono::DateTime;
use getrandom::getrandom;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const IDENTIFIER_PREFIX_LEN: usize = 2;
pub const MIN_IDENTIFIER_DIGITS: usize = 4;
pub const MAX_IDENTIFIER_DIGITS: usize = 10;

macro_rules! define_id_type {
    ($name:ident, $kind:literal, $normalize:path, $validate:path) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> Result<Self, String> {
                let normalized = $normalize(raw);
                $validate(&normalized)?;
                Ok(Self(normalized))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(|err| {
                    D::Error::custom(format!("invalid {} `{}`: {}", $kind, raw, err))
                })
            }
        }
    };
}

fn normalize_agent_address(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_channel = trimmed.strip_prefix("whatsapp:").unwrap_or(trimmed);
    let compact: String = without_channel
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect();
    let digits = compact.trim_start_matches('+');
    if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) {
        format!("+{digits}")
    } else {
        compact
    }
}

pub fn validate_agent_address(value: &str) -> Result<(), String> {
    let body = value.strip_prefix('+').unwrap_or(value);
    if body.is_empty() {
        return Err("agent address must be non-empty".to_string());
    }
    if !body.starts_with(|ch: char| ch.is_ascii_alphanumeric()) {
        return Err("agent address must start with a letter or digit".to_string());
    }
    if body
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '@'))
    {
        return Ok(());
    }
    Err("agent address must use only ASCII letters, digits, '-', '_', '.' or '@'".to_string())
}

fn normalize_installation_id(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Installation identifiers are two letters followed by 4 to 10 digits, e.g. `DR0123456`.
pub fn validate_installation_id(value: &str) -> Result<(), String> {
    let prefix = value
        .get(..IDENTIFIER_PREFIX_LEN)
        .filter(|prefix| prefix.chars().all(|ch| ch.is_ascii_uppercase()))
        .ok_or_else(|| "installation id must start with two letters".to_string())?;
    let digits = &value[prefix.len()..];
    if !(MIN_IDENTIFIER_DIGITS..=MAX_IDENTIFIER_DIGITS).contains(&digits.len())
        || !digits.chars().all(|ch| ch.is_ascii_digit())
    {
        return Err(format!(
            "installation id must continue with {MIN_IDENTIFIER_DIGITS}-{MAX_IDENTIFIER_DIGITS} digits"
        ));
    }
    Ok(())
}

define_id_type!(
    AgentAddress,
    "agent address",
    normalize_agent_address,
    validate_agent_address
);
define_id_type!(
    InstallationId,
    "installation id",
    normalize_installation_id,
    validate_installation_id
);

impl AgentAddress {
    /// Stable agent identifier derived from the channel address.
    pub fn agent_id(&self) -> &str {
        self.0.trim_start_matches('+')
    }
}

impl InstallationId {
    /// Parses and additionally requires the configured two-letter prefix.
    pub fn parse_with_prefix(raw: &str, prefix: &str) -> Result<Self, String> {
        let id = Self::parse(raw)?;
        if !id.0.starts_with(&prefix.to_ascii_uppercase()) {
            return Err(format!("installation id must start with `{prefix}`"));
        }
        Ok(id)
    }

    pub fn prefix(&self) -> &str {
        &self.0[..IDENTIFIER_PREFIX_LEN]
    }
}

/// Reference for one unit of work, minted when an installation is created or reset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobReference(String);

impl JobReference {
    pub fn mint(
        agent: &AgentAddress,
        installation: Option<&InstallationId>,
        now: i64,
    ) -> Result<Self, String> {
        let stamp = DateTime::from_timestamp(now, 0)
            .ok_or_else(|| format!("timestamp {now} is out of range for a job reference"))?
            .format("%Y%m%d_%H%M%S");
        let mut bytes = [0_u8; 2];
        getrandom(&mut bytes)
            .map_err(|err| format!("failed to generate job reference randomness: {err}"))?;
        let suffix = u16::from_le_bytes(bytes);
        let reference = match installation {
            Some(id) => format!("JOB_{stamp}_{}_{id}_{suffix:04x}", agent.agent_id()),
            None => format!("JOB_{stamp}_{}_{suffix:04x}", agent.agent_id()),
        };
        Ok(Self(reference))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
