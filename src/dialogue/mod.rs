use crate::admin::{AdminCapability, AdminGate, ThresholdDirective};
use crate::shared::ids::{AgentAddress, InstallationId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Location,
}

/// One message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub agent_address: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub media_kind: Option<MediaKind>,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl InboundEvent {
    pub fn text(agent_address: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            agent_address: agent_address.into(),
            text: text.into(),
            media_ref: None,
            media_kind: None,
            message_id: None,
        }
    }

    pub fn photo(agent_address: impl Into<String>, media_ref: impl Into<String>) -> Self {
        Self {
            media_ref: Some(media_ref.into()),
            media_kind: Some(MediaKind::Photo),
            ..Self::text(agent_address, "")
        }
    }

    pub fn location(agent_address: impl Into<String>, media_ref: impl Into<String>) -> Self {
        Self {
            media_ref: Some(media_ref.into()),
            media_kind: Some(MediaKind::Location),
            ..Self::text(agent_address, "")
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    fn media_ref(&self) -> Option<&str> {
        self.media_ref
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipScope {
    Current,
    Location,
    Step,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Greeting,
    Status,
    Help,
    Reset,
    List,
    AdminSkip(AdminCapability, SkipScope),
    AdminThreshold(AdminCapability, ThresholdDirective),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutedEvent {
    Identifier(InstallationId),
    LocationCheckin { media_ref: String },
    MediaSubmission { media_ref: String },
    Command(Command),
    Unrecognized(String),
}

/// Maps inbound messages to events. Media beats text; a message that is
/// exactly an identifier beats keywords; admin keywords only route for agents
/// the gate authorizes.
#[derive(Debug, Clone)]
pub struct DialogueRouter {
    gate: AdminGate,
    identifier_prefix: String,
}

impl DialogueRouter {
    pub fn new(gate: AdminGate, identifier_prefix: impl Into<String>) -> Self {
        Self {
            gate,
            identifier_prefix: identifier_prefix.into().to_ascii_uppercase(),
        }
    }

    pub fn identifier_prefix(&self) -> &str {
        &self.identifier_prefix
    }

    pub fn gate(&self) -> &AdminGate {
        &self.gate
    }

    pub fn classify(&self, event: &InboundEvent, agent: &AgentAddress) -> RoutedEvent {
        if let Some(media_ref) = event.media_ref() {
            let media_ref = media_ref.to_string();
            return match event.media_kind {
                Some(MediaKind::Location) => RoutedEvent::LocationCheckin { media_ref },
                Some(MediaKind::Photo) | None => RoutedEvent::MediaSubmission { media_ref },
            };
        }

        let text = event.text.trim();
        if let Ok(id) = InstallationId::parse_with_prefix(text, &self.identifier_prefix) {
            return RoutedEvent::Identifier(id);
        }

        let upper = text.to_ascii_uppercase();
        let words: Vec<&str> = upper.split_whitespace().collect();
        let command = match words.as_slice() {
            ["START"] | ["NEW"] => Some(Command::Start),
            ["HI"] | ["HELLO"] | ["HEY"] | ["HOLA"] => Some(Command::Greeting),
            ["STATUS"] => Some(Command::Status),
            ["HELP"] => Some(Command::Help),
            ["RESET"] => Some(Command::Reset),
            ["LIST"] => Some(Command::List),
            ["SKIP"] => self
                .gate
                .authorize(agent)
                .map(|cap| Command::AdminSkip(cap, SkipScope::Current)),
            ["SKIP", "LOCATION"] => self
                .gate
                .authorize(agent)
                .map(|cap| Command::AdminSkip(cap, SkipScope::Location)),
            ["SKIP", "STEP"] => self
                .gate
                .authorize(agent)
                .map(|cap| Command::AdminSkip(cap, SkipScope::Step)),
            ["THRESHOLD" | "STRICTNESS", rest @ ..] => self
                .gate
                .authorize(agent)
                .map(|cap| Command::AdminThreshold(cap, ThresholdDirective::parse(rest))),
            _ => None,
        };

        match command {
            Some(command) => RoutedEvent::Command(command),
            None => RoutedEvent::Unrecognized(text.to_string()),
        }
    }
}
