pub mod console;
pub mod threshold;

pub use console::{threshold_reply, ActiveSessionSummary, AdminConsole, Statistics};
pub use threshold::{ThresholdDirective, ThresholdPreset};

use crate::config::Settings;
use crate::shared::ids::AgentAddress;
use std::collections::BTreeSet;

/// Proof that an agent passed the admin gate. Only `AdminGate` can mint one,
/// so every privileged operation that takes it is gated by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCapability {
    agent: AgentAddress,
}

impl AdminCapability {
    pub fn agent(&self) -> &AgentAddress {
        &self.agent
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    enabled: bool,
    allowed_agent_ids: BTreeSet<String>,
}

impl AdminGate {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Open only in the development environment with admin enabled; entries in
    /// `allowed_agents` that do not parse as addresses are ignored.
    pub fn from_settings(settings: &Settings) -> Self {
        let allowed_agent_ids = settings
            .admin
            .allowed_agents
            .iter()
            .filter_map(|raw| AgentAddress::parse(raw).ok())
            .map(|address| address.agent_id().to_string())
            .collect();
        Self {
            enabled: settings.admin_enabled(),
            allowed_agent_ids,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn authorize(&self, agent: &AgentAddress) -> Option<AdminCapability> {
        (self.enabled && self.allowed_agent_ids.contains(agent.agent_id())).then(|| {
            AdminCapability {
                agent: agent.clone(),
            }
        })
    }
}
