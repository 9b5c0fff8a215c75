//! Role-to-client resolution
//!
//! Every model-backed step of a run is addressed by a [`ModelRole`]. The
//! registry owns one client per role so the scoping, supervision, research,
//! compression, and report steps can run on different models, mirroring the
//! per-role configuration scheme (`SCOPE_MODEL`, `SUPERVISOR_MODEL`, ...).

use crate::config::EngineConfig;
use crate::llm::client::{ModelClient, Provider};
use crate::types::{ResearchError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// The model-backed steps of a research run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    /// Clarification and brief generation.
    Scope,
    /// Decomposition and sufficiency judgment.
    Supervisor,
    /// Per-worker tool-call selection.
    Research,
    /// Claim extraction from raw findings.
    Compress,
    /// Final report synthesis.
    Report,
}

impl ModelRole {
    pub const ALL: [ModelRole; 5] = [
        ModelRole::Scope,
        ModelRole::Supervisor,
        ModelRole::Research,
        ModelRole::Compress,
        ModelRole::Report,
    ];
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelRole::Scope => "scope",
            ModelRole::Supervisor => "supervisor",
            ModelRole::Research => "research",
            ModelRole::Compress => "compress",
            ModelRole::Report => "report",
        };
        write!(f, "{}", name)
    }
}

/// Resolves a [`ModelRole`] to its configured client.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    clients: HashMap<ModelRole, Arc<dyn ModelClient>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration, parsing each role's model
    /// string and creating its client.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let api_key = config.openai_api_key.as_deref();
        let api_base = config.openai_api_base.as_deref();

        let mut registry = Self::new();
        for (role, model_string) in [
            (ModelRole::Scope, &config.models.scope),
            (ModelRole::Supervisor, &config.models.supervisor),
            (ModelRole::Research, &config.models.research),
            (ModelRole::Compress, &config.models.compress),
            (ModelRole::Report, &config.models.report),
        ] {
            let provider = Provider::parse(model_string, api_key, api_base)?;
            tracing::debug!(role = %role, provider = provider.name(), "Configured model role");
            registry.register(role, provider.create_client()?);
        }
        Ok(registry)
    }

    /// Assign the same client to every role. Intended for tests and
    /// single-model deployments.
    pub fn uniform(client: Arc<dyn ModelClient>) -> Self {
        let mut registry = Self::new();
        for role in ModelRole::ALL {
            registry.register(role, client.clone());
        }
        registry
    }

    pub fn register(&mut self, role: ModelRole, client: Arc<dyn ModelClient>) {
        self.clients.insert(role, client);
    }

    pub fn client_for(&self, role: ModelRole) -> Result<Arc<dyn ModelClient>> {
        self.clients.get(&role).cloned().ok_or_else(|| {
            ResearchError::Configuration(format!("No model configured for role '{}'", role))
        })
    }
}
