//! Wiring from configuration to ready-to-use features.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::credentials::{resolve_api_key, Credentials};
use crate::dispatch::Dispatcher;
use crate::features::{
    AdvisorChat, Codex, DossierCompiler, LiveTactics, PersonaForge, TrainingSimulator,
};
use crate::providers::gemini::GeminiProvider;
use crate::providers::{GenerativeProvider, UnconfiguredProvider};

/// Shared dispatcher plus everything needed to construct features.
#[derive(Debug, Clone)]
pub struct App {
    dispatcher: Dispatcher,
    config: Config,
    notice: Option<String>,
    has_key: bool,
}

impl App {
    /// Build from configuration, resolving the API key through `env` and
    /// `credentials`.
    ///
    /// Unusable model settings or a missing key do not fail: every model call
    /// then reports configuration missing, and [`App::configuration_notice`]
    /// explains why.
    pub fn from_config(
        config: Config,
        credentials: &Credentials,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let key = match config.model.api_key_env.trim() {
            "" => None,
            var => resolve_api_key(var, credentials, env),
        };
        let has_key = key.is_some();

        let (provider, notice): (Arc<dyn GenerativeProvider>, Option<String>) =
            match (config.model.missing_setting(), key) {
                (Some(problem), _) => {
                    warn!(problem = %problem, "model settings unusable; model features disabled");
                    let notice = format!(
                        "Configuration missing: {problem}. Fix it in config.toml or the GHOSTLINE_* environment to enable the advisors."
                    );
                    (Arc::new(UnconfiguredProvider::new(notice.clone())), Some(notice))
                }
                (None, Some(key)) => {
                    info!(
                        endpoint = %config.model.endpoint,
                        model = %config.model.model,
                        "model provider configured"
                    );
                    let provider = GeminiProvider::new(
                        config.model.endpoint.clone(),
                        config.model.model.clone(),
                        key,
                    );
                    (Arc::new(provider), None)
                }
                (None, None) => {
                    warn!(
                        var = %config.model.api_key_env,
                        "no API key; model features disabled"
                    );
                    let notice = format!(
                        "Configuration missing: set {} in the environment or in ~/.ghostline/.env to enable the advisors.",
                        config.model.api_key_env
                    );
                    (Arc::new(UnconfiguredProvider::new(notice.clone())), Some(notice))
                }
            };

        let dispatcher = Dispatcher::new(provider).with_timeout(config.model.request_timeout());
        Self {
            dispatcher,
            config,
            notice,
            has_key,
        }
    }

    /// Build around an existing provider.
    pub fn with_provider(config: Config, provider: Arc<dyn GenerativeProvider>) -> Self {
        let dispatcher = Dispatcher::new(provider).with_timeout(config.model.request_timeout());
        Self {
            dispatcher,
            config,
            notice: None,
            has_key: true,
        }
    }

    /// Why model features are disabled, if they are.
    pub fn configuration_notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Whether the model can be called.
    pub fn is_configured(&self) -> bool {
        self.notice.is_none()
    }

    /// Whether an API key was found, regardless of the other model settings.
    pub fn has_api_key(&self) -> bool {
        self.has_key
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// New advisor chat.
    pub fn chat(&self) -> AdvisorChat {
        AdvisorChat::new(self.dispatcher.clone()).with_limit(self.config.context.chat)
    }

    /// New live tactics feature.
    pub fn live(&self) -> LiveTactics {
        LiveTactics::new(self.dispatcher.clone()).with_limit(self.config.context.live)
    }

    /// New dossier compiler.
    pub fn dossier(&self) -> DossierCompiler {
        DossierCompiler::new(self.dispatcher.clone())
    }

    /// New persona forge.
    pub fn forge(&self) -> PersonaForge {
        PersonaForge::new(self.dispatcher.clone()).with_limit(self.config.context.forge)
    }

    /// New training simulator.
    pub fn training(&self) -> TrainingSimulator {
        TrainingSimulator::new(self.dispatcher.clone()).with_limit(self.config.context.training)
    }

    /// New codex over the built-in library.
    pub fn codex(&self) -> Codex {
        Codex::new(self.dispatcher.clone())
    }
}
