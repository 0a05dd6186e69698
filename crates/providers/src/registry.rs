//! Provider identifier → client constructor registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::chatfire::ChatfireClient;
use crate::client::VideoClient;
use crate::error::ProviderError;
use crate::minimax::MinimaxClient;
use crate::openai::OpenAiSoraClient;
use crate::volces::VolcesArkClient;

/// Connection settings for one provider account.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Provider identifier the config was registered under.
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    /// Remote model requested when a job does not name one.
    pub model: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Builds a client from a shared HTTP client and account settings.
pub type ClientConstructor =
    Arc<dyn Fn(&reqwest::Client, ProviderConfig) -> Arc<dyn VideoClient> + Send + Sync>;

/// Maps provider identifiers to client constructors.
///
/// Built once at startup; lookups are read-only afterwards.
pub struct ProviderRegistry {
    http: reqwest::Client,
    constructors: HashMap<String, ClientConstructor>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// An empty registry reusing an existing [`reqwest::Client`]
    /// (connection pooling across all constructed clients).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            constructors: HashMap::new(),
        }
    }

    /// A registry holding every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        self.register(&["doubao", "volcengine", "volces"], |http, config| {
            Arc::new(VolcesArkClient::new(http.clone(), config))
        });
        self.register(&["chatfire"], |http, config| {
            Arc::new(ChatfireClient::new(http.clone(), config))
        });
        self.register(&["openai"], |http, config| {
            Arc::new(OpenAiSoraClient::new(http.clone(), config))
        });
        self.register(&["minimax"], |http, config| {
            Arc::new(MinimaxClient::new(http.clone(), config))
        });
    }

    /// Register a constructor under one or more identifiers, replacing any
    /// previous registration of the same name.
    pub fn register<F>(&mut self, names: &[&str], constructor: F)
    where
        F: Fn(&reqwest::Client, ProviderConfig) -> Arc<dyn VideoClient> + Send + Sync + 'static,
    {
        let constructor: ClientConstructor = Arc::new(constructor);
        for name in names {
            self.constructors
                .insert(name.to_ascii_lowercase(), Arc::clone(&constructor));
        }
    }

    /// Whether a provider identifier is registered.
    pub fn contains(&self, provider: &str) -> bool {
        self.constructors.contains_key(&provider.to_ascii_lowercase())
    }

    /// Registered identifiers, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Construct a client for `config.provider`.
    pub fn build(&self, config: ProviderConfig) -> Result<Arc<dyn VideoClient>, ProviderError> {
        let constructor = self
            .constructors
            .get(&config.provider.to_ascii_lowercase())
            .ok_or_else(|| ProviderError::UnknownProvider(config.provider.clone()))?;
        Ok(constructor(&self.http, config))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
