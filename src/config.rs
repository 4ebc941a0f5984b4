//! Configuração do startstop carregada a partir de `startstop.toml`.
//!
//! A struct [`StartStopConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `STARTSTOP_ENDPOINT` tem precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::convergence::BackoffConfig;

const DEFAULT_PATH: &str = "startstop.toml";

/// Configuração de nível superior carregada de `startstop.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartStopConfig {
    /// URL base do plano de controle.
    #[serde(default)]
    pub endpoint: String,

    /// Tag que marca uma instância como gerenciada; sempre exigida nos filtros.
    #[serde(default = "default_management_tag")]
    pub management_tag: String,

    /// Pula a espera de convergência em execuções dry-run.
    ///
    /// Desligado por padrão: um dry-run ainda espera, como sempre esperou.
    #[serde(default)]
    pub skip_wait_on_dry_run: bool,

    /// Timeout de cada requisição HTTP ao plano de controle, em segundos.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Política de backoff da espera de convergência.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

// Valor padrão para a tag de gerenciamento: "StartStop".
fn default_management_tag() -> String {
    "StartStop".to_string()
}

// Valor padrão para o timeout de requisição: 60s.
fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for StartStopConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            management_tag: default_management_tag(),
            skip_wait_on_dry_run: false,
            request_timeout_secs: default_request_timeout_secs(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl StartStopConfig {
    /// Carrega a configuração do caminho informado ou de `startstop.toml` no
    /// diretório atual. Usa valores padrão se o arquivo padrão não existir;
    /// um caminho explícito inexistente é erro, assim como uma política de
    /// backoff que permitiria consultas sem pausa.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_PATH).exists() => Self::from_file(Path::new(DEFAULT_PATH))?,
            None => Self::default(),
        };

        // Variável de ambiente tem precedência sobre o arquivo para o endpoint.
        if let Ok(endpoint) = std::env::var("STARTSTOP_ENDPOINT")
            && !endpoint.is_empty()
        {
            config.endpoint = endpoint;
        }

        config.backoff.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str::<StartStopConfig>(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
