//! Server Configuration

use advisor_runtime::ProviderKind;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// `BIND_ADDR`, default `0.0.0.0:8080`
    pub bind_addr: String,

    /// `LLM_PROVIDER`, default `gemini`
    pub provider: ProviderKind,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let provider = std::env::var("LLM_PROVIDER")
            .map_or(Ok(ProviderKind::Gemini), |value| value.parse())?;

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            provider,
        })
    }
}
