//! menubot configuration.
//!
//! Every value comes from a CLI flag or its environment variable fallback;
//! a `.env` file is loaded first when present. The result is an immutable
//! `BotConfig` passed explicitly to whatever needs it.

use anyhow::{Result, anyhow};
use clap::Args;
use mb_channels::{DEFAULT_GRAPH_API_BASE_URL, DEFAULT_GRAPH_API_VERSION, WhatsAppCloudAdapter};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// WhatsApp Cloud API access token.
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Token the platform echoes during webhook verification.
    #[arg(long, env = "VERIFY_TOKEN", hide_env_values = true)]
    pub verify_token: String,

    /// Sending phone number id.
    #[arg(long, env = "PHONE_NUMBER_ID")]
    pub phone_number_id: String,

    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// App secret for `X-Hub-Signature-256` verification. Disabled when unset.
    #[arg(long, env = "APP_SECRET", hide_env_values = true)]
    pub app_secret: Option<String>,

    #[arg(long, env = "GRAPH_API_BASE_URL", default_value = DEFAULT_GRAPH_API_BASE_URL)]
    pub graph_api_base_url: String,

    #[arg(long, env = "GRAPH_API_VERSION", default_value = DEFAULT_GRAPH_API_VERSION)]
    pub graph_api_version: String,

    #[arg(long, env = "HTTP_TIMEOUT_SECONDS", default_value_t = 30)]
    pub http_timeout_seconds: u64,
}

#[derive(Clone)]
pub struct BotConfig {
    pub access_token: String,
    pub verify_token: String,
    pub phone_number_id: String,
    pub app_secret: Option<String>,
    pub listen_addr: SocketAddr,
    pub graph_api_base_url: String,
    pub graph_api_version: String,
    pub http_timeout: Duration,
}

impl TryFrom<ConfigArgs> for BotConfig {
    type Error = anyhow::Error;

    fn try_from(args: ConfigArgs) -> Result<Self> {
        let access_token = required("access token (ACCESS_TOKEN)", args.access_token)?;
        let verify_token = required("verify token (VERIFY_TOKEN)", args.verify_token)?;
        let phone_number_id = required("phone number id (PHONE_NUMBER_ID)", args.phone_number_id)?;

        if args.port == 0 {
            return Err(anyhow!("port (PORT) must be > 0"));
        }
        let host: IpAddr = args
            .host
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid host (HOST) {:?}: {e}", args.host))?;

        if args.http_timeout_seconds == 0 {
            return Err(anyhow!("http timeout (HTTP_TIMEOUT_SECONDS) must be > 0"));
        }

        let graph_api_base_url = args.graph_api_base_url.trim().trim_end_matches('/');
        reqwest::Url::parse(graph_api_base_url).map_err(|e| {
            anyhow!("invalid graph API base URL (GRAPH_API_BASE_URL) {graph_api_base_url:?}: {e}")
        })?;
        let graph_api_version =
            required("graph API version (GRAPH_API_VERSION)", args.graph_api_version)?;

        Ok(Self {
            access_token,
            verify_token,
            phone_number_id,
            app_secret: args
                .app_secret
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            listen_addr: SocketAddr::new(host, args.port),
            graph_api_base_url: graph_api_base_url.to_string(),
            graph_api_version,
            http_timeout: Duration::from_secs(args.http_timeout_seconds),
        })
    }
}

impl BotConfig {
    pub fn whatsapp_adapter(&self) -> Result<WhatsAppCloudAdapter> {
        let adapter = WhatsAppCloudAdapter::with_timeout(
            &self.access_token,
            &self.phone_number_id,
            self.http_timeout,
        )?
        .with_api(&self.graph_api_base_url, &self.graph_api_version);
        Ok(adapter)
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("access_token", &"<redacted>")
            .field("verify_token", &"<redacted>")
            .field("phone_number_id", &self.phone_number_id)
            .field(
                "app_secret",
                &self.app_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("listen_addr", &self.listen_addr)
            .field("graph_api_base_url", &self.graph_api_base_url)
            .field("graph_api_version", &self.graph_api_version)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn required(name: &str, value: String) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(anyhow!("{name} is required"));
    }
    Ok(value.to_string())
}
