use std::env;

use anyhow::{anyhow, Result};

use crate::profile::BotProfile;

pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v20.0";
pub const DEFAULT_XAI_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_XAI_MODEL: &str = "grok-2-latest";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are BuildByAlistar Assistant. Be concise and helpful.";

#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub max_bytes: Option<u64>,
    pub keep: usize,
    pub compress: bool,
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_base: String,
    pub phone_number_id: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Shared secret for the GET handshake. Unset means every handshake fails.
    pub verify_token: Option<String>,
    pub whatsapp: WhatsAppConfig,
    pub model: ModelConfig,
    pub profile: BotProfile,
    pub outbound_timeout_ms: u64,
    pub log_file: Option<String>,
    pub rotation: RotationConfig,
    pub log_stdout: bool,
    pub log_sample_n: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            verify_token: None,
            whatsapp: WhatsAppConfig {
                api_base: DEFAULT_GRAPH_API_BASE.to_owned(),
                phone_number_id: None,
                access_token: None,
            },
            model: ModelConfig {
                api_base: DEFAULT_XAI_BASE_URL.to_owned(),
                api_key: None,
                model: DEFAULT_XAI_MODEL.to_owned(),
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
                temperature: 0.4,
            },
            profile: BotProfile::default(),
            outbound_timeout_ms: 15_000,
            log_file: None,
            rotation: RotationConfig {
                max_bytes: None,
                keep: 1,
                compress: false,
            },
            log_stdout: false,
            log_sample_n: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let profile = match non_empty_env("BRIDGE_PROFILE") {
            Some(path) => BotProfile::from_file(&path)?,
            None => defaults.profile,
        };

        let whatsapp = WhatsAppConfig {
            api_base: non_empty_env("GRAPH_API_BASE").unwrap_or(defaults.whatsapp.api_base),
            phone_number_id: non_empty_env("PHONE_NUMBER_ID"),
            access_token: non_empty_env("WHATSAPP_TOKEN"),
        };

        let model = ModelConfig {
            api_base: non_empty_env("XAI_BASE_URL").unwrap_or(defaults.model.api_base),
            api_key: non_empty_env("XAI_API_KEY"),
            model: non_empty_env("XAI_MODEL").unwrap_or(defaults.model.model),
            // Whitespace is significant in prompts; only an unset variable falls back.
            system_prompt: env::var("SYSTEM_PROMPT")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.model.system_prompt),
            temperature: parse_optional_f32("XAI_TEMPERATURE")?
                .unwrap_or(defaults.model.temperature),
        };

        let rotation = RotationConfig {
            max_bytes: parse_optional_u64("LOG_MAX_BYTES")?,
            keep: parse_optional_u64("LOG_ROTATE_KEEP")?.unwrap_or(1) as usize,
            compress: parse_bool_env("LOG_ROTATE_COMPRESS")?.unwrap_or(false),
        };

        let port = match parse_optional_u64("PORT")? {
            Some(p) => u16::try_from(p).map_err(|_| anyhow!("PORT must be at most 65535"))?,
            None => defaults.port,
        };

        Ok(Self {
            port,
            // Compared byte for byte during the handshake; not trimmed.
            verify_token: env::var("VERIFY_TOKEN").ok().filter(|s| !s.is_empty()),
            whatsapp,
            model,
            profile,
            outbound_timeout_ms: parse_optional_u64("OUTBOUND_TIMEOUT_MS")?
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.outbound_timeout_ms),
            log_file: non_empty_env("LOG_FILE"),
            rotation,
            log_stdout: parse_bool_env("LOG_STDOUT")?.unwrap_or(false),
            log_sample_n: parse_optional_u64("LOG_SAMPLE_N")?.filter(|n| *n > 1),
        })
    }

    /// Log a warning for each credential the bridge will run without.
    pub fn warn_missing_credentials(&self) {
        let missing = [
            ("VERIFY_TOKEN", self.verify_token.is_none()),
            ("WHATSAPP_TOKEN", self.whatsapp.access_token.is_none()),
            ("PHONE_NUMBER_ID", self.whatsapp.phone_number_id.is_none()),
            ("XAI_API_KEY", self.model.api_key.is_none()),
        ];
        for (var, absent) in missing {
            if absent {
                tracing::warn!(var, "credential not set; dependent calls will fail");
            }
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_optional_u64(var: &str) -> Result<Option<u64>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a positive integer", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_optional_f32(var: &str) -> Result<Option<f32>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => match value.trim().parse::<f32>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
            _ => Err(anyhow!("{} must be a non-negative number", var)),
        },
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool_env(var: &str) -> Result<Option<bool>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| anyhow!("{} must be a boolean (true/false/1/0)", var)),
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
