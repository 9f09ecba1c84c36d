use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    pub webhook_url: Option<String>,
    pub echo_text: bool,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

/// Service-account credentials used to sign the OAuth assertion.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub range: String,
    pub api_base: String,
    pub service_account: ServiceAccount,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    /// `None` disables photo analysis; photos are acknowledged with their link.
    pub gemini: Option<GeminiConfig>,
    /// `None` disables the spreadsheet log.
    pub sheets: Option<SheetsConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let bot_token = var("TELEGRAM_BOT_TOKEN")
            .or_else(|| var("BOT_TOKEN"))
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;
        let echo_text = match var("ECHO_TEXT") {
            Some(v) => parse_bool("ECHO_TEXT", &v)?,
            None => true,
        };
        let telegram = TelegramConfig {
            bot_token,
            api_base: var("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.into()),
            webhook_url: var("WEBHOOK_URL"),
            echo_text,
        };

        let gemini = var("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            api_base: var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.into()),
        });

        let sheets = match var("SPREADSHEET_ID") {
            Some(spreadsheet_id) => Some(SheetsConfig {
                spreadsheet_id,
                range: var("SHEET_RANGE").unwrap_or_else(|| "Sheet1!A1".into()),
                api_base: var("SHEETS_API_BASE").unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.into()),
                service_account: service_account(&var)?,
            }),
            None => None,
        };

        Ok(Self {
            telegram,
            gemini,
            sheets,
        })
    }
}

fn service_account<F>(var: &F) -> Result<ServiceAccount, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(blob) = var("GOOGLE_CREDENTIALS") {
        let mut sa: ServiceAccount =
            serde_json::from_str(&blob).map_err(|e| ConfigError::InvalidValue {
                key: "GOOGLE_CREDENTIALS".into(),
                message: e.to_string(),
            })?;
        sa.private_key = unescape_newlines(&sa.private_key);
        return Ok(sa);
    }

    let client_email = var("GOOGLE_SERVICE_ACCOUNT_EMAIL").ok_or_else(|| {
        ConfigError::MissingRequired {
            key: "GOOGLE_SERVICE_ACCOUNT_EMAIL".into(),
            hint: "set GOOGLE_CREDENTIALS or the email/private key pair when SPREADSHEET_ID is set"
                .into(),
        }
    })?;
    let private_key = var("GOOGLE_PRIVATE_KEY").ok_or_else(|| ConfigError::MissingRequired {
        key: "GOOGLE_PRIVATE_KEY".into(),
        hint: "PEM-encoded RSA key of the service account".into(),
    })?;
    Ok(ServiceAccount {
        client_email,
        private_key: unescape_newlines(&private_key),
        token_uri: var("GOOGLE_TOKEN_URI").unwrap_or_else(default_token_uri),
    })
}

// Hosting dashboards store multi-line PEM keys with literal "\n".
fn unescape_newlines(key: &str) -> String {
    key.replace("\\n", "\n")
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
