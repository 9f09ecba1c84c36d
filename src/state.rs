use std::sync::Arc;

use anyhow::Context;

use crate::analysis::{FoodAnalyzer, GeminiClient};
use crate::config::AppConfig;
use crate::sheets::{SheetLogger, SheetsClient};
use crate::telegram::{TelegramApi, TelegramClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub telegram: Arc<dyn TelegramApi>,
    /// Unset when no analysis key is configured.
    pub analyzer: Option<Arc<dyn FoodAnalyzer>>,
    /// Unset when no spreadsheet is configured.
    pub sheets: Option<Arc<dyn SheetLogger>>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let http = reqwest::Client::builder()
            .user_agent(concat!("nutribot/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;

        let telegram = TelegramClient::new(http.clone(), &config.telegram);
        if let Some(url) = config.telegram.webhook_url.as_deref() {
            if let Err(e) = telegram.set_webhook(url).await {
                tracing::warn!(error = %format!("{e:#}"), %url, "setWebhook failed; continuing");
            }
        }

        let analyzer = config
            .gemini
            .as_ref()
            .map(|g| Arc::new(GeminiClient::new(http.clone(), g)) as Arc<dyn FoodAnalyzer>);
        if analyzer.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; photos will be acknowledged without analysis");
        }

        let sheets = match config.sheets.as_ref() {
            Some(s) => Some(Arc::new(
                SheetsClient::new(http.clone(), s).context("configure sheets client")?,
            ) as Arc<dyn SheetLogger>),
            None => None,
        };

        Ok(Self::from_parts(
            config,
            Arc::new(telegram) as Arc<dyn TelegramApi>,
            analyzer,
            sheets,
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        telegram: Arc<dyn TelegramApi>,
        analyzer: Option<Arc<dyn FoodAnalyzer>>,
        sheets: Option<Arc<dyn SheetLogger>>,
    ) -> Self {
        Self {
            config,
            telegram,
            analyzer,
            sheets,
        }
    }
}
