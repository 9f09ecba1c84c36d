use anyhow::{anyhow, Context};
use axum::async_trait;
use tracing::info;

use super::auth::ServiceAccountKeys;
use super::dto::{LogRow, ValueRange};
use crate::config::SheetsConfig;

/// Destination for per-photo audit rows.
#[async_trait]
pub trait SheetLogger: Send + Sync {
    async fn append_row(&self, row: &LogRow) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    keys: ServiceAccountKeys,
    spreadsheet_id: String,
    range: String,
    api_base: String,
}

impl SheetsClient {
    pub fn new(client: reqwest::Client, cfg: &SheetsConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            keys: ServiceAccountKeys::from_service_account(&cfg.service_account)?,
            spreadsheet_id: cfg.spreadsheet_id.clone(),
            range: cfg.range.clone(),
            api_base: cfg.api_base.clone(),
        })
    }

    fn append_url(&self) -> anyhow::Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base).context("parse sheets api base")?;
        let append = format!("{}:append", self.range);
        url.path_segments_mut()
            .map_err(|_| anyhow!("sheets api base cannot carry a path"))?
            .pop_if_empty()
            .extend([
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                append.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }
}

#[async_trait]
impl SheetLogger for SheetsClient {
    async fn append_row(&self, row: &LogRow) -> anyhow::Result<()> {
        let token = self.keys.access_token(&self.client).await?;
        let resp = self
            .client
            .post(self.append_url()?)
            .bearer_auth(token)
            .json(&ValueRange::from(row))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("sheets values.append")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("values.append failed ({status}): {err}");
        }
        info!(spreadsheet_id = %self.spreadsheet_id, "log row appended");
        Ok(())
    }
}
