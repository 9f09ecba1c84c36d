use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::dto::{ApiResponse, FileLookup, SendMessageRequest, SetWebhookRequest};
use crate::config::TelegramConfig;

/// The Bot API calls the webhook makes.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// `getFile`. A reply with `ok: false` is returned as-is, not as an error.
    async fn get_file(&self, file_id: &str) -> anyhow::Result<FileLookup>;
    async fn download_file(&self, file_path: &str) -> anyhow::Result<Bytes>;
    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
    fn file_url(&self, file_path: &str) -> String;
}

#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    bot_token: String,
    api_base: String,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, cfg: &TelegramConfig) -> Self {
        Self {
            client,
            bot_token: cfg.bot_token.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Points Telegram at our endpoint. Startup only.
    pub async fn set_webhook(&self, url: &str) -> anyhow::Result<()> {
        let resp: ApiResponse<bool> = self
            .client
            .post(self.api_url("setWebhook"))
            .json(&SetWebhookRequest { url })
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("telegram setWebhook")?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("decode setWebhook response")?;
        if !resp.ok {
            anyhow::bail!(
                "setWebhook rejected: {}",
                resp.description.unwrap_or_default()
            );
        }
        info!(%url, "telegram webhook registered");
        Ok(())
    }
}

#[async_trait]
impl TelegramApi for TelegramClient {
    async fn get_file(&self, file_id: &str) -> anyhow::Result<FileLookup> {
        let lookup: FileLookup = self
            .client
            .get(self.api_url("getFile"))
            .query(&[("file_id", file_id)])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("telegram getFile")?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("decode getFile response")?;
        debug!(%file_id, ok = lookup.ok, "getFile");
        Ok(lookup)
    }

    async fn download_file(&self, file_path: &str) -> anyhow::Result<Bytes> {
        let resp = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("telegram file download")?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("telegram file download status")?;
        let body = resp
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .context("read telegram file body")?;
        debug!(%file_path, size = body.len(), "file downloaded");
        Ok(body)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("telegram sendMessage")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("sendMessage failed ({status}): {err}");
        }
        debug!(%chat_id, "message sent");
        Ok(())
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.bot_token, file_path)
    }
}
