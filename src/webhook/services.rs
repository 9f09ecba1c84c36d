use anyhow::Context;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::analysis::{AnalysisOutcome, FoodAnalyzer};
use crate::images::ImagePayload;
use crate::sheets::LogRow;
use crate::state::AppState;
use crate::telegram::dto::{ImageRef, Message, Update};
use crate::telegram::TelegramApi;

pub const MSG_WELCOME: &str =
    "Halo! Kirimkan saya foto makanan, saya akan mencoba mengestimasi kalorinya.";
pub const MSG_ASK_INPUT: &str = "Kirim teks atau foto ya 🙏";
pub const MSG_LOOKUP_FAILED: &str = "Gagal ambil file dari Telegram 😕";
pub const MSG_ANALYZING: &str = "Sedang menganalisis foto, mohon tunggu...";
pub const MSG_PROCESSING_FAILED: &str = "Maaf, terjadi kesalahan saat memproses gambar.";

/// What an incoming message asks of the bot, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Photo(ImageRef),
    Start,
    Text(String),
    Other,
}

pub fn classify(msg: &Message) -> Intent {
    if let Some(image) = msg.image() {
        return Intent::Photo(image);
    }
    match msg.text() {
        Some(t) if is_start_command(t) => Intent::Start,
        Some(t) => Intent::Text(t.to_string()),
        None => Intent::Other,
    }
}

// Matches "/start", "/start payload" and "/start@SomeBot".
fn is_start_command(text: &str) -> bool {
    let cmd = text.split_whitespace().next().unwrap_or_default();
    cmd == "/start" || cmd.starts_with("/start@")
}

/// Body the webhook answers Telegram with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    NoMessage,
    Handled,
}

impl Ack {
    pub fn body(self) -> &'static str {
        match self {
            Ack::NoMessage => "no message",
            Ack::Handled => "ok",
        }
    }
}

pub async fn handle_update(state: &AppState, update: Update) -> Ack {
    let Some(msg) = update.message else {
        return Ack::NoMessage;
    };
    handle_message(state, &msg).await;
    Ack::Handled
}

#[instrument(skip(state, msg), fields(chat_id = msg.chat.id))]
async fn handle_message(state: &AppState, msg: &Message) {
    let chat_id = msg.chat.id;
    match classify(msg) {
        Intent::Photo(image) => handle_photo(state, msg, image).await,
        Intent::Start => reply(state, chat_id, MSG_WELCOME).await,
        Intent::Text(text) if state.config.telegram.echo_text => {
            reply(state, chat_id, &format!("Kamu nulis: {text}")).await
        }
        Intent::Text(_) => reply(state, chat_id, MSG_WELCOME).await,
        Intent::Other => reply(state, chat_id, MSG_ASK_INPUT).await,
    }
}

/// Send failures are logged and swallowed; the webhook still acknowledges.
async fn reply(state: &AppState, chat_id: i64, text: &str) {
    if let Err(e) = state.telegram.send_message(chat_id, text).await {
        error!(error = %format!("{e:#}"), %chat_id, "sendMessage failed");
    }
}

#[instrument(skip(state, msg, image), fields(file_id = %image.file_id))]
async fn handle_photo(state: &AppState, msg: &Message, image: ImageRef) {
    let chat_id = msg.chat.id;

    let file_path = match state.telegram.get_file(&image.file_id).await {
        Ok(lookup) => match lookup.file_path() {
            Some(path) => path.to_string(),
            None => {
                warn!(description = ?lookup.description, "getFile returned no file");
                reply(state, chat_id, MSG_LOOKUP_FAILED).await;
                return;
            }
        },
        Err(e) => {
            error!(error = %format!("{e:#}"), "getFile failed");
            reply(state, chat_id, MSG_LOOKUP_FAILED).await;
            return;
        }
    };
    let file_url = state.telegram.file_url(&file_path);

    let Some(analyzer) = state.analyzer.as_deref() else {
        reply(state, chat_id, &format!("✅ Foto diterima!\n{file_url}")).await;
        return;
    };

    reply(state, chat_id, MSG_ANALYZING).await;

    let outcome =
        match analyze_photo(state.telegram.as_ref(), analyzer, &image, &file_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %format!("{e:#}"), "photo analysis failed");
                reply(state, chat_id, MSG_PROCESSING_FAILED).await;
                return;
            }
        };
    info!(parsed = outcome.is_parsed(), "photo analysed");

    reply(state, chat_id, &outcome.reply_text()).await;

    if let Some(sheets) = state.sheets.as_deref() {
        let row = LogRow {
            timestamp: OffsetDateTime::now_utc(),
            user_name: msg.from.as_ref().map(|u| u.display_name()).unwrap_or_default(),
            user_id: msg.from.as_ref().map(|u| u.id),
            file_url,
            estimate: outcome.estimate(),
        };
        if let Err(e) = sheets.append_row(&row).await {
            error!(error = %format!("{e:#}"), "log row append failed");
        }
    }
}

/// Download, call the analyzer, and decode. Only transport failures are errors;
/// undecodable model output becomes `AnalysisOutcome::Fallback`.
pub async fn analyze_photo(
    telegram: &dyn TelegramApi,
    analyzer: &dyn FoodAnalyzer,
    image: &ImageRef,
    file_path: &str,
) -> anyhow::Result<AnalysisOutcome> {
    let data = telegram
        .download_file(file_path)
        .await
        .with_context(|| format!("download {file_path}"))?;
    let payload = ImagePayload::new(data, image.mime_type.as_deref(), file_path);
    let text = analyzer.analyze(&payload).await.context("analyze photo")?;
    Ok(AnalysisOutcome::parse(&text))
}

#[cfg(test)]
mod services_tests {
    use super::*;
    use crate::state::fakes::{FakeAnalyzer, FakeTelegram};
    use serde_json::json;

    fn message(v: serde_json::Value) -> Message {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn photo_has_priority_over_text() {
        let m = message(json!({
            "chat": {"id": 1},
            "text": "halo",
            "photo": [{"file_id": "a"}, {"file_id": "b"}]
        }));
        assert_eq!(
            classify(&m),
            Intent::Photo(ImageRef {
                file_id: "b".into(),
                mime_type: None
            })
        );
    }

    #[test]
    fn start_command_variants() {
        for text in ["/start", "/start ref123", "/start@KaloriBot"] {
            let m = message(json!({"chat": {"id": 1}, "text": text}));
            assert_eq!(classify(&m), Intent::Start, "{text}");
        }
        let m = message(json!({"chat": {"id": 1}, "text": "/started"}));
        assert_eq!(classify(&m), Intent::Text("/started".into()));
    }

    #[test]
    fn plain_text_is_text() {
        let m = message(json!({"chat": {"id": 1}, "text": "  nasi goreng  "}));
        assert_eq!(classify(&m), Intent::Text("nasi goreng".into()));
    }

    #[test]
    fn blank_text_and_stickers_are_other() {
        let m = message(json!({"chat": {"id": 1}, "text": "   "}));
        assert_eq!(classify(&m), Intent::Other);
        let m = message(json!({"chat": {"id": 1}, "sticker": {"file_id": "s"}}));
        assert_eq!(classify(&m), Intent::Other);
        let m = message(json!({
            "chat": {"id": 1},
            "document": {"file_id": "d", "mime_type": "application/zip"}
        }));
        assert_eq!(classify(&m), Intent::Other);
    }

    #[tokio::test]
    async fn analysis_error_chain_keeps_root_cause() {
        let tg = FakeTelegram {
            fail_download: true,
            ..FakeTelegram::with_file("photos/b.jpg")
        };
        let analyzer = FakeAnalyzer::replying("{}");
        let image = ImageRef {
            file_id: "b".into(),
            mime_type: None,
        };
        let err = analyze_photo(&tg, &analyzer, &image, "photos/b.jpg")
            .await
            .unwrap_err();
        assert_eq!(format!("{err:#}"), "download photos/b.jpg: 404 Not Found");
        assert_eq!(err.to_string(), "download photos/b.jpg");
    }

    #[test]
    fn ack_bodies() {
        assert_eq!(Ack::NoMessage.body(), "no message");
        assert_eq!(Ack::Handled.body(), "ok");
    }
}
