use serde::{Deserialize, Serialize};

/// One webhook delivery. Only the parts the bot reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: Option<i64>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    /// Resolution variants, smallest first.
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().filter(|l| !l.is_empty()) {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub mime_type: Option<String>,
}

impl Document {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("image/"))
    }
}

/// The image picked out of a message for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub file_id: String,
    /// Declared type for documents; native photos carry none.
    pub mime_type: Option<String>,
}

impl Message {
    /// Largest photo variant, else an image-typed document.
    pub fn image(&self) -> Option<ImageRef> {
        if let Some(largest) = self.photo.last() {
            return Some(ImageRef {
                file_id: largest.file_id.clone(),
                mime_type: None,
            });
        }
        self.document
            .as_ref()
            .filter(|d| d.is_image())
            .map(|d| ImageRef {
                file_id: d.file_id.clone(),
                mime_type: d.mime_type.clone(),
            })
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// Envelope every Bot API method answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramFile {
    pub file_path: Option<String>,
}

pub type FileLookup = ApiResponse<TelegramFile>;

impl FileLookup {
    /// Downloadable path, present only when the lookup succeeded.
    pub fn file_path(&self) -> Option<&str> {
        if !self.ok {
            return None;
        }
        self.result
            .as_ref()
            .and_then(|f| f.file_path.as_deref())
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SetWebhookRequest<'a> {
    pub url: &'a str,
}
