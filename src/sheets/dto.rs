use serde::Serialize;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::analysis::NutritionEstimate;

/// One audit record for a processed photo.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub timestamp: OffsetDateTime,
    pub user_name: String,
    pub user_id: Option<i64>,
    pub file_url: String,
    pub estimate: NutritionEstimate,
}

impl LogRow {
    /// Column order: timestamp, name, user id, file URL, description,
    /// calories, carbs, protein, fat.
    pub fn values(&self) -> Vec<Value> {
        let timestamp = self
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string());
        vec![
            json!(timestamp),
            json!(self.user_name),
            self.user_id.map_or_else(|| json!(""), |id| json!(id.to_string())),
            json!(self.file_url),
            json!(self.estimate.description),
            json!(self.estimate.calories),
            json!(self.estimate.carbs_g),
            json!(self.estimate.protein_g),
            json!(self.estimate.fat_g),
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct ValueRange {
    pub values: Vec<Vec<Value>>,
}

impl From<&LogRow> for ValueRange {
    fn from(row: &LogRow) -> Self {
        Self {
            values: vec![row.values()],
        }
    }
}
