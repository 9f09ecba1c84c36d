use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const FALLBACK_DESCRIPTION: &str =
    "Maaf, aku belum bisa mengenali makanan di foto ini. Coba kirim foto yang lebih jelas ya 🙏";

/// Canonical nutrition record. The model is prompted with Indonesian keys;
/// English keys are accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    #[serde(alias = "deskripsi")]
    pub description: String,
    #[serde(alias = "kalori", default, deserialize_with = "lenient_number")]
    pub calories: f64,
    #[serde(
        alias = "karbo",
        alias = "karbohidrat",
        alias = "carbs",
        alias = "carbohydrates",
        default,
        deserialize_with = "lenient_number"
    )]
    pub carbs_g: f64,
    #[serde(alias = "protein", default, deserialize_with = "lenient_number")]
    pub protein_g: f64,
    #[serde(alias = "lemak", alias = "fat", default, deserialize_with = "lenient_number")]
    pub fat_g: f64,
}

impl NutritionEstimate {
    pub fn fallback() -> Self {
        Self {
            description: FALLBACK_DESCRIPTION.to_string(),
            calories: 0.0,
            carbs_g: 0.0,
            protein_g: 0.0,
            fat_g: 0.0,
        }
    }

    /// Chat rendering: description followed by the macro breakdown.
    pub fn summary(&self) -> String {
        format!(
            "{}\n\n🔥 Kalori: {} kkal\n🍚 Karbohidrat: {} g\n🍗 Protein: {} g\n🥑 Lemak: {} g",
            self.description.trim(),
            fmt_amount(self.calories),
            fmt_amount(self.carbs_g),
            fmt_amount(self.protein_g),
            fmt_amount(self.fat_g),
        )
    }
}

/// Result of decoding the model's text: either the record or the fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Parsed(NutritionEstimate),
    Fallback,
}

impl AnalysisOutcome {
    /// Never fails: anything that is not the expected JSON object is `Fallback`.
    pub fn parse(raw: &str) -> Self {
        let body = strip_code_fence(raw);
        if body.is_empty() {
            return Self::Fallback;
        }
        match serde_json::from_str::<NutritionEstimate>(body) {
            Ok(estimate) if estimate.description.trim().is_empty() => {
                tracing::warn!("analysis JSON has an empty description");
                Self::Fallback
            }
            Ok(estimate) => Self::Parsed(estimate),
            Err(e) => {
                tracing::warn!(error = %e, len = raw.len(), "analysis text is not valid JSON");
                Self::Fallback
            }
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn estimate(&self) -> NutritionEstimate {
        match self {
            Self::Parsed(e) => e.clone(),
            Self::Fallback => NutritionEstimate::fallback(),
        }
    }

    pub fn reply_text(&self) -> String {
        match self {
            Self::Parsed(e) => e.summary(),
            Self::Fallback => FALLBACK_DESCRIPTION.to_string(),
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    lazy_static! {
        static ref FENCE_RE: Regex = Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").unwrap();
    }
    let trimmed = raw.trim();
    match FENCE_RE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(number_from_value).unwrap_or(0.0))
}

fn number_from_value(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s),
        _ => 0.0,
    };
    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}

// "450 kkal", "12,5 g", "300-400" -> first number.
fn leading_number(s: &str) -> f64 {
    lazy_static! {
        static ref NUM_RE: Regex = Regex::new(r"-?\d+(?:[.,]\d+)?").unwrap();
    }
    NUM_RE
        .find(s)
        .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn fmt_amount(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod analysis_dto_tests {
    use super::*;

    #[test]
    fn parses_indonesian_keys() {
        let out = AnalysisOutcome::parse(
            r#"{"deskripsi":"X","kalori":500,"karbo":60,"protein":20,"lemak":15}"#,
        );
        assert_eq!(
            out,
            AnalysisOutcome::Parsed(NutritionEstimate {
                description: "X".into(),
                calories: 500.0,
                carbs_g: 60.0,
                protein_g: 20.0,
                fat_g: 15.0,
            })
        );
    }

    #[test]
    fn parses_english_keys() {
        let out = AnalysisOutcome::parse(
            r#"{"description":"Nasi goreng","calories":650,"carbs":80,"protein":18,"fat":25}"#,
        );
        let e = out.estimate();
        assert_eq!(e.description, "Nasi goreng");
        assert_eq!(e.calories, 650.0);
        assert_eq!(e.fat_g, 25.0);
    }

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n{\"deskripsi\":\"Sate\",\"kalori\":300,\"karbo\":10,\"protein\":25,\"lemak\":12}\n```";
        let out = AnalysisOutcome::parse(raw);
        assert!(out.is_parsed());
        assert_eq!(out.estimate().protein_g, 25.0);
    }

    #[test]
    fn strips_bare_code_fence() {
        let raw = "```\n{\"deskripsi\":\"Soto\"}\n```";
        assert_eq!(out_desc(raw), "Soto");
    }

    fn out_desc(raw: &str) -> String {
        AnalysisOutcome::parse(raw).estimate().description
    }

    #[test]
    fn prose_falls_back_to_zeroes() {
        let out = AnalysisOutcome::parse("Ini terlihat seperti nasi goreng, sekitar 600 kalori.");
        assert_eq!(out, AnalysisOutcome::Fallback);
        let e = out.estimate();
        assert_eq!(e.description, FALLBACK_DESCRIPTION);
        assert_eq!((e.calories, e.carbs_g, e.protein_g, e.fat_g), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn empty_text_falls_back() {
        assert_eq!(AnalysisOutcome::parse(""), AnalysisOutcome::Fallback);
        assert_eq!(AnalysisOutcome::parse("   \n "), AnalysisOutcome::Fallback);
        assert_eq!(AnalysisOutcome::parse("```json\n```"), AnalysisOutcome::Fallback);
    }

    #[test]
    fn missing_description_falls_back() {
        assert_eq!(
            AnalysisOutcome::parse(r#"{"kalori":500}"#),
            AnalysisOutcome::Fallback
        );
    }

    #[test]
    fn unparsable_numbers_become_zero() {
        let e = AnalysisOutcome::parse(
            r#"{"deskripsi":"Bakso","kalori":"450 kkal","karbo":"12,5 g","protein":null,"lemak":"banyak"}"#,
        )
        .estimate();
        assert_eq!(e.calories, 450.0);
        assert_eq!(e.carbs_g, 12.5);
        assert_eq!(e.protein_g, 0.0);
        assert_eq!(e.fat_g, 0.0);
    }

    #[test]
    fn missing_numbers_default_to_zero() {
        let e = AnalysisOutcome::parse(r#"{"deskripsi":"Teh manis"}"#).estimate();
        assert_eq!(e.description, "Teh manis");
        assert_eq!(e.calories, 0.0);
    }

    #[test]
    fn negative_numbers_are_clamped() {
        let e = AnalysisOutcome::parse(r#"{"deskripsi":"?","kalori":-5}"#).estimate();
        assert_eq!(e.calories, 0.0);
    }

    #[test]
    fn negative_number_strings_are_clamped_too() {
        let e = AnalysisOutcome::parse(
            r#"{"deskripsi":"?","kalori":"-5","karbo":"-12,5 g","protein":"7"}"#,
        )
        .estimate();
        assert_eq!(e.calories, 0.0);
        assert_eq!(e.carbs_g, 0.0);
        assert_eq!(e.protein_g, 7.0);
    }

    #[test]
    fn blank_description_falls_back() {
        assert_eq!(
            AnalysisOutcome::parse(r#"{"deskripsi":"","kalori":500}"#),
            AnalysisOutcome::Fallback
        );
        let out = AnalysisOutcome::parse(r#"{"deskripsi":"  \n ","kalori":500}"#);
        assert_eq!(out, AnalysisOutcome::Fallback);
        assert_eq!(out.reply_text(), FALLBACK_DESCRIPTION);
    }

    #[test]
    fn summary_renders_all_numbers() {
        let text = AnalysisOutcome::parse(
            r#"{"deskripsi":"X","kalori":500,"karbo":60,"protein":20.5,"lemak":15}"#,
        )
        .reply_text();
        assert!(text.starts_with("X\n\n"));
        assert!(text.contains("500 kkal"));
        assert!(text.contains("60 g"));
        assert!(text.contains("20.5 g"));
        assert!(text.contains("15 g"));
    }

    #[test]
    fn fallback_reply_is_apology_only() {
        assert_eq!(AnalysisOutcome::Fallback.reply_text(), FALLBACK_DESCRIPTION);
    }
}
