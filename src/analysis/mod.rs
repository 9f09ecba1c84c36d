pub mod dto;
pub mod gemini;

pub use dto::{AnalysisOutcome, NutritionEstimate};
pub use gemini::{FoodAnalyzer, GeminiClient};
