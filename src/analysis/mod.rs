pub mod pipeline;
pub mod risk;
pub mod stages;

pub use pipeline::ContractAnalyzer;
pub use risk::{screen_keywords, KeywordRisk, RiskLevel};
pub use stages::contract_pipeline;
