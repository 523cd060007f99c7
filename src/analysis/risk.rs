use serde::Serialize;

/// Indicator keywords per risk category, matched case-insensitively as substrings.
const RISK_KEYWORDS: &[(&str, &[&str])] = &[
    ("financial", &["payment", "fee", "cost", "penalty", "compensation"]),
    ("operational", &["service", "performance", "availability", "uptime"]),
    ("security", &["data", "breach", "confidential", "secure", "encrypt"]),
    ("legal", &["liability", "indemnify", "warrant", "comply", "jurisdict"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_score(score: usize) -> Self {
        match score {
            0..=1 => RiskLevel::Low,
            2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordRisk {
    pub category: &'static str,
    pub level: RiskLevel,
    pub score: usize,
    pub keywords_found: Vec<&'static str>,
}

/// Deterministic keyword screen. Only categories with at least one hit are
/// returned, in fixed category order.
pub fn screen_keywords(text: &str) -> Vec<KeywordRisk> {
    let lowered = text.to_lowercase();

    RISK_KEYWORDS
        .iter()
        .filter_map(|&(category, keywords)| {
            let keywords_found: Vec<&'static str> = keywords
                .iter()
                .copied()
                .filter(|keyword| lowered.contains(*keyword))
                .collect();
            if keywords_found.is_empty() {
                return None;
            }

            Some(KeywordRisk {
                category,
                level: RiskLevel::from_score(keywords_found.len()),
                score: keywords_found.len(),
                keywords_found,
            })
        })
        .collect()
}
