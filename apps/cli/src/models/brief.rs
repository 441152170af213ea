//! `CompanyBrief` — structured output of the company-research stage.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One news item surfaced by research. The date is whatever the reasoning
/// call could pin down; anything that is not a clean `YYYY-MM-DD` becomes
/// `None` rather than failing the whole brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    pub source_url: String,
}

/// Company context for tailoring. May be partially empty when search found
/// little — never null; downstream stages tolerate an empty brief.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyBrief {
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub tech_stack: BTreeSet<String>,
    #[serde(default)]
    pub culture_notes: Vec<String>,
    #[serde(default)]
    pub recent_news: Vec<NewsItem>,
}

impl CompanyBrief {
    pub fn is_empty(&self) -> bool {
        self.mission.is_empty()
            && self.tech_stack.is_empty()
            && self.culture_notes.is_empty()
            && self.recent_news.is_empty()
    }
}

/// Accepts `"2025-11-03"`, `null`, a missing field, or junk ("2025", "last
/// spring") — junk maps to `None` instead of poisoning deserialization.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_deserializes_full_shape() {
        let json = r#"{
            "mission": "Make shipping boring.",
            "tech_stack": ["Rust", "Postgres", "Kubernetes"],
            "culture_notes": ["Small teams own services end to end"],
            "recent_news": [
                {"headline": "Acme raises Series B", "date": "2026-03-12", "source_url": "https://news.example.com/a"},
                {"headline": "Acme opens Berlin office", "date": null, "source_url": "https://news.example.com/b"}
            ]
        }"#;
        let brief: CompanyBrief = serde_json::from_str(json).unwrap();
        assert_eq!(brief.recent_news.len(), 2);
        assert_eq!(
            brief.recent_news[0].date,
            NaiveDate::from_ymd_opt(2026, 3, 12)
        );
        assert!(brief.recent_news[1].date.is_none());
    }

    #[test]
    fn test_junk_date_becomes_none() {
        let json = r#"{"headline": "h", "date": "early 2025", "source_url": "u"}"#;
        let item: NewsItem = serde_json::from_str(json).unwrap();
        assert!(item.date.is_none());
    }

    #[test]
    fn test_empty_object_is_valid_and_empty() {
        let brief: CompanyBrief = serde_json::from_str("{}").unwrap();
        assert!(brief.is_empty());
    }

    #[test]
    fn test_default_brief_is_empty() {
        assert!(CompanyBrief::default().is_empty());
    }
}
