use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
}

impl Prompt {
    pub fn new(id: i64, title: String, content: String, tags: Vec<String>) -> Self {
        Prompt {
            id,
            title,
            content,
            tags,
            created_at: iso_timestamp(Utc::now()),
        }
    }

    /// Whether a stored or imported record still satisfies the creation rules.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }
}

/// Raw form input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptDraft {
    pub title: String,
    pub content: String,
    pub tags: String,
}

impl PromptDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        tags: impl Into<String>,
    ) -> Self {
        PromptDraft {
            title: title.into(),
            content: content.into(),
            tags: tags.into(),
        }
    }

    /// Trims the fields and splits the tag list. Title and content must be
    /// non-empty once trimmed.
    pub fn validate(&self) -> Result<(String, String, Vec<String>), ValidationError> {
        let title = self.title.trim();
        let content = self.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(ValidationError::MissingField);
        }
        Ok((title.to_string(), content.to_string(), parse_tags(&self.tags)))
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.content.clear();
        self.tags.clear();
    }
}

/// Splits on ASCII or ideographic commas, dropping blank pieces.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split([',', '、'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Millisecond-epoch ids that stay strictly increasing even when the clock
/// does not advance between calls.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn seeded(existing: &[Prompt]) -> Self {
        IdGenerator {
            last: existing.iter().map(|p| p.id).max().unwrap_or(0),
        }
    }

    /// `None` once the id space is used up, e.g. after a backup brought in
    /// `i64::MAX`.
    pub fn next_id(&mut self) -> Option<i64> {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Records an id issued elsewhere, e.g. one restored from a backup.
    pub fn observe(&mut self, id: i64) {
        self.last = self.last.max(id);
    }

    fn next_at(&mut self, now_millis: i64) -> Option<i64> {
        let id = now_millis.max(self.last.checked_add(1)?);
        self.last = id;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_tags_mixed_separators() {
        assert_eq!(parse_tags("a, b、c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_tags_drops_blank_pieces() {
        assert_eq!(parse_tags(" ,writing,, 、 code ,"), vec!["writing", "code"]);
        assert!(parse_tags("   ").is_empty());
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_draft_requires_title_and_content() {
        let draft = PromptDraft::new("   ", "body", "");
        assert_eq!(draft.validate(), Err(ValidationError::MissingField));

        let draft = PromptDraft::new("title", "\n\t", "");
        assert_eq!(draft.validate(), Err(ValidationError::MissingField));
    }

    #[test]
    fn test_draft_trims_fields() {
        let draft = PromptDraft::new("  Summary ", " Summarize this.\n", "work");
        let (title, content, tags) = draft.validate().unwrap();
        assert_eq!(title, "Summary");
        assert_eq!(content, "Summarize this.");
        assert_eq!(tags, vec!["work"]);
    }

    #[test]
    fn test_ids_increase_within_same_millisecond() {
        let mut ids = IdGenerator::seeded(&[]);
        let a = ids.next_at(1_700_000_000_000).unwrap();
        let b = ids.next_at(1_700_000_000_000).unwrap();
        let c = ids.next_at(1_699_999_999_999).unwrap();
        assert_eq!(a, 1_700_000_000_000);
        assert_eq!(b, a + 1);
        assert_eq!(c, b + 1);
    }

    #[test]
    fn test_ids_seeded_past_existing() {
        let existing = Prompt::new(5_000, "t".into(), "c".into(), vec![]);
        let mut ids = IdGenerator::seeded(&[existing]);
        assert_eq!(ids.next_at(10), Some(5_001));
        assert_eq!(ids.next_at(9_000), Some(9_000));
    }

    #[test]
    fn test_ids_exhausted_at_max() {
        let mut ids = IdGenerator::seeded(&[]);
        ids.observe(i64::MAX);
        assert_eq!(ids.next_at(1_700_000_000_000), None);
        assert_eq!(ids.next_at(i64::MAX), None);
    }

    #[test]
    fn test_iso_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_serialized_field_names() {
        let prompt = Prompt {
            id: 1,
            title: "T".into(),
            content: "C".into(),
            tags: vec!["x".into()],
            created_at: "2024-05-01T09:30:00.000Z".into(),
        };
        let json = serde_json::to_string(&prompt).unwrap();
        assert_eq!(
            json,
            r#"{"id":1,"title":"T","content":"C","tags":["x"],"createdAt":"2024-05-01T09:30:00.000Z"}"#
        );
    }
}
