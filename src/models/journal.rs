use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::release::{ReleaseRecord, ReleaseStep, CUSTOM_EMOTION};

pub const JOURNAL_ID_SUFFIX: &str = "_journal";
const EMPTY_CONTENT: &str = "完成了一次情绪释放练习";

/// Readable summary of one saved release, shown on the journal page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: String,
    pub date: NaiveDate,
    pub emotions: Vec<String>,
    pub content: String,
}

impl From<&ReleaseRecord> for JournalEntry {
    fn from(record: &ReleaseRecord) -> Self {
        let mut emotions: Vec<String> = record
            .emotions
            .iter()
            .map(|emotion| emotion.as_str().to_string())
            .collect();
        if !record.custom_emotion.is_empty() {
            emotions.push(CUSTOM_EMOTION.to_string());
        }

        Self {
            id: format!("{}{}", record.id, JOURNAL_ID_SUFFIX),
            date: record.date.date_naive(),
            emotions,
            content: journal_content(record),
        }
    }
}

fn journal_content(record: &ReleaseRecord) -> String {
    let mut content = String::new();

    if !record.sensations.is_empty() {
        content.push_str(&format!("身体感受：{}\n\n", record.sensations.join(", ")));
    }

    if !record.responses.is_empty() {
        content.push_str("释放过程：\n");
        for (index, response) in record.responses.iter().enumerate() {
            let label = ReleaseStep::ALL
                .get(index)
                .map(ReleaseStep::label)
                .unwrap_or_default();
            content.push_str(&format!("{}. {}：{}\n", index + 1, label, response.response));
        }
        content.push('\n');
    }

    if !record.notes.is_empty() {
        content.push_str(&format!("释放感悟：{}", record.notes));
    }

    let trimmed = content.trim();
    if trimmed.is_empty() {
        EMPTY_CONTENT.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Emotion, StepResponse};
    use chrono::{DateTime, Utc};

    fn record() -> ReleaseRecord {
        let date: DateTime<Utc> = "2026-03-14T23:30:00Z".parse().unwrap();
        ReleaseRecord {
            id: 1_773_531_000_000,
            date,
            emotions: vec![Emotion::Anger],
            custom_emotion: String::new(),
            sensations: vec!["胸闷".into()],
            custom_sensation: String::new(),
            responses: ["是", "也许", "愿意", "好"]
                .iter()
                .enumerate()
                .map(|(i, text)| StepResponse {
                    step: i as u8 + 1,
                    response: text.to_string(),
                })
                .collect(),
            notes: "感觉轻松了".into(),
            timestamp: date,
        }
    }

    #[test]
    fn content_lists_sensations_steps_and_notes() {
        let entry = JournalEntry::from(&record());

        assert_eq!(entry.id, "1773531000000_journal");
        assert_eq!(entry.date.to_string(), "2026-03-14");
        assert_eq!(entry.emotions, vec!["愤怒".to_string()]);
        assert_eq!(
            entry.content,
            "身体感受：胸闷\n\n释放过程：\n1. 接纳：是\n2. 可能性：也许\n3. 意愿：愿意\n4. 行动：好\n\n释放感悟：感觉轻松了"
        );
    }

    #[test]
    fn custom_emotion_folds_in_custom_tag() {
        let mut source = record();
        source.custom_emotion = "委屈".into();

        let entry = JournalEntry::from(&source);
        assert_eq!(entry.emotions, vec!["愤怒".to_string(), "custom".to_string()]);

        source.custom_emotion = " ".into();
        assert_eq!(JournalEntry::from(&source).emotions.len(), 2);

        source.custom_emotion.clear();
        assert_eq!(JournalEntry::from(&source).emotions.len(), 1);
    }

    #[test]
    fn empty_session_gets_default_sentence() {
        let mut source = record();
        source.sensations.clear();
        source.responses.clear();
        source.notes.clear();

        assert_eq!(JournalEntry::from(&source).content, "完成了一次情绪释放练习");
    }

    #[test]
    fn date_serializes_as_calendar_day() {
        let json = serde_json::to_value(JournalEntry::from(&record())).unwrap();
        assert_eq!(json["date"], "2026-03-14");
    }
}
