//! Release session data: the emotion and sensation catalogues, the four
//! guided steps, and the persisted `ReleaseRecord`.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Selection value that reveals the custom-emotion entry instead of toggling a tag.
pub const CUSTOM_EMOTION: &str = "custom";
/// Selection value that reveals the custom-sensation entry instead of selecting a tag.
pub const OTHER_SENSATION: &str = "other";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Emotion {
    #[serde(rename = "愤怒")]
    Anger,
    #[serde(rename = "悲伤")]
    Sadness,
    #[serde(rename = "恐惧")]
    Fear,
    #[serde(rename = "焦虑")]
    Anxiety,
    #[serde(rename = "内疚")]
    Guilt,
    #[serde(rename = "羞愧")]
    Shame,
    #[serde(rename = "嫉妒")]
    Jealousy,
    #[serde(rename = "失望")]
    Disappointment,
    #[serde(rename = "孤独")]
    Loneliness,
    #[serde(rename = "压力")]
    Stress,
}

impl Emotion {
    pub const ALL: [Emotion; 10] = [
        Emotion::Anger,
        Emotion::Sadness,
        Emotion::Fear,
        Emotion::Anxiety,
        Emotion::Guilt,
        Emotion::Shame,
        Emotion::Jealousy,
        Emotion::Disappointment,
        Emotion::Loneliness,
        Emotion::Stress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Anger => "愤怒",
            Emotion::Sadness => "悲伤",
            Emotion::Fear => "恐惧",
            Emotion::Anxiety => "焦虑",
            Emotion::Guilt => "内疚",
            Emotion::Shame => "羞愧",
            Emotion::Jealousy => "嫉妒",
            Emotion::Disappointment => "失望",
            Emotion::Loneliness => "孤独",
            Emotion::Stress => "压力",
        }
    }
}

impl FromStr for Emotion {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.as_str() == value)
            .ok_or_else(|| anyhow!("unknown emotion tag '{value}'"))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sensation {
    #[serde(rename = "胸闷")]
    ChestTightness,
    #[serde(rename = "喉咙发紧")]
    ThroatTightness,
    #[serde(rename = "胃部不适")]
    StomachUpset,
    #[serde(rename = "头痛")]
    Headache,
    #[serde(rename = "肩颈紧张")]
    ShoulderTension,
    #[serde(rename = "心跳加速")]
    RacingHeart,
    #[serde(rename = "呼吸急促")]
    ShortBreath,
    #[serde(rename = "身体发热")]
    Flushing,
}

impl Sensation {
    pub const ALL: [Sensation; 8] = [
        Sensation::ChestTightness,
        Sensation::ThroatTightness,
        Sensation::StomachUpset,
        Sensation::Headache,
        Sensation::ShoulderTension,
        Sensation::RacingHeart,
        Sensation::ShortBreath,
        Sensation::Flushing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensation::ChestTightness => "胸闷",
            Sensation::ThroatTightness => "喉咙发紧",
            Sensation::StomachUpset => "胃部不适",
            Sensation::Headache => "头痛",
            Sensation::ShoulderTension => "肩颈紧张",
            Sensation::RacingHeart => "心跳加速",
            Sensation::ShortBreath => "呼吸急促",
            Sensation::Flushing => "身体发热",
        }
    }
}

impl FromStr for Sensation {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Sensation::ALL
            .into_iter()
            .find(|sensation| sensation.as_str() == value)
            .ok_or_else(|| anyhow!("unknown sensation tag '{value}'"))
    }
}

/// What the user clicked on the emotion grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EmotionChoice {
    Tag(Emotion),
    Custom,
}

impl FromStr for EmotionChoice {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        if value == CUSTOM_EMOTION {
            Ok(EmotionChoice::Custom)
        } else {
            value.parse().map(EmotionChoice::Tag)
        }
    }
}

/// What the user clicked on the body-sensation list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SensationChoice {
    Tag(Sensation),
    Other,
}

impl FromStr for SensationChoice {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        if value == OTHER_SENSATION {
            Ok(SensationChoice::Other)
        } else {
            value.parse().map(SensationChoice::Tag)
        }
    }
}

/// The four guided questions, in the order they are asked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseStep {
    Acceptance,
    Possibility,
    Willingness,
    Action,
}

impl ReleaseStep {
    pub const ALL: [ReleaseStep; 4] = [
        ReleaseStep::Acceptance,
        ReleaseStep::Possibility,
        ReleaseStep::Willingness,
        ReleaseStep::Action,
    ];

    /// 1-based position, as stored in `StepResponse::step`.
    pub fn number(&self) -> u8 {
        match self {
            ReleaseStep::Acceptance => 1,
            ReleaseStep::Possibility => 2,
            ReleaseStep::Willingness => 3,
            ReleaseStep::Action => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReleaseStep::Acceptance => "接纳",
            ReleaseStep::Possibility => "可能性",
            ReleaseStep::Willingness => "意愿",
            ReleaseStep::Action => "行动",
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            ReleaseStep::Acceptance => "你能允许自己去感受这份情绪吗？",
            ReleaseStep::Possibility => "你能放下这份情绪吗？",
            ReleaseStep::Willingness => "你愿意放下它吗？",
            ReleaseStep::Action => "什么时候？现在就放下，好吗？",
        }
    }

    pub fn next(&self) -> Option<ReleaseStep> {
        match self {
            ReleaseStep::Acceptance => Some(ReleaseStep::Possibility),
            ReleaseStep::Possibility => Some(ReleaseStep::Willingness),
            ReleaseStep::Willingness => Some(ReleaseStep::Action),
            ReleaseStep::Action => None,
        }
    }

    pub fn from_number(number: u8) -> Option<ReleaseStep> {
        ReleaseStep::ALL
            .into_iter()
            .find(|step| step.number() == number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepResponse {
    pub step: u8,
    pub response: String,
}

/// An in-progress session, built up step by step before it has an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDraft {
    pub date: DateTime<Utc>,
    pub emotions: Vec<Emotion>,
    pub custom_emotion: String,
    pub sensations: Vec<String>,
    pub custom_sensation: String,
    pub responses: Vec<StepResponse>,
    pub notes: String,
}

impl ReleaseDraft {
    pub fn into_record(self, id: i64, saved_at: DateTime<Utc>) -> ReleaseRecord {
        ReleaseRecord {
            id,
            date: self.date,
            emotions: self.emotions,
            custom_emotion: self.custom_emotion,
            sensations: self.sensations,
            custom_sensation: self.custom_sensation,
            responses: self.responses,
            notes: self.notes,
            timestamp: saved_at,
        }
    }
}

/// A saved release session. Append-only once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub emotions: Vec<Emotion>,
    #[serde(default)]
    pub custom_emotion: String,
    pub sensations: Vec<String>,
    #[serde(default)]
    pub custom_sensation: String,
    pub responses: Vec<StepResponse>,
    #[serde(default)]
    pub notes: String,
    /// When the record was saved.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_from_ui_values() {
        assert_eq!(
            "愤怒".parse::<EmotionChoice>().unwrap(),
            EmotionChoice::Tag(Emotion::Anger)
        );
        assert_eq!("custom".parse::<EmotionChoice>().unwrap(), EmotionChoice::Custom);
        assert_eq!("other".parse::<SensationChoice>().unwrap(), SensationChoice::Other);
        assert!("开心".parse::<EmotionChoice>().is_err());
    }

    #[test]
    fn emotion_tags_serialize_as_display_names() {
        let json = serde_json::to_string(&vec![Emotion::Anger, Emotion::Stress]).unwrap();
        assert_eq!(json, r#"["愤怒","压力"]"#);
    }

    #[test]
    fn steps_walk_in_fixed_order() {
        let labels: Vec<_> = ReleaseStep::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels, ["接纳", "可能性", "意愿", "行动"]);
        assert_eq!(ReleaseStep::from_number(3), Some(ReleaseStep::Willingness));
        assert_eq!(ReleaseStep::Action.next(), None);
    }
}
