// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routine items: the practices a user checks off during the day.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Error returned when a wire value is not part of a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Symbol shown next to a routine item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RoutineIcon {
    Rosary,
    Book,
    Cross,
    Candle,
    Sun,
    Heart,
    Shield,
    Moon,
    Church,
    Music,
}

impl RoutineIcon {
    pub const ALL: [RoutineIcon; 10] = [
        RoutineIcon::Rosary,
        RoutineIcon::Book,
        RoutineIcon::Cross,
        RoutineIcon::Candle,
        RoutineIcon::Sun,
        RoutineIcon::Heart,
        RoutineIcon::Shield,
        RoutineIcon::Moon,
        RoutineIcon::Church,
        RoutineIcon::Music,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoutineIcon::Rosary => "rosary",
            RoutineIcon::Book => "book",
            RoutineIcon::Cross => "cross",
            RoutineIcon::Candle => "candle",
            RoutineIcon::Sun => "sun",
            RoutineIcon::Heart => "heart",
            RoutineIcon::Shield => "shield",
            RoutineIcon::Moon => "moon",
            RoutineIcon::Church => "church",
            RoutineIcon::Music => "music",
        }
    }
}

impl FromStr for RoutineIcon {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        RoutineIcon::ALL
            .into_iter()
            .find(|icon| icon.as_str() == wanted)
            .ok_or_else(|| UnknownVariant {
                kind: "icon",
                value: s.to_string(),
            })
    }
}

/// Part of the day a practice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Night,
    Any,
}

impl TimeOfDay {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Night => "night",
            TimeOfDay::Any => "any",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "night" => Ok(TimeOfDay::Night),
            "any" => Ok(TimeOfDay::Any),
            _ => Err(UnknownVariant {
                kind: "timeOfDay",
                value: s.to_string(),
            }),
        }
    }
}

/// In-app shortcut attached to a practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActionLink {
    #[default]
    None,
    ReadLiturgy,
    OpenMap,
}

impl ActionLink {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionLink::None => "NONE",
            ActionLink::ReadLiturgy => "READ_LITURGY",
            ActionLink::OpenMap => "OPEN_MAP",
        }
    }
}

impl FromStr for ActionLink {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" | "" => Ok(ActionLink::None),
            "READ_LITURGY" => Ok(ActionLink::ReadLiturgy),
            "OPEN_MAP" => Ok(ActionLink::OpenMap),
            _ => Err(UnknownVariant {
                kind: "actionLink",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ActionLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single practice in a user's routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoutineItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub xp_reward: u32,
    pub completed: bool,
    pub icon: RoutineIcon,
    pub time_of_day: TimeOfDay,
    /// Days of week (0 = Sunday). Order and duplicates are irrelevant.
    pub day_of_week: BTreeSet<u8>,
    #[serde(default)]
    pub action_link: ActionLink,
}

/// A routine item as submitted by the user, before it gets an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewRoutineItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub xp_reward: u32,
    pub icon: RoutineIcon,
    pub time_of_day: TimeOfDay,
    #[serde(default = "every_day")]
    pub day_of_week: BTreeSet<u8>,
    #[serde(default)]
    pub action_link: ActionLink,
}

impl NewRoutineItem {
    /// Assign a fresh id and start uncompleted. Days outside 0..=6 are dropped.
    pub fn into_item(self) -> RoutineItem {
        RoutineItem {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            xp_reward: self.xp_reward.max(1),
            completed: false,
            icon: self.icon,
            time_of_day: self.time_of_day,
            day_of_week: self.day_of_week.into_iter().filter(|d| *d <= 6).collect(),
            action_link: self.action_link,
        }
    }
}

/// All seven days of the week.
pub fn every_day() -> BTreeSet<u8> {
    (0..=6).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_parsing_is_case_insensitive() {
        assert_eq!("  Sun".parse::<RoutineIcon>(), Ok(RoutineIcon::Sun));
        assert_eq!("ROSARY".parse::<RoutineIcon>(), Ok(RoutineIcon::Rosary));
        assert!("star".parse::<RoutineIcon>().is_err());
    }

    #[test]
    fn test_action_link_wire_names() {
        assert_eq!("read_liturgy".parse::<ActionLink>(), Ok(ActionLink::ReadLiturgy));
        assert_eq!("".parse::<ActionLink>(), Ok(ActionLink::None));
        assert_eq!(
            serde_json::to_value(ActionLink::OpenMap).unwrap(),
            serde_json::json!("OPEN_MAP")
        );
    }

    #[test]
    fn test_day_of_week_is_a_set() {
        let item: RoutineItem = serde_json::from_value(serde_json::json!({
            "id": "a",
            "title": "Terço",
            "description": "",
            "xpReward": 10,
            "completed": false,
            "icon": "rosary",
            "timeOfDay": "night",
            "dayOfWeek": [3, 1, 3, 0]
        }))
        .unwrap();

        assert_eq!(item.day_of_week.into_iter().collect::<Vec<_>>(), vec![0, 1, 3]);
        assert_eq!(item.action_link, ActionLink::None);
    }

    #[test]
    fn test_new_item_gets_fresh_id() {
        let new = NewRoutineItem {
            title: " Angelus ".to_string(),
            description: String::new(),
            xp_reward: 0,
            icon: RoutineIcon::Church,
            time_of_day: TimeOfDay::Afternoon,
            day_of_week: [0, 9].into_iter().collect(),
            action_link: ActionLink::None,
        };
        let a = new.clone().into_item();
        let b = new.into_item();

        assert_ne!(a.id, b.id);
        assert_eq!(a.title, "Angelus");
        assert_eq!(a.xp_reward, 1);
        assert!(!a.completed);
        assert_eq!(a.day_of_week.into_iter().collect::<Vec<_>>(), vec![0]);
    }
}
