use crate::localized::{Language, LocalizedText};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

pub type ActivityId = i64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownCategory {
    pub kind: &'static str,
    pub value: String,
}

/// Generates `as_str`, `ALL`, `Display` and `FromStr` for a snake_case categorical enum.
macro_rules! categorical {
    ($name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownCategory;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($key => Ok($name::$variant),)+
                    other => Err(UnknownCategory {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSize {
    Individual,
    #[default]
    Small,
    Medium,
    Large,
}

categorical!(GroupSize {
    Individual => "individual",
    Small => "small",
    Medium => "medium",
    Large => "large",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Low,
    #[default]
    Medium,
    High,
}

categorical!(EffortLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Indoor,
    #[default]
    Outdoor,
    Mixed,
}

categorical!(Location {
    Indoor => "indoor",
    Outdoor => "outdoor",
    Mixed => "mixed",
});

/// Scout section the activity is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Cubs,
    #[default]
    Scouts,
    Explorers,
    Rovers,
}

categorical!(AgeGroup {
    Cubs => "cubs",
    Scouts => "scouts",
    Explorers => "explorers",
    Rovers => "rovers",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationalGoal {
    pub id: i64,
    pub title: LocalizedText,
}

impl EducationalGoal {
    pub fn new(id: i64, title: LocalizedText) -> Self {
        Self { id, title }
    }
}

/// Sustainable Development Goal tag (1..=17).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sdg {
    pub id: i64,
    pub title: LocalizedText,
}

impl Sdg {
    pub fn new(id: i64, title: LocalizedText) -> Self {
        Self { id, title }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: LocalizedText,
    #[serde(default)]
    pub description: LocalizedText,
    #[serde(default)]
    pub materials: LocalizedText,
    /// Approximate duration; activity entries inherit it at read time.
    pub duration_minutes: u32,
    #[serde(default)]
    pub group_size: GroupSize,
    #[serde(default)]
    pub effort_level: EffortLevel,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub age_group: AgeGroup,
    #[serde(default)]
    pub educational_goals: Vec<EducationalGoal>,
    #[serde(default)]
    pub sdgs: Vec<Sdg>,
}

impl Activity {
    /// New activity named in the fallback language, with default categorical attributes.
    pub fn new(id: ActivityId, name: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            id,
            name: LocalizedText::new().with(Language::FALLBACK, name),
            description: LocalizedText::new(),
            materials: LocalizedText::new(),
            duration_minutes,
            group_size: GroupSize::default(),
            effort_level: EffortLevel::default(),
            location: Location::default(),
            age_group: AgeGroup::default(),
            educational_goals: Vec::new(),
            sdgs: Vec::new(),
        }
    }

    pub fn localized(&self, language: Language) -> LocalizedActivity {
        LocalizedActivity {
            id: self.id,
            name: self.name.resolve(language).to_string(),
            description: self.description.resolve(language).to_string(),
            materials: self.materials.resolve(language).to_string(),
            duration_minutes: self.duration_minutes,
            group_size: self.group_size,
            effort_level: self.effort_level,
            location: self.location,
            age_group: self.age_group,
            educational_goals: self
                .educational_goals
                .iter()
                .map(|goal| LocalizedTag {
                    id: goal.id,
                    title: goal.title.resolve(language).to_string(),
                })
                .collect(),
            sdgs: self
                .sdgs
                .iter()
                .map(|sdg| LocalizedTag {
                    id: sdg.id,
                    title: sdg.title.resolve(language).to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedTag {
    pub id: i64,
    pub title: String,
}

/// An [`Activity`] with every multilingual field resolved to one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedActivity {
    pub id: ActivityId,
    pub name: String,
    pub description: String,
    pub materials: String,
    pub duration_minutes: u32,
    pub group_size: GroupSize,
    pub effort_level: EffortLevel,
    pub location: Location,
    pub age_group: AgeGroup,
    pub educational_goals: Vec<LocalizedTag>,
    pub sdgs: Vec<LocalizedTag>,
}

/// Read access to the activity catalogue.
pub trait ActivityLookup {
    fn get_activity(&self, id: ActivityId) -> Option<&Activity>;
}

impl<T: ActivityLookup + ?Sized> ActivityLookup for &T {
    fn get_activity(&self, id: ActivityId) -> Option<&Activity> {
        (**self).get_activity(id)
    }
}

impl ActivityLookup for HashMap<ActivityId, Activity> {
    fn get_activity(&self, id: ActivityId) -> Option<&Activity> {
        self.get(&id)
    }
}

impl ActivityLookup for BTreeMap<ActivityId, Activity> {
    fn get_activity(&self, id: ActivityId) -> Option<&Activity> {
        self.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_round_trips_through_str() {
        for size in GroupSize::ALL {
            assert_eq!(size.as_str().parse::<GroupSize>().unwrap(), *size);
        }
        assert_eq!("high".parse::<EffortLevel>().unwrap(), EffortLevel::High);
        let err = "huge".parse::<GroupSize>().unwrap_err();
        assert_eq!(
            err,
            UnknownCategory {
                kind: "GroupSize",
                value: "huge".to_string()
            }
        );
        assert_eq!(err.to_string(), "unknown GroupSize 'huge'");
    }

    #[test]
    fn localized_view_resolves_every_text_field() {
        let mut activity = Activity::new(7, "Peddy-paper", 60);
        activity.name.set(Language::En, "Treasure hunt");
        activity.description = LocalizedText::new().with(Language::Pt, "Percurso com pistas");
        activity.educational_goals = vec![EducationalGoal::new(
            3,
            LocalizedText::new()
                .with(Language::Pt, "Orientação")
                .with(Language::En, "Orienteering"),
        )];

        let view = activity.localized(Language::En);
        assert_eq!(view.name, "Treasure hunt");
        assert_eq!(view.description, "Percurso com pistas");
        assert_eq!(view.materials, "");
        assert_eq!(view.educational_goals[0].title, "Orienteering");
    }

    #[test]
    fn missing_categorical_fields_use_defaults_when_deserializing() {
        let json = serde_json::json!({
            "id": 1,
            "name": { "pt": "Jogo" },
            "duration_minutes": 15
        });
        let activity: Activity = serde_json::from_value(json).unwrap();
        assert_eq!(activity.group_size, GroupSize::Small);
        assert_eq!(activity.location, Location::Outdoor);
        assert!(activity.sdgs.is_empty());
    }
}
