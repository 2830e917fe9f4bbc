use crate::activity::{ActivityId, ActivityLookup};
use crate::error::ValidationError;
use crate::localized::Language;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProgramId = i64;
pub type EntryId = i64;

/// A named, owned schedule. The owner is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    #[serde(default)]
    pub is_public: bool,
    owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    pub fn new(
        id: ProgramId,
        owner: impl Into<String>,
        details: ProgramDetails,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        details.validate()?;
        Ok(Self {
            id,
            name: details.name.trim().to_string(),
            date: details.date,
            start_time: details.start_time,
            is_public: details.is_public,
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        self.owner.eq_ignore_ascii_case(email)
    }

    /// Replaces the editable header fields. Owner and creation time are kept.
    pub fn apply_details(
        &mut self,
        details: ProgramDetails,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        details.validate()?;
        self.name = details.name.trim().to_string();
        self.date = details.date;
        self.start_time = details.start_time;
        self.is_public = details.is_public;
        self.updated_at = now;
        Ok(())
    }

    pub fn details(&self) -> ProgramDetails {
        ProgramDetails {
            name: self.name.clone(),
            date: self.date,
            start_time: self.start_time,
            is_public: self.is_public,
        }
    }
}

/// Owner-editable program fields, used for both creation and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDetails {
    pub name: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    #[serde(default)]
    pub is_public: bool,
}

impl ProgramDetails {
    pub fn new(name: impl Into<String>, start_time: NaiveTime) -> Self {
        Self {
            name: name.into(),
            date: None,
            start_time,
            is_public: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

/// What an entry schedules: a catalogue activity or a free-text block with its own duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    Activity {
        activity_id: ActivityId,
    },
    Custom {
        title: String,
        duration_minutes: u32,
    },
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Activity { .. } => "activity",
            EntryKind::Custom { .. } => "custom",
        }
    }

    pub fn activity_id(&self) -> Option<ActivityId> {
        match self {
            EntryKind::Activity { activity_id } => Some(*activity_id),
            EntryKind::Custom { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub id: EntryId,
    /// Zero-based, contiguous within a program.
    pub position: u32,
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl ProgramEntry {
    pub fn activity(id: EntryId, position: u32, activity_id: ActivityId) -> Self {
        Self {
            id,
            position,
            kind: EntryKind::Activity { activity_id },
        }
    }

    pub fn custom(id: EntryId, position: u32, title: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            id,
            position,
            kind: EntryKind::Custom {
                title: title.into(),
                duration_minutes,
            },
        }
    }

    /// Custom title, or the activity name resolved in `language`.
    pub fn display_title<L>(&self, lookup: &L, language: Language) -> String
    where
        L: ActivityLookup + ?Sized,
    {
        match &self.kind {
            EntryKind::Custom { title, .. } => title.clone(),
            EntryKind::Activity { activity_id } => match lookup.get_activity(*activity_id) {
                Some(activity) => activity.name.resolve(language).to_string(),
                None => format!("activity {activity_id} (missing)"),
            },
        }
    }
}

/// In-place edit of an existing entry. Must match the entry's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryPatch {
    Activity {
        activity_id: ActivityId,
    },
    Custom {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        duration_minutes: Option<i64>,
    },
}
