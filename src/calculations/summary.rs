use super::timeline::{add_minutes, effective_duration, in_position_order, report_missing_activity};
use crate::activity::{ActivityLookup, AgeGroup, EducationalGoal, EffortLevel, GroupSize, Location, Sdg};
use crate::error::DataIntegrityWarning;
use crate::program::{EntryKind, ProgramEntry};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally<T> {
    pub value: T,
    pub count: usize,
}

/// Frequency count per distinct value, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution<T> {
    tallies: Vec<Tally<T>>,
}

impl<T> Default for Distribution<T> {
    fn default() -> Self {
        Self {
            tallies: Vec::new(),
        }
    }
}

impl<T: Copy + PartialEq> Distribution<T> {
    pub fn record(&mut self, value: T) {
        match self.tallies.iter_mut().find(|tally| tally.value == value) {
            Some(tally) => tally.count += 1,
            None => self.tallies.push(Tally { value, count: 1 }),
        }
    }

    pub fn count(&self, value: T) -> usize {
        self.tallies
            .iter()
            .find(|tally| tally.value == value)
            .map(|tally| tally.count)
            .unwrap_or(0)
    }

    pub fn tallies(&self) -> &[Tally<T>] {
        &self.tallies
    }

    pub fn total(&self) -> usize {
        self.tallies.iter().map(|tally| tally.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSummary {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_duration_minutes: u64,
    pub entry_count: usize,
    pub activity_count: usize,
    pub custom_count: usize,
    pub educational_goals: Vec<EducationalGoal>,
    pub sdgs: Vec<Sdg>,
    pub group_sizes: Distribution<GroupSize>,
    pub effort_levels: Distribution<EffortLevel>,
    pub locations: Distribution<Location>,
    pub age_groups: Distribution<AgeGroup>,
    #[serde(default)]
    pub warnings: Vec<DataIntegrityWarning>,
}

impl ProgramSummary {
    pub fn empty(start_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time: start_time,
            total_duration_minutes: 0,
            entry_count: 0,
            activity_count: 0,
            custom_count: 0,
            educational_goals: Vec::new(),
            sdgs: Vec::new(),
            group_sizes: Distribution::default(),
            effort_levels: Distribution::default(),
            locations: Distribution::default(),
            age_groups: Distribution::default(),
            warnings: Vec::new(),
        }
    }

    /// One-line overview in the style of `key=value, ...`.
    pub fn to_cli_summary(&self) -> String {
        let mut parts = vec![
            format!("entries={}", self.entry_count),
            format!("activities={}", self.activity_count),
            format!("custom={}", self.custom_count),
            format!("total={}min", self.total_duration_minutes),
            format!(
                "time={}-{}",
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M")
            ),
        ];
        if !self.educational_goals.is_empty() {
            parts.push(format!("goals={}", self.educational_goals.len()));
        }
        if !self.sdgs.is_empty() {
            let ids = self
                .sdgs
                .iter()
                .map(|sdg| sdg.id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("sdgs={}", ids));
        }
        if !self.warnings.is_empty() {
            parts.push(format!("warnings={}", self.warnings.len()));
        }
        parts.join(", ")
    }
}

/// Aggregates a program's entries. Pure: identical input gives identical output.
pub fn summarize<L>(entries: &[ProgramEntry], lookup: &L, start: NaiveTime) -> ProgramSummary
where
    L: ActivityLookup + ?Sized,
{
    let mut summary = ProgramSummary::empty(start);
    let mut seen_goals = HashSet::new();
    let mut seen_sdgs = HashSet::new();

    for entry in in_position_order(entries) {
        summary.entry_count += 1;
        match effective_duration(entry, lookup) {
            Ok(minutes) => summary.total_duration_minutes += u64::from(minutes),
            Err(warning) => {
                report_missing_activity(&warning);
                summary.warnings.push(warning);
            }
        }

        let activity_id = match &entry.kind {
            EntryKind::Custom { .. } => {
                summary.custom_count += 1;
                continue;
            }
            EntryKind::Activity { activity_id } => {
                summary.activity_count += 1;
                *activity_id
            }
        };
        let Some(activity) = lookup.get_activity(activity_id) else {
            continue;
        };

        for goal in &activity.educational_goals {
            if seen_goals.insert(goal.id) {
                summary.educational_goals.push(goal.clone());
            }
        }
        for sdg in &activity.sdgs {
            if seen_sdgs.insert(sdg.id) {
                summary.sdgs.push(sdg.clone());
            }
        }
        summary.group_sizes.record(activity.group_size);
        summary.effort_levels.record(activity.effort_level);
        summary.locations.record(activity.location);
        summary.age_groups.record(activity.age_group);
    }

    summary.end_time = add_minutes(start, summary.total_duration_minutes);
    summary
}
