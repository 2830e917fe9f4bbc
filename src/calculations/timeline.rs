use crate::activity::ActivityLookup;
use crate::error::DataIntegrityWarning;
use crate::program::{EntryId, EntryKind, ProgramEntry};
use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    pub entry_id: EntryId,
    pub position: u32,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub duration_minutes: u32,
}

/// Start/end times for every entry of a program, in position order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub start: NaiveTime,
    pub slots: Vec<ScheduledEntry>,
    #[serde(default)]
    pub warnings: Vec<DataIntegrityWarning>,
}

impl Timeline {
    pub fn empty(start: NaiveTime) -> Self {
        Self {
            start,
            slots: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// End of the last slot, or the program start when nothing is scheduled.
    pub fn end(&self) -> NaiveTime {
        self.slots.last().map(|slot| slot.end).unwrap_or(self.start)
    }

    pub fn total_minutes(&self) -> u64 {
        self.slots
            .iter()
            .map(|slot| u64::from(slot.duration_minutes))
            .sum()
    }

    pub fn slot(&self, entry_id: EntryId) -> Option<&ScheduledEntry> {
        self.slots.iter().find(|slot| slot.entry_id == entry_id)
    }
}

/// Wall-clock addition that wraps past midnight.
pub fn add_minutes(time: NaiveTime, minutes: u64) -> NaiveTime {
    let wrapped = (minutes % MINUTES_PER_DAY) as i64;
    time.overflowing_add_signed(TimeDelta::minutes(wrapped)).0
}

/// Minutes the entry occupies. A dangling activity reference counts as zero.
pub(crate) fn effective_duration<L>(
    entry: &ProgramEntry,
    lookup: &L,
) -> Result<u32, DataIntegrityWarning>
where
    L: ActivityLookup + ?Sized,
{
    match &entry.kind {
        EntryKind::Custom {
            duration_minutes, ..
        } => Ok(*duration_minutes),
        EntryKind::Activity { activity_id } => lookup
            .get_activity(*activity_id)
            .map(|activity| activity.duration_minutes)
            .ok_or(DataIntegrityWarning {
                entry_id: entry.id,
                activity_id: *activity_id,
            }),
    }
}

pub(crate) fn report_missing_activity(warning: &DataIntegrityWarning) {
    tracing::warn!(
        entry_id = warning.entry_id,
        activity_id = warning.activity_id,
        "program entry references a missing activity; scheduling it with zero duration"
    );
}

/// Entries sorted by position without cloning them.
pub(crate) fn in_position_order(entries: &[ProgramEntry]) -> Vec<&ProgramEntry> {
    let mut ordered: Vec<&ProgramEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.position);
    ordered
}

pub fn compute_timeline<L>(entries: &[ProgramEntry], lookup: &L, start: NaiveTime) -> Timeline
where
    L: ActivityLookup + ?Sized,
{
    let mut timeline = Timeline::empty(start);
    let mut cursor = start;

    for entry in in_position_order(entries) {
        let duration_minutes = match effective_duration(entry, lookup) {
            Ok(minutes) => minutes,
            Err(warning) => {
                report_missing_activity(&warning);
                timeline.warnings.push(warning);
                0
            }
        };
        let end = add_minutes(cursor, u64::from(duration_minutes));
        timeline.slots.push(ScheduledEntry {
            entry_id: entry.id,
            position: entry.position,
            start: cursor,
            end,
            duration_minutes,
        });
        cursor = end;
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Activity;
    use std::collections::HashMap;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn add_minutes_wraps_at_midnight() {
        assert_eq!(add_minutes(t(23, 30), 45), t(0, 15));
        assert_eq!(add_minutes(t(9, 0), MINUTES_PER_DAY), t(9, 0));
        assert_eq!(add_minutes(t(9, 0), 0), t(9, 0));
    }

    #[test]
    fn slots_follow_position_not_slice_order() {
        let lookup: HashMap<i64, Activity> = HashMap::new();
        let entries = vec![
            ProgramEntry::custom(1, 1, "Segundo", 20),
            ProgramEntry::custom(2, 0, "Primeiro", 10),
        ];
        let timeline = compute_timeline(&entries, &lookup, t(10, 0));
        assert_eq!(timeline.slots[0].entry_id, 2);
        assert_eq!(timeline.slots[0].end, t(10, 10));
        assert_eq!(timeline.slots[1].start, t(10, 10));
        assert_eq!(timeline.end(), t(10, 30));
    }

    #[test]
    fn empty_program_ends_at_start() {
        let lookup: HashMap<i64, Activity> = HashMap::new();
        let timeline = compute_timeline(&[], &lookup, t(14, 0));
        assert!(timeline.slots.is_empty());
        assert_eq!(timeline.end(), t(14, 0));
        assert_eq!(timeline.total_minutes(), 0);
    }
}
