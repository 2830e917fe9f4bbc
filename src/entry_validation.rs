use crate::error::ValidationError;
use crate::program::{EntryKind, ProgramEntry};
use std::collections::HashSet;

/// Custom blocks longer than a day make no sense on a 24-hour clock.
pub const MAX_CUSTOM_DURATION_MINUTES: u32 = 24 * 60;

pub fn validate_custom_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

pub fn validate_custom_duration(minutes: i64) -> Result<u32, ValidationError> {
    if minutes <= 0 {
        return Err(ValidationError::NonPositiveDuration { minutes });
    }
    if minutes > i64::from(MAX_CUSTOM_DURATION_MINUTES) {
        return Err(ValidationError::DurationTooLarge {
            minutes,
            max: MAX_CUSTOM_DURATION_MINUTES,
        });
    }
    Ok(minutes as u32)
}

pub fn validate_entry(entry: &ProgramEntry) -> Result<(), ValidationError> {
    match &entry.kind {
        EntryKind::Activity { .. } => Ok(()),
        EntryKind::Custom {
            title,
            duration_minutes,
        } => {
            validate_custom_title(title)?;
            validate_custom_duration(i64::from(*duration_minutes))?;
            Ok(())
        }
    }
}

/// Unique ids, valid custom blocks and positions forming `0..n` (in any order).
pub fn validate_entry_collection(entries: &[ProgramEntry]) -> Result<(), ValidationError> {
    let mut seen_ids = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen_ids.insert(entry.id) {
            return Err(ValidationError::DuplicateEntryId(entry.id));
        }
        validate_entry(entry)?;
    }

    let mut positions: Vec<u32> = entries.iter().map(|entry| entry.position).collect();
    positions.sort_unstable();
    for (expected, found) in positions.into_iter().enumerate() {
        let expected = expected as u32;
        if found != expected {
            return Err(ValidationError::NonContiguousPositions { expected, found });
        }
    }
    Ok(())
}
