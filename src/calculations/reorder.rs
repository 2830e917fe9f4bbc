use crate::error::ValidationError;
use crate::program::ProgramEntry;

/// Sets every entry's position to its index in the slice.
pub fn renumber(entries: &mut [ProgramEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.position = index as u32;
    }
}

/// Moves the entry at `from` so it ends up at index `to`, then renumbers.
///
/// This is a single-element move, not a swap: `[a, b, c]` moved `0 -> 2` gives
/// `[b, c, a]`. Out-of-range indices are rejected and the input is never touched.
pub fn reorder(
    entries: &[ProgramEntry],
    from: usize,
    to: usize,
) -> Result<Vec<ProgramEntry>, ValidationError> {
    let len = entries.len();
    for index in [from, to] {
        if index >= len {
            return Err(ValidationError::InvalidIndex { index, len });
        }
    }

    let mut reordered = entries.to_vec();
    let moved = reordered.remove(from);
    reordered.insert(to, moved);
    renumber(&mut reordered);
    Ok(reordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: i64) -> Vec<ProgramEntry> {
        (0..n)
            .map(|i| ProgramEntry::custom(i + 1, i as u32, format!("Bloco {}", i + 1), 10))
            .collect()
    }

    fn ids(entries: &[ProgramEntry]) -> Vec<i64> {
        entries.iter().map(|entry| entry.id).collect()
    }

    #[test]
    fn moves_forward_and_backward() {
        let original = entries(4);
        let forward = reorder(&original, 0, 2).unwrap();
        assert_eq!(ids(&forward), vec![2, 3, 1, 4]);

        let backward = reorder(&original, 3, 1).unwrap();
        assert_eq!(ids(&backward), vec![1, 4, 2, 3]);
    }

    #[test]
    fn positions_match_new_indices() {
        let moved = reorder(&entries(3), 2, 0).unwrap();
        let positions: Vec<u32> = moved.iter().map(|entry| entry.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(moved[0].id, 3);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let original = entries(2);
        assert_eq!(
            reorder(&original, 2, 0),
            Err(ValidationError::InvalidIndex { index: 2, len: 2 })
        );
        assert_eq!(
            reorder(&original, 0, 5),
            Err(ValidationError::InvalidIndex { index: 5, len: 2 })
        );
        assert_eq!(original, entries(2));
    }

    #[test]
    fn empty_list_has_no_valid_index() {
        assert_eq!(
            reorder(&[], 0, 0),
            Err(ValidationError::InvalidIndex { index: 0, len: 0 })
        );
    }
}
