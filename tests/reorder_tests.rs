use scout_toolkit::{ProgramEntry, ValidationError, renumber, reorder};

fn sample() -> Vec<ProgramEntry> {
    vec![
        ProgramEntry::activity(1, 0, 10),
        ProgramEntry::custom(2, 1, "Lanche", 15),
        ProgramEntry::activity(3, 2, 11),
        ProgramEntry::custom(4, 3, "Canções", 20),
    ]
}

fn ids(entries: &[ProgramEntry]) -> Vec<i64> {
    entries.iter().map(|entry| entry.id).collect()
}

fn positions(entries: &[ProgramEntry]) -> Vec<u32> {
    entries.iter().map(|entry| entry.position).collect()
}

#[test]
fn move_is_remove_then_insert() {
    let moved = reorder(&sample(), 0, 2).unwrap();
    assert_eq!(ids(&moved), vec![2, 3, 1, 4]);
    assert_eq!(positions(&moved), vec![0, 1, 2, 3]);

    let moved = reorder(&sample(), 3, 1).unwrap();
    assert_eq!(ids(&moved), vec![1, 4, 2, 3]);
    assert_eq!(positions(&moved), vec![0, 1, 2, 3]);
}

#[test]
fn same_index_is_identity() {
    let entries = sample();
    for i in 0..entries.len() {
        assert_eq!(reorder(&entries, i, i).unwrap(), entries);
    }
}

#[test]
fn moving_back_restores_the_original() {
    let entries = sample();
    for from in 0..entries.len() {
        for to in 0..entries.len() {
            let there = reorder(&entries, from, to).unwrap();
            let back = reorder(&there, to, from).unwrap();
            assert_eq!(back, entries, "{from} -> {to} -> {from}");
        }
    }
}

#[test]
fn out_of_range_indices_are_rejected() {
    let entries = sample();
    assert_eq!(
        reorder(&entries, 4, 0).unwrap_err(),
        ValidationError::InvalidIndex { index: 4, len: 4 }
    );
    assert_eq!(
        reorder(&entries, 0, 9).unwrap_err(),
        ValidationError::InvalidIndex { index: 9, len: 4 }
    );
    assert!(reorder(&[], 0, 0).is_err());
    assert_eq!(entries, sample());
}

#[test]
fn renumber_closes_gaps() {
    let mut entries = sample();
    entries.remove(1);
    renumber(&mut entries);
    assert_eq!(ids(&entries), vec![1, 3, 4]);
    assert_eq!(positions(&entries), vec![0, 1, 2]);
}
