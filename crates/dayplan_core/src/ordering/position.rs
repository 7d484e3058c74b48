//! Dense position index arithmetic.
//!
//! # Responsibility
//! - Compute append positions for entities entering a group.
//! - Describe the bulk shift that keeps a group dense after a member leaves
//!   or moves, as a `PositionShift` the store applies in one statement.
//!
//! # Invariants
//! - Live positions in a group are always exactly `0..len`.
//! - Shifts never touch the moving/leaving member itself; the caller assigns
//!   or clears that member's position.

use crate::ordering::group::GroupKey;

/// Bulk `position += delta` over the members of `group` whose position lies
/// in `lower..=upper` (`upper = None` means unbounded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionShift {
    pub group: GroupKey,
    pub lower: i64,
    pub upper: Option<i64>,
    pub delta: i64,
}

impl PositionShift {
    pub fn covers(&self, position: i64) -> bool {
        position >= self.lower && self.upper.map_or(true, |upper| position <= upper)
    }

    /// Returns `position` after this shift.
    pub fn apply(&self, position: i64) -> i64 {
        if self.covers(position) {
            position + self.delta
        } else {
            position
        }
    }
}

/// Returns the append position given the group's current maximum.
///
/// An empty group (`None`) yields 0. Holes are never reused.
pub fn next_position(current_max: Option<i64>) -> i64 {
    current_max.map_or(0, |max| max + 1)
}

/// Shift restoring density after the member at `removed` left `group`.
///
/// Returns `None` when the leaving member held no position.
pub fn close_gap(group: GroupKey, removed: Option<i64>) -> Option<PositionShift> {
    let removed = removed?;
    Some(PositionShift {
        group,
        lower: removed + 1,
        upper: None,
        delta: -1,
    })
}

/// Shift making room for a member moving from `from` to `to` (array-move
/// semantics, not a swap). Returns `None` for a no-op move.
pub fn move_within_group(group: GroupKey, from: i64, to: i64) -> Option<PositionShift> {
    if to > from {
        Some(PositionShift {
            group,
            lower: from + 1,
            upper: Some(to),
            delta: -1,
        })
    } else if to < from {
        Some(PositionShift {
            group,
            lower: to,
            upper: Some(from - 1),
            delta: 1,
        })
    } else {
        None
    }
}

/// Returns whether `positions` form exactly `{0, .., len - 1}`.
pub fn is_dense(positions: &[i64]) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as i64)
}

#[cfg(test)]
mod tests {
    use super::{close_gap, is_dense, move_within_group, next_position};
    use crate::ordering::group::GroupKey;

    const GROUP: GroupKey = GroupKey::Backlog { recurring: false };

    /// Applies a move to `(id, position)` members the way the store does.
    fn apply_move(members: &mut [(char, i64)], from: i64, to: i64) {
        let moving = members
            .iter()
            .position(|(_, position)| *position == from)
            .unwrap();
        if let Some(shift) = move_within_group(GROUP, from, to) {
            for (index, member) in members.iter_mut().enumerate() {
                if index != moving {
                    member.1 = shift.apply(member.1);
                }
            }
        }
        members[moving].1 = to;
    }

    fn order(members: &[(char, i64)]) -> String {
        let mut sorted = members.to_vec();
        sorted.sort_by_key(|(_, position)| *position);
        sorted.into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn next_position_starts_at_zero_and_appends() {
        assert_eq!(next_position(None), 0);
        assert_eq!(next_position(Some(0)), 1);
        assert_eq!(next_position(Some(4)), 5);
    }

    #[test]
    fn close_gap_shifts_only_members_after_removed() {
        let shift = close_gap(GROUP, Some(2)).unwrap();
        let remaining: Vec<i64> = [0, 1, 3, 4].iter().map(|p| shift.apply(*p)).collect();
        assert_eq!(remaining, vec![0, 1, 2, 3]);
        assert!(is_dense(&remaining));
    }

    #[test]
    fn close_gap_without_position_is_noop() {
        assert_eq!(close_gap(GROUP, None), None);
    }

    #[test]
    fn move_down_the_list_pulls_range_up() {
        let mut members = vec![('a', 0), ('b', 1), ('c', 2), ('d', 3)];
        apply_move(&mut members, 0, 2);
        assert_eq!(order(&members), "bcad");
        assert!(is_dense(&members.iter().map(|m| m.1).collect::<Vec<_>>()));
    }

    #[test]
    fn move_up_the_list_pushes_range_down() {
        let mut members = vec![('a', 0), ('b', 1), ('c', 2), ('d', 3)];
        apply_move(&mut members, 3, 1);
        assert_eq!(order(&members), "adbc");
    }

    #[test]
    fn move_to_same_position_changes_nothing() {
        assert_eq!(move_within_group(GROUP, 2, 2), None);
        let mut members = vec![('a', 0), ('b', 1), ('c', 2)];
        apply_move(&mut members, 1, 1);
        assert_eq!(members, vec![('a', 0), ('b', 1), ('c', 2)]);
    }

    #[test]
    fn move_there_and_back_restores_order() {
        let original = vec![('a', 0), ('b', 1), ('c', 2), ('d', 3), ('e', 4)];
        for from in 0..5 {
            for to in 0..5 {
                let mut members = original.clone();
                apply_move(&mut members, from, to);
                apply_move(&mut members, to, from);
                assert_eq!(members, original, "move {from} -> {to} -> {from}");
            }
        }
    }

    #[test]
    fn is_dense_detects_gaps_and_duplicates() {
        assert!(is_dense(&[]));
        assert!(is_dense(&[2, 0, 1]));
        assert!(!is_dense(&[0, 2]));
        assert!(!is_dense(&[0, 1, 1]));
        assert!(!is_dense(&[1]));
    }
}
