//! Direction inference for unlabelled batches.

use tgsearch_types::{Direction, Message};

use crate::window::MessageWindow;

/// How a batch that exactly touches a window edge is classified.
///
/// `Conservative` treats touching (`batch max == window min` or
/// `batch min == window max`) as overlap and returns `Initial`, which makes
/// the caller rebuild the window. `Adjacent` treats it as a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    #[default]
    Conservative,
    Adjacent,
}

/// Classify `batch` against `window` with the default boundary policy.
pub fn infer_direction(batch: &[Message], window: Option<&MessageWindow>) -> Direction {
    infer_direction_with(batch, window, BoundaryPolicy::default())
}

pub fn infer_direction_with(
    batch: &[Message],
    window: Option<&MessageWindow>,
    policy: BoundaryPolicy,
) -> Direction {
    let (Some(current_min), Some(current_max)) =
        (window.and_then(|w| w.min_id()), window.and_then(|w| w.max_id()))
    else {
        return Direction::Initial;
    };

    // Batch order is not assumed; malformed ids do not participate.
    let Some((new_min, new_max)) = id_bounds(batch) else {
        return Direction::Initial;
    };

    match policy {
        BoundaryPolicy::Conservative => {
            if new_max < current_min {
                Direction::Older
            } else if new_min > current_max {
                Direction::Newer
            } else {
                Direction::Initial
            }
        }
        BoundaryPolicy::Adjacent => {
            // A single-id window touched on both sides is still ambiguous.
            if new_max <= current_min && new_min < current_min {
                Direction::Older
            } else if new_min >= current_max && new_max > current_max {
                Direction::Newer
            } else {
                Direction::Initial
            }
        }
    }
}

fn id_bounds(batch: &[Message]) -> Option<(i64, i64)> {
    batch
        .iter()
        .filter_map(Message::numeric_id)
        .fold(None, |acc, id| match acc {
            None => Some((id, id)),
            Some((lo, hi)) => Some((lo.min(id), hi.max(id))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(id: &str) -> Message {
        Message {
            platform_message_id: id.to_string(),
            chat_id: "1".to_string(),
            from_id: None,
            from_name: None,
            content: String::new(),
            media: vec![],
            reply_to_id: None,
            platform_timestamp: Utc::now(),
        }
    }

    fn batch(ids: &[i64]) -> Vec<Message> {
        ids.iter().map(|id| msg(&id.to_string())).collect()
    }

    fn window_with(ids: &[i64]) -> MessageWindow {
        let mut w = MessageWindow::new(100).unwrap();
        w.add_batch(&batch(ids), Direction::Initial);
        w
    }

    #[test]
    fn entirely_before_is_older() {
        let w = window_with(&[50, 60]);
        assert_eq!(infer_direction(&batch(&[10, 20]), Some(&w)), Direction::Older);
    }

    #[test]
    fn entirely_after_is_newer() {
        let w = window_with(&[10, 20]);
        assert_eq!(infer_direction(&batch(&[50, 60]), Some(&w)), Direction::Newer);
    }

    #[test]
    fn overlap_is_initial() {
        let w = window_with(&[20, 40]);
        assert_eq!(infer_direction(&batch(&[30, 50]), Some(&w)), Direction::Initial);
    }

    #[test]
    fn empty_window_is_initial() {
        let w = MessageWindow::new(10).unwrap();
        assert_eq!(infer_direction(&batch(&[10, 20, 30]), Some(&w)), Direction::Initial);
        assert_eq!(infer_direction(&batch(&[10, 20, 30]), None), Direction::Initial);
    }

    #[test]
    fn empty_batch_is_initial() {
        let w = window_with(&[50, 60]);
        assert_eq!(infer_direction(&[], Some(&w)), Direction::Initial);
    }

    #[test]
    fn touching_min_is_initial() {
        let w = window_with(&[50, 60]);
        assert_eq!(infer_direction(&batch(&[40, 50]), Some(&w)), Direction::Initial);
    }

    #[test]
    fn touching_max_is_initial() {
        let w = window_with(&[50, 60]);
        assert_eq!(infer_direction(&batch(&[60, 70]), Some(&w)), Direction::Initial);
    }

    #[test]
    fn unordered_batch_uses_numeric_bounds() {
        let w = window_with(&[100, 200]);
        // Lexicographically "9" > "10"; numerically it is older.
        assert_eq!(infer_direction(&batch(&[9, 10, 3]), Some(&w)), Direction::Older);
        assert_eq!(infer_direction(&batch(&[1000, 201]), Some(&w)), Direction::Newer);
    }

    #[test]
    fn malformed_ids_are_ignored() {
        let w = window_with(&[50, 60]);
        let mut b = batch(&[10, 20]);
        b.push(msg("not-a-number"));
        assert_eq!(infer_direction(&b, Some(&w)), Direction::Older);
        assert_eq!(infer_direction(&[msg("x")], Some(&w)), Direction::Initial);
    }

    #[test]
    fn adjacent_policy_accepts_touching_edges() {
        let w = window_with(&[50, 60]);
        let adj = BoundaryPolicy::Adjacent;
        assert_eq!(infer_direction_with(&batch(&[40, 50]), Some(&w), adj), Direction::Older);
        assert_eq!(infer_direction_with(&batch(&[60, 70]), Some(&w), adj), Direction::Newer);
        assert_eq!(infer_direction_with(&batch(&[55, 70]), Some(&w), adj), Direction::Initial);
    }

    #[test]
    fn adjacent_policy_single_id_batch_on_edge_is_initial() {
        let w = window_with(&[50, 60]);
        let adj = BoundaryPolicy::Adjacent;
        assert_eq!(infer_direction_with(&batch(&[50]), Some(&w), adj), Direction::Initial);
        assert_eq!(infer_direction_with(&batch(&[60]), Some(&w), adj), Direction::Initial);
    }
}
