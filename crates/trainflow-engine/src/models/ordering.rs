//! Sibling ordering by rank key

use serde::{Deserialize, Serialize};
use trainflow_common::RankKey;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// A node that is ordered among its siblings by a [`RankKey`].
pub trait Ranked {
    fn id(&self) -> Uuid;
    fn order(&self) -> &RankKey;
    fn set_order(&mut self, order: RankKey);
}

/// Sort siblings by `(order, id)`.
///
/// Two concurrent inserts can produce the same key; the id tie-break keeps the
/// result deterministic.
pub fn sort_siblings<T: Ranked>(items: &mut [T]) {
    items.sort_by(|a, b| a.order().cmp(b.order()).then_with(|| a.id().cmp(&b.id())));
}

/// Where a node goes relative to its siblings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "position", content = "anchor", rename_all = "snake_case")]
pub enum Placement {
    First,
    #[default]
    Last,
    Before(Uuid),
    After(Uuid),
}

/// Rank key for `placement` within `siblings`.
///
/// `siblings` must already be sorted with [`sort_siblings`]. `moving` names a
/// node that is being repositioned; it is ignored as a neighbour so a move
/// never depends on the node's own key.
pub fn rank_for<T: Ranked>(
    siblings: &[T],
    placement: Placement,
    moving: Option<Uuid>,
) -> EngineResult<RankKey> {
    let others: Vec<&T> = siblings
        .iter()
        .filter(|s| Some(s.id()) != moving)
        .collect();

    let position = match placement {
        Placement::First => 0,
        Placement::Last => others.len(),
        Placement::Before(anchor) | Placement::After(anchor) => {
            if Some(anchor) == moving {
                return Err(EngineError::Validation(
                    "a node cannot be placed relative to itself".to_string(),
                ));
            }
            let idx = others
                .iter()
                .position(|s| s.id() == anchor)
                .ok_or_else(|| EngineError::not_found("Sibling", anchor))?;
            if matches!(placement, Placement::After(_)) {
                idx + 1
            } else {
                idx
            }
        },
    };

    let mut lower = position.checked_sub(1).map(|i| others[i].order());
    let mut upper = others.get(position).map(|s| s.order());

    // Siblings sharing a key have no room between them. Before goes ahead of
    // the whole run, everything else goes past it.
    if let (Some(lo), Some(hi)) = (lower, upper) {
        if lo >= hi {
            if matches!(placement, Placement::Before(_)) {
                lower = others[..position]
                    .iter()
                    .rev()
                    .map(|s| s.order())
                    .find(|k| *k < hi);
            } else {
                upper = others[position..]
                    .iter()
                    .map(|s| s.order())
                    .find(|k| *k > lo);
            }
        }
    }

    Ok(RankKey::between(lower, upper)?)
}

/// Move sibling `id` to `placement` and return its new key.
///
/// Only the moved node's key changes.
pub fn reposition<T: Ranked>(
    siblings: &mut [T],
    id: Uuid,
    placement: Placement,
    entity: &'static str,
) -> EngineResult<RankKey> {
    if !siblings.iter().any(|s| s.id() == id) {
        return Err(EngineError::not_found(entity, id));
    }
    let order = rank_for(siblings, placement, Some(id))?;
    if let Some(node) = siblings.iter_mut().find(|s| s.id() == id) {
        node.set_order(order.clone());
    }
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Node {
        id: Uuid,
        order: RankKey,
    }

    impl Ranked for Node {
        fn id(&self) -> Uuid {
            self.id
        }

        fn order(&self) -> &RankKey {
            &self.order
        }

        fn set_order(&mut self, order: RankKey) {
            self.order = order;
        }
    }

    fn node(key: &str) -> Node {
        Node {
            id: Uuid::new_v4(),
            order: RankKey::parse(key).unwrap(),
        }
    }

    fn sorted(keys: &[&str]) -> Vec<Node> {
        let mut nodes: Vec<Node> = keys.iter().map(|k| node(k)).collect();
        sort_siblings(&mut nodes);
        nodes
    }

    #[test]
    fn test_empty_list_gets_midpoint() {
        let nodes: Vec<Node> = Vec::new();
        assert_eq!(rank_for(&nodes, Placement::Last, None).unwrap(), RankKey::midpoint());
        assert_eq!(rank_for(&nodes, Placement::First, None).unwrap(), RankKey::midpoint());
    }

    #[test]
    fn test_first_last_before_after() {
        let nodes = sorted(&["e", "m", "t"]);
        let first = rank_for(&nodes, Placement::First, None).unwrap();
        assert!(first < nodes[0].order);

        let last = rank_for(&nodes, Placement::Last, None).unwrap();
        assert!(last > nodes[2].order);

        let after_e = rank_for(&nodes, Placement::After(nodes[0].id), None).unwrap();
        assert!(nodes[0].order < after_e && after_e < nodes[1].order);

        let before_t = rank_for(&nodes, Placement::Before(nodes[2].id), None).unwrap();
        assert!(nodes[1].order < before_t && before_t < nodes[2].order);
    }

    #[test]
    fn test_move_ignores_own_key() {
        let nodes = sorted(&["e", "m", "t"]);
        // Moving "e" after "t": bounds are "t" and nothing.
        let key = rank_for(&nodes, Placement::After(nodes[2].id), Some(nodes[0].id)).unwrap();
        assert!(key > nodes[2].order);

        // Moving "t" to the front: "e" is the upper bound.
        let key = rank_for(&nodes, Placement::First, Some(nodes[2].id)).unwrap();
        assert!(key < nodes[0].order);
    }

    #[test]
    fn test_reposition_rewrites_only_the_moved_key() {
        let mut nodes = sorted(&["e", "m", "t"]);
        let before: Vec<RankKey> = nodes.iter().map(|n| n.order.clone()).collect();
        let moved = nodes[0].id;

        let key = reposition(&mut nodes, moved, Placement::Last, "Step").unwrap();
        assert!(key > before[2]);
        assert_eq!(nodes[0].order, key);
        assert_eq!(nodes[1].order, before[1]);
        assert_eq!(nodes[2].order, before[2]);

        let err = reposition(&mut nodes, Uuid::new_v4(), Placement::First, "Step").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Step", .. }));
    }

    #[test]
    fn test_unknown_anchor_is_not_found() {
        let nodes = sorted(&["m"]);
        let err = rank_for(&nodes, Placement::Before(Uuid::new_v4()), None).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_self_anchor_is_rejected() {
        let nodes = sorted(&["m", "n"]);
        let err = rank_for(&nodes, Placement::After(nodes[0].id), Some(nodes[0].id)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_duplicate_keys_insert_past_the_run() {
        let nodes = sorted(&["g", "m", "m", "t"]);
        let key = rank_for(&nodes, Placement::After(nodes[1].id), None).unwrap();
        assert!(key > nodes[2].order);
        assert!(key < nodes[3].order);
    }

    #[test]
    fn test_duplicate_keys_insert_before_the_run() {
        let nodes = sorted(&["g", "m", "m", "t"]);
        let key = rank_for(&nodes, Placement::Before(nodes[2].id), None).unwrap();
        assert!(key > nodes[0].order);
        assert!(key < nodes[2].order);

        let head = sorted(&["m", "m"]);
        let key = rank_for(&head, Placement::Before(head[1].id), None).unwrap();
        assert!(key < head[1].order);
    }

    #[test]
    fn test_sort_breaks_ties_by_id() {
        let mut nodes = vec![node("m"), node("m"), node("c")];
        sort_siblings(&mut nodes);
        assert_eq!(nodes[0].order.as_str(), "c");
        assert!(nodes[1].id < nodes[2].id);
    }

    #[test]
    fn test_placement_serde_shape() {
        let anchor = Uuid::nil();
        let json = serde_json::to_value(Placement::After(anchor)).unwrap();
        assert_eq!(json["position"], "after");
        assert_eq!(json["anchor"], anchor.to_string());
        let last: Placement = serde_json::from_str(r#"{"position":"last"}"#).unwrap();
        assert_eq!(last, Placement::Last);
    }
}
