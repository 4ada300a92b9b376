use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::score::{compute_priority, compute_urgency, LearnableItem, UserItemState};
use crate::config::PriorityConfig;
use crate::sanitize::finite_or;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedItem {
    pub item_id: String,
    pub priority: f64,
    pub urgency: f64,
    /// priority * (1 + urgency)
    pub score: f64,
}

/// Order items for the study queue.
///
/// Items without an entry in `states` are scored as never seen. Ordering is
/// score descending, then item id ascending.
pub fn rank_items(
    items: &[LearnableItem],
    states: &HashMap<String, UserItemState>,
    now: DateTime<Utc>,
    config: &PriorityConfig,
) -> Vec<RankedItem> {
    let unseen = UserItemState::default();
    let mut ranked: Vec<RankedItem> = items
        .iter()
        .map(|item| {
            let state = states.get(&item.id).unwrap_or(&unseen);
            let priority = compute_priority(item, state, config);
            let urgency = compute_urgency(state.next_review, now, &config.urgency);
            RankedItem {
                item_id: item.id.clone(),
                priority,
                urgency,
                score: finite_or(priority * (1.0 + urgency), 0.0),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    ranked
}

/// Copy of `item` with its stored priority recomputed.
pub fn refresh_priority(
    item: &LearnableItem,
    state: &UserItemState,
    config: &PriorityConfig,
) -> LearnableItem {
    LearnableItem {
        priority: compute_priority(item, state, config),
        ..item.clone()
    }
}

pub fn refresh_priorities(
    items: &[LearnableItem],
    states: &HashMap<String, UserItemState>,
    config: &PriorityConfig,
) -> Vec<LearnableItem> {
    let unseen = UserItemState::default();
    items
        .iter()
        .map(|item| refresh_priority(item, states.get(&item.id).unwrap_or(&unseen), config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_ties_broken_by_id() {
        let items = vec![
            LearnableItem::new("c", 0.5, 0.5, 0.5),
            LearnableItem::new("a", 0.5, 0.5, 0.5),
            LearnableItem::new("b", 0.5, 0.5, 0.5),
        ];
        let ranked = rank_items(&items, &HashMap::new(), now(), &PriorityConfig::default());
        let ids: Vec<_> = ranked.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_repeated_calls_identical() {
        let items: Vec<_> = (0..30)
            .map(|i| LearnableItem::new(format!("w{i}"), (i % 4) as f64 * 0.25, 0.3, 0.1))
            .collect();
        let config = PriorityConfig::default();
        let first = rank_items(&items, &HashMap::new(), now(), &config);
        let second = rank_items(&items, &HashMap::new(), now(), &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overdue_item_moves_up() {
        let items = vec![
            LearnableItem::new("fresh", 0.5, 0.5, 0.5),
            LearnableItem::new("overdue", 0.5, 0.5, 0.5),
        ];
        let mut states = HashMap::new();
        states.insert(
            "overdue".to_string(),
            UserItemState {
                next_review: Some(now() - Duration::days(5)),
                ..UserItemState::default()
            },
        );
        states.insert(
            "fresh".to_string(),
            UserItemState {
                next_review: Some(now() + Duration::days(20)),
                ..UserItemState::default()
            },
        );
        let ranked = rank_items(&items, &states, now(), &PriorityConfig::default());
        assert_eq!(ranked[0].item_id, "overdue");
        assert!(ranked[0].urgency > 1.0);
        let r = &ranked[0];
        assert!((r.score - r.priority * (1.0 + r.urgency)).abs() < 1e-12);
    }

    #[test]
    fn test_refresh_priority_updates_field_only() {
        let item = LearnableItem::new("w", 0.8, 0.2, 0.4);
        let config = PriorityConfig::default();
        let refreshed = refresh_priority(&item, &UserItemState::default(), &config);
        assert!(refreshed.priority > 0.0);
        assert_eq!(refreshed.id, item.id);
        assert_eq!(refreshed.frequency, item.frequency);
        assert_eq!(item.priority, 0.0);

        let all = refresh_priorities(&[item.clone()], &HashMap::new(), &config);
        assert_eq!(all[0], refreshed);
    }
}
