//! Badge catalog and progress counters.
//!
//! Progress is a map of badge id to counter stored under `badges`. Every
//! tracked action bumps at most one category badge plus `starter` and
//! `champion`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::db::KeyValueStore;
use crate::db::store::{BADGES_KEY, load_json, save_json};
use crate::error::ServiceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum BadgeId {
    Starter,
    Energy,
    Water,
    EcoCommuter,
    Recycling,
    Champion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
}

#[derive(Debug, Clone, Serialize)]
pub struct BadgeDefinition {
    pub id: BadgeId,
    pub icon: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub target: u32,
    pub category: &'static str,
    pub rarity: Rarity,
}

/// Ordered by rarity
pub const BADGE_CATALOG: &[BadgeDefinition] = &[
    BadgeDefinition {
        id: BadgeId::Starter,
        icon: "🌱",
        name: "Green Starter",
        description: "Take your first sustainability action",
        target: 1,
        category: "beginner",
        rarity: Rarity::Common,
    },
    BadgeDefinition {
        id: BadgeId::Energy,
        icon: "💡",
        name: "Energy Saver",
        description: "Reduce electricity usage 5 times",
        target: 5,
        category: "energy",
        rarity: Rarity::Common,
    },
    BadgeDefinition {
        id: BadgeId::Water,
        icon: "💧",
        name: "Water Guardian",
        description: "Conserve water resources 5 times",
        target: 5,
        category: "water",
        rarity: Rarity::Common,
    },
    BadgeDefinition {
        id: BadgeId::EcoCommuter,
        icon: "🚴",
        name: "Eco Commuter",
        description: "Use sustainable transport 10 times",
        target: 10,
        category: "transport",
        rarity: Rarity::Uncommon,
    },
    BadgeDefinition {
        id: BadgeId::Recycling,
        icon: "♻️",
        name: "Recycling Hero",
        description: "Recycle materials 8 times",
        target: 8,
        category: "waste",
        rarity: Rarity::Rare,
    },
    BadgeDefinition {
        id: BadgeId::Champion,
        icon: "🏆",
        name: "Eco Champion",
        description: "Complete 25 sustainability actions",
        target: 25,
        category: "achievement",
        rarity: Rarity::Epic,
    },
];

/// Category badges, checked in order; the first match wins
const CATEGORY_RULES: &[(&[&str], BadgeId)] = &[
    (&["bike", "cycle", "walk", "bus", "train"], BadgeId::EcoCommuter),
    (&["recycle", "reuse", "compost"], BadgeId::Recycling),
    (&["energy", "electricity", "light"], BadgeId::Energy),
    (&["water", "shower", "tap"], BadgeId::Water),
];

/// Stored progress counters keyed by badge id
pub type BadgeProgress = BTreeMap<String, u32>;

/// Category badge an action description counts toward, if any
pub fn categorize(action: &str) -> Option<BadgeId> {
    let lower = action.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(_, badge)| *badge)
}

/// Bump the counters an action earns and persist them.
///
/// `starter` and `champion` advance on every action regardless of category.
pub fn track_badge_progress(store: &dyn KeyValueStore, action: &str) -> ServiceResult<BadgeProgress> {
    let mut progress: BadgeProgress = load_json(store, BADGES_KEY)?.unwrap_or_default();

    let category = categorize(action);
    let earned = category
        .into_iter()
        .chain([BadgeId::Starter, BadgeId::Champion]);
    for badge in earned {
        let key: &str = badge.as_ref();
        *progress.entry(key.to_string()).or_insert(0) += 1;
    }

    save_json(store, BADGES_KEY, &progress)?;
    Ok(progress)
}

/// Which badges a summary lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeFilter {
    #[default]
    All,
    Unlocked,
    Locked,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: BadgeDefinition,
    pub progress: u32,
    pub unlocked: bool,
    /// Capped at 100
    pub progress_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeSummary {
    pub badges: Vec<BadgeStatus>,
    /// Unlocked badges across the whole catalog, not just the filtered list
    pub earned: usize,
    pub total: usize,
    /// Mean per-badge completion, rounded
    pub overall_percent: u32,
}

/// Status of every catalog badge, filtered for display
pub fn summarize(progress: &BadgeProgress, filter: BadgeFilter) -> BadgeSummary {
    let mut earned = 0;
    let mut completion = 0.0;
    let mut badges = Vec::new();

    for badge in BADGE_CATALOG {
        let key: &str = badge.id.as_ref();
        let count = progress.get(key).copied().unwrap_or(0);
        let unlocked = count >= badge.target;
        let ratio = f64::from(count) / f64::from(badge.target);

        if unlocked {
            earned += 1;
        }
        completion += ratio.min(1.0);

        let listed = match filter {
            BadgeFilter::All => true,
            BadgeFilter::Unlocked => unlocked,
            BadgeFilter::Locked => !unlocked,
        };
        if listed {
            badges.push(BadgeStatus {
                badge: badge.clone(),
                progress: count,
                unlocked,
                progress_percent: (ratio * 100.0).min(100.0),
            });
        }
    }

    let total = BADGE_CATALOG.len();
    BadgeSummary {
        badges,
        earned,
        total,
        overall_percent: (completion / total as f64 * 100.0).round() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_categorize_first_match_wins() {
        assert_eq!(categorize("Walked to work"), Some(BadgeId::EcoCommuter));
        // "bus" (transport) beats "water"
        assert_eq!(categorize("took the bus to buy water"), Some(BadgeId::EcoCommuter));
        assert_eq!(categorize("compost scraps"), Some(BadgeId::Recycling));
        assert_eq!(categorize("saved electricity"), Some(BadgeId::Energy));
        assert_eq!(categorize("saved water"), Some(BadgeId::Water));
        assert_eq!(categorize("planted a tree"), None);
    }

    #[test]
    fn test_every_action_counts_for_starter_and_champion() {
        let db = Database::open_in_memory().unwrap();

        track_badge_progress(&db, "planted a tree").unwrap();
        let progress = track_badge_progress(&db, "recycled cans, then reuse bags").unwrap();

        assert_eq!(progress.get("starter"), Some(&2));
        assert_eq!(progress.get("champion"), Some(&2));
        assert_eq!(progress.get("recycling"), Some(&1));
        assert_eq!(progress.get("ecoCommuter"), None);

        let stored: BadgeProgress = load_json(&db, BADGES_KEY).unwrap().unwrap();
        assert_eq!(stored, progress);
    }

    #[test]
    fn test_summary_filters_and_totals() {
        let mut progress = BadgeProgress::new();
        progress.insert("starter".to_string(), 3);
        progress.insert("energy".to_string(), 5);
        progress.insert("ecoCommuter".to_string(), 5);

        let all = summarize(&progress, BadgeFilter::All);
        assert_eq!(all.badges.len(), 6);
        assert_eq!(all.earned, 2);
        assert_eq!(all.total, 6);
        // (1 + 1 + 0.5) / 6
        assert_eq!(all.overall_percent, 42);

        let unlocked = summarize(&progress, BadgeFilter::Unlocked);
        let ids: Vec<BadgeId> = unlocked.badges.iter().map(|b| b.badge.id).collect();
        assert_eq!(ids, vec![BadgeId::Starter, BadgeId::Energy]);
        assert_eq!(unlocked.earned, 2);

        let locked = summarize(&progress, BadgeFilter::Locked);
        assert_eq!(locked.badges.len(), 4);
        assert_eq!(locked.badges[1].progress_percent, 50.0);
    }

    #[test]
    fn test_badge_id_keys() {
        let key: &str = BadgeId::EcoCommuter.as_ref();
        assert_eq!(key, "ecoCommuter");
        assert_eq!(Rarity::Uncommon.to_string(), "uncommon");
    }
}
