//! Promotion rule: which source cards get mirrored.
//!
//! Precedence:
//! 1. closed cards are never promoted
//! 2. a label named like the completed tag rejects the card outright
//! 3. otherwise the card is promoted if it sits in the priority list, or if
//!    its progress checklist is at least `threshold` complete
//!
//! Name comparisons ignore case and surrounding whitespace. Decisions are
//! computed fresh from the card's current state every time.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use boardsync_board::BoardClient;
use boardsync_core::{
    config::{BoardPair, PromotionRules},
    types::{Card, LabelNames, ListId},
};

use crate::SyncError;

/// Why a card was or was not promoted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    Closed,
    CompletedLabel { label: String },
    PriorityList { list: String },
    ChecklistProgress { ratio: f64 },
    /// `ratio` is `None` when the card has no progress checklist.
    BelowThreshold { ratio: Option<f64> },
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Closed => f.write_str("card is closed"),
            DecisionReason::CompletedLabel { label } => write!(f, "labelled '{label}'"),
            DecisionReason::PriorityList { list } => write!(f, "in list '{list}'"),
            DecisionReason::ChecklistProgress { ratio } => {
                write!(f, "checklist {:.0}% complete", ratio * 100.0)
            }
            DecisionReason::BelowThreshold { ratio: Some(ratio) } => {
                write!(f, "checklist only {:.0}% complete", ratio * 100.0)
            }
            DecisionReason::BelowThreshold { ratio: None } => {
                f.write_str("not prioritized, no progress checklist")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityDecision {
    pub promote: bool,
    pub reason: DecisionReason,
}

impl EligibilityDecision {
    fn promote(reason: DecisionReason) -> Self {
        Self {
            promote: true,
            reason,
        }
    }

    fn reject(reason: DecisionReason) -> Self {
        Self {
            promote: false,
            reason,
        }
    }
}

pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Decide whether `card` should be mirrored.
///
/// `list_name` is the name of the list the card currently sits in (if
/// known); `labels` resolves the card's label ids to names.
pub fn evaluate(
    card: &Card,
    list_name: Option<&str>,
    labels: &LabelNames,
    rules: &PromotionRules,
) -> EligibilityDecision {
    if card.closed {
        return EligibilityDecision::reject(DecisionReason::Closed);
    }

    let completed = card
        .label_ids
        .iter()
        .filter_map(|id| labels.get(id))
        .find(|name| names_match(name, &rules.completed_label));
    if let Some(label) = completed {
        return EligibilityDecision::reject(DecisionReason::CompletedLabel {
            label: label.clone(),
        });
    }

    if let Some(list) = list_name.filter(|l| names_match(l, &rules.priority_list)) {
        return EligibilityDecision::promote(DecisionReason::PriorityList {
            list: list.to_string(),
        });
    }

    let ratio = card
        .checklists
        .iter()
        .filter(|c| names_match(&c.name, &rules.progress_checklist))
        .map(|c| c.completion_ratio())
        .fold(None, |best: Option<f64>, r| Some(best.map_or(r, |b| b.max(r))));

    match ratio {
        Some(ratio) if ratio >= rules.threshold => {
            EligibilityDecision::promote(DecisionReason::ChecklistProgress { ratio })
        }
        ratio => EligibilityDecision::reject(DecisionReason::BelowThreshold { ratio }),
    }
}

// ---------------------------------------------------------------------------
// Board assessment
// ---------------------------------------------------------------------------

/// A source card together with the decision made about it.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub card: Card,
    pub list_name: Option<String>,
    pub decision: EligibilityDecision,
}

/// Read a source board fresh and evaluate every open card on it.
///
/// Fails (and the pair is skipped) when the board's lists, labels or cards
/// cannot be read, or when the priority list does not exist on the board.
pub fn assess_board<C: BoardClient + ?Sized>(
    client: &C,
    pair: &BoardPair,
    rules: &PromotionRules,
) -> Result<Vec<Assessment>, SyncError> {
    let lists = client.board_lists(&pair.source_board)?;
    if !lists.iter().any(|l| names_match(&l.name, &rules.priority_list)) {
        return Err(SyncError::ListNotFound {
            list: rules.priority_list.clone(),
            board: pair.source_board.to_string(),
        });
    }
    let list_names: HashMap<ListId, String> =
        lists.into_iter().map(|l| (l.id, l.name)).collect();

    let labels: LabelNames = client
        .board_labels(&pair.source_board)?
        .into_iter()
        .map(|l| (l.id, l.name))
        .collect();

    let cards = client.board_cards(&pair.source_board)?;
    Ok(cards
        .into_iter()
        .map(|card| {
            let list_name = list_names.get(&card.list_id).cloned();
            let decision = evaluate(&card, list_name.as_deref(), &labels, rules);
            tracing::debug!(
                "'{}' → promote={} ({:?})",
                card.title,
                decision.promote,
                decision.reason
            );
            Assessment {
                card,
                list_name,
                decision,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use boardsync_core::types::{CardId, CheckItem, CheckItemId, Checklist, ChecklistId, LabelId};
    use rstest::rstest;

    use super::*;

    fn checklist(name: &str, done: usize, total: usize) -> Checklist {
        Checklist {
            id: ChecklistId::from(format!("cl-{name}")),
            name: name.to_string(),
            items: (0..total)
                .map(|i| CheckItem {
                    id: CheckItemId::from(format!("i{i}")),
                    name: format!("item {i}"),
                    done: i < done,
                })
                .collect(),
        }
    }

    fn card(labels: &[&str], checklists: Vec<Checklist>) -> Card {
        Card {
            id: CardId::from("c1"),
            title: "Grant A".into(),
            description: String::new(),
            due: None,
            list_id: ListId::from("l1"),
            closed: false,
            label_ids: labels.iter().map(|l| LabelId::from(*l)).collect(),
            member_ids: BTreeSet::new(),
            attachments: vec![],
            checklists,
            comments: vec![],
        }
    }

    fn label_names() -> LabelNames {
        [
            (LabelId::from("done"), "Completed".to_string()),
            (LabelId::from("urgent"), "Urgent".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[rstest]
    #[case(3, 4, true)]
    #[case(2, 4, false)]
    #[case(4, 4, true)]
    #[case(0, 0, false)]
    fn progress_threshold(#[case] done: usize, #[case] total: usize, #[case] promote: bool) {
        let c = card(&[], vec![checklist("In-Progress", done, total)]);
        let d = evaluate(&c, Some("Backlog"), &label_names(), &PromotionRules::default());
        assert_eq!(d.promote, promote, "{done}/{total}: {:?}", d.reason);
    }

    #[rstest]
    #[case("Priority IV")]
    #[case("priority iv")]
    #[case("  PRIORITY IV ")]
    fn priority_list_promotes_without_checklist(#[case] list: &str) {
        let c = card(&["urgent"], vec![]);
        let d = evaluate(&c, Some(list), &label_names(), &PromotionRules::default());
        assert!(d.promote);
        assert!(matches!(d.reason, DecisionReason::PriorityList { .. }));
    }

    #[rstest]
    #[case(Some("Priority IV"), 4)]
    #[case(Some("Backlog"), 4)]
    #[case(None, 0)]
    fn completed_label_always_wins(#[case] list: Option<&str>, #[case] done: usize) {
        let c = card(&["done"], vec![checklist("In-Progress", done, 4)]);
        let d = evaluate(&c, list, &label_names(), &PromotionRules::default());
        assert!(!d.promote);
        assert_eq!(
            d.reason,
            DecisionReason::CompletedLabel {
                label: "Completed".into()
            }
        );
    }

    #[test]
    fn checklist_name_is_case_insensitive() {
        let c = card(&[], vec![checklist("in-progress", 3, 4)]);
        let d = evaluate(&c, None, &label_names(), &PromotionRules::default());
        assert_eq!(d.reason, DecisionReason::ChecklistProgress { ratio: 0.75 });
    }

    #[test]
    fn other_checklists_do_not_count() {
        let c = card(&[], vec![checklist("Reviews", 4, 4)]);
        let d = evaluate(&c, None, &label_names(), &PromotionRules::default());
        assert!(!d.promote);
        assert_eq!(d.reason, DecisionReason::BelowThreshold { ratio: None });
    }

    #[test]
    fn unknown_label_ids_are_ignored() {
        let c = card(&["ghost"], vec![checklist("In-Progress", 4, 4)]);
        let d = evaluate(&c, None, &label_names(), &PromotionRules::default());
        assert!(d.promote);
    }

    #[test]
    fn closed_card_is_never_promoted() {
        let mut c = card(&[], vec![]);
        c.closed = true;
        let d = evaluate(&c, Some("Priority IV"), &label_names(), &PromotionRules::default());
        assert_eq!(d.reason, DecisionReason::Closed);
    }

    #[test]
    fn custom_threshold_is_respected() {
        let rules = PromotionRules {
            threshold: 0.5,
            ..PromotionRules::default()
        };
        let c = card(&[], vec![checklist("In-Progress", 2, 4)]);
        assert!(evaluate(&c, None, &label_names(), &rules).promote);
    }
}
