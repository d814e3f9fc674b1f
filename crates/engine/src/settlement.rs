//! Debt netting.
//!
//! Converts a roster plus an expense log into the minimal set of pairwise
//! net payments: one directional amount per participant pair, mutual debts
//! cancelled. This is a pure computation with no I/O, no mutation of inputs
//! and deterministic output for a given input order, so it can run once per
//! read request with no coordination.
//!
//! Stale references are a normal lifecycle state, not an error: deleting a
//! participant leaves their name inside stored expenses. Such expenses still
//! count toward the trip total, but debts are only accrued between
//! participants currently on the roster.

use std::collections::HashMap;

use crate::{
    EngineError, ResultEngine,
    expenses::{Expense, Split, WeightedMode},
    money::MoneyCents,
    participants::Participant,
};

/// Net imbalances of at most this many minor units are reported as settled.
///
/// With integer money the only drift left is the rounding of percent shares
/// and exact-mode entries, so one cent of slack is enough. This is the single
/// tolerance used everywhere; callers must not layer their own on top.
pub const SETTLEMENT_EPSILON_MINOR: i64 = 1;

/// A single directional amount one participant must pay another after
/// cancellation of mutual debts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetPayment {
    pub from: String,
    pub to: String,
    pub amount: MoneyCents,
}

/// The outcome of one settlement computation.
///
/// Produced fresh on every call and never persisted; `total_spent` covers
/// every logged expense, including those whose payer has left the roster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementResult {
    pub total_spent: MoneyCents,
    pub net_payments: Vec<NetPayment>,
}

/// Computes who owes whom for one snapshot of a trip.
///
/// The participant order fixes the pair iteration order of the output;
/// callers that need byte-stable results across calls should pass a stable
/// order (the engine passes the roster sorted by name).
///
/// Fails fast on a non-positive expense amount: that is corrupted input,
/// not a lifecycle state. Dangling payer or sharer names are excluded
/// silently instead (see module docs).
pub fn compute_settlement(
    participants: &[Participant],
    expenses: &[Expense],
) -> ResultEngine<SettlementResult> {
    let names: Vec<&str> = participants
        .iter()
        .map(|participant| participant.name.as_str())
        .collect();
    let mut index_by_name: HashMap<&str, usize> = HashMap::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        index_by_name.insert(*name, idx);
    }

    let n = names.len();
    // owed[i * n + j] accumulates how much names[i] owes names[j], across
    // all expenses, in minor units.
    let mut owed = vec![0i64; n * n];
    let mut total_spent = MoneyCents::ZERO;

    for expense in expenses {
        if !expense.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "expense {} has a non-positive amount",
                expense.id
            )));
        }
        total_spent += expense.amount;

        let Some(&payer) = index_by_name.get(expense.payer_name.as_str()) else {
            // Payer no longer on the roster: the amount stays in the total,
            // the debts are gone.
            continue;
        };

        for (sharer, share) in resolve_shares(expense, &index_by_name) {
            if sharer == payer || share == 0 {
                continue;
            }
            owed[sharer * n + payer] += share;
        }
    }

    // Each unordered pair is visited exactly once; the direction of the
    // emitted payment follows the sign of the net, not the name order.
    let mut net_payments = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let net = owed[i * n + j] - owed[j * n + i];
            if net > SETTLEMENT_EPSILON_MINOR {
                net_payments.push(NetPayment {
                    from: names[i].to_string(),
                    to: names[j].to_string(),
                    amount: MoneyCents::new(net),
                });
            } else if net < -SETTLEMENT_EPSILON_MINOR {
                net_payments.push(NetPayment {
                    from: names[j].to_string(),
                    to: names[i].to_string(),
                    amount: MoneyCents::new(-net),
                });
            }
        }
    }

    Ok(SettlementResult {
        total_spent,
        net_payments,
    })
}

/// Resolves an expense's split into `(participant index, share_minor)`
/// pairs, dropping entries whose name no longer matches a current
/// participant.
///
/// An equal split divides over the *filtered* sharer count, so the remaining
/// sharers still cover the whole amount between them; a filtered-to-empty
/// sharer list simply contributes nothing.
fn resolve_shares(expense: &Expense, index_by_name: &HashMap<&str, usize>) -> Vec<(usize, i64)> {
    match &expense.split {
        Split::Equal { sharers } => {
            let present: Vec<usize> = sharers
                .iter()
                .filter_map(|name| index_by_name.get(name.as_str()).copied())
                .collect();
            let shares = expense.amount.equal_shares(present.len());
            present
                .into_iter()
                .zip(shares.into_iter().map(MoneyCents::cents))
                .collect()
        }
        Split::Weighted { mode, entries } => entries
            .iter()
            .filter_map(|entry| {
                let idx = index_by_name.get(entry.name.as_str()).copied()?;
                let share = match mode {
                    WeightedMode::Percent => expense.amount.basis_point_share(entry.weight),
                    WeightedMode::Exact => MoneyCents::new(entry.weight),
                };
                Some((idx, share.cents()))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Currency, expenses::SplitEntry};
    use chrono::Utc;
    use uuid::Uuid;

    fn roster(names: &[&str]) -> Vec<Participant> {
        names
            .iter()
            .map(|name| Participant {
                id: Uuid::new_v4(),
                name: (*name).to_string(),
            })
            .collect()
    }

    fn expense(amount_minor: i64, payer: &str, split: Split) -> Expense {
        Expense::new(
            "trip".to_string(),
            "Dinner".to_string(),
            MoneyCents::new(amount_minor),
            Currency::Eur,
            payer.to_string(),
            None,
            split,
            Utc::now(),
            "owner".to_string(),
        )
        .unwrap()
    }

    fn equal(amount_minor: i64, payer: &str, sharers: &[&str]) -> Expense {
        expense(
            amount_minor,
            payer,
            Split::Equal {
                sharers: sharers.iter().map(|s| (*s).to_string()).collect(),
            },
        )
    }

    fn weighted(
        amount_minor: i64,
        payer: &str,
        mode: WeightedMode,
        entries: &[(&str, i64)],
    ) -> Expense {
        expense(
            amount_minor,
            payer,
            Split::Weighted {
                mode,
                entries: entries
                    .iter()
                    .map(|(name, weight)| SplitEntry {
                        name: (*name).to_string(),
                        weight: *weight,
                    })
                    .collect(),
            },
        )
    }

    fn payment(from: &str, to: &str, amount_minor: i64) -> NetPayment {
        NetPayment {
            from: from.to_string(),
            to: to.to_string(),
            amount: MoneyCents::new(amount_minor),
        }
    }

    #[test]
    fn empty_inputs_settle_to_nothing() {
        let result = compute_settlement(&[], &[]).unwrap();
        assert_eq!(result.total_spent, MoneyCents::ZERO);
        assert!(result.net_payments.is_empty());
    }

    #[test]
    fn single_equal_expense_splits_in_half() {
        let participants = roster(&["Alice", "Bob"]);
        let expenses = [equal(100_00, "Alice", &["Alice", "Bob"])];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(result.total_spent.cents(), 100_00);
        assert_eq!(result.net_payments, vec![payment("Bob", "Alice", 50_00)]);
    }

    #[test]
    fn mutual_debts_collapse_to_one_edge() {
        let participants = roster(&["Alice", "Bob"]);
        let expenses = [
            equal(100_00, "Alice", &["Alice", "Bob"]),
            equal(60_00, "Bob", &["Alice", "Bob"]),
        ];

        // Bob owes Alice 50, Alice owes Bob 30: one edge of 20 remains.
        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(result.net_payments, vec![payment("Bob", "Alice", 20_00)]);
    }

    #[test]
    fn exact_splits_use_stored_weights_directly() {
        let participants = roster(&["Alice", "Bob", "Carol"]);
        let expenses = [weighted(
            90_00,
            "Alice",
            WeightedMode::Exact,
            &[("Bob", 30_00), ("Carol", 60_00)],
        )];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(
            result.net_payments,
            vec![
                payment("Bob", "Alice", 30_00),
                payment("Carol", "Alice", 60_00),
            ]
        );
    }

    #[test]
    fn percent_splits_scale_the_amount() {
        let participants = roster(&["Alice", "Bob", "Carol"]);
        // 25% each: the weights are not required to sum to 100%.
        let expenses = [weighted(
            200_00,
            "Alice",
            WeightedMode::Percent,
            &[("Bob", 2500), ("Carol", 2500)],
        )];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(
            result.net_payments,
            vec![
                payment("Bob", "Alice", 50_00),
                payment("Carol", "Alice", 50_00),
            ]
        );
    }

    #[test]
    fn deleted_sharer_is_excluded_but_total_is_kept() {
        // Carol was removed from the roster after the expense was logged.
        let participants = roster(&["Alice", "Bob"]);
        let expenses = [equal(90_00, "Alice", &["Alice", "Bob", "Carol"])];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(result.total_spent.cents(), 90_00);
        // The equal split divides over the two remaining sharers.
        assert_eq!(result.net_payments, vec![payment("Bob", "Alice", 45_00)]);
        assert!(
            result
                .net_payments
                .iter()
                .all(|p| p.from != "Carol" && p.to != "Carol")
        );
    }

    #[test]
    fn deleted_payer_contributes_no_debt() {
        let participants = roster(&["Alice", "Bob"]);
        let expenses = [
            equal(100_00, "Alice", &["Alice", "Bob"]),
            // Carol paid this one before she was removed.
            equal(80_00, "Carol", &["Alice", "Bob"]),
        ];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(result.total_spent.cents(), 180_00);
        assert_eq!(result.net_payments, vec![payment("Bob", "Alice", 50_00)]);
    }

    #[test]
    fn fully_dangling_equal_split_contributes_nothing() {
        let participants = roster(&["Alice", "Bob"]);
        let expenses = [equal(50_00, "Alice", &["Carol", "Dave"])];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(result.total_spent.cents(), 50_00);
        assert!(result.net_payments.is_empty());
    }

    #[test]
    fn no_self_debt_is_ever_emitted() {
        let participants = roster(&["Alice", "Bob", "Carol"]);
        let expenses = [
            equal(90_00, "Alice", &["Alice", "Bob", "Carol"]),
            weighted(
                40_00,
                "Bob",
                WeightedMode::Exact,
                &[("Bob", 10_00), ("Alice", 30_00)],
            ),
        ];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert!(result.net_payments.iter().all(|p| p.from != p.to));
        assert!(result.net_payments.iter().all(|p| p.amount.is_positive()));
    }

    #[test]
    fn at_most_one_edge_per_pair() {
        let participants = roster(&["Alice", "Bob", "Carol"]);
        let expenses = [
            equal(90_00, "Alice", &["Alice", "Bob", "Carol"]),
            equal(60_00, "Bob", &["Alice", "Bob", "Carol"]),
            equal(30_00, "Carol", &["Alice", "Bob", "Carol"]),
        ];

        let result = compute_settlement(&participants, &expenses).unwrap();
        let mut pairs: Vec<(String, String)> = result
            .net_payments
            .iter()
            .map(|p| {
                let mut pair = [p.from.clone(), p.to.clone()];
                pair.sort();
                (pair[0].clone(), pair[1].clone())
            })
            .collect();
        let before = pairs.len();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), before, "a pair appeared in both directions");
    }

    #[test]
    fn equal_splits_conserve_every_cent() {
        let participants = roster(&["Alice", "Bob", "Carol"]);
        let expenses = [
            equal(100_00, "Alice", &["Alice", "Bob", "Carol"]),
            equal(45_67, "Bob", &["Alice", "Bob"]),
            equal(10_01, "Carol", &["Alice", "Bob", "Carol"]),
        ];

        // paid minus own share, per participant
        let mut balance: HashMap<&str, i64> = HashMap::new();
        for expense in &expenses {
            *balance.entry(expense.payer_name.as_str()).or_insert(0) +=
                expense.amount.cents();
            let Split::Equal { sharers } = &expense.split else {
                unreachable!();
            };
            let shares = expense.amount.equal_shares(sharers.len());
            for (name, share) in sharers.iter().zip(shares) {
                *balance.entry(name.as_str()).or_insert(0) -= share.cents();
            }
        }
        assert_eq!(balance.values().sum::<i64>(), 0);

        // applying the net payments drives every balance to zero, within the
        // one-cent-per-pair tolerance
        let result = compute_settlement(&participants, &expenses).unwrap();
        for p in &result.net_payments {
            *balance.entry(p.from.as_str()).or_insert(0) += p.amount.cents();
            *balance.entry(p.to.as_str()).or_insert(0) -= p.amount.cents();
        }
        let pair_count = (participants.len() * (participants.len() - 1) / 2) as i64;
        for (name, remaining) in balance {
            assert!(
                remaining.abs() <= SETTLEMENT_EPSILON_MINOR * pair_count,
                "{name} left with {remaining} cents outstanding"
            );
        }
    }

    #[test]
    fn identical_inputs_yield_identical_results() {
        let participants = roster(&["Alice", "Bob", "Carol"]);
        let expenses = [
            equal(100_00, "Alice", &["Alice", "Bob", "Carol"]),
            weighted(
                80_00,
                "Bob",
                WeightedMode::Percent,
                &[("Alice", 5000), ("Carol", 5000)],
            ),
        ];

        let first = compute_settlement(&participants, &expenses).unwrap();
        let second = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn one_cent_imbalance_counts_as_settled() {
        let participants = roster(&["Alice", "Bob"]);
        let expenses = [weighted(10_00, "Alice", WeightedMode::Exact, &[("Bob", 1)])];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert!(result.net_payments.is_empty());
        assert_eq!(result.total_spent.cents(), 10_00);
    }

    #[test]
    fn two_cent_imbalance_is_emitted() {
        let participants = roster(&["Alice", "Bob"]);
        let expenses = [weighted(10_00, "Alice", WeightedMode::Exact, &[("Bob", 2)])];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(result.net_payments, vec![payment("Bob", "Alice", 2)]);
    }

    #[test]
    fn equal_remainder_goes_to_earliest_sharers() {
        let participants = roster(&["Alice", "Bob", "Carol"]);
        // 100.00 over three people: 33.34 + 33.33 + 33.33
        let expenses = [equal(100_00, "Alice", &["Alice", "Bob", "Carol"])];

        let result = compute_settlement(&participants, &expenses).unwrap();
        assert_eq!(
            result.net_payments,
            vec![
                payment("Bob", "Alice", 33_33),
                payment("Carol", "Alice", 33_33),
            ]
        );
    }

    #[test]
    fn non_positive_amount_fails_fast() {
        let participants = roster(&["Alice", "Bob"]);
        let corrupted = Expense {
            id: Uuid::new_v4(),
            trip_id: "trip".to_string(),
            title: "Dinner".to_string(),
            amount: MoneyCents::ZERO,
            currency: Currency::Eur,
            payer_name: "Alice".to_string(),
            category: None,
            split: Split::Equal {
                sharers: vec!["Alice".to_string(), "Bob".to_string()],
            },
            occurred_at: Utc::now(),
            created_by: "owner".to_string(),
        };

        assert!(matches!(
            compute_settlement(&participants, std::slice::from_ref(&corrupted)),
            Err(EngineError::InvalidAmount(_))
        ));
    }
}
