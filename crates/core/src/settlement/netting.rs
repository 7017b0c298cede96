//! Settlement netting.
//!
//! Greedy largest-debtor/largest-creditor matching. This is the usual approximation used
//! by expense-splitting tools and is not guaranteed to find the minimum number of
//! transfers (that problem is NP-hard), but it never emits more than `n - 1` transfers
//! for `n` unsettled users.

use rust_decimal::Decimal;
use tripper_shared::types::{UserId, round_money};

use super::types::{Balances, Transfer};

/// Balances within this distance of zero count as settled.
pub const SETTLED_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Computes the transfers that zero out `balances`.
///
/// Creditors and debtors are each ordered by descending magnitude. Ties keep the
/// balance map's user-id order, so identical input always yields identical output.
#[must_use]
pub fn compute_transfers(balances: &Balances) -> Vec<Transfer> {
    let mut creditors: Vec<(UserId, Decimal)> = Vec::new();
    let mut debtors: Vec<(UserId, Decimal)> = Vec::new();

    for (user, balance) in balances {
        if *balance > SETTLED_TOLERANCE {
            creditors.push((*user, *balance));
        } else if *balance < -SETTLED_TOLERANCE {
            debtors.push((*user, balance.abs()));
        }
    }

    // sort_by is stable
    creditors.sort_by(|a, b| b.1.cmp(&a.1));
    debtors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut transfers = Vec::with_capacity(creditors.len() + debtors.len());
    let (mut d, mut c) = (0, 0);

    while d < debtors.len() && c < creditors.len() {
        let (debtor, owed) = debtors[d];
        let (creditor, due) = creditors[c];

        let amount = round_money(owed.min(due));
        if amount > Decimal::ZERO {
            transfers.push(Transfer {
                from: debtor,
                to: creditor,
                amount,
            });
        }

        debtors[d].1 -= amount;
        creditors[c].1 -= amount;

        if debtors[d].1 <= SETTLED_TOLERANCE {
            d += 1;
        }
        if creditors[c].1 <= SETTLED_TOLERANCE {
            c += 1;
        }
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn user(n: u128) -> UserId {
        UserId::from_uuid(Uuid::from_u128(n))
    }

    fn balances(entries: &[(u128, Decimal)]) -> Balances {
        entries.iter().map(|(n, b)| (user(*n), *b)).collect()
    }

    #[test]
    fn test_tolerance_is_half_a_cent() {
        assert_eq!(SETTLED_TOLERANCE, dec!(0.005));
    }

    #[test]
    fn test_one_creditor_two_debtors() {
        let transfers =
            compute_transfers(&balances(&[(1, dec!(60)), (2, dec!(-30)), (3, dec!(-30))]));

        assert_eq!(
            transfers,
            vec![
                Transfer { from: user(2), to: user(1), amount: dec!(30.00) },
                Transfer { from: user(3), to: user(1), amount: dec!(30.00) },
            ]
        );
    }

    #[test]
    fn test_rounding_residue_does_not_create_extra_transfer() {
        // 66.67 / -33.33 / -33.33 sums to 0.01; the leftover cent stays with the creditor.
        let transfers = compute_transfers(&balances(&[
            (1, dec!(66.67)),
            (2, dec!(-33.33)),
            (3, dec!(-33.33)),
        ]));

        assert_eq!(transfers.len(), 2);
        assert!(transfers.iter().all(|t| t.to == user(1) && t.amount == dec!(33.33)));
    }

    #[test]
    fn test_largest_debtor_pays_largest_creditor_first() {
        let transfers = compute_transfers(&balances(&[
            (1, dec!(10)),
            (2, dec!(50)),
            (3, dec!(-45)),
            (4, dec!(-15)),
        ]));

        assert_eq!(
            transfers,
            vec![
                Transfer { from: user(3), to: user(2), amount: dec!(45) },
                Transfer { from: user(4), to: user(2), amount: dec!(5) },
                Transfer { from: user(4), to: user(1), amount: dec!(10) },
            ]
        );
    }

    #[test]
    fn test_settled_users_are_excluded() {
        let transfers = compute_transfers(&balances(&[
            (1, dec!(0.004)),
            (2, dec!(-0.005)),
            (3, dec!(0)),
        ]));

        assert!(transfers.is_empty());
    }

    #[rstest]
    #[case(dec!(0.005), 0)]
    #[case(dec!(0.006), 1)]
    #[case(dec!(0.01), 1)]
    #[case(dec!(12.34), 1)]
    fn test_settled_threshold(#[case] owed: Decimal, #[case] expected: usize) {
        let transfers = compute_transfers(&balances(&[(1, owed), (2, -owed)]));
        assert_eq!(transfers.len(), expected);
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_transfers(&Balances::new()).is_empty());
    }

    #[test]
    fn test_equal_magnitudes_keep_user_order() {
        let input = balances(&[(1, dec!(20)), (2, dec!(20)), (3, dec!(-20)), (4, dec!(-20))]);

        let first = compute_transfers(&input);
        let second = compute_transfers(&input);

        assert_eq!(first, second);
        assert_eq!(first[0].from, user(3));
        assert_eq!(first[0].to, user(1));
    }
}
