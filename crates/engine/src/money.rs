use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (expense amounts,
/// shares, net payments) to avoid floating-point drift. Division only happens
/// through the split helpers below, which keep the lost remainder explicit.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34€");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Splits the amount into `count` equal shares that sum back to the
    /// original amount exactly.
    ///
    /// Integer division leaves `amount % count` cents over; those are handed
    /// out one cent each to the earliest shares, so the earliest positions
    /// may carry one cent more than the later ones. Returns an empty vector
    /// for `count == 0`.
    ///
    /// ```rust
    /// use engine::MoneyCents;
    ///
    /// let shares = MoneyCents::new(100_00).equal_shares(3);
    /// assert_eq!(shares.iter().map(|s| s.cents()).collect::<Vec<_>>(), vec![3334, 3333, 3333]);
    /// ```
    #[must_use]
    pub fn equal_shares(self, count: usize) -> Vec<MoneyCents> {
        if count == 0 {
            return Vec::new();
        }

        let count_i = count as i64;
        let base = self.0 / count_i;
        let remainder = (self.0 % count_i).unsigned_abs() as usize;
        let step = if self.0 < 0 { -1 } else { 1 };

        (0..count)
            .map(|idx| MoneyCents(base + if idx < remainder { step } else { 0 }))
            .collect()
    }

    /// Returns the share of this amount described by a weight in hundredths
    /// of a percent (basis points), truncated toward zero.
    ///
    /// `10_000` basis points = 100%. The intermediate product is computed in
    /// `i128`, so the multiplication cannot overflow for any pair of `i64`
    /// inputs.
    #[must_use]
    pub fn basis_point_share(self, weight_bp: i64) -> MoneyCents {
        let scaled = (self.0 as i128 * weight_bp as i128) / 10_000;
        MoneyCents(scaled as i64)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let euros = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{euros}.{cents:02}€")
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_eur() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00€");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01€");
        assert_eq!(MoneyCents::new(10).to_string(), "0.10€");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50€");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50€");
    }

    #[test]
    fn equal_shares_sum_back_to_the_amount() {
        for (amount, count) in [(100_00, 3), (1, 2), (99, 4), (10_00, 1)] {
            let shares = MoneyCents::new(amount).equal_shares(count);
            assert_eq!(shares.len(), count);
            let sum: i64 = shares.iter().map(|s| s.cents()).sum();
            assert_eq!(sum, amount, "amount {amount} split {count} ways");
        }
    }

    #[test]
    fn equal_shares_hand_remainder_to_earliest() {
        let shares = MoneyCents::new(100).equal_shares(3);
        assert_eq!(
            shares.iter().map(|s| s.cents()).collect::<Vec<_>>(),
            vec![34, 33, 33]
        );
    }

    #[test]
    fn equal_shares_of_zero_count_is_empty() {
        assert!(MoneyCents::new(100).equal_shares(0).is_empty());
    }

    #[test]
    fn basis_point_share_truncates() {
        // 25.5% of 10.00€
        assert_eq!(MoneyCents::new(10_00).basis_point_share(2550).cents(), 255);
        // 33.33% of 1.00€ truncates the third decimal
        assert_eq!(MoneyCents::new(100).basis_point_share(3333).cents(), 33);
        assert_eq!(MoneyCents::new(100).basis_point_share(10_000).cents(), 100);
        assert_eq!(MoneyCents::new(100).basis_point_share(0).cents(), 0);
    }
}
