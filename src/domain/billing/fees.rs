//! Fee split between the platform and the coach for one payment.
//!
//! Amounts are integer cents. Rates are basis points (1/100 of a percent).

use serde::{Deserialize, Serialize};

const BPS_DENOMINATOR: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Platform cut when the invoice carries no application fee.
    pub platform_fee_bps: u32,
    /// Estimated processor percentage fee.
    pub processor_fee_bps: u32,
    /// Estimated processor fixed fee per charge.
    pub processor_fee_fixed_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub coach_amount_cents: i64,
    pub processor_fee_cents: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_bps: 1_000,
            processor_fee_bps: 399,
            processor_fee_fixed_cents: 39,
        }
    }
}

impl FeeSchedule {
    /// Splits a paid amount.
    ///
    /// `application_fee_cents` is the invoice's own application fee and wins
    /// over the configured percentage. The platform fee is clamped to
    /// `[0, amount]` so the coach amount is never negative.
    pub fn split(&self, amount_cents: i64, application_fee_cents: Option<i64>) -> FeeSplit {
        let amount_cents = amount_cents.max(0);
        let platform_fee_cents = application_fee_cents
            .unwrap_or_else(|| apply_bps(amount_cents, self.platform_fee_bps))
            .clamp(0, amount_cents);

        let processor_fee_cents = if amount_cents == 0 {
            0
        } else {
            apply_bps(amount_cents, self.processor_fee_bps) + self.processor_fee_fixed_cents.max(0)
        };

        FeeSplit {
            amount_cents,
            platform_fee_cents,
            coach_amount_cents: amount_cents - platform_fee_cents,
            processor_fee_cents,
        }
    }
}

/// Rounds half up.
fn apply_bps(amount_cents: i64, bps: u32) -> i64 {
    let scaled = i128::from(amount_cents) * i128::from(bps);
    let denom = i128::from(BPS_DENOMINATOR);
    ((scaled + denom / 2) / denom) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn configured_percentage_applies_without_application_fee() {
        let split = FeeSchedule::default().split(5_000, None);

        assert_eq!(split.platform_fee_cents, 500);
        assert_eq!(split.coach_amount_cents, 4_500);
        // 3.99% of 5000 = 199.5 -> 200, plus 39 fixed
        assert_eq!(split.processor_fee_cents, 239);
    }

    #[test]
    fn application_fee_overrides_percentage() {
        let split = FeeSchedule::default().split(5_000, Some(750));

        assert_eq!(split.platform_fee_cents, 750);
        assert_eq!(split.coach_amount_cents, 4_250);
    }

    #[test]
    fn oversized_application_fee_is_clamped() {
        let split = FeeSchedule::default().split(1_000, Some(5_000));

        assert_eq!(split.platform_fee_cents, 1_000);
        assert_eq!(split.coach_amount_cents, 0);
    }

    #[test]
    fn zero_amount_has_no_processor_fee() {
        let split = FeeSchedule::default().split(0, None);
        assert_eq!(split, FeeSplit {
            amount_cents: 0,
            platform_fee_cents: 0,
            coach_amount_cents: 0,
            processor_fee_cents: 0,
        });
    }

    proptest! {
        #[test]
        fn platform_and_coach_shares_sum_to_amount(
            amount in 0i64..10_000_000,
            fee in proptest::option::of(-1_000i64..20_000_000),
            bps in 0u32..=10_000,
        ) {
            let schedule = FeeSchedule { platform_fee_bps: bps, ..FeeSchedule::default() };
            let split = schedule.split(amount, fee);

            prop_assert_eq!(split.platform_fee_cents + split.coach_amount_cents, amount);
            prop_assert!(split.platform_fee_cents >= 0);
            prop_assert!(split.coach_amount_cents >= 0);
        }

        #[test]
        fn processor_fee_grows_with_amount(a in 1i64..1_000_000, b in 1i64..1_000_000) {
            let schedule = FeeSchedule::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(schedule.split(lo, None).processor_fee_cents
                <= schedule.split(hi, None).processor_fee_cents);
        }
    }
}
