//! Platform Settings Model

use serde::{Deserialize, Serialize};

/// Immutable snapshot of the active platform fee configuration
///
/// Fetched once per operation and passed down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PlatformSettings {
    /// Class booking fee, basis points
    pub class_fee_rate_bps: i64,
    /// Marketplace fee, basis points
    pub marketplace_fee_rate_bps: i64,
}

impl PlatformSettings {
    /// Platform share of a class booking (floor), saturating at `i64` bounds
    pub fn class_fee(&self, amount: i64) -> i64 {
        let fee = i128::from(amount) * i128::from(self.class_fee_rate_bps) / 10_000;
        i64::try_from(fee).unwrap_or(if fee < 0 { i64::MIN } else { i64::MAX })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_fee_floors() {
        let settings = PlatformSettings {
            class_fee_rate_bps: 350,
            marketplace_fee_rate_bps: 0,
        };
        assert_eq!(settings.class_fee(50_000), 1_750);
        assert_eq!(settings.class_fee(999), 34);
        assert_eq!(PlatformSettings::default().class_fee(50_000), 0);
    }

    #[test]
    fn test_class_fee_large_values_do_not_overflow() {
        let settings = PlatformSettings {
            class_fee_rate_bps: 10_000,
            marketplace_fee_rate_bps: 0,
        };
        assert_eq!(settings.class_fee(i64::MAX), i64::MAX);

        let settings = PlatformSettings {
            class_fee_rate_bps: i64::MAX,
            marketplace_fee_rate_bps: 0,
        };
        assert_eq!(settings.class_fee(i64::MAX), i64::MAX);
        assert_eq!(settings.class_fee(1_000_000), i64::MAX);
    }
}
