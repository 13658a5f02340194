//! Identity-tier balance limits.

use serde::{Deserialize, Serialize};

use wallet_core::Money;

/// Maximum balance per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub unidentified_max: Money,
    pub identified_max: Money,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self {
            unidentified_max: Money::new(10_000),
            identified_max: Money::new(100_000),
        }
    }
}

/// Why a replenishment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitRejection {
    UnidentifiedLimitExceeded { limit: Money },
    IdentifiedLimitExceeded { limit: Money },
}

impl TierLimits {
    /// Decide the balance after adding `amount` to `balance`.
    ///
    /// Checked in this order, first match wins:
    /// 1. new balance within the unidentified cap → allowed for every tier;
    /// 2. above it and not identified → `UnidentifiedLimitExceeded`;
    /// 3. within the identified cap → allowed;
    /// 4. otherwise (overflow included) → `IdentifiedLimitExceeded`.
    pub fn evaluate(
        &self,
        balance: Money,
        amount: Money,
        identified: bool,
    ) -> Result<Money, LimitRejection> {
        let Some(new_balance) = balance.checked_add(amount) else {
            return Err(LimitRejection::IdentifiedLimitExceeded {
                limit: self.identified_max,
            });
        };

        if new_balance <= self.unidentified_max {
            Ok(new_balance)
        } else if !identified {
            Err(LimitRejection::UnidentifiedLimitExceeded {
                limit: self.unidentified_max,
            })
        } else if new_balance <= self.identified_max {
            Ok(new_balance)
        } else {
            Err(LimitRejection::IdentifiedLimitExceeded {
                limit: self.identified_max,
            })
        }
    }
}
