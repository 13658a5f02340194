//! Transaction history types.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, CredentialDigest, Money, RecordId};

/// An immutable, append-only history entry for one balance increase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: RecordId,
    pub account_id: AccountId,
    /// Delta applied to the balance when the record was written.
    pub amount: Money,
    pub recorded_at: DateTime<Utc>,
}

/// Count and total of an account's records within a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub count: u64,
    pub total: Money,
}

impl ActivitySummary {
    pub const EMPTY: ActivitySummary = ActivitySummary {
        count: 0,
        total: Money::ZERO,
    };

    /// Aggregate a set of records (no filtering).
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TransactionRecord>) -> Self {
        records.into_iter().fold(Self::EMPTY, |acc, r| ActivitySummary {
            count: acc.count + 1,
            total: Money::new(acc.total.units() + r.amount.units()),
        })
    }
}

/// A calendar month (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthWindow {
    pub year: i32,
    /// 1-based month.
    pub month: u32,
}

impl MonthWindow {
    /// The month `now` falls in.
    pub fn containing(now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// Half-open `[first instant, first instant of next month)`.
    ///
    /// `None` for an invalid month or a date outside chrono's range.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let (next_year, next_month) = if self.month == 12 {
            (self.year.checked_add(1)?, 1)
        } else {
            (self.year, self.month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
        Some((
            start.and_hms_opt(0, 0, 0)?.and_utc(),
            end.and_hms_opt(0, 0, 0)?.and_utc(),
        ))
    }
}

/// One atomic replenishment: conditional balance write plus its history record.
///
/// Stores apply it only if the account row still matches `account_id` +
/// `digest` AND still holds `expected_balance`; otherwise nothing is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceCommit {
    pub account_id: AccountId,
    pub digest: CredentialDigest,
    pub expected_balance: Money,
    pub new_balance: Money,
    pub amount: Money,
    pub recorded_at: DateTime<Utc>,
}
