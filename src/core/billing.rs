//! Credit-card billing cycle: which statement a purchase lands on and when it is due.

use crate::core::kinds::ClosingPolicy;
use chrono::{Datelike, Months, NaiveDate};

/// A card's billing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingCycle {
    /// Day the statement closes
    pub closing_day: u32,
    /// Day the statement is due, in the month after the statement month
    pub due_day: u32,
    /// Closing policy
    pub policy: ClosingPolicy,
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    first
        .and_then(|d| d.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map_or(28, |last| last.day())
}

/// Day `day` of the month containing `month_start`, clipped to the month's length.
fn clipped_day(month_start: NaiveDate, day: u32) -> NaiveDate {
    let last = last_day_of_month(month_start.year(), month_start.month());
    month_start
        .with_day(day.clamp(1, last))
        .unwrap_or(month_start)
}

impl BillingCycle {
    /// First day of the statement month a purchase on `date` belongs to.
    #[must_use]
    pub fn statement_month(&self, date: NaiveDate) -> NaiveDate {
        let this_month = first_of_month(date);
        match self.policy {
            ClosingPolicy::Standard if date.day() > self.closing_day => this_month
                .checked_add_months(Months::new(1))
                .unwrap_or(this_month),
            ClosingPolicy::Standard | ClosingPolicy::PreviousClosing => this_month,
        }
    }

    /// Due date of the statement a purchase on `date` lands on.
    #[must_use]
    pub fn due_date(&self, date: NaiveDate) -> NaiveDate {
        let statement = self.statement_month(date);
        let due_month = statement
            .checked_add_months(Months::new(1))
            .unwrap_or(statement);
        clipped_day(due_month, self.due_day)
    }

    /// Due dates of an `n`-installment purchase made on `date`.
    ///
    /// Installment *k* is due `k - 1` months after the first, on the same day of month
    /// when the calendar allows and on the month's last day otherwise.
    #[must_use]
    pub fn installment_due_dates(&self, date: NaiveDate, installments: u32) -> Vec<NaiveDate> {
        let first = self.due_date(date);
        (0..installments.max(1))
            .map(|k| first.checked_add_months(Months::new(k)).unwrap_or(first))
            .collect()
    }
}
