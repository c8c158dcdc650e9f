use crate::state::BillingMonth;
use crate::state::QuotaCounter;
use chrono::DateTime;
use chrono::Local;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Allowed,
    /// Not enough quota left this month; work may resume at `resume_at`.
    Exhausted { resume_at: DateTime<Local> },
}

/// Enforces the monthly classification budget against a [`QuotaCounter`].
#[derive(Debug, Clone, Copy)]
pub struct QuotaGovernor {
    monthly_limit: u32,
}

impl QuotaGovernor {
    pub fn new(monthly_limit: u32) -> Self {
        Self { monthly_limit }
    }

    pub fn monthly_limit(&self) -> u32 {
        self.monthly_limit
    }

    /// Checks whether `n` more requests fit in the current month's budget.
    ///
    /// Rolls the counter over to the current month first, resetting `spent`
    /// when the stored month is stale. The caller persists the counter along
    /// with its next commit.
    pub fn reserve(&self, counter: &mut QuotaCounter, n: u32, now: DateTime<Local>) -> Reservation {
        let current = BillingMonth::of(&now);
        match counter.month {
            Some(month) if month == current => {}
            Some(month) => {
                info!(from = %month, to = %current, spent = counter.spent, "quota month rolled over");
                counter.spent = 0;
                counter.month = Some(current);
            }
            None => counter.month = Some(current),
        }

        if counter.spent.saturating_add(n) > self.monthly_limit {
            Reservation::Exhausted {
                resume_at: current.next().start(),
            }
        } else {
            Reservation::Allowed
        }
    }

    /// Records `k` requests as issued. Call once the request has been sent,
    /// whether or not it succeeded.
    pub fn commit(&self, counter: &mut QuotaCounter, k: u32) {
        counter.spent = counter.spent.saturating_add(k);
    }

    pub fn remaining(&self, counter: &QuotaCounter) -> u32 {
        self.monthly_limit.saturating_sub(counter.spent)
    }
}
