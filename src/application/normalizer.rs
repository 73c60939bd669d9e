//! Normalization of upstream installment schedules.
//!
//! The authorization service describes the same installment options from two
//! perspectives: a financial view and a purchase (merchant) view. Either one,
//! or both, may be present. The purchase view wins whenever it is present.

use crate::domain::installment::{InstallmentOption, InstallmentPlan};
use crate::domain::money::{Currency, Money};
use crate::error::{ConditionsError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Upstream conditions payload as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConditions {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "financialInstallments")]
    pub financial_installments: Option<Vec<RawInstallment>>,
    #[serde(default, alias = "purchaseInstallments")]
    pub purchase_installments: Option<Vec<RawInstallment>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInstallment {
    #[serde(alias = "installments")]
    pub count: i64,
    #[serde(default, alias = "installmentAmount")]
    pub installment_amount: Option<Decimal>,
    #[serde(default, alias = "totalAmount")]
    pub total_amount: Option<Decimal>,
    #[serde(default, alias = "interestFree")]
    pub interest_free: Option<bool>,
    #[serde(default, alias = "interestRate")]
    pub interest_rate: Option<Decimal>,
}

/// Which upstream collection a plan was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleView {
    Financial,
    Purchase,
}

/// Highest installment count accepted from the upstream unless configured
/// otherwise.
pub const DEFAULT_MAX_INSTALLMENTS: u32 = 120;

#[derive(Debug, Clone, Copy)]
pub struct InstallmentNormalizer {
    max_installments: u32,
}

impl Default for InstallmentNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallmentNormalizer {
    pub fn new() -> Self {
        Self::with_max_installments(DEFAULT_MAX_INSTALLMENTS)
    }

    pub fn with_max_installments(max_installments: u32) -> Self {
        Self {
            max_installments: max_installments.max(1),
        }
    }

    /// Decodes a response body. Anything that is not a conditions payload is
    /// a malformed schedule.
    pub fn parse(&self, body: &str) -> Result<RawConditions> {
        serde_json::from_str(body)
            .map_err(|e| ConditionsError::MalformedSchedule(format!("undecodable payload: {e}")))
    }

    /// Builds the canonical plan for a purchase of `single_payment_price`.
    pub fn normalize(
        &self,
        raw: &RawConditions,
        single_payment_price: Money,
    ) -> Result<InstallmentPlan> {
        let currency = single_payment_price.currency();
        if let Some(code) = &raw.currency {
            let upstream = Currency::from_str(code).map_err(|_| {
                ConditionsError::MalformedSchedule(format!("unknown currency {code}"))
            })?;
            if upstream != currency {
                return Err(ConditionsError::CurrencyMismatch {
                    left: currency,
                    right: upstream,
                });
            }
        }

        let (view, entries) = select_view(raw)?;
        debug!(?view, entries = entries.len(), "normalizing installment schedule");

        let options = entries
            .iter()
            .map(|entry| normalize_entry(entry, single_payment_price, self.max_installments))
            .collect::<Result<Vec<_>>>()?;
        Ok(InstallmentPlan::new(options))
    }
}

fn select_view(raw: &RawConditions) -> Result<(ScheduleView, &[RawInstallment])> {
    match (&raw.purchase_installments, &raw.financial_installments) {
        (Some(purchase), _) => Ok((ScheduleView::Purchase, purchase)),
        (None, Some(financial)) => Ok((ScheduleView::Financial, financial)),
        (None, None) => Err(ConditionsError::MalformedSchedule(
            "payload has no installment collection".to_string(),
        )),
    }
}

fn normalize_entry(
    entry: &RawInstallment,
    single_payment_price: Money,
    max_installments: u32,
) -> Result<InstallmentOption> {
    let currency = single_payment_price.currency();
    let count = u32::try_from(entry.count)
        .ok()
        .filter(|c| (1..=max_installments).contains(c))
        .ok_or_else(|| {
            ConditionsError::MalformedSchedule(format!("invalid installment count {}", entry.count))
        })?;

    let installment = entry
        .installment_amount
        .map(|d| Money::from_decimal(d, currency))
        .transpose()?;
    let upstream_total = entry
        .total_amount
        .map(|d| Money::from_decimal(d, currency))
        .transpose()?;
    if installment.is_some_and(|m| m.is_negative()) || upstream_total.is_some_and(|m| m.is_negative())
    {
        return Err(ConditionsError::MalformedSchedule(format!(
            "negative amount in {count}x option"
        )));
    }

    let (installment, total) = match (installment, upstream_total) {
        (Some(installment), None) => (installment, installment.multiply(count)?),
        (Some(installment), Some(total)) => {
            let computed = installment.multiply(count)?;
            let drift = total.subtract(computed)?.amount().abs();
            if drift == 0 {
                (installment, computed)
            } else if drift < i64::from(count) {
                (total.smallest_share(count)?, total)
            } else {
                return Err(ConditionsError::MalformedSchedule(format!(
                    "{count}x {installment} disagrees with total {total}"
                )));
            }
        }
        (None, Some(total)) => (total.smallest_share(count)?, total),
        (None, None) => {
            return Err(ConditionsError::MalformedSchedule(format!(
                "{count}x option has no amounts"
            )));
        }
    };

    // Every installment has to be worth at least one minor unit.
    if count > 1 && i64::from(count) > total.amount() {
        return Err(ConditionsError::MalformedSchedule(format!(
            "{count}x option cannot split {total}"
        )));
    }

    let interest_free = entry.interest_free == Some(true)
        || entry.interest_rate.is_some_and(|rate| rate.is_zero())
        || total == single_payment_price;

    InstallmentOption::new(count, installment, total, interest_free)
}
