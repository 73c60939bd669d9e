use super::money::Money;
use crate::error::{ConditionsError, Result};
use serde::{Deserialize, Serialize};

/// One way of splitting a purchase into `count` periodic charges.
///
/// `installment_amount` is the regular charge. Whatever `installment_amount * count`
/// leaves uncovered of `total_amount` is carried by the last installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OptionFields")]
pub struct InstallmentOption {
    count: u32,
    installment_amount: Money,
    total_amount: Money,
    interest_free: bool,
}

/// Wire shape of an option; decoding goes through `InstallmentOption::new`.
#[derive(Deserialize)]
struct OptionFields {
    count: u32,
    installment_amount: Money,
    total_amount: Money,
    interest_free: bool,
}

impl TryFrom<OptionFields> for InstallmentOption {
    type Error = ConditionsError;

    fn try_from(fields: OptionFields) -> Result<Self> {
        Self::new(
            fields.count,
            fields.installment_amount,
            fields.total_amount,
            fields.interest_free,
        )
    }
}

impl InstallmentOption {
    /// Builds an option from a regular installment and a total.
    ///
    /// The total must cover `count` regular installments and exceed them by
    /// less than one minor unit per installment.
    pub fn new(
        count: u32,
        installment_amount: Money,
        total_amount: Money,
        interest_free: bool,
    ) -> Result<Self> {
        if count == 0 {
            return Err(ConditionsError::MalformedSchedule(
                "installment count must be positive".to_string(),
            ));
        }
        if installment_amount.is_negative() || total_amount.is_negative() {
            return Err(ConditionsError::MalformedSchedule(format!(
                "negative amounts in {count}x option"
            )));
        }
        let remainder = total_amount.subtract(installment_amount.multiply(count)?)?;
        if remainder.is_negative() || remainder.amount() >= i64::from(count) {
            return Err(ConditionsError::MalformedSchedule(format!(
                "{count}x {installment_amount} does not add up to {total_amount}"
            )));
        }
        Ok(Self {
            count,
            installment_amount,
            total_amount,
            interest_free,
        })
    }

    /// Splits `total` into `count` installments with the remainder on the last one.
    pub fn from_total(count: u32, total: Money, interest_free: bool) -> Result<Self> {
        Self::new(count, total.smallest_share(count)?, total, interest_free)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn installment_amount(&self) -> Money {
        self.installment_amount
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn interest_free(&self) -> bool {
        self.interest_free
    }

    /// The final charge, i.e. the regular installment plus the rounding remainder.
    pub fn last_installment_amount(&self) -> Result<Money> {
        let regular = self.installment_amount.multiply(self.count - 1)?;
        self.total_amount.subtract(regular)
    }

    /// Every charge of the schedule in order. Sums exactly to `total_amount`.
    pub fn schedule(&self) -> Result<Vec<Money>> {
        let mut charges = vec![self.installment_amount; (self.count - 1) as usize];
        charges.push(self.last_installment_amount()?);
        Ok(charges)
    }
}

/// Installment options sorted ascending by count, at most one per count.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PlanFields")]
pub struct InstallmentPlan {
    options: Vec<InstallmentOption>,
}

#[derive(Deserialize)]
struct PlanFields {
    options: Vec<InstallmentOption>,
}

impl From<PlanFields> for InstallmentPlan {
    fn from(fields: PlanFields) -> Self {
        Self::new(fields.options)
    }
}

impl InstallmentPlan {
    /// Sorts by count and keeps the first option seen for each count.
    pub fn new(options: Vec<InstallmentOption>) -> Self {
        let mut unique: Vec<InstallmentOption> = Vec::with_capacity(options.len());
        for option in options {
            if !unique.iter().any(|o| o.count == option.count) {
                unique.push(option);
            }
        }
        unique.sort_by_key(|o| o.count);
        Self { options: unique }
    }

    pub fn options(&self) -> &[InstallmentOption] {
        &self.options
    }

    pub fn get(&self, count: u32) -> Option<&InstallmentOption> {
        self.options.iter().find(|o| o.count == count)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }
}
