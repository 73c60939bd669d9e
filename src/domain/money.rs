use crate::error::{ConditionsError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO-4217 currencies accepted by the conditions layer.
///
/// Each currency carries its minor-unit scale, which bounds the precision
/// `Money::from_decimal` accepts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Currency {
    ARS,
    BHD,
    BRL,
    CLP,
    COP,
    EUR,
    JPY,
    KWD,
    MXN,
    PEN,
    PYG,
    USD,
    UYU,
}

impl Currency {
    /// Number of fractional digits of the currency's minor unit.
    pub fn minor_unit_scale(&self) -> u32 {
        match self {
            Currency::CLP | Currency::JPY | Currency::PYG => 0,
            Currency::BHD | Currency::KWD => 3,
            _ => 2,
        }
    }
}

/// A monetary amount held as an integer count of minor units.
///
/// All arithmetic stays on the integer value. The only way out to a decimal
/// representation is [`Money::to_decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Converts a decimal amount into minor units.
    ///
    /// Trailing zeros are ignored, so `19.990` is accepted for a two-digit
    /// currency while `19.991` is a precision error.
    pub fn from_decimal(value: Decimal, currency: Currency) -> Result<Self> {
        let scale = currency.minor_unit_scale();
        let mut scaled = value.normalize();
        if scaled.scale() > scale {
            return Err(ConditionsError::Precision {
                value: value.to_string(),
                currency,
                scale,
            });
        }
        scaled.rescale(scale);
        let amount = i64::try_from(scaled.mantissa()).map_err(|_| {
            ConditionsError::ValidationError(format!("{value} {currency} is out of range"))
        })?;
        Ok(Self { amount, currency })
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.minor_unit_scale())
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    pub fn add(&self, other: Money) -> Result<Money> {
        self.ensure_same_currency(&other)?;
        self.amount
            .checked_add(other.amount)
            .map(|amount| Money::from_minor(amount, self.currency))
            .ok_or_else(|| self.overflow("add"))
    }

    pub fn subtract(&self, other: Money) -> Result<Money> {
        self.ensure_same_currency(&other)?;
        self.amount
            .checked_sub(other.amount)
            .map(|amount| Money::from_minor(amount, self.currency))
            .ok_or_else(|| self.overflow("subtract"))
    }

    pub fn multiply(&self, by: u32) -> Result<Money> {
        self.amount
            .checked_mul(i64::from(by))
            .map(|amount| Money::from_minor(amount, self.currency))
            .ok_or_else(|| self.overflow("multiply"))
    }

    /// Splits the amount into `parts` shares that sum exactly to `self`.
    ///
    /// Every share gets the floor of the division; the remainder is handed
    /// out one minor unit at a time to the first shares.
    pub fn allocate(&self, parts: u32) -> Result<Vec<Money>> {
        if parts == 0 {
            return Err(ConditionsError::ValidationError(
                "Cannot allocate into zero parts".to_string(),
            ));
        }
        let divisor = i64::from(parts);
        let base = self.amount.div_euclid(divisor);
        let remainder = self.amount.rem_euclid(divisor);

        Ok((0..divisor)
            .map(|i| {
                let extra = if i < remainder { 1 } else { 0 };
                Money::from_minor(base + extra, self.currency)
            })
            .collect())
    }

    /// The smallest share `allocate(parts)` would produce, without building
    /// the shares.
    pub fn smallest_share(&self, parts: u32) -> Result<Money> {
        if parts == 0 {
            return Err(ConditionsError::ValidationError(
                "Cannot allocate into zero parts".to_string(),
            ));
        }
        Ok(Money::from_minor(
            self.amount.div_euclid(i64::from(parts)),
            self.currency,
        ))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<()> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(ConditionsError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            })
        }
    }

    fn overflow(&self, op: &str) -> ConditionsError {
        ConditionsError::ValidationError(format!("{op} overflowed for {}", self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal(), self.currency)
    }
}
