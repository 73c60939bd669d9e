use super::money::{Currency, Money};
use crate::error::{ConditionsError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single cart line as seen by the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    pub fn subtotal(&self) -> Result<Money> {
        self.unit_price.multiply(self.quantity)
    }
}

/// Immutable view of the cart a conditions lookup is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    currency: Currency,
    items: Vec<LineItem>,
}

impl CartSnapshot {
    /// Validates the lines and merges the ones sharing a sku and unit price.
    ///
    /// Items end up sorted by sku then price, so two carts holding the same
    /// goods in a different order compare equal.
    pub fn new(currency: Currency, items: Vec<LineItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(ConditionsError::ValidationError(
                "Cart has no items".to_string(),
            ));
        }

        let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
        for item in items {
            if item.sku.trim().is_empty() {
                return Err(ConditionsError::ValidationError(
                    "Line item without sku".to_string(),
                ));
            }
            if item.quantity == 0 {
                return Err(ConditionsError::ValidationError(format!(
                    "Line item {} has zero quantity",
                    item.sku
                )));
            }
            if item.unit_price.currency() != currency {
                return Err(ConditionsError::CurrencyMismatch {
                    left: currency,
                    right: item.unit_price.currency(),
                });
            }
            if item.unit_price.is_negative() {
                return Err(ConditionsError::ValidationError(format!(
                    "Line item {} has a negative price",
                    item.sku
                )));
            }

            let sku = item.sku.trim().to_string();
            match merged
                .iter_mut()
                .find(|m| m.sku == sku && m.unit_price == item.unit_price)
            {
                Some(existing) => {
                    existing.quantity =
                        existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                            ConditionsError::ValidationError(format!("Quantity overflow for {sku}"))
                        })?;
                }
                None => merged.push(LineItem { sku, ..item }),
            }
        }
        merged.sort_by(|a, b| {
            a.sku
                .cmp(&b.sku)
                .then(a.unit_price.amount().cmp(&b.unit_price.amount()))
        });

        Ok(Self {
            currency,
            items: merged,
        })
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> Result<Money> {
        self.items
            .iter()
            .try_fold(Money::zero(self.currency), |acc, item| {
                acc.add(item.subtotal()?)
            })
    }

    /// Cache key for this cart: a SHA-256 over the normalized lines, the total
    /// and the currency. Skus are length-prefixed, so no sku can pass for the
    /// boundary between two lines.
    pub fn fingerprint(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.currency.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.total()?.amount().to_be_bytes());
        for item in &self.items {
            hasher.update(b"|");
            hasher.update((item.sku.len() as u64).to_be_bytes());
            hasher.update(item.sku.as_bytes());
            hasher.update(b":");
            hasher.update(item.quantity.to_be_bytes());
            hasher.update(b":");
            hasher.update(item.unit_price.amount().to_be_bytes());
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sku: &str, quantity: u32, cents: i64) -> LineItem {
        LineItem {
            sku: sku.to_string(),
            quantity,
            unit_price: Money::from_minor(cents, Currency::BRL),
        }
    }

    #[test]
    fn test_total_uses_integer_arithmetic() {
        let cart = CartSnapshot::new(
            Currency::BRL,
            vec![item("A", 3, 333), item("B", 1, 1000)],
        )
        .unwrap();
        assert_eq!(cart.total().unwrap(), Money::from_minor(1999, Currency::BRL));
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let first = CartSnapshot::new(
            Currency::BRL,
            vec![item("A", 1, 500), item("B", 2, 250), item("A", 1, 500)],
        )
        .unwrap();
        let second = CartSnapshot::new(
            Currency::BRL,
            vec![item("B", 2, 250), item("A", 2, 500)],
        )
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_differs_for_different_carts() {
        let first = CartSnapshot::new(Currency::BRL, vec![item("A", 1, 500)]).unwrap();
        let second = CartSnapshot::new(Currency::BRL, vec![item("A", 1, 501)]).unwrap();
        let usd = CartSnapshot::new(
            Currency::USD,
            vec![LineItem {
                sku: "A".to_string(),
                quantity: 1,
                unit_price: Money::from_minor(500, Currency::USD),
            }],
        )
        .unwrap();

        assert_ne!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
        assert_ne!(first.fingerprint().unwrap(), usd.fingerprint().unwrap());
    }

    #[test]
    fn test_sku_cannot_forge_line_boundaries() {
        // Spells out the bytes the two-line cart hashes after its first `|`.
        let mut forged = String::from("a:");
        forged.push_str("\0\0\0\x01");
        forged.push(':');
        forged.push_str("\0\0\0\0\0\0\0\0");
        forged.push_str("|b");

        let two_lines = CartSnapshot::new(
            Currency::BRL,
            vec![item("a", 1, 0), item("b", 1, 500)],
        )
        .unwrap();
        let one_line = CartSnapshot::new(Currency::BRL, vec![item(&forged, 1, 500)]).unwrap();

        assert_eq!(two_lines.total().unwrap(), one_line.total().unwrap());
        assert_ne!(
            two_lines.fingerprint().unwrap(),
            one_line.fingerprint().unwrap()
        );
    }

    #[test]
    fn test_cart_validation() {
        assert!(matches!(
            CartSnapshot::new(Currency::BRL, vec![]),
            Err(ConditionsError::ValidationError(_))
        ));
        assert!(matches!(
            CartSnapshot::new(Currency::BRL, vec![item("A", 0, 100)]),
            Err(ConditionsError::ValidationError(_))
        ));
        assert!(matches!(
            CartSnapshot::new(Currency::USD, vec![item("A", 1, 100)]),
            Err(ConditionsError::CurrencyMismatch { .. })
        ));
    }
}
