use crate::domain::cart::LineItem;
use crate::domain::money::{Currency, Money};
use crate::error::{ConditionsError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One cart line as it appears in the CSV input.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CartLineRecord {
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl CartLineRecord {
    /// Converts the decimal price into minor units of `currency`.
    pub fn into_line_item(self, currency: Currency) -> Result<LineItem> {
        Ok(LineItem {
            sku: self.sku,
            quantity: self.quantity,
            unit_price: Money::from_decimal(self.unit_price, currency)?,
        })
    }
}

/// Cart input with a `sku,quantity,unit_price` header.
///
/// Padding around fields is ignored. Prices stay decimal until a currency is
/// known, at which point `line_items` turns them into minor units.
pub struct CartReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CartReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Cart lines in file order, one `Result` per row.
    pub fn lines(self) -> impl Iterator<Item = Result<CartLineRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ConditionsError::from))
    }

    /// Reads every line and converts it, failing on the first bad record.
    pub fn line_items(self, currency: Currency) -> Result<Vec<LineItem>> {
        self.lines()
            .map(|line| line.and_then(|l| l.into_line_item(currency)))
            .collect()
    }
}
