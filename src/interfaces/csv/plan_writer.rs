use crate::domain::installment::InstallmentPlan;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct PlanRow {
    count: u32,
    installment_amount: Decimal,
    last_installment_amount: Decimal,
    total_amount: Decimal,
    interest_free: bool,
}

pub const PLAN_HEADER: [&str; 5] = [
    "count",
    "installment_amount",
    "last_installment_amount",
    "total_amount",
    "interest_free",
];

/// Writes installment plans as CSV. This is the output boundary where minor
/// units become decimals.
pub struct PlanWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PlanWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        Self { writer }
    }

    pub fn write_plan(&mut self, plan: &InstallmentPlan) -> Result<()> {
        self.write_header()?;
        for option in plan.options() {
            self.writer.serialize(PlanRow {
                count: option.count(),
                installment_amount: option.installment_amount().to_decimal(),
                last_installment_amount: option.last_installment_amount()?.to_decimal(),
                total_amount: option.total_amount().to_decimal(),
                interest_free: option.interest_free(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Header only, for lookups that came back without conditions.
    pub fn write_empty(&mut self) -> Result<()> {
        self.write_header()?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(PLAN_HEADER)?;
        Ok(())
    }
}
