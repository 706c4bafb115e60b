use std::path::Path;

use anyhow::Context;

use vmscale_forecast::{ForecastRecord, PredictionTable};

pub fn lookup(table: &Path, unit: i64, slot: u64, format: &str) -> anyhow::Result<()> {
    let table = PredictionTable::load(table)
        .with_context(|| format!("loading forecast table {}", table.display()))?;
    let record = table.lookup(unit, slot);
    println!("{}", render(record, unit, slot, format)?);
    Ok(())
}

fn render(
    record: Option<&ForecastRecord>,
    unit: i64,
    slot: u64,
    format: &str,
) -> anyhow::Result<String> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(&record)?),
        "text" => Ok(match record {
            Some(rec) => format!("Record = {rec}"),
            None => format!("no forecast for unit {unit} at slot {slot}"),
        }),
        other => anyhow::bail!("unknown output format: {other} (expected text or json)"),
    }
}
