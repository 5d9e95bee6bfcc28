use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use tirage_sim::engine::{RoundRecord, RunSummary};
use tirage_sim::strategy::StrategyKind;

#[derive(Debug, Serialize)]
struct ProfitRow {
    player: usize,
    strategy: StrategyKind,
    profit: f64,
}

/// Une ligne d'en-têtes, une ligne de valeurs.
pub fn write_summary_csv(path: &Path, summary: &RunSummary) -> Result<()> {
    let fields = summary.fields();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Impossible de créer {:?}", path))?;
    writer.write_record(fields.iter().map(|(name, _)| name.as_str()))?;
    writer.write_record(fields.iter().map(|(_, value)| format_value(*value)))?;
    writer.flush()?;
    log::info!("résumé : {} champs écrits dans {:?}", fields.len(), path);
    Ok(())
}

pub fn write_rounds_csv(path: &Path, rounds: &[RoundRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Impossible de créer {:?}", path))?;
    for record in rounds {
        writer.serialize(record)?;
    }
    writer.flush()?;
    log::info!("{} tours écrits dans {:?}", rounds.len(), path);
    Ok(())
}

pub fn write_profits_csv(path: &Path, profits: &[f64], strategies: &[StrategyKind]) -> Result<()> {
    if profits.len() != strategies.len() {
        bail!(
            "Soldes et stratégies désalignés : {} vs {}",
            profits.len(),
            strategies.len()
        );
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Impossible de créer {:?}", path))?;
    for (player, (&profit, &strategy)) in profits.iter().zip(strategies).enumerate() {
        writer.serialize(ProfitRow { player, strategy, profit })?;
    }
    writer.flush()?;
    Ok(())
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.4}", value)
    }
}
