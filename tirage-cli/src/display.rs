use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use textplots::Plot;

use tirage_db::models::{PayoutTable, Preset};
use tirage_sim::engine::{RoundRecord, RunSummary, StrategyStats};
use tirage_sim::probability::MatchModel;
use tirage_sim::report::{HistogramBin, match_frequencies};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn signed_cell(value: f64) -> Cell {
    let color = if value > 0.0 {
        Color::Green
    } else if value < 0.0 {
        Color::Red
    } else {
        Color::White
    };
    Cell::new(format!("{:.2}", value)).fg(color)
}

pub fn display_summary(summary: &RunSummary) {
    println!("\n📊 Résumé\n");

    let mut table = new_table(vec!["Indicateur", "Valeur"]);
    table.add_row(vec![Cell::new("Tours"), Cell::new(summary.total_rounds)]);
    table.add_row(vec![Cell::new("Joueurs"), Cell::new(summary.players)]);
    table.add_row(vec![Cell::new("Total misé"), Cell::new(format!("{:.2}", summary.total_spent))]);
    table.add_row(vec![Cell::new("Total redistribué"), Cell::new(format!("{:.2}", summary.total_returned))]);
    table.add_row(vec![Cell::new("Bénéfice maison"), signed_cell(summary.net_house_profit)]);
    table.add_row(vec![Cell::new("Solde moyen par joueur"), signed_cell(summary.avg_profit_per_player)]);
    table.add_row(vec![Cell::new("Joueurs gagnants"), Cell::new(summary.players_in_profit)]);
    table.add_row(vec![Cell::new("Joueurs perdants"), Cell::new(summary.players_in_loss)]);
    table.add_row(vec![Cell::new("Joueurs à l'équilibre"), Cell::new(summary.players_breakeven)]);
    println!("{table}");
}

pub fn display_theory_vs_simulation(summary: &RunSummary) {
    println!("\n🎯 Théorie vs simulation\n");

    let theory = MatchModel::standard().distribution();
    let observed = match_frequencies(&summary.match_counts);

    let mut table = new_table(vec!["Numéros trouvés", "P théorique", "Fréquence observée", "Tickets"]);
    for k in 0..theory.len() {
        table.add_row(vec![
            k.to_string(),
            format!("{:.6}", theory[k]),
            format!("{:.6}", observed[k]),
            summary.match_counts[k].to_string(),
        ]);
    }
    println!("{table}");

    let mut table = new_table(vec!["Par ticket", "Théorique", "Simulé", "Écart"]);
    table.add_row(vec![
        Cell::new("Espérance (gain − mise)"),
        Cell::new(format!("{:.4}", summary.expected_value_per_ticket)),
        Cell::new(format!("{:.4}", summary.actual_avg_return_per_ticket)),
        signed_cell(summary.actual_avg_return_per_ticket - summary.expected_value_per_ticket),
    ]);
    table.add_row(vec![
        Cell::new("Avantage maison (%)"),
        Cell::new(format!("{:.2}", summary.theoretical_house_edge_pct)),
        Cell::new(format!("{:.2}", summary.actual_house_edge_pct)),
        signed_cell(summary.actual_house_edge_pct - summary.theoretical_house_edge_pct),
    ]);
    println!("{table}");
}

pub fn display_strategies(stats: &[StrategyStats]) {
    if stats.is_empty() {
        return;
    }
    println!("\n🧭 Solde moyen par stratégie\n");

    let mut table = new_table(vec!["Stratégie", "Joueurs", "Solde moyen"]);
    for s in stats {
        table.add_row(vec![
            Cell::new(s.strategy),
            Cell::new(s.players),
            signed_cell(s.avg_profit),
        ]);
    }
    println!("{table}");
}

pub fn display_histogram(bins: &[HistogramBin]) {
    println!("\n📈 Distribution des soldes joueurs\n");
    if bins.is_empty() {
        println!("  (Pas de données à afficher)");
        return;
    }

    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    let mut table = new_table(vec!["Solde", "Joueurs", ""]);
    for bin in bins.iter().filter(|b| b.count > 0) {
        let bar = "█".repeat((bin.count as f64 / max_count as f64 * 40.0).round() as usize);
        table.add_row(vec![
            format!("[{:.0} ; {:.0}]", bin.lower, bin.upper),
            bin.count.to_string(),
            bar,
        ]);
    }
    println!("{table}");
}

pub fn display_house_profit_chart(rounds: &[RoundRecord]) {
    println!("\n📉 Bénéfice maison par tour\n");
    if rounds.len() < 2 {
        for r in rounds {
            println!("  Tour {} : {:.2}", r.round, r.net_house_profit);
        }
        return;
    }

    let points: Vec<(f32, f32)> = rounds
        .iter()
        .map(|r| (r.round as f32, r.net_house_profit as f32))
        .collect();
    let x_min = points[0].0;
    let x_max = points[points.len() - 1].0;
    let shape = textplots::Shape::Lines(&points);
    let mut chart = textplots::Chart::new(120, 40, x_min, x_max);
    println!("{}", chart.lineplot(&shape));
}

pub fn display_theory(model: &MatchModel, payouts: &PayoutTable, entry_fee: f64) {
    println!("\n🎯 Modèle hypergéométrique ({} numéros, {} tirés, {} joués)\n", model.pool, model.draw, model.pick);

    let mut table = new_table(vec!["Numéros trouvés", "Probabilité", "1 sur", "Gain", "Contribution"]);
    for (k, p) in model.distribution().into_iter().enumerate() {
        let one_in = if p > 0.0 { format!("{:.1}", 1.0 / p) } else { "—".to_string() };
        table.add_row(vec![
            k.to_string(),
            format!("{:.6}", p),
            one_in,
            format!("{:.2}", payouts.get(k)),
            format!("{:.4}", p * payouts.get(k)),
        ]);
    }
    println!("{table}");

    let ev = model.expected_value_per_ticket(payouts, entry_fee);
    println!("  Mise                     : {:.2}", entry_fee);
    println!("  Espérance par ticket     : {:.4}", ev);
    println!("  Avantage maison théorique: {:.2} %", model.house_edge_pct(payouts, entry_fee));
}

pub fn display_presets(presets: &[(Preset, String)]) {
    if presets.is_empty() {
        println!("Aucun preset enregistré.");
        return;
    }

    let mut table = new_table(vec!["Nom", "Mise", "1 numéro", "2 numéros", "3 numéros", "Modifié le"]);
    for (preset, updated_at) in presets {
        table.add_row(vec![
            preset.name.clone(),
            format!("{:.2}", preset.entry_fee),
            format!("{:.2}", preset.payouts.p1),
            format!("{:.2}", preset.payouts.p2),
            format!("{:.2}", preset.payouts.p3),
            if updated_at.is_empty() { "—".to_string() } else { updated_at.clone() },
        ]);
    }
    println!("{table}");
}
