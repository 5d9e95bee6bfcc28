use serde::Serialize;

use crate::engine::RunSummary;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl RunSummary {
    /// Résumé à plat : une liste ordonnée de champs numériques nommés.
    pub fn fields(&self) -> Vec<(String, f64)> {
        let mut fields = vec![
            ("total_rounds".to_string(), self.total_rounds as f64),
            ("players".to_string(), self.players as f64),
            ("total_spent".to_string(), self.total_spent),
            ("total_returned".to_string(), self.total_returned),
            ("net_house_profit".to_string(), self.net_house_profit),
            ("avg_profit_per_player".to_string(), self.avg_profit_per_player),
            ("players_in_profit".to_string(), self.players_in_profit as f64),
            ("players_in_loss".to_string(), self.players_in_loss as f64),
            ("players_breakeven".to_string(), self.players_breakeven as f64),
            ("expected_value_per_ticket".to_string(), self.expected_value_per_ticket),
            ("actual_avg_return_per_ticket".to_string(), self.actual_avg_return_per_ticket),
            ("theoretical_house_edge_pct".to_string(), self.theoretical_house_edge_pct),
            ("actual_house_edge_pct".to_string(), self.actual_house_edge_pct),
        ];
        for (k, &count) in self.match_counts.iter().enumerate() {
            fields.push((format!("tickets_{k}_match"), count as f64));
        }
        for stats in &self.strategies {
            fields.push((format!("avg_profit_{}", stats.strategy), stats.avg_profit));
        }
        fields
    }
}

/// Histogramme à pas constant sur [min, max]. Vide si `profits` est vide ou `bins` nul.
pub fn profit_histogram(profits: &[f64], bins: usize) -> Vec<HistogramBin> {
    if profits.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = profits.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = profits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if max - min <= f64::EPSILON {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: profits.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &p in profits {
        let idx = (((p - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Fréquences empiriques de 0, 1, 2, 3 numéros trouvés.
pub fn match_frequencies(counts: &[u64; 4]) -> [f64; 4] {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return [0.0; 4];
    }
    let mut freqs = [0.0; 4];
    for (f, &c) in freqs.iter_mut().zip(counts) {
        *f = c as f64 / total as f64;
    }
    freqs
}
