//! Modèle hypergéométrique fermé : probabilité qu'une grille de `pick` numéros
//! partage exactement k numéros avec un tirage uniforme de `draw` numéros parmi `pool`.
//!
//! C'est la référence théorique contre laquelle la simulation Monte-Carlo est comparée.

use tirage_db::models::{DRAW_SIZE, PICK_SIZE, POOL_SIZE, PayoutTable};

/// Coefficient binomial C(n, k), 0 si k > n.
pub fn binomial(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0f64;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result.round()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchModel {
    pub pool: u64,
    pub draw: u64,
    pub pick: u64,
}

impl Default for MatchModel {
    fn default() -> Self {
        Self::standard()
    }
}

impl MatchModel {
    /// 100 numéros, 9 tirés, 3 joués.
    pub fn standard() -> Self {
        Self {
            pool: POOL_SIZE as u64,
            draw: DRAW_SIZE as u64,
            pick: PICK_SIZE as u64,
        }
    }

    /// P(k) = C(draw, k) · C(pool − draw, pick − k) / C(pool, pick)
    pub fn match_probability(&self, k: usize) -> f64 {
        let k = k as u64;
        if k > self.pick {
            return 0.0;
        }
        let total = binomial(self.pool, self.pick);
        if total == 0.0 {
            return 0.0;
        }
        binomial(self.draw, k) * binomial(self.pool.saturating_sub(self.draw), self.pick - k) / total
    }

    /// [P(0), P(1), ..., P(pick)]
    pub fn distribution(&self) -> Vec<f64> {
        (0..=self.pick as usize)
            .map(|k| self.match_probability(k))
            .collect()
    }

    /// Σ_k P(k)·gain(k) − mise
    pub fn expected_value_per_ticket(&self, payouts: &PayoutTable, entry_fee: f64) -> f64 {
        let expected_reward: f64 = (0..=self.pick as usize)
            .map(|k| self.match_probability(k) * payouts.get(k))
            .sum();
        expected_reward - entry_fee
    }

    /// Avantage maison théorique en % de la mise. 0 si la mise est nulle.
    pub fn house_edge_pct(&self, payouts: &PayoutTable, entry_fee: f64) -> f64 {
        if entry_fee <= 0.0 {
            return 0.0;
        }
        -self.expected_value_per_ticket(payouts, entry_fee) / entry_fee * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial_known_values() {
        assert_eq!(binomial(100, 3), 161_700.0);
        assert_eq!(binomial(91, 3), 121_485.0);
        assert_eq!(binomial(9, 2), 36.0);
        assert_eq!(binomial(9, 0), 1.0);
        assert_eq!(binomial(5, 5), 1.0);
        assert_eq!(binomial(3, 4), 0.0);
    }

    #[test]
    fn test_match_probabilities_exact() {
        let model = MatchModel::standard();
        let expected = [121_485.0, 36_855.0, 3_276.0, 84.0];
        for (k, &num) in expected.iter().enumerate() {
            let p = model.match_probability(k);
            assert!((p - num / 161_700.0).abs() < 1e-12, "P({k}) = {p}");
        }
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let dist = MatchModel::standard().distribution();
        assert_eq!(dist.len(), 4);
        assert!(dist.iter().all(|&p| p >= 0.0));
        let sum: f64 = dist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "Sum = {}", sum);
    }

    #[test]
    fn test_out_of_range_is_zero() {
        assert_eq!(MatchModel::standard().match_probability(4), 0.0);
    }

    #[test]
    fn test_idempotent() {
        let model = MatchModel::standard();
        for k in 0..=3 {
            assert_eq!(model.match_probability(k), model.match_probability(k));
        }
    }

    #[test]
    fn test_expected_value_standard_payouts() {
        let model = MatchModel::standard();
        let ev = model.expected_value_per_ticket(&PayoutTable::new(25.0, 200.0, 250.0), 20.0);
        let expected = 1_597_575.0 / 161_700.0 - 20.0;
        assert!((ev - expected).abs() < 1e-9, "EV = {ev}");
        assert!(ev < 0.0);
    }

    #[test]
    fn test_house_edge_zero_fee() {
        let model = MatchModel::standard();
        assert_eq!(model.house_edge_pct(&PayoutTable::default(), 0.0), 0.0);
        let edge = model.house_edge_pct(&PayoutTable::default(), 20.0);
        assert!(edge > 50.0 && edge < 51.0, "edge = {edge}");
    }

    #[test]
    fn test_small_pool_model() {
        // 10 numéros, 9 tirés : impossible de ne rien trouver avec 3 numéros
        let model = MatchModel { pool: 10, draw: 9, pick: 3 };
        assert_eq!(model.match_probability(0), 0.0);
        assert_eq!(model.match_probability(1), 0.0);
        let sum: f64 = model.distribution().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
