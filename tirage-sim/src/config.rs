use serde::{Deserialize, Serialize};

use tirage_db::models::{POOL_SIZE, PayoutTable};

use crate::draw::{DrawMode, Weighting};
use crate::error::{Result, SimError};
use crate::strategy::{RemainderPolicy, StrategyDistribution};

/// Le bonus s'applique aux tours multiples de cette période.
pub const BONUS_PERIOD: u32 = 5;
pub const BONUS_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub entry_fee: f64,
    pub payouts: PayoutTable,
    pub num_players: usize,
    pub num_rounds: u32,
    pub distribution: StrategyDistribution,
    pub remainder: RemainderPolicy,
    pub adaptive_memory: usize,
    pub bonus_enabled: bool,
    pub draw_mode: DrawMode,
    pub weighting: Weighting,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            entry_fee: 20.0,
            payouts: PayoutTable::default(),
            num_players: 1000,
            num_rounds: 100,
            distribution: StrategyDistribution::default(),
            remainder: RemainderPolicy::default(),
            adaptive_memory: 5,
            bonus_enabled: false,
            draw_mode: DrawMode::default(),
            weighting: Weighting::default(),
            seed: None,
        }
    }
}

impl SimConfig {
    /// Vérifie tous les paramètres ; aucun tour n'est joué si cette étape échoue.
    pub fn validate(&self) -> Result<()> {
        if !self.entry_fee.is_finite() || self.entry_fee < 0.0 {
            return Err(SimError::config(format!("mise invalide : {}", self.entry_fee)));
        }
        for (k, amount) in [(1, self.payouts.p1), (2, self.payouts.p2), (3, self.payouts.p3)] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(SimError::config(format!(
                    "gain pour {} numéro(s) invalide : {}",
                    k, amount
                )));
            }
        }
        if self.num_players == 0 {
            return Err(SimError::config("au moins un joueur requis"));
        }
        if self.num_rounds == 0 {
            return Err(SimError::config("au moins un tour requis"));
        }
        if self.adaptive_memory == 0 {
            return Err(SimError::config("la mémoire adaptative doit être >= 1"));
        }
        self.distribution.validate()?;
        if self.draw_mode == DrawMode::Weighted {
            self.weighting.validate(POOL_SIZE)?;
        }
        Ok(())
    }

    pub fn is_bonus_round(&self, round: u32) -> bool {
        self.bonus_enabled && round % BONUS_PERIOD == 0
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::config(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SimError::config(format!("JSON invalide : {e}")))
    }
}
