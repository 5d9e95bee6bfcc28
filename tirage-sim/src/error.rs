use thiserror::Error;

use crate::strategy::StrategyKind;

#[derive(Debug, Error)]
pub enum SimError {
    /// Paramètres invalides, détectés avant le premier tour.
    #[error("configuration invalide : {0}")]
    Configuration(String),

    #[error(
        "tour {round} : stratégie {strategy} sans candidats suffisants ({available} disponibles, {needed} requis)"
    )]
    InsufficientCandidates {
        round: u32,
        strategy: StrategyKind,
        available: usize,
        needed: usize,
    },

    #[error("échantillonnage impossible : {0}")]
    Sampling(String),
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
