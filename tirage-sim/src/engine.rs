//! Boucle de simulation : un tirage par tour, une grille par joueur, règlement des gains.
//!
//! Les tours sont strictement séquentiels (l'historique des tirages change entre deux tours).
//! À l'intérieur d'un tour, les joueurs sont évalués en parallèle : chacun lit le même
//! instantané de l'historique, tire ses numéros sur son propre flux aléatoire et n'écrit
//! que dans son propre solde. Les totaux du tour sont réduits ensuite, dans l'ordre des joueurs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use tirage_db::models::{POOL_SIZE, PayoutTable, Pick};

use crate::config::{BONUS_MULTIPLIER, SimConfig};
use crate::draw::generate_draw;
use crate::error::{Result, SimError};
use crate::history::DrawHistory;
use crate::probability::MatchModel;
use crate::strategy::{RemainderPolicy, Strategy, StrategyKind, allocate_players};

/// Solde considéré comme nul en deçà de ce seuil.
pub const BREAKEVEN_EPSILON: f64 = 1e-9;

const STREAM_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone)]
pub struct Player {
    pub index: usize,
    pub strategy: Strategy,
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub total_spent: f64,
    pub total_payout: f64,
    pub net_house_profit: f64,
    pub house_edge_pct: f64,
    pub bonus_applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyStats {
    pub strategy: StrategyKind,
    pub players: usize,
    pub avg_profit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub total_rounds: u32,
    pub players: usize,
    pub total_spent: f64,
    pub total_returned: f64,
    pub net_house_profit: f64,
    pub avg_profit_per_player: f64,
    pub players_in_profit: usize,
    pub players_in_loss: usize,
    pub players_breakeven: usize,
    pub expected_value_per_ticket: f64,
    pub actual_avg_return_per_ticket: f64,
    pub theoretical_house_edge_pct: f64,
    pub actual_house_edge_pct: f64,
    /// Nombre de grilles ayant trouvé 0, 1, 2, 3 numéros sur toute la partie.
    pub match_counts: [u64; 4],
    /// Vide sauf si plusieurs stratégies ont une part non nulle.
    pub strategies: Vec<StrategyStats>,
}

#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub summary: RunSummary,
    /// Solde final de chaque joueur, indexé comme les joueurs.
    pub profits: Vec<f64>,
    pub strategies: Vec<StrategyKind>,
    pub rounds: Vec<RoundRecord>,
}

#[derive(Debug, Clone, Copy)]
struct PlayerOutcome {
    pick: Pick,
    matches: usize,
    reward: f64,
    net: f64,
}

/// Gain d'une grille et variation nette du solde du joueur.
pub fn settle(matches: usize, payouts: &PayoutTable, entry_fee: f64, bonus: bool) -> (f64, f64) {
    let mut reward = payouts.get(matches);
    if bonus {
        reward *= BONUS_MULTIPLIER;
    }
    (reward, reward - entry_fee)
}

/// Flux aléatoire d'un joueur pour un tour, indépendant de l'ordonnancement des threads.
fn player_rng(round_seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(round_seed ^ (index as u64 + 1).wrapping_mul(STREAM_MIX))
}

pub struct Simulation {
    config: SimConfig,
    seed: u64,
    rng: StdRng,
    players: Vec<Player>,
    history: DrawHistory,
    rounds: Vec<RoundRecord>,
    match_counts: [u64; 4],
    last_picks: Vec<Pick>,
    failed_round: Option<u32>,
}

impl Simulation {
    /// Valide la configuration et crée les joueurs. Aucun tour n'est joué.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        let allocation = allocate_players(&config.distribution, config.num_players, config.remainder);
        let allocated: usize = allocation.iter().map(|(_, count)| count).sum();
        if allocated < config.num_players {
            log::warn!(
                "{} joueur(s) écarté(s) par la troncature de la répartition",
                config.num_players - allocated
            );
        }
        if allocated == 0 {
            return Err(SimError::config(
                "aucun joueur après répartition des stratégies",
            ));
        }

        let mut players = Vec::with_capacity(allocated);
        for (kind, count) in allocation {
            for _ in 0..count {
                players.push(Player {
                    index: players.len(),
                    strategy: Strategy::assign(kind, POOL_SIZE, &mut rng)?,
                    profit: 0.0,
                });
            }
        }

        log::info!(
            "simulation : {} joueurs, {} tours, tirage {}, graine {}",
            players.len(),
            config.num_rounds,
            config.draw_mode,
            seed
        );

        let history = DrawHistory::new(config.adaptive_memory);
        let rounds = Vec::with_capacity(config.num_rounds as usize);

        Ok(Self {
            config,
            seed,
            rng,
            players,
            history,
            rounds,
            match_counts: [0; 4],
            last_picks: Vec::new(),
            failed_round: None,
        })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn history(&self) -> &DrawHistory {
        &self.history
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Grilles jouées au dernier tour, dans l'ordre des joueurs.
    pub fn last_picks(&self) -> &[Pick] {
        &self.last_picks
    }

    pub fn is_finished(&self) -> bool {
        self.rounds.len() as u32 >= self.config.num_rounds
    }

    /// Joue le tour suivant. Un tour en échec ne modifie aucun solde
    /// et interdit de poursuivre la partie.
    pub fn play_round(&mut self) -> Result<RoundRecord> {
        self.ensure_not_failed()?;
        if self.is_finished() {
            return Err(SimError::config(format!(
                "les {} tours configurés sont déjà joués",
                self.config.num_rounds
            )));
        }
        let round = self.rounds.len() as u32 + 1;
        let draw = generate_draw(
            self.config.draw_mode,
            &self.config.weighting,
            POOL_SIZE,
            &mut self.rng,
        )?;
        let round_seed: u64 = self.rng.random();

        let entry_fee = self.config.entry_fee;
        let payouts = self.config.payouts;
        let bonus = self.config.is_bonus_round(round);

        // Les joueurs voient l'historique tel qu'il était avant ce tirage
        let history = &self.history;
        let evaluated: Result<Vec<PlayerOutcome>> = self
            .players
            .par_iter()
            .map(|player| {
                let mut rng = player_rng(round_seed, player.index);
                let pick = player
                    .strategy
                    .pick(history, POOL_SIZE, &mut rng)
                    .map_err(|shortfall| SimError::InsufficientCandidates {
                        round,
                        strategy: player.strategy.kind(),
                        available: shortfall.available,
                        needed: shortfall.needed,
                    })?;
                let matches = draw.match_count(&pick);
                let (reward, net) = settle(matches, &payouts, entry_fee, bonus);
                Ok(PlayerOutcome { pick, matches, reward, net })
            })
            .collect();
        let outcomes = match evaluated {
            Ok(outcomes) => outcomes,
            Err(e) => {
                self.failed_round = Some(round);
                log::warn!("tour {} interrompu : {}", round, e);
                return Err(e);
            }
        };

        self.history.push(draw);

        let total_spent = self.players.len() as f64 * entry_fee;
        let mut total_payout = 0.0;
        for (player, outcome) in self.players.iter_mut().zip(&outcomes) {
            player.profit += outcome.net;
            total_payout += outcome.reward;
            self.match_counts[outcome.matches.min(3)] += 1;
        }
        let net_house_profit = total_spent - total_payout;
        let house_edge_pct = if total_spent > 0.0 {
            net_house_profit / total_spent * 100.0
        } else {
            0.0
        };

        let record = RoundRecord {
            round,
            total_spent,
            total_payout,
            net_house_profit,
            house_edge_pct,
            bonus_applied: bonus,
        };
        log::debug!(
            "tour {} : tirage {:?}, mises {:.2}, gains {:.2}, maison {:.2}",
            round,
            draw.numbers,
            total_spent,
            total_payout,
            net_house_profit
        );
        self.last_picks = outcomes.iter().map(|o| o.pick).collect();
        self.rounds.push(record.clone());
        Ok(record)
    }

    fn ensure_not_failed(&self) -> Result<()> {
        match self.failed_round {
            Some(round) => Err(SimError::config(format!(
                "simulation interrompue au tour {}",
                round
            ))),
            None => Ok(()),
        }
    }

    /// Joue les tours restants et produit les résultats.
    pub fn run_to_end(mut self) -> Result<SimulationOutput> {
        while !self.is_finished() {
            self.play_round()?;
        }
        self.finish()
    }

    /// Refuse de produire des résultats pour une partie interrompue.
    pub fn finish(self) -> Result<SimulationOutput> {
        self.ensure_not_failed()?;
        let summary = self.summarize();
        log::info!(
            "simulation terminée : {} tours, maison {:.2}, EV théorique {:.4}, retour réel {:.4}",
            summary.total_rounds,
            summary.net_house_profit,
            summary.expected_value_per_ticket,
            summary.actual_avg_return_per_ticket
        );
        Ok(SimulationOutput {
            summary,
            profits: self.players.iter().map(|p| p.profit).collect(),
            strategies: self.players.iter().map(|p| p.strategy.kind()).collect(),
            rounds: self.rounds,
        })
    }

    fn summarize(&self) -> RunSummary {
        let n_players = self.players.len();
        let n_rounds = self.rounds.len() as u32;
        let tickets = n_players as f64 * n_rounds as f64;
        let fee = self.config.entry_fee;

        let total_profit: f64 = self.players.iter().map(|p| p.profit).sum();
        let total_spent = tickets * fee;

        let players_in_profit = self.players.iter().filter(|p| p.profit > BREAKEVEN_EPSILON).count();
        let players_in_loss = self.players.iter().filter(|p| p.profit < -BREAKEVEN_EPSILON).count();
        let players_breakeven = n_players - players_in_profit - players_in_loss;

        let model = MatchModel::standard();
        let net_house_profit = -total_profit;

        let strategies = if self.config.distribution.is_mixed() {
            StrategyKind::ALL
                .iter()
                .map(|&kind| {
                    let profits: Vec<f64> = self
                        .players
                        .iter()
                        .filter(|p| p.strategy.kind() == kind)
                        .map(|p| p.profit)
                        .collect();
                    let avg_profit = if profits.is_empty() {
                        0.0
                    } else {
                        profits.iter().sum::<f64>() / profits.len() as f64
                    };
                    StrategyStats {
                        strategy: kind,
                        players: profits.len(),
                        avg_profit,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        RunSummary {
            seed: self.seed,
            total_rounds: n_rounds,
            players: n_players,
            total_spent,
            total_returned: total_profit + total_spent,
            net_house_profit,
            avg_profit_per_player: if n_players > 0 { total_profit / n_players as f64 } else { 0.0 },
            players_in_profit,
            players_in_loss,
            players_breakeven,
            expected_value_per_ticket: model.expected_value_per_ticket(&self.config.payouts, fee),
            actual_avg_return_per_ticket: if tickets > 0.0 { total_profit / tickets } else { 0.0 },
            theoretical_house_edge_pct: model.house_edge_pct(&self.config.payouts, fee),
            actual_house_edge_pct: if total_spent > 0.0 {
                net_house_profit / total_spent * 100.0
            } else {
                0.0
            },
            match_counts: self.match_counts,
            strategies,
        }
    }
}

/// Lance une simulation complète. Échoue avant le premier tour si la configuration est invalide.
pub fn run(config: &SimConfig) -> Result<SimulationOutput> {
    Simulation::new(config.clone())?.run_to_end()
}

/// Nombre de joueurs écartés par la politique `drop` pour cette configuration.
pub fn dropped_players(config: &SimConfig) -> usize {
    if config.remainder != RemainderPolicy::Drop {
        return 0;
    }
    let allocated: usize = allocate_players(&config.distribution, config.num_players, config.remainder)
        .iter()
        .map(|(_, count)| count)
        .sum();
    config.num_players.saturating_sub(allocated)
}
