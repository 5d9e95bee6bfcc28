use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use tirage_db::models::{PICK_SIZE, Pick};

use crate::error::{Result, SimError};
use crate::history::DrawHistory;

/// Taille du pool privé d'un joueur `rotate`.
pub const ROTATE_POOL_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Fixed,
    Rotate,
    Adaptive,
    Pattern,
    Random,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Fixed,
        StrategyKind::Rotate,
        StrategyKind::Adaptive,
        StrategyKind::Pattern,
        StrategyKind::Random,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Fixed => "fixed",
            StrategyKind::Rotate => "rotate",
            StrategyKind::Adaptive => "adaptive",
            StrategyKind::Pattern => "pattern",
            StrategyKind::Random => "random",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Politique d'un joueur. Seules `Fixed` et `Rotate` portent un état (leur pool privé).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Fixed(Pick),
    Rotate([u8; ROTATE_POOL_SIZE]),
    Adaptive,
    Pattern,
    Random,
}

/// Pas assez de numéros disponibles pour composer une grille.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateShortfall {
    pub available: usize,
    pub needed: usize,
}

fn sample_numbers<R: Rng + ?Sized>(candidates: &[u8], rng: &mut R) -> std::result::Result<Pick, CandidateShortfall> {
    if candidates.len() < PICK_SIZE {
        return Err(CandidateShortfall {
            available: candidates.len(),
            needed: PICK_SIZE,
        });
    }
    let mut numbers = [0u8; PICK_SIZE];
    for (slot, idx) in numbers.iter_mut().zip(index::sample(rng, candidates.len(), PICK_SIZE)) {
        *slot = candidates[idx];
    }
    Ok(Pick::new(numbers))
}

fn sample_from_pool<R: Rng + ?Sized>(pool_size: u8, amount: usize, rng: &mut R) -> Vec<u8> {
    index::sample(rng, pool_size as usize, amount)
        .into_iter()
        .map(|idx| (idx + 1) as u8)
        .collect()
}

impl Strategy {
    /// Construit la stratégie d'un joueur ; tire le pool privé pour `fixed` et `rotate`.
    pub fn assign<R: Rng + ?Sized>(kind: StrategyKind, pool_size: u8, rng: &mut R) -> Result<Self> {
        let needed = match kind {
            StrategyKind::Rotate => ROTATE_POOL_SIZE,
            _ => PICK_SIZE,
        };
        if (pool_size as usize) < needed {
            return Err(SimError::config(format!(
                "stratégie {} : pool de {} numéros, au moins {} requis",
                kind, pool_size, needed
            )));
        }
        let strategy = match kind {
            StrategyKind::Fixed => {
                let numbers = sample_from_pool(pool_size, PICK_SIZE, rng);
                Strategy::Fixed(Pick::new([numbers[0], numbers[1], numbers[2]]))
            }
            StrategyKind::Rotate => {
                let mut pool = [0u8; ROTATE_POOL_SIZE];
                for (slot, n) in pool.iter_mut().zip(sample_from_pool(pool_size, ROTATE_POOL_SIZE, rng)) {
                    *slot = n;
                }
                pool.sort_unstable();
                Strategy::Rotate(pool)
            }
            StrategyKind::Adaptive => Strategy::Adaptive,
            StrategyKind::Pattern => Strategy::Pattern,
            StrategyKind::Random => Strategy::Random,
        };
        Ok(strategy)
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Fixed(_) => StrategyKind::Fixed,
            Strategy::Rotate(_) => StrategyKind::Rotate,
            Strategy::Adaptive => StrategyKind::Adaptive,
            Strategy::Pattern => StrategyKind::Pattern,
            Strategy::Random => StrategyKind::Random,
        }
    }

    /// Grille du tour. `history` est l'instantané pris avant le tirage du tour.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        history: &DrawHistory,
        pool_size: u8,
        rng: &mut R,
    ) -> std::result::Result<Pick, CandidateShortfall> {
        match self {
            Strategy::Fixed(pick) => Ok(*pick),
            Strategy::Rotate(pool) => sample_numbers(pool, rng),
            Strategy::Adaptive => {
                if history.is_empty() {
                    return random_pick(pool_size, rng);
                }
                let seen = history.seen_mask(pool_size);
                let cold: Vec<u8> = (1..=pool_size).filter(|&n| !seen[n as usize]).collect();
                sample_numbers(&cold, rng)
            }
            Strategy::Pattern => {
                let third = pool_size / 3;
                if third == 0 {
                    return Err(CandidateShortfall {
                        available: pool_size as usize,
                        needed: PICK_SIZE,
                    });
                }
                Ok(Pick::new([
                    rng.random_range(1..=third),
                    rng.random_range(third + 1..=2 * third),
                    rng.random_range(2 * third + 1..=pool_size),
                ]))
            }
            Strategy::Random => random_pick(pool_size, rng),
        }
    }
}

fn random_pick<R: Rng + ?Sized>(pool_size: u8, rng: &mut R) -> std::result::Result<Pick, CandidateShortfall> {
    if (pool_size as usize) < PICK_SIZE {
        return Err(CandidateShortfall {
            available: pool_size as usize,
            needed: PICK_SIZE,
        });
    }
    let numbers = sample_from_pool(pool_size, PICK_SIZE, rng);
    Ok(Pick::new([numbers[0], numbers[1], numbers[2]]))
}

/// Répartition des joueurs par stratégie, en pourcentages entiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDistribution {
    pub fixed: u32,
    pub rotate: u32,
    pub adaptive: u32,
    pub pattern: u32,
    pub random: u32,
}

impl Default for StrategyDistribution {
    fn default() -> Self {
        Self::only(StrategyKind::Fixed)
    }
}

impl StrategyDistribution {
    pub fn empty() -> Self {
        Self {
            fixed: 0,
            rotate: 0,
            adaptive: 0,
            pattern: 0,
            random: 0,
        }
    }

    /// 100 % sur une seule stratégie.
    pub fn only(kind: StrategyKind) -> Self {
        let mut dist = Self::empty();
        dist.set(kind, 100);
        dist
    }

    pub fn set(&mut self, kind: StrategyKind, pct: u32) {
        *self.slot_mut(kind) = pct;
    }

    pub fn get(&self, kind: StrategyKind) -> u32 {
        match kind {
            StrategyKind::Fixed => self.fixed,
            StrategyKind::Rotate => self.rotate,
            StrategyKind::Adaptive => self.adaptive,
            StrategyKind::Pattern => self.pattern,
            StrategyKind::Random => self.random,
        }
    }

    fn slot_mut(&mut self, kind: StrategyKind) -> &mut u32 {
        match kind {
            StrategyKind::Fixed => &mut self.fixed,
            StrategyKind::Rotate => &mut self.rotate,
            StrategyKind::Adaptive => &mut self.adaptive,
            StrategyKind::Pattern => &mut self.pattern,
            StrategyKind::Random => &mut self.random,
        }
    }

    pub fn total(&self) -> u32 {
        StrategyKind::ALL.iter().map(|&k| self.get(k)).sum()
    }

    /// Plus d'une stratégie avec une part non nulle.
    pub fn is_mixed(&self) -> bool {
        StrategyKind::ALL.iter().filter(|&&k| self.get(k) > 0).count() > 1
    }

    pub fn validate(&self) -> Result<()> {
        let total = self.total();
        if total != 100 {
            return Err(SimError::config(format!(
                "la répartition des stratégies somme à {} %, 100 % attendus",
                total
            )));
        }
        Ok(())
    }
}

/// Sort des joueurs laissés de côté par la troncature `floor(n × pct / 100)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Les joueurs restants ne sont pas créés.
    Drop,
    /// Les places restantes vont aux plus forts restes fractionnaires.
    #[default]
    Redistribute,
}

/// Nombre de joueurs par stratégie, dans l'ordre de `StrategyKind::ALL`.
pub fn allocate_players(
    distribution: &StrategyDistribution,
    num_players: usize,
    policy: RemainderPolicy,
) -> Vec<(StrategyKind, usize)> {
    let mut counts: Vec<(StrategyKind, usize, u64)> = StrategyKind::ALL
        .iter()
        .map(|&kind| {
            let scaled = num_players as u64 * distribution.get(kind) as u64;
            (kind, (scaled / 100) as usize, scaled % 100)
        })
        .collect();

    if policy == RemainderPolicy::Redistribute {
        let assigned: usize = counts.iter().map(|(_, c, _)| c).sum();
        let leftover = num_players.saturating_sub(assigned);

        let mut order: Vec<usize> = (0..counts.len()).collect();
        // Tri stable : à reste égal, l'ordre d'énumération départage
        order.sort_by(|&a, &b| counts[b].2.cmp(&counts[a].2));
        let chosen: Vec<usize> = order
            .into_iter()
            .filter(|&i| counts[i].2 > 0)
            .take(leftover)
            .collect();
        for i in chosen {
            counts[i].1 += 1;
        }
    }

    counts.into_iter().map(|(kind, count, _)| (kind, count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tirage_db::models::{Draw, POOL_SIZE, validate_pick};

    fn history_of(draws: &[[u8; 9]], capacity: usize) -> DrawHistory {
        let mut history = DrawHistory::new(capacity);
        for &numbers in draws {
            history.push(Draw::new(numbers));
        }
        history
    }

    #[test]
    fn test_every_strategy_yields_valid_pick() {
        let mut rng = StdRng::seed_from_u64(42);
        let history = history_of(&[[1, 2, 3, 4, 5, 6, 7, 8, 9]], 5);
        for kind in StrategyKind::ALL {
            let strategy = Strategy::assign(kind, POOL_SIZE, &mut rng).unwrap();
            assert_eq!(strategy.kind(), kind);
            for _ in 0..200 {
                let pick = strategy.pick(&history, POOL_SIZE, &mut rng).unwrap();
                assert!(validate_pick(&pick.numbers).is_ok(), "{kind} : grille invalide {:?}", pick);
            }
        }
    }

    #[test]
    fn test_fixed_is_constant() {
        let mut rng = StdRng::seed_from_u64(1);
        let strategy = Strategy::assign(StrategyKind::Fixed, POOL_SIZE, &mut rng).unwrap();
        let history = DrawHistory::new(5);
        let first = strategy.pick(&history, POOL_SIZE, &mut rng).unwrap();
        for _ in 0..50 {
            assert_eq!(strategy.pick(&history, POOL_SIZE, &mut rng).unwrap(), first);
        }
    }

    #[test]
    fn test_rotate_stays_in_pool() {
        let mut rng = StdRng::seed_from_u64(2);
        let strategy = Strategy::assign(StrategyKind::Rotate, POOL_SIZE, &mut rng).unwrap();
        let Strategy::Rotate(pool) = &strategy else {
            panic!("pool rotate attendu");
        };
        let mut distinct = std::collections::BTreeSet::new();
        let history = DrawHistory::new(5);
        for _ in 0..200 {
            let pick = strategy.pick(&history, POOL_SIZE, &mut rng).unwrap();
            for n in pick.numbers {
                assert!(pool.contains(&n), "{n} hors du pool {:?}", pool);
            }
            distinct.insert(pick.numbers);
        }
        assert!(distinct.len() > 1, "les grilles rotate devraient varier");
    }

    #[test]
    fn test_pattern_one_per_third() {
        let mut rng = StdRng::seed_from_u64(3);
        let history = DrawHistory::new(5);
        for _ in 0..500 {
            let pick = Strategy::Pattern.pick(&history, POOL_SIZE, &mut rng).unwrap();
            assert!((1..=33).contains(&pick.numbers[0]));
            assert!((34..=66).contains(&pick.numbers[1]));
            assert!((67..=100).contains(&pick.numbers[2]));
        }
    }

    #[test]
    fn test_adaptive_avoids_history() {
        let mut rng = StdRng::seed_from_u64(4);
        let draws: Vec<[u8; 9]> = (0..5u8)
            .map(|i| {
                let mut numbers = [0u8; 9];
                for (j, slot) in numbers.iter_mut().enumerate() {
                    *slot = i * 7 + j as u8 + 1;
                }
                numbers
            })
            .collect();
        let history = history_of(&draws, 5);
        let union = history.union(POOL_SIZE);
        assert!(union.len() <= 45);

        for _ in 0..500 {
            let pick = Strategy::Adaptive.pick(&history, POOL_SIZE, &mut rng).unwrap();
            for n in pick.numbers {
                assert!(!union.contains(&n), "{n} déjà tiré récemment");
            }
        }
    }

    #[test]
    fn test_adaptive_empty_history_uses_whole_pool() {
        let mut rng = StdRng::seed_from_u64(5);
        let history = DrawHistory::new(5);
        let pick = Strategy::Adaptive.pick(&history, POOL_SIZE, &mut rng).unwrap();
        assert!(validate_pick(&pick.numbers).is_ok());
    }

    #[test]
    fn test_adaptive_insufficient_candidates() {
        let mut rng = StdRng::seed_from_u64(6);
        // Pool de 11 : un tirage de 9 ne laisse que 2 candidats
        let history = history_of(&[[1, 2, 3, 4, 5, 6, 7, 8, 9]], 1);
        let err = Strategy::Adaptive.pick(&history, 11, &mut rng).unwrap_err();
        assert_eq!(err, CandidateShortfall { available: 2, needed: 3 });
    }

    #[test]
    fn test_assign_rotate_pool_too_small() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(Strategy::assign(StrategyKind::Rotate, 9, &mut rng).is_err());
        assert!(Strategy::assign(StrategyKind::Fixed, 9, &mut rng).is_ok());
    }

    #[test]
    fn test_distribution_validate() {
        assert!(StrategyDistribution::default().validate().is_ok());
        let mut dist = StrategyDistribution { fixed: 20, rotate: 20, adaptive: 20, pattern: 20, random: 19 };
        assert!(matches!(dist.validate(), Err(SimError::Configuration(_))));
        dist.random = 21;
        assert!(matches!(dist.validate(), Err(SimError::Configuration(_))));
        dist.random = 20;
        assert!(dist.validate().is_ok());
        assert!(dist.is_mixed());
        assert!(!StrategyDistribution::only(StrategyKind::Random).is_mixed());
    }

    #[test]
    fn test_allocate_exact_partition() {
        let dist = StrategyDistribution { fixed: 50, rotate: 30, adaptive: 20, pattern: 0, random: 0 };
        let counts = allocate_players(&dist, 1000, RemainderPolicy::Drop);
        assert_eq!(
            counts,
            vec![
                (StrategyKind::Fixed, 500),
                (StrategyKind::Rotate, 300),
                (StrategyKind::Adaptive, 200),
                (StrategyKind::Pattern, 0),
                (StrategyKind::Random, 0),
            ]
        );
    }

    #[test]
    fn test_allocate_drop_undercounts() {
        let dist = StrategyDistribution { fixed: 33, rotate: 33, adaptive: 34, pattern: 0, random: 0 };
        let counts = allocate_players(&dist, 10, RemainderPolicy::Drop);
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 9);
    }

    #[test]
    fn test_allocate_redistribute_largest_remainder() {
        let dist = StrategyDistribution { fixed: 33, rotate: 33, adaptive: 34, pattern: 0, random: 0 };
        let counts = allocate_players(&dist, 10, RemainderPolicy::Redistribute);
        // restes : 30, 30, 40 -> adaptive reçoit la place restante
        assert_eq!(counts[0], (StrategyKind::Fixed, 3));
        assert_eq!(counts[1], (StrategyKind::Rotate, 3));
        assert_eq!(counts[2], (StrategyKind::Adaptive, 4));

        let counts = allocate_players(&dist, 7, RemainderPolicy::Redistribute);
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 7);
    }

    #[test]
    fn test_allocate_single_player() {
        let dist = StrategyDistribution { fixed: 20, rotate: 20, adaptive: 20, pattern: 20, random: 20 };
        let counts = allocate_players(&dist, 1, RemainderPolicy::Redistribute);
        assert_eq!(counts.iter().map(|(_, c)| c).sum::<usize>(), 1);
        assert_eq!(counts[0], (StrategyKind::Fixed, 1));
        let dropped = allocate_players(&dist, 1, RemainderPolicy::Drop);
        assert_eq!(dropped.iter().map(|(_, c)| c).sum::<usize>(), 0);
    }
}
