use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub const POOL_SIZE: u8 = 100;
pub const DRAW_SIZE: usize = 9;
pub const PICK_SIZE: usize = 3;

/// Tirage gagnant d'un tour : 9 numéros distincts, triés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Draw {
    pub numbers: [u8; DRAW_SIZE],
}

impl Draw {
    pub fn new(mut numbers: [u8; DRAW_SIZE]) -> Self {
        numbers.sort_unstable();
        Self { numbers }
    }

    pub fn contains(&self, n: u8) -> bool {
        self.numbers.binary_search(&n).is_ok()
    }

    /// Nombre de numéros de `pick` présents dans le tirage.
    pub fn match_count(&self, pick: &Pick) -> usize {
        pick.numbers.iter().filter(|&&n| self.contains(n)).count()
    }
}

/// Grille d'un joueur : 3 numéros distincts, triés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pick {
    pub numbers: [u8; PICK_SIZE],
}

impl Pick {
    pub fn new(mut numbers: [u8; PICK_SIZE]) -> Self {
        numbers.sort_unstable();
        Self { numbers }
    }
}

impl std::fmt::Display for Pick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self
            .numbers
            .iter()
            .map(|n| format!("{:2}", n))
            .collect::<Vec<_>>()
            .join(" - ");
        write!(f, "{s}")
    }
}

/// Gains par nombre de numéros trouvés. 0 numéro ne rapporte rien.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutTable {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
}

impl Default for PayoutTable {
    fn default() -> Self {
        Self {
            p1: 25.0,
            p2: 200.0,
            p3: 250.0,
        }
    }
}

impl PayoutTable {
    pub fn new(p1: f64, p2: f64, p3: f64) -> Self {
        Self { p1, p2, p3 }
    }

    pub fn get(&self, match_count: usize) -> f64 {
        match match_count {
            1 => self.p1,
            2 => self.p2,
            3 => self.p3,
            _ => 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (k, amount) in [(1, self.p1), (2, self.p2), (3, self.p3)] {
            if !amount.is_finite() || amount < 0.0 {
                bail!("Gain pour {} numéro(s) invalide : {}", k, amount);
            }
        }
        Ok(())
    }
}

/// Jeu de paramètres nommé : mise et barème de gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub entry_fee: f64,
    pub payouts: PayoutTable,
}

impl Preset {
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            entry_fee: 20.0,
            payouts: PayoutTable::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Nom de preset vide");
        }
        if !self.entry_fee.is_finite() || self.entry_fee < 0.0 {
            bail!("Mise invalide : {}", self.entry_fee);
        }
        self.payouts.validate()
    }
}

fn validate_numbers(numbers: &[u8], expected: usize, label: &str) -> Result<()> {
    if numbers.len() != expected {
        bail!("{} : {} numéros attendus, {} reçus", label, expected, numbers.len());
    }
    for &n in numbers {
        if n < 1 || n > POOL_SIZE {
            bail!("{} : numéro {} hors limites (1-{})", label, n, POOL_SIZE);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("{} : numéro en double : {}", label, numbers[i]);
            }
        }
    }
    Ok(())
}

pub fn validate_draw(numbers: &[u8]) -> Result<()> {
    validate_numbers(numbers, DRAW_SIZE, "Tirage")
}

pub fn validate_pick(numbers: &[u8]) -> Result<()> {
    validate_numbers(numbers, PICK_SIZE, "Grille")
}
