use std::collections::VecDeque;

use tirage_db::models::Draw;

/// Derniers tirages, bornés à `capacity`. Le plus ancien est évincé en premier.
#[derive(Debug, Clone)]
pub struct DrawHistory {
    capacity: usize,
    draws: VecDeque<Draw>,
}

impl DrawHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            draws: VecDeque::new(),
        }
    }

    pub fn push(&mut self, draw: Draw) {
        self.draws.push_back(draw);
        while self.draws.len() > self.capacity {
            self.draws.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Du plus ancien au plus récent.
    pub fn iter(&self) -> impl Iterator<Item = &Draw> {
        self.draws.iter()
    }

    /// Présence de chaque numéro dans l'historique, indexée par numéro (l'indice 0 est inutilisé).
    pub fn seen_mask(&self, pool_size: u8) -> Vec<bool> {
        let mut seen = vec![false; pool_size as usize + 1];
        for draw in &self.draws {
            for &n in &draw.numbers {
                if let Some(slot) = seen.get_mut(n as usize) {
                    *slot = true;
                }
            }
        }
        seen
    }

    /// Numéros apparus au moins une fois dans l'historique, triés.
    pub fn union(&self, pool_size: u8) -> Vec<u8> {
        self.seen_mask(pool_size)
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, seen)| **seen)
            .map(|(n, _)| n as u8)
            .collect()
    }
}
