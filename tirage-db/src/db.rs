use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::{PayoutTable, Preset};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS presets (
    name        TEXT PRIMARY KEY,
    entry_fee   REAL NOT NULL,
    payout_1    REAL NOT NULL,
    payout_2    REAL NOT NULL,
    payout_3    REAL NOT NULL,
    updated_at  TEXT NOT NULL
);
";

/// Stockage de presets nommés. Le moteur n'a besoin que de charger et
/// d'enregistrer par nom ; le format de persistance est l'affaire de l'implémentation.
pub trait PresetStore {
    fn load_preset(&self, name: &str) -> Result<Option<Preset>>;
    /// Retourne `true` si un preset du même nom a été remplacé.
    fn save_preset(&mut self, preset: &Preset) -> Result<bool>;
}

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("tirage.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

/// Crée le schéma et insère le preset `standard` s'il est absent.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    let standard = Preset::standard();
    conn.execute(
        "INSERT OR IGNORE INTO presets (name, entry_fee, payout_1, payout_2, payout_3, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            standard.name,
            standard.entry_fee,
            standard.payouts.p1,
            standard.payouts.p2,
            standard.payouts.p3,
            chrono::Local::now().to_rfc3339(),
        ],
    ).context("Échec de l'insertion du preset standard")?;
    Ok(())
}

/// Insère ou remplace un preset. Retourne `true` si le preset existait déjà.
pub fn upsert_preset(conn: &Connection, preset: &Preset) -> Result<bool> {
    preset.validate()?;
    let existed = fetch_preset(conn, &preset.name)?.is_some();
    conn.execute(
        "INSERT INTO presets (name, entry_fee, payout_1, payout_2, payout_3, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(name) DO UPDATE SET
            entry_fee = excluded.entry_fee,
            payout_1 = excluded.payout_1,
            payout_2 = excluded.payout_2,
            payout_3 = excluded.payout_3,
            updated_at = excluded.updated_at",
        rusqlite::params![
            preset.name,
            preset.entry_fee,
            preset.payouts.p1,
            preset.payouts.p2,
            preset.payouts.p3,
            chrono::Local::now().to_rfc3339(),
        ],
    ).with_context(|| format!("Échec de l'enregistrement du preset '{}'", preset.name))?;
    Ok(existed)
}

fn row_to_preset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Preset> {
    Ok(Preset {
        name: row.get(0)?,
        entry_fee: row.get(1)?,
        payouts: PayoutTable {
            p1: row.get(2)?,
            p2: row.get(3)?,
            p3: row.get(4)?,
        },
    })
}

pub fn fetch_preset(conn: &Connection, name: &str) -> Result<Option<Preset>> {
    let preset = conn
        .query_row(
            "SELECT name, entry_fee, payout_1, payout_2, payout_3 FROM presets WHERE name = ?1",
            [name],
            row_to_preset,
        )
        .optional()
        .with_context(|| format!("Échec de la lecture du preset '{}'", name))?;
    Ok(preset)
}

pub fn list_presets(conn: &Connection) -> Result<Vec<(Preset, String)>> {
    let mut stmt = conn.prepare(
        "SELECT name, entry_fee, payout_1, payout_2, payout_3, updated_at
         FROM presets ORDER BY name ASC"
    )?;
    let presets = stmt.query_map([], |row| {
        Ok((row_to_preset(row)?, row.get::<_, String>(5)?))
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(presets)
}

pub fn delete_preset(conn: &Connection, name: &str) -> Result<bool> {
    let changed = conn
        .execute("DELETE FROM presets WHERE name = ?1", [name])
        .with_context(|| format!("Échec de la suppression du preset '{}'", name))?;
    Ok(changed > 0)
}

impl PresetStore for Connection {
    fn load_preset(&self, name: &str) -> Result<Option<Preset>> {
        fetch_preset(self, name)
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<bool> {
        upsert_preset(self, preset)
    }
}

/// Stockage en mémoire, pour les tests et les usages sans base.
#[derive(Debug, Clone, Default)]
pub struct MemoryPresetStore {
    presets: BTreeMap<String, Preset>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }
}

impl PresetStore for MemoryPresetStore {
    fn load_preset(&self, name: &str) -> Result<Option<Preset>> {
        Ok(self.presets.get(name).cloned())
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<bool> {
        preset.validate()?;
        Ok(self.presets.insert(preset.name.clone(), preset.clone()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_preset(name: &str, entry_fee: f64) -> Preset {
        Preset {
            name: name.to_string(),
            entry_fee,
            payouts: PayoutTable::new(10.0, 100.0, 1000.0),
        }
    }

    #[test]
    fn test_migrate_seeds_standard() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let standard = fetch_preset(&conn, "standard").unwrap().unwrap();
        assert_eq!(standard, Preset::standard());
    }

    #[test]
    fn test_migrate_twice_keeps_edits() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        upsert_preset(&conn, &test_preset("standard", 5.0)).unwrap();
        migrate(&conn).unwrap();
        let standard = fetch_preset(&conn, "standard").unwrap().unwrap();
        assert_eq!(standard.entry_fee, 5.0);
    }

    #[test]
    fn test_upsert_and_fetch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let existed = upsert_preset(&conn, &test_preset("agressif", 10.0)).unwrap();
        assert!(!existed);
        let existed = upsert_preset(&conn, &test_preset("agressif", 12.0)).unwrap();
        assert!(existed);

        let loaded = fetch_preset(&conn, "agressif").unwrap().unwrap();
        assert_eq!(loaded.entry_fee, 12.0);
        assert_eq!(loaded.payouts.p3, 1000.0);
    }

    #[test]
    fn test_fetch_missing() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert!(fetch_preset(&conn, "inconnu").unwrap().is_none());
    }

    #[test]
    fn test_upsert_rejects_invalid() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert!(upsert_preset(&conn, &test_preset("negatif", -1.0)).is_err());
        assert!(fetch_preset(&conn, "negatif").unwrap().is_none());
    }

    #[test]
    fn test_list_and_delete() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        upsert_preset(&conn, &test_preset("b", 1.0)).unwrap();
        upsert_preset(&conn, &test_preset("a", 1.0)).unwrap();

        let names: Vec<String> = list_presets(&conn)
            .unwrap()
            .into_iter()
            .map(|(p, _)| p.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "standard"]);

        assert!(delete_preset(&conn, "a").unwrap());
        assert!(!delete_preset(&conn, "a").unwrap());
        assert_eq!(list_presets(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_store_trait_connection() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert!(!conn.save_preset(&test_preset("trait", 3.0)).unwrap());
        assert!(conn.save_preset(&test_preset("trait", 3.0)).unwrap());
        assert_eq!(conn.load_preset("trait").unwrap().unwrap().entry_fee, 3.0);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryPresetStore::new();
        assert!(store.load_preset("x").unwrap().is_none());
        assert!(!store.save_preset(&test_preset("x", 2.0)).unwrap());
        assert!(store.save_preset(&test_preset("x", 4.0)).unwrap());
        assert_eq!(store.load_preset("x").unwrap().unwrap().entry_fee, 4.0);
        assert_eq!(store.names(), vec!["x"]);
        assert!(store.save_preset(&test_preset("", 1.0)).is_err());
    }
}
