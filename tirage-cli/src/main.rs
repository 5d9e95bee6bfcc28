mod display;
mod export;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use tirage_db::db::{PresetStore, db_path, delete_preset, list_presets, migrate, open_db};
use tirage_db::models::{PayoutTable, Preset};
use tirage_sim::config::SimConfig;
use tirage_sim::draw::DrawMode;
use tirage_sim::engine::{Simulation, dropped_players};
use tirage_sim::probability::MatchModel;
use tirage_sim::report::profit_histogram;
use tirage_sim::strategy::{RemainderPolicy, StrategyDistribution, StrategyKind};

use crate::display::{
    display_histogram, display_house_profit_chart, display_presets, display_strategies,
    display_summary, display_theory, display_theory_vs_simulation,
};

#[derive(Parser)]
#[command(name = "tirage", about = "Simulateur de tirages : 3 numéros joués, 9 tirés parmi 100")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lancer une simulation
    Run(RunArgs),

    /// Probabilités théoriques et espérance par ticket
    Theory {
        /// Preset de gains à utiliser
        #[arg(long)]
        preset: Option<String>,

        #[command(flatten)]
        payouts: PayoutArgs,
    },

    /// Gérer les presets de gains
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Afficher le chemin de la base de données
    DbPath,
}

#[derive(clap::Args, Default)]
struct PayoutArgs {
    /// Mise par ticket
    #[arg(long)]
    entry_fee: Option<f64>,

    /// Gain pour 1 numéro
    #[arg(long)]
    p1: Option<f64>,

    /// Gain pour 2 numéros
    #[arg(long)]
    p2: Option<f64>,

    /// Gain pour 3 numéros
    #[arg(long)]
    p3: Option<f64>,
}

impl PayoutArgs {
    fn apply(&self, entry_fee: &mut f64, payouts: &mut PayoutTable) {
        if let Some(fee) = self.entry_fee {
            *entry_fee = fee;
        }
        if let Some(p1) = self.p1 {
            payouts.p1 = p1;
        }
        if let Some(p2) = self.p2 {
            payouts.p2 = p2;
        }
        if let Some(p3) = self.p3 {
            payouts.p3 = p3;
        }
    }
}

#[derive(clap::Args)]
struct RunArgs {
    /// Fichier de configuration JSON (les options ci-dessous le surchargent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset de gains à charger depuis la base
    #[arg(long)]
    preset: Option<String>,

    #[command(flatten)]
    payouts: PayoutArgs,

    /// Nombre de joueurs
    #[arg(short = 'n', long)]
    players: Option<usize>,

    /// Nombre de tours
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Répartition des stratégies, ex. "fixed=40,pattern=30,random=30"
    #[arg(short, long, value_parser = parse_distribution)]
    distribution: Option<StrategyDistribution>,

    /// Sort des joueurs laissés par la troncature de la répartition
    #[arg(long)]
    remainder: Option<RemainderPolicy>,

    /// Nombre de tirages mémorisés par la stratégie adaptive
    #[arg(long)]
    memory: Option<usize>,

    /// Gains × 1.2 tous les 5 tours
    #[arg(long, conflicts_with = "no_bonus")]
    bonus: bool,

    /// Désactive le bonus, même s'il est activé par le fichier de configuration
    #[arg(long)]
    no_bonus: bool,

    /// Mode de tirage
    #[arg(short, long)]
    mode: Option<DrawMode>,

    /// Seed pour la reproductibilité
    #[arg(long)]
    seed: Option<u64>,

    /// Nombre de classes de l'histogramme des soldes
    #[arg(long, default_value = "50")]
    bins: usize,

    /// Exporter le résumé en CSV
    #[arg(long)]
    summary_csv: Option<PathBuf>,

    /// Exporter le détail par tour en CSV
    #[arg(long)]
    rounds_csv: Option<PathBuf>,

    /// Exporter le solde de chaque joueur en CSV
    #[arg(long)]
    profits_csv: Option<PathBuf>,

    /// Enregistrer la configuration effective en JSON
    #[arg(long)]
    save_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum PresetAction {
    /// Lister les presets
    List,

    /// Afficher un preset
    Load { name: String },

    /// Créer ou remplacer un preset
    Save {
        name: String,
        #[arg(long)]
        entry_fee: f64,
        #[arg(long)]
        p1: f64,
        #[arg(long)]
        p2: f64,
        #[arg(long)]
        p3: f64,
    },

    /// Supprimer un preset
    Delete { name: String },
}

fn parse_distribution(s: &str) -> Result<StrategyDistribution, String> {
    let mut dist = StrategyDistribution::empty();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, pct) = part
            .split_once('=')
            .ok_or_else(|| format!("'{}' : format attendu strategie=pourcentage", part))?;
        let kind = StrategyKind::from_str(name.trim(), true)
            .map_err(|_| format!("stratégie inconnue : '{}'", name.trim()))?;
        let pct: u32 = pct
            .trim()
            .parse()
            .map_err(|_| format!("pourcentage invalide : '{}'", pct.trim()))?;
        dist.set(kind, pct);
    }
    Ok(dist)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let path = db_path();
    let mut conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Run(args) => cmd_run(&conn, args),
        Command::Theory { preset, payouts } => cmd_theory(&conn, preset.as_deref(), &payouts),
        Command::Preset { action } => cmd_preset(&mut conn, action),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn load_named_preset<S: PresetStore>(store: &S, name: &str) -> Result<Preset> {
    store
        .load_preset(name)?
        .with_context(|| format!("Preset '{}' introuvable. Voir : tirage preset list", name))
}

fn build_config<S: PresetStore>(store: &S, args: &RunArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Impossible de lire {:?}", path))?;
            SimConfig::from_json(&json)?
        }
        None => SimConfig::default(),
    };

    if let Some(name) = &args.preset {
        let preset = load_named_preset(store, name)?;
        config.entry_fee = preset.entry_fee;
        config.payouts = preset.payouts;
    }
    args.payouts.apply(&mut config.entry_fee, &mut config.payouts);

    if let Some(players) = args.players {
        config.num_players = players;
    }
    if let Some(rounds) = args.rounds {
        config.num_rounds = rounds;
    }
    if let Some(distribution) = args.distribution {
        config.distribution = distribution;
    }
    if let Some(remainder) = args.remainder {
        config.remainder = remainder;
    }
    if let Some(memory) = args.memory {
        config.adaptive_memory = memory;
    }
    if args.bonus {
        config.bonus_enabled = true;
    } else if args.no_bonus {
        config.bonus_enabled = false;
    }
    if let Some(mode) = args.mode {
        config.draw_mode = mode;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    Ok(config)
}

fn cmd_run(conn: &tirage_db::rusqlite::Connection, args: RunArgs) -> Result<()> {
    let config = build_config(conn, &args)?;

    if let Some(path) = &args.save_config {
        std::fs::write(path, config.to_json()?)
            .with_context(|| format!("Impossible d'écrire {:?}", path))?;
        println!("Configuration enregistrée dans : {}", path.display());
    }

    let dropped = dropped_players(&config);
    if dropped > 0 {
        println!("(Répartition tronquée : {} joueur(s) non créé(s))", dropped);
    }
    if config.draw_mode == DrawMode::Weighted {
        println!(
            "(Mode pondéré : numéros 1-{} pondérés ×{}. Tirage avec remise puis dédoublonnage, \
             approximation d'un tirage pondéré sans remise.)",
            config.weighting.favored_max, config.weighting.favored_weight
        );
    }

    let mut sim = Simulation::new(config.clone())?;

    let pb = ProgressBar::new(config.num_rounds as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tours")
        .context("Gabarit de barre de progression invalide")?
        .progress_chars("=> "));

    while !sim.is_finished() {
        if let Err(e) = sim.play_round() {
            pb.abandon();
            return Err(e.into());
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let output = sim.finish()?;
    println!("Simulation terminée (seed : {})", output.summary.seed);

    display_summary(&output.summary);
    display_theory_vs_simulation(&output.summary);
    display_strategies(&output.summary.strategies);
    display_histogram(&profit_histogram(&output.profits, args.bins));
    display_house_profit_chart(&output.rounds);

    if let Some(path) = &args.summary_csv {
        export::write_summary_csv(path, &output.summary)?;
        println!("Résumé exporté : {}", path.display());
    }
    if let Some(path) = &args.rounds_csv {
        export::write_rounds_csv(path, &output.rounds)?;
        println!("Détail par tour exporté : {}", path.display());
    }
    if let Some(path) = &args.profits_csv {
        export::write_profits_csv(path, &output.profits, &output.strategies)?;
        println!("Soldes des joueurs exportés : {}", path.display());
    }

    Ok(())
}

fn cmd_theory(conn: &tirage_db::rusqlite::Connection, preset: Option<&str>, args: &PayoutArgs) -> Result<()> {
    let mut base = match preset {
        Some(name) => load_named_preset(conn, name)?,
        None => Preset::standard(),
    };
    args.apply(&mut base.entry_fee, &mut base.payouts);
    base.validate()?;

    display_theory(&MatchModel::standard(), &base.payouts, base.entry_fee);
    Ok(())
}

fn cmd_preset(conn: &mut tirage_db::rusqlite::Connection, action: PresetAction) -> Result<()> {
    match action {
        PresetAction::List => {
            let presets = list_presets(conn)?;
            display_presets(&presets);
        }
        PresetAction::Load { name } => {
            let preset = load_named_preset(&*conn, &name)?;
            display_presets(&[(preset, String::new())]);
        }
        PresetAction::Save { name, entry_fee, p1, p2, p3 } => {
            let preset = Preset {
                name,
                entry_fee,
                payouts: PayoutTable::new(p1, p2, p3),
            };
            let existed = conn.save_preset(&preset)?;
            if existed {
                println!("Preset '{}' mis à jour.", preset.name);
            } else {
                println!("Preset '{}' créé.", preset.name);
            }
        }
        PresetAction::Delete { name } => {
            if name == "standard" {
                bail!("Le preset 'standard' ne peut pas être supprimé");
            }
            if delete_preset(conn, &name)? {
                println!("Preset '{}' supprimé.", name);
            } else {
                println!("Preset '{}' introuvable.", name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tirage_db::db::MemoryPresetStore;

    #[test]
    fn test_parse_distribution() {
        let dist = parse_distribution("fixed=40, pattern=30,random=30").unwrap();
        assert_eq!(dist.fixed, 40);
        assert_eq!(dist.pattern, 30);
        assert_eq!(dist.random, 30);
        assert_eq!(dist.rotate, 0);
        assert_eq!(dist.total(), 100);
    }

    #[test]
    fn test_parse_distribution_errors() {
        assert!(parse_distribution("fixed").is_err());
        assert!(parse_distribution("lucky=100").is_err());
        assert!(parse_distribution("fixed=abc").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "tirage", "run", "-n", "10", "-r", "3", "--mode", "weighted", "--bonus",
            "--distribution", "adaptive=50,rotate=50", "--p2", "150",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("sous-commande run attendue");
        };
        assert_eq!(args.players, Some(10));
        assert_eq!(args.rounds, Some(3));
        assert_eq!(args.mode, Some(DrawMode::Weighted));
        assert!(args.bonus);
        assert_eq!(args.payouts.p2, Some(150.0));
        assert_eq!(args.distribution.unwrap().adaptive, 50);
    }

    #[test]
    fn test_build_config_precedence() {
        let mut store = MemoryPresetStore::new();
        store
            .save_preset(&Preset {
                name: "genereux".to_string(),
                entry_fee: 10.0,
                payouts: PayoutTable::new(15.0, 100.0, 500.0),
            })
            .unwrap();

        let cli = Cli::try_parse_from(["tirage", "run", "--preset", "genereux", "--p3", "900", "--seed", "4"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("sous-commande run attendue");
        };
        let config = build_config(&store, &args).unwrap();
        assert_eq!(config.entry_fee, 10.0);
        assert_eq!(config.payouts, PayoutTable::new(15.0, 100.0, 900.0));
        assert_eq!(config.seed, Some(4));
        assert_eq!(config.num_players, 1000);
    }

    #[test]
    fn test_build_config_missing_preset() {
        let conn = tirage_db::rusqlite::Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let cli = Cli::try_parse_from(["tirage", "run", "--preset", "absent"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("sous-commande run attendue");
        };
        assert!(build_config(&conn, &args).is_err());
    }

    #[test]
    fn test_no_bonus_overrides_config_file() {
        let path = std::env::temp_dir().join(format!("tirage-{}-bonus.json", std::process::id()));
        let file_config = SimConfig {
            bonus_enabled: true,
            ..Default::default()
        };
        std::fs::write(&path, file_config.to_json().unwrap()).unwrap();
        let store = MemoryPresetStore::new();
        let path_arg = path.to_string_lossy().to_string();

        let cli = Cli::try_parse_from(["tirage", "run", "--config", path_arg.as_str()]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("sous-commande run attendue");
        };
        assert!(build_config(&store, &args).unwrap().bonus_enabled);

        let cli = Cli::try_parse_from(["tirage", "run", "--config", path_arg.as_str(), "--no-bonus"]).unwrap();
        let Command::Run(args) = cli.command else {
            panic!("sous-commande run attendue");
        };
        assert!(!build_config(&store, &args).unwrap().bonus_enabled);

        assert!(Cli::try_parse_from(["tirage", "run", "--bonus", "--no-bonus"]).is_err());
        let _ = std::fs::remove_file(path);
    }
}
