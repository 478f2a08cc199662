use clap::Parser;
use combat_ledger_window_review::{config, init_logging, review, specs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Grade empowerment-window usage from a WoW combat log")]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Combat log file, or a Logs directory (newest WoWCombatLog*.txt is used)
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Player to review: a GUID ("Player-...") or a character name
    #[arg(short, long)]
    player: Option<String>,

    #[arg(short, long, value_enum)]
    activation: Option<config::ActivationMode>,

    /// Haste as a fraction (0.25 = 25%)
    #[arg(long)]
    haste: Option<f64>,

    /// Embedded profile key ("CLASS/Spec") or a path to a profile TOML
    #[arg(long)]
    profile: Option<String>,

    /// Print the embedded profiles and exit
    #[arg(long)]
    list_profiles: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_profiles {
        println!("{}", serde_json::to_string_pretty(&specs::list_all())?);
        return Ok(());
    }

    let mut cfg = config::load_or_default(&cli.config_dir)?;
    if let Some(log) = cli.log {
        cfg.log_path = log;
    }
    if let Some(player) = cli.player {
        if player.starts_with("Player-") {
            cfg.player_guid = player;
        } else {
            cfg.player_name = player;
            cfg.player_guid.clear();
        }
    }
    if let Some(mode) = cli.activation {
        cfg.activation = mode;
    }
    if let Some(haste) = cli.haste {
        cfg.haste = haste;
    }
    if let Some(profile) = cli.profile {
        if profile.ends_with(".toml") {
            cfg.profile_path = Some(PathBuf::from(profile));
        } else {
            cfg.profile = profile;
            cfg.profile_path = None;
        }
    }

    let _guard = init_logging(cfg.log_dir.as_deref())?;

    let report = review(&cfg).await?;
    tracing::info!("Overall: {}", report.overall());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
