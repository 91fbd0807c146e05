//! League scoring command-line entrypoint.

use anyhow::Context;
use clap::Parser;
use league_scoring::{
    config::AppConfig,
    dao::models::DriverId,
    services::{league_service, roster, scoring_service, season, standings_service},
    services::details::format_points,
    state::ScoringSession,
};
use time::{Date, OffsetDateTime};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path.clone()),
        None => AppConfig::load(),
    };
    let mut session = ScoringSession::from_config(&config).context("opening league store")?;

    run(&mut session, cli.command)
}

fn run(session: &mut ScoringSession, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => {
            let setup = season::initialize_season(session, &season::season_2025())
                .context("initializing season")?;
            println!(
                "created {} table(s), seeded {} table(s)",
                setup.created.len(),
                setup.seeded.len()
            );
        }
        Commands::Races => {
            let today = today();
            let view = session.get_view(false).context("loading league")?;
            let next = standings_service::upcoming_races(view, today)
                .first()
                .map(|race| race.id.clone());
            for race in view.snapshot.races.values() {
                let marker = if next.as_ref() == Some(&race.id) { " <- next" } else { "" };
                println!(
                    "{:<4} {}  {:<9} {}{marker}",
                    race.id,
                    race.date,
                    race.status.as_str(),
                    race.name
                );
            }
            if let Some(race) = standings_service::most_recent_race(view, today) {
                println!("most recent: {} ({})", race.name, race.date);
            }
        }
        Commands::Players => {
            let view = session.get_view(false).context("loading league")?;
            let picks = standings_service::current_picks(view);
            for (player_id, name) in &view.player_names {
                let drivers = picks
                    .get(player_id)
                    .map(|drivers| join_ids(drivers))
                    .unwrap_or_default();
                println!("{player_id:<6} {name:<20} {drivers}");
            }
        }
        Commands::Standings => {
            let view = session.get_view(false).context("loading league")?;
            for standing in standings_service::standings(view) {
                println!(
                    "{:>3}. {:<20} {:>8}",
                    standing.rank,
                    standing.name,
                    format_points(standing.points)
                );
            }
        }
        Commands::Drivers => {
            let view = session.get_view(false).context("loading league")?;
            for standing in standings_service::driver_standings(view) {
                println!(
                    "{:>3}. {:<4} {:<24} {:>8}",
                    standing.rank,
                    standing.id,
                    standing.name,
                    format_points(standing.points)
                );
            }
        }
        Commands::Score { race } => {
            let result = scoring_service::score_event(session, &race)
                .with_context(|| format!("scoring race {race}"))?;
            for row in &result.rows {
                println!(
                    "{:<20} {:>7}  {}",
                    row.player_name,
                    format_points(row.total),
                    row.details
                );
            }
        }
        Commands::Breakdown { race } => {
            let view = session.get_view(false).context("loading league")?;
            for row in standings_service::race_breakdown(view, &race)? {
                println!(
                    "{:<20} {:>7}  {}",
                    row.player_name,
                    format_points(row.points),
                    row.details
                );
            }
        }
        Commands::Substitute {
            race,
            substitute,
            team,
            original,
        } => {
            league_service::record_substitution(session, &race, &substitute, &team, &original)
                .context("recording substitution")?;
            println!("{substitute} replaces {original} at {race}");
        }
        Commands::Results { race, points } => {
            league_service::record_race_results(session, &race, &points)
                .context("recording race results")?;
            println!("recorded {} result(s) for {race}", points.len());
        }
        Commands::AddPlayer {
            id,
            name,
            drivers,
            from,
        } => {
            let drivers: Vec<DriverId> = drivers.into_iter().map(DriverId::new).collect();
            let rules = session.rules().clone();
            let view = session.get_view(true).context("loading league")?;
            let credits = roster::validate_team(view, &drivers, &rules)?;
            league_service::add_player(session, &id, &name, &drivers, from.unwrap_or_else(today))
                .context("adding player")?;
            println!("added {name} with {} ({credits} credits)", join_ids(&drivers));
        }
        Commands::ChangeDriver {
            player,
            old,
            new,
            effective,
        } => {
            let effective = effective.unwrap_or_else(today);
            league_service::change_driver(session, &player, &old, &new, effective)
                .context("changing driver")?;
            println!("{player}: {old} -> {new} from {effective}");
        }
        Commands::Teams => {
            let rules = session.rules().clone();
            let view = session.get_view(false).context("loading league")?;
            for team in roster::available_teams(view, &rules) {
                println!("{:<12} {} credits", join_ids(&team.drivers), team.credits);
            }
        }
        Commands::Constructors => {
            let view = session.get_view(false).context("loading league")?;
            for team in standings_service::team_performance(view) {
                let races = team
                    .race_points
                    .iter()
                    .map(|(race_id, points)| format!("{race_id} {}", format_points(*points)))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "{:<20} {:>8}  {races}",
                    team.team_name,
                    format_points(team.total)
                );
            }
        }
        Commands::Efficiency { race } => {
            let view = session.get_view(false).context("loading league")?;
            for row in standings_service::credit_efficiency(view, race.as_deref())? {
                println!(
                    "{:<4} {:>2} cr  avg {:>6}  {:>6} per credit",
                    row.driver_id,
                    row.credits,
                    format_points(row.avg_points),
                    format_points(row.efficiency)
                );
            }
        }
        Commands::Backup => match session.backup().context("backing up league")? {
            Some(path) => println!("backup written to {}", path.display()),
            None => println!("nothing to back up"),
        },
    }

    info!("done");
    Ok(())
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn join_ids(ids: &[DriverId]) -> String {
    ids.iter()
        .map(DriverId::as_str)
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Configure tracing subscribers; `RUST_LOG` overrides the default level.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
