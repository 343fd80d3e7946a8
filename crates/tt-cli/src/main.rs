use std::io::{Write, stdout};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tt_cli::commands::history::HistoryFilter;
use tt_cli::commands::util::{open_database, peek_session, with_session};
use tt_cli::commands::{activities, clear, export, history, status, timer, watch};
use tt_cli::{ActivitiesAction, Cli, Commands, Config, HistoryAction, SessionFile};
use tt_core::{Clock, SystemClock};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = stdout();
    let mut out = stdout.lock();
    dispatch(&mut out, command, &config)?;
    out.flush()?;
    Ok(())
}

fn dispatch<W: Write>(out: &mut W, command: &Commands, config: &Config) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let session_file = SessionFile::new(&config.session_path);

    match command {
        Commands::Activities(action) => {
            let db = open_database(config)?;
            match action {
                ActivitiesAction::List { json } => activities::list(out, &db, *json)?,
                ActivitiesAction::Add { name } => activities::add(out, &db, name)?,
            }
        }
        Commands::Select { name } => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| timer::select(out, c, name))?;
        }
        Commands::Start { name } => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| {
                timer::start(out, c, name.as_deref())
            })?;
        }
        Commands::Toggle => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| timer::toggle(out, c))?;
        }
        Commands::Pause => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| timer::pause(out, c))?;
        }
        Commands::Resume => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| timer::resume(out, c))?;
        }
        Commands::Stop => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| timer::stop(out, c))?;
        }
        Commands::Discard => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| timer::discard(out, c))?;
        }
        Commands::Status { json } => {
            let session = peek_session(&session_file, clock)?;
            status::run(out, &session, config.export_timezone, *json)?;
        }
        Commands::Watch { ticks } => {
            watch::run(out, &session_file, &clock, *ticks, watch::TICK)?;
        }
        Commands::History(args) => {
            let db = open_database(config)?;
            match &args.action {
                Some(HistoryAction::MarkUploaded { ids, all_pending }) => {
                    history::mark_uploaded(out, &db, ids, *all_pending)?;
                }
                None => {
                    let filter = HistoryFilter {
                        pending: args.pending,
                        today: args
                            .today
                            .then(|| config.export_timezone.date_of(clock.now())),
                    };
                    history::run(out, &db, filter, args.json, config.export_timezone)?;
                }
            }
        }
        Commands::Export { output } => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| {
                export::run(out, c, config.export_timezone, output.as_deref())
            })?;
        }
        Commands::Clear { yes } => {
            let db = open_database(config)?;
            with_session(&db, &session_file, clock, |c| clear::run(out, c, *yes))?;
        }
    }
    Ok(())
}
