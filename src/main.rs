mod ui;

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::info;

use trackside::{HttpBackend, RecordedBackend, ReplayError, SessionRequest, SessionType};
use ui::{ReplayApp, ReplaySource, config::AppConfig};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a session prepared by the replay server
    Remote {
        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long)]
        round: Option<u32>,

        /// R for the race, S for the sprint
        #[arg(short, long)]
        session_type: Option<SessionType>,

        /// Ask the server to rebuild its cached copy of the session
        #[arg(long, default_value_t = false)]
        refresh: bool,

        #[arg(long)]
        server: Option<String>,
    },
    /// Replay a recorded session file without a server
    File {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn remote_request(
    year: Option<i32>,
    round: Option<u32>,
    session_type: Option<SessionType>,
    force_refresh: bool,
    app_config: &AppConfig,
) -> Result<SessionRequest, ReplayError> {
    let year = year
        .or(app_config.last_year)
        .ok_or_else(|| ReplayError::InvalidUserInput {
            field: "year".to_string(),
            reason: "no year given and none remembered".to_string(),
        })?;
    let round = round
        .or(app_config.last_round)
        .ok_or_else(|| ReplayError::InvalidUserInput {
            field: "round".to_string(),
            reason: "no round given and none remembered".to_string(),
        })?;
    if round == 0 {
        return Err(ReplayError::InvalidUserInput {
            field: "round".to_string(),
            reason: "rounds start at 1".to_string(),
        });
    }
    Ok(SessionRequest {
        year,
        round,
        session_type: session_type
            .or(app_config.last_session_type)
            .unwrap_or(SessionType::Race),
        force_refresh,
    })
}

fn run(source: ReplaySource, app_config: AppConfig, title: &str) -> Result<(), ReplayError> {
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::from(app_config.window_size.clone()))
        .with_min_inner_size(Vec2::new(640., 480.));

    eframe::run_native(
        title,
        native_options,
        Box::new(|cc| Ok(Box::new(ReplayApp::new(source, app_config, cc)))),
    )
    .expect("could not start app");
    Ok(())
}

fn remote(
    year: Option<i32>,
    round: Option<u32>,
    session_type: Option<SessionType>,
    refresh: bool,
    server: Option<String>,
) -> Result<(), ReplayError> {
    let mut app_config = AppConfig::from_local_file().unwrap_or_default();
    let request = remote_request(year, round, session_type, refresh, &app_config)?;
    if let Some(server) = server {
        app_config.server_url = server;
    }
    app_config.last_year = Some(request.year);
    app_config.last_round = Some(request.round);
    app_config.last_session_type = Some(request.session_type);

    let backend = Arc::new(HttpBackend::new(&app_config.server_url)?);
    info!(
        "Replaying {} round {} ({}) from {}",
        request.year,
        request.round,
        request.session_type,
        backend.base_url()
    );
    let title = format!(
        "Trackside - {} round {} {}",
        request.year, request.round, request.session_type
    );
    let source = ReplaySource {
        loader: backend.clone(),
        frames: backend,
        request,
    };
    run(source, app_config, &title)
}

fn file(input: &PathBuf) -> Result<(), ReplayError> {
    let app_config = AppConfig::from_local_file().unwrap_or_default();
    let backend = Arc::new(RecordedBackend::from_file(input)?);
    let session = backend.session();
    // the recording answers any request with its own session
    let request = SessionRequest {
        year: session.year.unwrap_or_default(),
        round: session.round_number.unwrap_or_default(),
        session_type: session
            .session_type
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(SessionType::Race),
        force_refresh: false,
    };
    let source = ReplaySource {
        loader: backend.clone(),
        frames: backend,
        request,
    };
    run(source, app_config, "Trackside")
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");
    match &cli.command {
        Commands::Remote {
            year,
            round,
            session_type,
            refresh,
            server,
        } => remote(*year, *round, *session_type, *refresh, server.clone())
            .expect("Error while running replay"),
        Commands::File { input } => file(input).expect("Error while replaying recording"),
    };
}
