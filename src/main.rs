use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use geoguide::app::{App, LocationRequest};
use geoguide::config::Config;
use geoguide::gemini::{AnswerService, GeminiClient};
use geoguide::handler::handle_event;
use geoguide::location::{FixedLocation, IpLocator, LocationProvider, NoLocation};
use geoguide::render::{render_message, render_plain};
use geoguide::state::UserLocation;
use geoguide::tui::{self, EventHandler, Tui};
use geoguide::{logging, ui};

#[derive(Parser)]
#[command(name = "geoguide", version)]
#[command(about = "Ask about places, restaurants and geography, grounded with Google Maps")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Gemini model to use
    #[arg(short, long, global = true, env = "GEOGUIDE_MODEL")]
    model: Option<String>,
    /// Fixed latitude for "nearby" questions
    #[arg(long, global = true, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,
    /// Fixed longitude for "nearby" questions
    #[arg(long, global = true, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
    /// Never look up or send a location
    #[arg(long, global = true, conflicts_with_all = ["lat", "lon"])]
    no_location: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Ask one question and print the answer
    Ask {
        /// Your question
        question: String,
        /// Print the answer text and citations as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Ask { .. }) => logging::init_stderr()?,
        _ => {
            let path = logging::init_file()?;
            eprintln!("Logging to {}", path.display());
        }
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring unreadable config file: {:#}", e);
        Config::new()
    });

    let model = cli.model.clone().unwrap_or_else(|| config.model().to_string());
    let answers: Arc<dyn AnswerService> = Arc::new(GeminiClient::new(
        config.base_url(),
        &config.resolve_api_key(),
        &model,
    ));
    let locator = build_locator(&cli, &config);
    let auto_locate = !cli.no_location && config.auto_location();

    let app = App::new(answers, locator, &model);
    info!(%model, auto_locate, "starting geoguide");

    match cli.command {
        Some(Commands::Ask { question, json }) => ask(app, &question, json, auto_locate).await,
        Some(Commands::Chat) | None => run_tui(app, auto_locate).await,
    }
}

fn build_locator(cli: &Cli, config: &Config) -> Arc<dyn LocationProvider> {
    if cli.no_location {
        return Arc::new(NoLocation);
    }
    if let (Some(lat), Some(lon)) = (cli.lat, cli.lon) {
        return Arc::new(FixedLocation(UserLocation::new(lat, lon)));
    }
    match config.fixed_location() {
        Some(loc) => Arc::new(FixedLocation(loc)),
        None => Arc::new(IpLocator::new(config.location_url())),
    }
}

async fn run_tui(mut app: App, auto_locate: bool) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    if auto_locate {
        app.request_location(LocationRequest::Automatic);
    }

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handle_event(app, event),
            None => break,
        }
        app.poll_tasks().await;
    }
    Ok(())
}

async fn ask(mut app: App, question: &str, json: bool, auto_locate: bool) -> Result<()> {
    if auto_locate {
        app.locate(LocationRequest::Automatic).await;
    }

    let submission = app
        .begin_submission(question)
        .ok_or_else(|| anyhow!("Question is empty"))?;
    let result = app
        .answers
        .answer(&submission.prompt, submission.location, &submission.history)
        .await;

    match result {
        Ok(answer) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            }
            app.finish_submission(Ok(answer));
        }
        Err(e) => {
            let message = format!("Could not get an answer: {}", e);
            app.finish_submission(Err(e.into()));
            print_reply(&app)?;
            return Err(anyhow!(message));
        }
    }

    if !json {
        print_reply(&app)?;
    }
    Ok(())
}

fn print_reply(app: &App) -> Result<()> {
    let reply = app
        .conversation
        .last()
        .ok_or_else(|| anyhow!("No reply recorded"))?;
    println!("{}", render_plain(&render_message(reply)));
    Ok(())
}
