//! canagrosa - terminal administration for the CANAGROSA registry.

use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use canagrosa_admin::api::{ApiClient, DataSource, KeyringTokenStore, SampleCache, TokenStore};
use canagrosa_admin::app::App;
use canagrosa_admin::catalog::Entity;
use canagrosa_admin::config::Config;
use canagrosa_admin::error::AppError;
use canagrosa_admin::events::{Event, EventHandler};
use canagrosa_admin::logging;
use canagrosa_admin::table::{JsonFileBackend, PreferenceStore};
use canagrosa_admin::tasks::{create_task_channel, TaskTracker};
use canagrosa_admin::ui::{init_theme, load_theme};

#[derive(Debug, Parser)]
#[command(name = "canagrosa", version, about)]
struct Cli {
    /// Connection profile from the configuration file.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Table to open first: clients, samples or users.
    #[arg(long)]
    table: Option<Entity>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store the API token for a profile in the OS keyring.
    Login {
        #[arg(long)]
        token: String,
    },
    /// Remove the stored API token of a profile.
    Logout,
    /// Forget the saved columns, widths and sort of a table.
    ResetTable {
        /// Table id (clients, samples, users).
        table: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let result = run(cli);
    logging::shutdown();
    result
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()
        .map_err(|e| anyhow!(AppError::from(e).display_message()))
        .context("could not load configuration")?;

    match cli.command {
        Some(Command::Login { token }) => {
            let profile = config.resolve_profile(cli.profile.as_deref())?;
            KeyringTokenStore.set(&profile.name, &token)?;
            println!("Token stored for profile '{}'.", profile.name);
            Ok(())
        }
        Some(Command::Logout) => {
            let profile = config.resolve_profile(cli.profile.as_deref())?;
            KeyringTokenStore.delete(&profile.name)?;
            println!("Token removed for profile '{}'.", profile.name);
            Ok(())
        }
        Some(Command::ResetTable { table }) => {
            let table_id = table
                .parse::<Entity>()
                .map(|e| e.table_id().to_string())
                .unwrap_or(table);
            let store = preference_store()?;
            if store.reset_table(&table_id) {
                println!("Preferences for table '{}' cleared.", table_id);
                Ok(())
            } else {
                Err(anyhow!("could not clear preferences for table '{}'", table_id))
            }
        }
        None => run_tui(&config, cli.profile.as_deref(), cli.table.unwrap_or_default()),
    }
}

fn preference_path() -> Result<PathBuf> {
    JsonFileBackend::default_path().ok_or_else(|| anyhow!("could not determine data directory"))
}

fn preference_store() -> Result<PreferenceStore> {
    Ok(PreferenceStore::new(JsonFileBackend::open(preference_path()?)))
}

fn run_tui(config: &Config, profile: Option<&str>, initial: Entity) -> Result<()> {
    let profile = config.resolve_profile(profile)?.clone();
    init_theme(load_theme(&config.settings.theme));

    let tokens: Arc<dyn TokenStore> = Arc::new(KeyringTokenStore);
    let client = ApiClient::new(&profile, tokens.as_ref())
        .map_err(|e| anyhow!(AppError::from(e).display_message()))?;
    let source = DataSource::new(client, SampleCache::shared(config.settings.cache_ttl()));

    let prefs = match preference_store() {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Preferences will not be saved");
            PreferenceStore::in_memory()
        }
    };

    let runtime = tokio::runtime::Runtime::new().context("could not start async runtime")?;
    // Background tasks are spawned from the UI loop below
    let _runtime = runtime.enter();

    let mut app = App::new(&config.settings, profile.name.clone(), tokens, prefs, initial);
    info!(profile = %profile.name, table = %initial, "Starting UI");

    let mut terminal = TerminalGuard::new()?;
    let result = event_loop(terminal.terminal(), &mut app, &source);
    drop(terminal);
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    source: &DataSource,
) -> Result<()> {
    let (mut rx, spawner) = create_task_channel();
    let mut tracker = TaskTracker::new();
    let events = EventHandler::new();

    let size = terminal.size()?;
    app.update(Event::Resize(size.width, size.height));
    app.start(Instant::now());

    loop {
        for request in app.take_requests() {
            spawner.dispatch(source, &mut tracker, request);
        }

        terminal.draw(|frame| app.view(frame))?;

        let event = events.next()?;
        app.update(event);

        while let Ok(message) = rx.try_recv() {
            app.handle_api_message(message);
        }

        if app.should_quit() {
            break;
        }
    }

    tracker.abort_all();
    Ok(())
}

/// Raw mode, alternate screen and mouse capture for as long as it lives.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        install_panic_hook();
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            restore_terminal();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    fn terminal(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
        let _ = self.terminal.show_cursor();
    }
}

fn install_panic_hook() {
    static HOOK: OnceLock<()> = OnceLock::new();
    HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_terminal();
            previous(info);
        }));
    });
}

fn restore_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
    let _ = disable_raw_mode();
    let _ = stdout.flush();
}
