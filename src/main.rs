mod app;
mod components;
mod config;
mod event;
mod handler;
mod theme;
mod tui;
mod ui;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vcode_project::error::{AppError, AppResult};
use vcode_project::project::view::render_list;
use vcode_project::project::{visible_items, ProjectTree, ShellFilter};
use vcode_project::settings::load_project;

use crate::app::App;
use crate::config::{AppConfig, BrowserConfig};
use crate::event::{Event, EventHandler};
use crate::tui::{install_panic_hook, Tui};

/// Browse a project tree described by `*.files.xml` settings.
#[derive(Parser, Debug)]
#[command(name = "vproj", version, about)]
struct Cli {
    /// Project directory (`<name>.vcode`) or a single settings file
    path: PathBuf,

    /// Explicit config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file (interactive mode only logs when set)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the fully expanded tree and exit
    #[arg(long)]
    print: bool,

    /// Only list files matching these shell globs
    #[arg(long, num_args = 1..)]
    filter: Vec<String>,

    /// Open every group at start-up
    #[arg(long)]
    expand_all: bool,
}

impl Cli {
    fn config_overrides(&self) -> AppConfig {
        AppConfig {
            browser: BrowserConfig {
                filter: (!self.filter.is_empty()).then(|| self.filter.clone()),
                expand_all: self.expand_all.then_some(true),
                use_icons: None,
            },
            ..Default::default()
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The terminal belongs to the UI in interactive mode, so logs go to
/// `--log-file` there or nowhere; `--print` logs to stderr.
fn init_logging(cli: &Cli) -> AppResult<()> {
    if let Some(path) = &cli.log_file {
        let file = File::create(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if cli.print {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// Write every row of the fully expanded tree in the plain list format.
fn print_tree(tree: &ProjectTree, config: &AppConfig) -> AppResult<()> {
    let filter = ShellFilter::new(config.filter())?;
    let rows = visible_items(
        tree,
        |_| true,
        |item| filter.as_ref().map_or(true, |f| f.lets_through(item)),
    );
    let mut out = io::stdout().lock();
    for line in render_list(tree, &rows) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

async fn run(tui: &mut Tui, app: &mut App) -> AppResult<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(app, key),
            Event::Tick => app.clear_expired_status(),
            Event::Resize(_, _) => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn resolve_path(path: &Path) -> AppResult<PathBuf> {
    path.canonicalize()
        .map_err(|_| AppError::InvalidPath(format!("{} does not exist", path.display())))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let path = resolve_path(&cli.path)?;
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.config_overrides()));
    let tree = load_project(&path)?;

    if cli.print {
        return print_tree(&tree, &config);
    }

    install_panic_hook();
    let mut app = App::new(&path, tree, &config)?;
    let mut tui = Tui::new()?;
    let result = run(&mut tui, &mut app).await;
    tui.restore()?;
    result?;

    if let Some(chosen) = &app.chosen {
        println!("{}", chosen.display());
    }
    Ok(())
}
