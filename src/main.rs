pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use handdrill::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, StorageBackend},
    hand_table::{self, TableSource},
    logging,
    progress::ProgressStore,
    runtime::{CrosstermEventSource, DrillEvent, Runner},
    selector::{HandSelector, UniformSelector, WeightedSelector},
    session::Drill,
    storage::{KeyValueStore, MemoryStore},
};
use log::error;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 250;

/// starting-hand chart drill that keeps asking about the hands you miss
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "Drill a poker starting-hand chart. Each hand asks for its Players value; hands you miss come back more often, and misses are saved between runs."
)]
pub struct Cli {
    /// CSV table with Hand,Color,Players,misses columns (defaults to the bundled chart)
    #[clap(short = 't', long)]
    table: Option<PathBuf>,

    /// directory a relative --table path is resolved against
    #[clap(long)]
    base_dir: Option<PathBuf>,

    /// where progress is saved
    #[clap(short = 'b', long, value_enum)]
    backend: Option<StorageBackend>,

    /// directory holding saved progress (defaults to ~/.local/state/handdrill)
    #[clap(long)]
    state_dir: Option<PathBuf>,

    /// ask about every hand equally often instead of favouring missed hands
    #[clap(long)]
    uniform: bool,

    /// show each hand's current weight while drilling
    #[clap(long)]
    show_weights: bool,

    /// print the most missed hands and exit
    #[clap(long, value_name = "ROWS", num_args = 0..=1, default_missing_value = "20")]
    stats: Option<usize>,

    /// erase saved progress and exit
    #[clap(long)]
    reset_progress: bool,

    /// store the effective settings as the new defaults
    #[clap(long)]
    save_config: bool,
}

/// Effective settings for one run: saved config overlaid with CLI flags
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub table: TableSource,
    pub base_dir: PathBuf,
    pub backend: StorageBackend,
    pub state_dir: Option<PathBuf>,
    pub uniform: bool,
    pub show_weights: bool,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            table: TableSource::from_option(cli.table.clone().or_else(|| config.table_path.clone())),
            base_dir: cli
                .base_dir
                .clone()
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| PathBuf::from(".")),
            backend: cli.backend.unwrap_or(config.backend),
            state_dir: cli.state_dir.clone(),
            uniform: cli.uniform || config.uniform,
            show_weights: cli.show_weights || config.show_weights,
        }
    }

    pub fn to_config(&self) -> Config {
        Config {
            table_path: match &self.table {
                TableSource::Bundled => None,
                TableSource::Path(p) => Some(p.clone()),
            },
            backend: self.backend,
            uniform: self.uniform,
            show_weights: self.show_weights,
        }
    }

    fn selector(&self) -> Box<dyn HandSelector> {
        if self.uniform {
            Box::new(UniformSelector)
        } else {
            Box::new(WeightedSelector)
        }
    }

    /// Open the configured medium. A medium that cannot be opened degrades to
    /// an in-memory one so the drill still starts; the second value then
    /// explains why nothing will be saved.
    fn open_medium(&self) -> (Box<dyn KeyValueStore>, Option<String>) {
        match self.backend.open(self.state_dir.as_deref()) {
            Ok(medium) => (medium, None),
            Err(e) => {
                error!("could not open {} progress store, progress will not be saved: {e}", self.backend);
                let warning = format!("cannot open {} store: {e}", self.backend);
                (Box::new(MemoryStore::new()), Some(warning))
            }
        }
    }
}

pub type AppDrill = Drill<Box<dyn KeyValueStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Quiz,
    Stats,
    LoadFailed,
}

#[derive(Debug, Default)]
pub struct StatsState {
    pub scroll_offset: usize,
}

pub struct App {
    pub settings: Settings,
    pub drill: Option<AppDrill>,
    pub load_error: Option<String>,
    pub state: AppState,
    /// Candidate answers offered for every hand
    pub domain: Vec<u32>,
    /// Highlighted candidate
    pub cursor: usize,
    pub stats_state: StatsState,
    /// Set when the configured store could not be opened and misses only
    /// live in memory
    pub storage_warning: Option<String>,
}

impl App {
    /// Full bootstrap: fetch the table, load progress, pick the first hand.
    pub fn new(settings: Settings) -> Self {
        match hand_table::fetch(&settings.table, &settings.base_dir) {
            Ok(reference) => {
                let (medium, storage_warning) = settings.open_medium();
                let drill = Drill::new(reference, medium).with_selector(settings.selector());
                Self {
                    storage_warning,
                    ..Self::with_drill(settings, drill)
                }
            }
            Err(e) => {
                error!("could not load hand table: {e}");
                Self {
                    settings,
                    drill: None,
                    load_error: Some(e.to_string()),
                    state: AppState::LoadFailed,
                    domain: Vec::new(),
                    cursor: 0,
                    stats_state: StatsState::default(),
                    storage_warning: None,
                }
            }
        }
    }

    pub fn with_drill(settings: Settings, mut drill: AppDrill) -> Self {
        if drill.current_item().is_none() {
            drill.select_next();
        }
        Self {
            domain: hand_table::answer_domain(drill.items()),
            settings,
            drill: Some(drill),
            load_error: None,
            state: AppState::Quiz,
            cursor: 0,
            stats_state: StatsState::default(),
            storage_warning: None,
        }
    }

    /// Re-run the whole bootstrap from scratch.
    pub fn reload(&mut self) {
        *self = App::new(self.settings.clone());
    }

    fn submit(&mut self, candidate: usize) {
        let Some(&value) = self.domain.get(candidate) else {
            return;
        };
        if let Some(drill) = self.drill.as_mut() {
            self.cursor = candidate;
            drill.submit_answer(value);
        }
    }

    fn next_hand(&mut self) {
        if let Some(drill) = self.drill.as_mut() {
            if drill.can_advance() {
                drill.select_next();
                self.cursor = 0;
            }
        }
    }

    fn answered(&self) -> bool {
        self.drill.as_ref().is_some_and(|d| d.can_advance())
    }

    /// Apply one key press. Returns false when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return false;
        }

        match self.state {
            AppState::LoadFailed => match key.code {
                KeyCode::Char('r') => self.reload(),
                KeyCode::Char('q') => return false,
                _ => {}
            },
            AppState::Quiz => match key.code {
                KeyCode::Char('q') => return false,
                KeyCode::Char('s') => {
                    self.stats_state = StatsState::default();
                    self.state = AppState::Stats;
                }
                KeyCode::Char(c @ '1'..='9') if !self.answered() => {
                    let candidate = c as usize - '1' as usize;
                    self.submit(candidate);
                }
                KeyCode::Left | KeyCode::Up if !self.answered() => {
                    self.cursor = self.cursor.saturating_sub(1);
                }
                KeyCode::Right | KeyCode::Down if !self.answered() => {
                    if self.cursor + 1 < self.domain.len() {
                        self.cursor += 1;
                    }
                }
                KeyCode::Enter if !self.answered() => self.submit(self.cursor),
                KeyCode::Enter | KeyCode::Char('n') | KeyCode::Char(' ') | KeyCode::Right => {
                    self.next_hand()
                }
                _ => {}
            },
            AppState::Stats => match key.code {
                KeyCode::Char('q') => return false,
                KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Char('s') => {
                    self.state = AppState::Quiz;
                }
                KeyCode::Up => {
                    self.stats_state.scroll_offset = self.stats_state.scroll_offset.saturating_sub(1);
                }
                KeyCode::Down => {
                    // clamped when rendering
                    self.stats_state.scroll_offset += 1;
                }
                KeyCode::PageUp => {
                    self.stats_state.scroll_offset = self.stats_state.scroll_offset.saturating_sub(10);
                }
                KeyCode::PageDown => {
                    self.stats_state.scroll_offset += 10;
                }
                KeyCode::Home => {
                    self.stats_state.scroll_offset = 0;
                }
                KeyCode::Char('x') => {
                    if let Some(drill) = self.drill.as_mut() {
                        if let Err(e) = drill.reset_progress() {
                            error!("could not erase progress: {e}");
                        }
                        drill.select_next();
                        self.cursor = 0;
                        self.stats_state = StatsState::default();
                    }
                }
                _ => {}
            },
        }
        true
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_store = FileConfigStore::new();
    let config = config_store.load();
    let settings = Settings::resolve(&cli, &config);

    let log_path = settings
        .state_dir
        .as_ref()
        .map(|dir| dir.join("handdrill.log"))
        .or_else(AppDirs::log_path);
    logging::init(log_path.as_deref());

    if cli.save_config {
        config_store.save(&settings.to_config())?;
        println!("saved settings to {}", config_store.path().display());
    }

    if cli.reset_progress {
        let mut medium = settings.backend.open(settings.state_dir.as_deref())?;
        ProgressStore::default().persist(&mut medium)?;
        println!("progress erased");
        return Ok(());
    }

    if let Some(rows) = cli.stats {
        print_stats(&settings, rows)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(settings);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    terminal.draw(|f| ui::draw(app, f))?;
    loop {
        match runner.step() {
            DrillEvent::Tick => {}
            DrillEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            DrillEvent::Key(key) => {
                if !app.handle_key(key) {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
        }
    }

    Ok(())
}

fn print_stats(settings: &Settings, rows: usize) -> Result<(), Box<dyn Error>> {
    let medium = settings.backend.open(settings.state_dir.as_deref())?;
    let drill = Drill::bootstrap(&settings.table, &settings.base_dir, medium)?;
    let summary = drill.most_missed(rows);

    if summary.is_empty() {
        println!("no misses recorded yet");
        return Ok(());
    }

    println!("{} misses recorded", drill.progress().total_misses());
    println!("{:<6} {:<14} {:>7} {:>7}  last missed", "hand", "label", "answer", "misses");
    for row in summary {
        println!(
            "{:<6} {:<14} {:>7} {:>7}  {}",
            row.key,
            row.label,
            row.target.map_or_else(|| "-".to_string(), |t| t.to_string()),
            row.misses,
            row.last_missed_at.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
