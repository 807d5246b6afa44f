use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use recdeck::app::App;
use recdeck::config::Config;
use recdeck::data::memory::MemorySource;
use recdeck::ui::theme::Theme;

#[derive(Parser)]
#[command(
    name = "recdeck",
    version,
    about = "Keyboard-driven record browser and editor for the terminal"
)]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(short, long, help = "Path to a JSON dataset (bundled sample when omitted)")]
    data: Option<PathBuf>,

    #[arg(short, long, help = "App to open at startup")]
    app: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    let theme_name = cli.theme.unwrap_or_else(|| config.theme.clone());
    let theme = Theme::load(&theme_name).unwrap_or_default();
    let theme: &'static Theme = Box::leak(Box::new(theme));

    let source = match &cli.data {
        Some(path) => MemorySource::from_path(path)?,
        None => MemorySource::sample(),
    };

    let mut app = App::new(Box::new(source), theme, config.checked_char)?;
    if let Some(name) = cli.app.or_else(|| config.start_app.clone()) {
        if app.source().list_apps().contains(&name) {
            app.open_app(&name);
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        // Blocking read; every key is dispatched to completion before the
        // next draw.
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.dispatch_key(key);
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}
