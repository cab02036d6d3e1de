mod controller;
mod data;
mod fetch;
mod map_draw;
mod registry;
mod state;
mod store;
mod ui;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info, warn};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;

use fetch::FetchOutcome;
use state::AppState;
use store::LegendStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = fetch::FetchConfig::from_env();
    let (records, status) = match fetch::load_buildings(&config) {
        FetchOutcome::Primary(data) => {
            info!("loaded {} buildings", data.len());
            let status = format!("{} buildings", data.len());
            (data, status)
        }
        FetchOutcome::Fallback(data) => {
            warn!("loaded {} buildings via table query", data.len());
            let status = format!("{} buildings (table query)", data.len());
            (data, status)
        }
        FetchOutcome::Failed(reason) => {
            error!("could not load buildings: {reason}");
            (Vec::new(), "No building data".to_string())
        }
    };

    let store = LegendStore::new(LegendStore::default_dir());
    let mut state = AppState::new(records, store, status);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        terminal.draw(|f| ui::draw(f, &mut state))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(KeyEvent {
                    code,
                    kind: KeyEventKind::Press,
                    ..
                }) => {
                    if state.handle_input(code) {
                        break;
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse),
                _ => {}
            }
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
