use anyhow::Result;
use bubble_map::app::App;
use bubble_map::config::{Args, Config};
use bubble_map::{data, logging, ui};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use geojson::FeatureCollection;
use log::{error, info};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    let config = Config::from(Args::parse());
    logging::init();

    // Nothing is drawn unless both inputs load
    let (features, dataset) = match data::load(&config.data) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Error loading data: {e}");
            std::process::exit(1);
        }
    };

    // Initialize terminal
    logging::suspend();
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &config, features, dataset);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    logging::resume();

    result
}

/// Hover tracking, cause picking and slider clicks
fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => {
            app.set_mouse_pos(mouse.column, mouse.row, now);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            app.set_mouse_pos(mouse.column, mouse.row, now);
            app.click(mouse.column, mouse.row, now);
        }
        MouseEventKind::ScrollDown => app.next_cause(now),
        MouseEventKind::ScrollUp => app.prev_cause(now),
        _ => {}
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    config: &Config,
    features: FeatureCollection,
    dataset: data::Dataset,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, features, dataset, size.width, size.height, Instant::now());
    info!("Showing {} for {}", app.cause(), app.year());

    // Main loop
    loop {
        // Bubbles may move under a still pointer
        let frame_time = Instant::now();
        app.refresh_hover(frame_time);

        // Draw
        terminal.draw(|frame| ui::render(frame, &app, frame_time))?;

        // ~60fps while anything animates, idle otherwise
        let timeout = if app.is_animating(frame_time) { 16 } else { 100 };
        if event::poll(Duration::from_millis(timeout))? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Cause selector
                            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => {
                                app.next_cause(now);
                            }
                            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => {
                                app.prev_cause(now);
                            }

                            // Year slider
                            KeyCode::Right | KeyCode::Char('l') => app.next_year(now),
                            KeyCode::Left | KeyCode::Char('h') => app.prev_year(now),
                            KeyCode::Home => app.first_year(now),
                            KeyCode::End => app.last_year(now),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse, now),
                Event::Resize(width, height) => app.resize(width, height, now),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
