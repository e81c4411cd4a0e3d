use anyhow::{anyhow, Result};
use charla_core::Config;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "charla")]
#[command(about = "Terminal chat client for webhook chat endpoints")]
struct Cli {
    /// Server URL to prefill on the connect screen (overrides the saved one)
    #[arg(short, long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    // CLI flag wins over the last successfully probed URL
    let config = Config::load().unwrap_or_else(|_| Config::new());
    let initial_url = cli.url.or(config.server_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(initial_url);
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        }
    }

    tui::restore()?;
    Ok(())
}

/// Log to a file under the config directory; the terminal owns stderr, so
/// nothing may write there while the UI is up.
fn init_logging() -> Result<()> {
    let log_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("charla");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("charla.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
