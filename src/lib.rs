pub mod capture;
pub mod console;
pub mod game;
pub mod models;
pub mod settings;
mod utils;

use anyhow::{Context, Result};

use game::{Game, GameController, RandomPicker};
use settings::{default_settings_path, SettingsStore};

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("rps-gesture starting up...");

    let store = SettingsStore::new(default_settings_path())?;
    let settings = store.settings();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let game = Game::new(
            settings.rules(),
            settings.start_mode,
            Box::new(RandomPicker::new()),
        );
        let (controller, handle, events) = GameController::new(
            game,
            settings.capture_controller(),
            settings.gesture_input(),
        );
        let control_loop = controller.spawn();

        console::run_console(handle, events).await?;
        control_loop.await.context("control loop task failed")?;
        Ok(())
    })
}
