mod audio;
mod config;
mod error;
mod hardware;
mod media;
mod playback;
mod playlist;
mod shutdown;
mod ui;
mod worker_thread;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use audio::MixerBackend;
use hardware::{HardwareController, SerialLink, TransportControl};
use media::MediaLibrary;
use playback::{AudioBackend, ControllerSettings, PlaybackController, PlayerRenderer};
use playlist::PlaylistStore;
use shutdown::{spawn_ctrl_c_watcher, CancellationToken};
use ui::{App, TerminalView};

/// Terminal media browser and player.
#[derive(Parser, Debug)]
#[command(name = "termplay", version, about)]
struct Args {
    /// Directory to scan for media (defaults to the configured or current directory)
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the hardware controller
    #[arg(long, env = "TERMPLAY_SERIAL_PORT")]
    serial_port: Option<String>,

    /// Run without the hardware controller
    #[arg(long)]
    no_hardware: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "debug")]
    log_level: log::LevelFilter,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut clog = colog::default_builder();
    clog.filter(None, args.log_level);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let mut config = config::load_or_create(&config_path)?;
    if let Some(port) = args.serial_port.clone() {
        config.hardware.port = port;
    }
    if args.no_hardware {
        config.hardware.enabled = false;
    }
    info!("Loaded config from {}", config_path.display());

    let token = CancellationToken::new();
    spawn_ctrl_c_watcher(token.clone());

    let view = Arc::new(TerminalView::new(Duration::from_millis(
        config.playback.flash_duration_ms,
    )));
    let backend: Arc<dyn AudioBackend> = Arc::new(MixerBackend::new(config.output.clone()));
    let controller = Arc::new(PlaybackController::new(
        backend,
        Arc::clone(&view) as Arc<dyn PlayerRenderer>,
        ControllerSettings::from(&config.playback),
    ));
    if let Err(err) = controller.initialize() {
        error!("Playback engine unavailable: {}", err);
    }

    let hardware = Arc::new(HardwareController::new(Box::new(SerialLink::new(
        &config.hardware,
    ))));
    if config.hardware.enabled {
        let transport = Arc::clone(&controller) as Arc<dyn TransportControl>;
        if let Err(err) = hardware.initialize(transport) {
            warn!(
                "Hardware controller unavailable on {}: {}",
                config.hardware.port, err
            );
        }
    } else {
        info!("Hardware controller disabled");
    }

    {
        let controller = Arc::clone(&controller);
        let hardware = Arc::clone(&hardware);
        token.on_cancel(move || {
            hardware.cleanup();
            controller.shutdown();
        });
    }

    let directory = args
        .directory
        .clone()
        .or_else(|| config.library.initial_directory.clone())
        .map(Ok)
        .unwrap_or_else(std::env::current_dir)?;
    let mut library = MediaLibrary::new(config.library.recursive_scan, config.library.read_tags);
    let found = library.scan_directory(&directory);
    info!("Found {} media files in {}", found, directory.display());

    let mut store = PlaylistStore::new(config.playlists.resolved_directory());
    match store.load_all() {
        Ok(count) => info!(
            "Loaded {} playlists from {}",
            count,
            store.directory().display()
        ),
        Err(err) => warn!("Failed to load playlists: {}", err),
    }

    let mut app = App::new(
        view,
        Arc::clone(&controller),
        library,
        store,
        directory,
        config.library.items_per_page,
        token.clone(),
    );
    app.run();
    info!(
        "Exiting with {} files in the library",
        app.library().len()
    );

    hardware.cleanup();
    controller.shutdown();
    Ok(())
}
