mod logging;

use anyhow::{Context, Result, bail};
use gtmambient::{AmbientConfigExt, AmbientController};
use gtmconfig::get_config;
use gtmitunes::ItunesClient;
use gtmlocal::LocalLibrary;
use gtmsource::{
    Aggregator, AudioResolverExt, CatalogProvider, LocalLibraryProvider, NetworkSearchProvider,
    ProviderRegistry, SearchOutcome,
};
use gtmytdlp::YtDlp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, info, warn};

const USAGE: &str = "usage: GameThemeMusic [-v] <search term>";

#[tokio::main]
async fn main() -> Result<()> {
    let mut verbose = false;
    let mut words = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            _ => words.push(arg),
        }
    }
    let term = words.join(" ");
    if term.trim().is_empty() {
        bail!(USAGE);
    }

    let config = get_config();
    let log = logging::init_logging(&config);
    if verbose {
        log.set_max_level(Level::DEBUG);
    }

    // ========== Gateways ==========
    let music_dir = config.get_music_dir()?;
    let theme_suffix = config.get_theme_suffix()?;
    info!(music_dir = %music_dir, "Using music directory");

    let library = Arc::new(LocalLibrary::new(&music_dir));
    let itunes = ItunesClient::builder()
        .api_base(config.get_itunes_api_base()?)
        .music_dir(&music_dir)
        .build()
        .context("building iTunes client")?;
    let ytdlp = Arc::new(
        YtDlp::new(config.get_ytdlp_path()?, LocalLibrary::new(&music_dir))
            .with_search_count(config.get_network_search_count()?)
            .with_max_duration_secs(config.get_network_max_duration_secs()?),
    );

    // ========== Providers ==========
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(
        NetworkSearchProvider::new(ytdlp.clone()).with_theme_suffix(theme_suffix.clone()),
    ));
    registry.register(Arc::new(
        CatalogProvider::new(Arc::new(itunes), library.clone())
            .with_max_results(config.get_catalog_search_limit()?)
            .with_theme_suffix(theme_suffix.clone()),
    ));
    registry.register(Arc::new(
        LocalLibraryProvider::new(library)
            .with_max_results(config.get_local_search_limit()?)
            .with_theme_suffix(theme_suffix),
    ));
    info!("{} provider(s) registered", registry.len());

    // ========== Ambient ==========
    let ambient = AmbientController::with_slot(config.ambient_timings(), config.ambient_slot());
    let mut transitions = ambient.subscribe();
    tokio::spawn(async move {
        loop {
            match transitions.recv().await {
                Ok(state) => info!(
                    sessions = ?state.active_sessions,
                    selection_ui_open = state.selection_ui_open,
                    should_play = state.should_play(),
                    "Ambient state applied"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed ambient transitions"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // the selection UI is open for the whole lookup
    ambient.set_selection_ui_open(true);

    let aggregator = Aggregator::new(&registry);
    let previews = match aggregator.search(&term).await {
        SearchOutcome::Completed(previews) => previews,
        SearchOutcome::Superseded => Vec::new(),
    };

    println!("{} result(s) for \"{}\"", previews.len(), term);
    for preview in &previews {
        println!("  [{}] {} ({})", preview.kind(), preview.title, preview.id);
    }

    let provider = previews.first().and_then(|p| registry.for_id(&p.id));
    match provider {
        Some(provider) => match provider.get_audio(&term).await {
            Some(selected) => {
                println!("Selected {} from {}", selected.video_id, provider.kind());
                println!("  {}", selected.audio_url);
            }
            None => println!("No playable audio from {}", provider.kind()),
        },
        None => println!("Nothing to play"),
    }

    ambient.set_selection_ui_open(false);
    // let the dismissal settle before exiting
    tokio::time::sleep(ambient.timings().dismiss_delay + Duration::from_millis(50)).await;

    ytdlp.shutdown().await;
    Ok(())
}
