mod cli;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};

use namouse_core::events::SessionEvent;
use namouse_core::{NamouseConfig, NamouseError, PlaybackOutcome, Result, ScreenSize};
use namouse_playback::{Actuator, SystemActuator};
use namouse_recorder::SystemCapture;
use namouse_session::{spawn_session, SessionConfig, SessionHandle};
use namouse_storage::{load_from_path, resolve_script_path, save_to_path};

use cli::{CliArgs, Command, PlayArgs};

/// Install the global subscriber. `RUST_LOG` wins over `level`.
fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

/// Screen size for script metadata, zero when the platform cannot tell.
fn screen_size(actuator: &dyn Actuator) -> ScreenSize {
    match actuator.screen_size() {
        Ok(size) => size,
        Err(e) => {
            tracing::warn!(error = %e, "Screen size unavailable, saving zero metadata");
            ScreenSize::default()
        }
    }
}

fn open_session(
    config: &NamouseConfig,
    listen_for_hotkeys: bool,
) -> Result<(SessionHandle, Arc<dyn Actuator>)> {
    let actuator: Arc<dyn Actuator> = Arc::new(SystemActuator::new());
    let session_config = SessionConfig {
        listen_for_hotkeys,
        ..SessionConfig::from(config)
    };
    let session = spawn_session(
        session_config,
        Box::new(SystemCapture::new()),
        Arc::clone(&actuator),
    )?;
    Ok((session, actuator))
}

/// Next event from the session, skipping over lag. `None` once the session is gone.
async fn next_event(events: &mut broadcast::Receiver<SessionEvent>) -> Option<SessionEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event stream lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn save_current(
    session: &SessionHandle,
    actuator: &dyn Actuator,
    path: &Path,
) -> Result<()> {
    let script = session.script_snapshot()?;
    if script.is_empty() {
        tracing::warn!(path = %path.display(), "Saving an empty script");
    }
    let settings = session.settings().await?;
    save_to_path(path, &script, &settings, screen_size(actuator))
}

async fn record(
    config: &NamouseConfig,
    output: &Path,
    limit: Option<f64>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let limit = limit
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| NamouseError::Config(format!("Invalid duration {}: {}", secs, e)))
        })
        .transpose()?;
    let (session, actuator) = open_session(config, false)?;
    let mut events = session.subscribe();

    session.start_recording().await?;
    tracing::info!(
        stop = %config.hotkeys.stop,
        "Recording. Press Ctrl+C or the stop hotkey to finish"
    );

    let time_limit = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(shutdown);
    tokio::pin!(time_limit);

    let stopped_by_hotkey = loop {
        tokio::select! {
            _ = &mut shutdown => break false,
            _ = &mut time_limit => {
                tracing::info!("Recording time limit reached");
                break false;
            }
            event = next_event(&mut events) => match event {
                Some(SessionEvent::RecordingStopped { .. }) => break true,
                Some(_) => {}
                None => return Err(NamouseError::ShuttingDown),
            },
        }
    };

    let summary = if stopped_by_hotkey {
        session.script_snapshot()?.summary()
    } else {
        session.stop_recording().await?
    };
    tracing::info!(
        events = summary.total,
        moves = summary.moves,
        clicks = summary.clicks,
        scrolls = summary.scrolls,
        keys = summary.keys,
        duration_secs = summary.duration_secs,
        "Recording finished"
    );

    let path = resolve_script_path(output, &config.general.scripts_dir);
    save_current(&session, actuator.as_ref(), &path).await?;
    session.shutdown().await
}

async fn play(
    config: &NamouseConfig,
    args: &PlayArgs,
    shutdown: impl Future<Output = ()>,
) -> Result<PlaybackOutcome> {
    let path = resolve_script_path(&args.file, &config.general.scripts_dir);
    let loaded = load_from_path(&path)?;
    let settings = args.apply(&loaded.settings)?;

    let (session, _) = open_session(config, false)?;
    let mut events = session.subscribe();
    session.load_script(loaded.script, Some(loaded.settings)).await?;
    session.start_playback(Some(settings)).await?;
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted, stopping playback");
                break stop_after_interrupt(&session, &mut events).await?;
            }
            event = next_event(&mut events) => match event {
                Some(SessionEvent::PlaybackProgress { repeat, index, fraction, .. }) => {
                    tracing::debug!(repeat, index, fraction, "Playback progress");
                }
                Some(SessionEvent::PlaybackFinished { outcome, .. }) => break outcome,
                Some(_) => {}
                None => return Err(NamouseError::ShuttingDown),
            },
        }
    };

    session.shutdown().await?;
    Ok(outcome)
}

/// Stop the run after an interrupt.
///
/// The run may have ended just before the stop request; its outcome is then
/// taken from the event stream.
async fn stop_after_interrupt(
    session: &SessionHandle,
    events: &mut broadcast::Receiver<SessionEvent>,
) -> Result<PlaybackOutcome> {
    match session.stop_playback().await {
        Err(NamouseError::Session(reason)) if session.state().is_idle() => {
            tracing::debug!(%reason, "Playback already finished");
            while let Some(event) = next_event(events).await {
                if let SessionEvent::PlaybackFinished { outcome, .. } = event {
                    return Ok(outcome);
                }
            }
            Err(NamouseError::ShuttingDown)
        }
        result => result,
    }
}

fn optimize_file(config: &NamouseConfig, file: &Path, output: Option<&Path>) -> Result<()> {
    let input = resolve_script_path(file, &config.general.scripts_dir);
    let output = output
        .map(|o| resolve_script_path(o, &config.general.scripts_dir))
        .unwrap_or_else(|| input.clone());

    let loaded = load_from_path(&input)?;
    let (optimized, removed) = namouse_recorder::optimize(&loaded.script);
    let screen = loaded
        .metadata
        .map(|m| ScreenSize {
            width: m.screen_width,
            height: m.screen_height,
        })
        .unwrap_or_default();
    save_to_path(&output, &optimized, &loaded.settings, screen)?;
    tracing::info!(
        removed,
        remaining = optimized.len(),
        path = %output.display(),
        "Script optimized"
    );
    Ok(())
}

fn insert_delay_file(
    config: &NamouseConfig,
    file: &Path,
    index: usize,
    duration: f64,
) -> Result<()> {
    let path = resolve_script_path(file, &config.general.scripts_dir);
    let mut loaded = load_from_path(&path)?;
    loaded.script.insert_delay(index, duration)?;
    let screen = loaded
        .metadata
        .map(|m| ScreenSize {
            width: m.screen_width,
            height: m.screen_height,
        })
        .unwrap_or_default();
    save_to_path(&path, &loaded.script, &loaded.settings, screen)
}

fn print_info(config: &NamouseConfig, file: &Path, json: bool) -> Result<()> {
    let path = resolve_script_path(file, &config.general.scripts_dir);
    let loaded = load_from_path(&path)?;
    let summary = loaded.script.summary();

    if json {
        let report = serde_json::json!({
            "path": path.display().to_string(),
            "version": loaded.version,
            "summary": summary,
            "settings": loaded.settings,
            "metadata": loaded.metadata,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", path.display());
    if let Some(version) = &loaded.version {
        println!("  format version: {}", version);
    }
    println!(
        "  events: {} ({} moves, {} clicks, {} scrolls, {} keys, {} delays)",
        summary.total,
        summary.moves,
        summary.clicks,
        summary.scrolls,
        summary.keys,
        summary.delays
    );
    println!("  duration: {:.3}s", summary.duration_secs);
    println!(
        "  speed {}x, repeat {}, interval {}s",
        loaded.settings.playback_speed,
        loaded.settings.repeat_count,
        loaded.settings.repeat_interval
    );
    if let Some(metadata) = &loaded.metadata {
        println!("  created: {}", metadata.created);
        println!("  screen: {}x{}", metadata.screen_width, metadata.screen_height);
    }
    Ok(())
}

/// Hotkey-driven session until `shutdown` resolves.
async fn run_interactive(
    config: &NamouseConfig,
    script: Option<&Path>,
    output: Option<&Path>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let (session, actuator) = open_session(config, true)?;
    let mut events = session.subscribe();

    if let Some(script) = script {
        let loaded = load_from_path(&resolve_script_path(script, &config.general.scripts_dir))?;
        session.load_script(loaded.script, Some(loaded.settings)).await?;
    }
    let output = output.map(|o| resolve_script_path(o, &config.general.scripts_dir));

    let hotkeys = &config.hotkeys;
    tracing::info!(
        record = %hotkeys.record,
        stop = %hotkeys.stop,
        play = %hotkeys.play,
        pause = %hotkeys.pause,
        "Session ready. Press Ctrl+C to quit"
    );
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = next_event(&mut events) => match event {
                Some(SessionEvent::RecordingStopped { event_count, .. }) => {
                    if let Some(path) = &output {
                        if let Err(e) = save_current(&session, actuator.as_ref(), path).await {
                            tracing::error!(
                                error = %e,
                                events = event_count,
                                "Failed to save recording"
                            );
                        }
                    }
                }
                Some(SessionEvent::PlaybackProgress { .. }) => {}
                Some(event) => tracing::info!(event = event.event_name(), "Session event"),
                None => break,
            },
        }
    }

    session.shutdown().await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_file = args.resolve_config_path();
    let (config, config_error) = match NamouseConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (NamouseConfig::default(), Some(e)),
    };
    init_tracing(&args.resolve_log_level(&config.general.log_level));
    tracing::debug!("Starting namouse v{}", env!("CARGO_PKG_VERSION"));
    match config_error {
        None => tracing::debug!(path = %config_file.display(), "Configuration loaded"),
        Some(NamouseError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %config_file.display(), "No configuration file, using defaults");
        }
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config. Using defaults."
        ),
    }

    match &args.command {
        Command::Record { output, duration } => {
            record(&config, output, *duration, ctrl_c()).await?;
        }
        Command::Play(play_args) => {
            let outcome = play(&config, play_args, ctrl_c()).await?;
            match outcome {
                PlaybackOutcome::Completed => tracing::info!("Playback completed"),
                PlaybackOutcome::Stopped => tracing::info!("Playback stopped"),
                PlaybackOutcome::Failed(reason) => {
                    tracing::error!(%reason, "Playback failed");
                    return Err(NamouseError::Actuation(reason).into());
                }
            }
        }
        Command::Optimize { file, output } => {
            optimize_file(&config, file, output.as_deref())?;
        }
        Command::Info { file, json } => print_info(&config, file, *json)?,
        Command::InsertDelay {
            file,
            index,
            duration,
        } => insert_delay_file(&config, file, *index, *duration)?,
        Command::Run { script, output } => {
            run_interactive(&config, script.as_deref(), output.as_deref(), ctrl_c()).await?;
        }
    }

    Ok(())
}
