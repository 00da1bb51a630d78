//! CLI argument definitions for the namouse application.
//!
//! Uses `clap` with derive macros for argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use namouse_core::error::Result;
use namouse_core::settings::Settings;

/// namouse - record mouse and keyboard input and play it back.
#[derive(Parser, Debug)]
#[command(name = "namouse", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record input into a script file until Ctrl+C, the stop hotkey or the
    /// optional time limit.
    Record {
        /// Script file to write. Bare names go to the scripts directory.
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Stop automatically after this many seconds.
        #[arg(short = 'd', long = "duration")]
        duration: Option<f64>,
    },

    /// Play a script file back.
    Play(PlayArgs),

    /// Merge bursts of pointer moves in a script file.
    Optimize {
        file: PathBuf,

        /// Write the result here instead of overwriting the input.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Show what a script file contains.
    Info {
        file: PathBuf,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Insert a pause into a script file, shifting later events.
    InsertDelay {
        file: PathBuf,

        /// Position of the new delay event.
        #[arg(long)]
        index: usize,

        /// Delay length in seconds.
        #[arg(long)]
        duration: f64,
    },

    /// Interactive session driven by the configured hotkeys until Ctrl+C.
    Run {
        /// Script to load before listening.
        #[arg(short = 's', long = "script")]
        script: Option<PathBuf>,

        /// Save every finished recording to this file.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PlayArgs {
    pub file: PathBuf,

    /// Speed multiplier, overrides the script's setting.
    #[arg(short = 's', long = "speed")]
    pub speed: Option<f64>,

    /// Number of playthroughs, 0 for unbounded.
    #[arg(short = 'r', long = "repeat")]
    pub repeat: Option<u32>,

    /// Seconds to wait between playthroughs.
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<f64>,
}

impl PlayArgs {
    /// Apply the command line overrides on top of `base`.
    pub fn apply(&self, base: &Settings) -> Result<Settings> {
        let mut settings = base.clone();
        if let Some(speed) = self.speed {
            settings.playback_speed = speed;
        }
        if let Some(repeat) = self.repeat {
            settings.repeat_count = repeat;
        }
        if let Some(interval) = self.interval {
            settings.repeat_interval = interval;
        }
        settings.validate()?;
        Ok(settings)
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > NAMOUSE_CONFIG env var > platform default
    /// (~/.namouse/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("NAMOUSE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".namouse").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".namouse").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let args =
            CliArgs::try_parse_from(["namouse", "record", "-o", "login", "--duration", "5"])
                .unwrap();
        match args.command {
            Command::Record { output, duration } => {
                assert_eq!(output, PathBuf::from("login"));
                assert_eq!(duration, Some(5.0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_record_requires_output() {
        assert!(CliArgs::try_parse_from(["namouse", "record"]).is_err());
    }

    #[test]
    fn test_parse_play_with_overrides() {
        let args = CliArgs::try_parse_from([
            "namouse", "play", "demo.nam", "--speed", "2", "-r", "0", "-i", "1.5",
        ])
        .unwrap();
        let Command::Play(play) = args.command else {
            panic!("expected play");
        };
        assert_eq!(play.file, PathBuf::from("demo.nam"));
        assert_eq!(play.speed, Some(2.0));
        assert_eq!(play.repeat, Some(0));
        assert_eq!(play.interval, Some(1.5));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "namouse", "info", "demo.nam", "--config", "/tmp/n.toml", "-l", "debug",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/n.toml")));
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/n.toml"));
        assert_eq!(args.resolve_log_level("info"), "debug");
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = CliArgs::try_parse_from(["namouse", "info", "demo.nam"]).unwrap();
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_parse_insert_delay() {
        let args = CliArgs::try_parse_from([
            "namouse", "insert-delay", "demo", "--index", "3", "--duration", "0.5",
        ])
        .unwrap();
        match args.command {
            Command::InsertDelay {
                file,
                index,
                duration,
            } => {
                assert_eq!(file, PathBuf::from("demo"));
                assert_eq!(index, 3);
                assert_eq!(duration, 0.5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_without_script() {
        let args = CliArgs::try_parse_from(["namouse", "run"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Run {
                script: None,
                output: None
            }
        ));
    }

    #[test]
    fn test_play_overrides_keep_other_settings() {
        let base = Settings {
            mouse_smoothing: true,
            repeat_count: 3,
            ..Settings::default()
        };
        let play = PlayArgs {
            speed: Some(0.5),
            ..PlayArgs::default()
        };
        let settings = play.apply(&base).unwrap();
        assert_eq!(settings.playback_speed, 0.5);
        assert_eq!(settings.repeat_count, 3);
        assert!(settings.mouse_smoothing);
    }

    #[test]
    fn test_play_overrides_are_validated() {
        let play = PlayArgs {
            speed: Some(0.0),
            ..PlayArgs::default()
        };
        assert!(play.apply(&Settings::default()).is_err());

        let play = PlayArgs {
            interval: Some(-1.0),
            ..PlayArgs::default()
        };
        assert!(play.apply(&Settings::default()).is_err());
    }
}
