use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use typist::language::builtin_profiles;
use typist::model::{Category, TypingPlan};
use typist::planner::{generate_plan, TypingConfig};
use typist::playback::{play_plan, PlayOptions};
use typist::sim;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    Wayland,
    X11,
    Stdout,
}

impl PlaybackBackendArg {
    fn to_library(self) -> typist::playback::PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => typist::playback::PlaybackBackend::Auto,
            PlaybackBackendArg::Wayland => typist::playback::PlaybackBackend::Wayland,
            PlaybackBackendArg::X11 => typist::playback::PlaybackBackend::X11,
            PlaybackBackendArg::Stdout => typist::playback::PlaybackBackend::Stdout,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct TypingArgs {
    /// Language whose patterns are typed faster (see `typist languages`)
    #[arg(long, default_value = "Java")]
    language: String,

    #[arg(long, default_value_t = 100.0)]
    wpm_min: f64,

    #[arg(long, default_value_t = 250.0)]
    wpm_max: f64,

    /// Drop spaces and tabs at the start of every line (for editors that auto-indent)
    #[arg(long)]
    skip_leading_whitespace: bool,

    /// Extra pause after `;`, `{`, `}` (or `:` for Python), in milliseconds
    #[arg(long, default_value_t = 200)]
    statement_pause_ms: u64,
}

impl TypingArgs {
    fn to_config(&self) -> TypingConfig {
        TypingConfig {
            language: self.language.clone(),
            wpm_min: self.wpm_min,
            wpm_max: self.wpm_max,
            skip_leading_whitespace: self.skip_leading_whitespace,
            statement_pause_ms: self.statement_pause_ms,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct PlayArgs {
    /// Playback backend.
    ///
    /// - auto: choose a backend based on the runtime environment
    /// - wayland: force Wayland playback
    /// - x11: force X11 playback (XTEST)
    /// - stdout: print the typed text instead of injecting keys
    #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
    backend: PlaybackBackendArg,

    /// Countdown seconds before playback starts
    #[arg(long, default_value_t = 3)]
    countdown: u64,

    /// Wayland seat name to attach the virtual keyboard to (e.g. seat0, seat1).
    #[arg(long, value_name = "NAME")]
    seat: Option<String>,

    /// Disable console typing trace output
    #[arg(long)]
    no_trace: bool,

    /// Optional RNG seed for reproducible delays
    #[arg(long)]
    seed: Option<u64>,
}

impl PlayArgs {
    fn to_options(&self) -> PlayOptions {
        PlayOptions {
            backend: self.backend.to_library(),
            countdown_secs: self.countdown,
            seat: self.seat.clone(),
            trace: !self.no_trace,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "typist")]
#[command(about = "Types source code into the focused window at a human pace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process text into a typing plan (JSON)
    Plan {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output plan file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        typing: TypingArgs,
    },

    /// Type a plan into the currently focused window
    Play {
        /// Plan file (JSON)
        #[arg(long, value_name = "PATH")]
        plan: PathBuf,

        #[command(flatten)]
        play: PlayArgs,
    },

    /// Process text then immediately type it
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Optional output plan file to save
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        #[command(flatten)]
        typing: TypingArgs,

        #[command(flatten)]
        play: PlayArgs,
    },

    /// List supported languages
    Languages,
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: &PathBuf, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn print_stats(verb: &str, plan: &TypingPlan) {
    let stats = sim::stats(plan);
    let fast: Vec<String> = Category::ALL
        .iter()
        .filter(|c| !matches!(c, Category::Plain))
        .map(|c| format!("{} {}", stats.count(*c), c.label()))
        .collect();
    eprintln!(
        "{verb}: {} chars in {} spans ({}), {} pause(s) totalling {:.1}s, ~{:.1}-{:.1} min",
        stats.chars,
        stats.spans,
        fast.join(", "),
        stats.directives,
        stats.total_pause_secs,
        stats.fastest_secs / 60.0,
        stats.slowest_secs / 60.0,
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            input,
            output,
            typing,
        } => {
            let raw = read_input(&input)?;
            let plan = generate_plan(&raw, &typing.to_config())?;
            print_stats("Planned", &plan);

            let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
            if let Some(out) = output {
                write_output(&out, &json)?;
            } else {
                println!("{json}");
            }
        }
        Command::Play { plan, play } => {
            // Fail fast on unsupported environments/backends.
            typist::playback::preflight_backend(play.backend.to_library(), play.seat.as_deref())?;

            let json = fs::read_to_string(&plan)
                .with_context(|| format!("failed to read {}", plan.display()))?;
            let plan: TypingPlan =
                serde_json::from_str(&json).context("failed to parse plan JSON")?;
            print_stats("Playing", &plan);

            play_plan(plan, &play.to_options())?;
        }
        Command::Run {
            input,
            output,
            typing,
            play,
        } => {
            typist::playback::preflight_backend(play.backend.to_library(), play.seat.as_deref())?;

            let raw = read_input(&input)?;
            let plan = generate_plan(&raw, &typing.to_config())?;
            print_stats("Planned", &plan);

            if let Some(out) = output {
                let json =
                    serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
                write_output(&out, &json)?;
            }

            play_plan(plan, &play.to_options())?;
        }
        Command::Languages => {
            for profile in builtin_profiles() {
                if profile.aliases.is_empty() {
                    println!("{}", profile.id);
                } else {
                    println!("{} ({})", profile.id, profile.aliases.join(", "));
                }
            }
        }
    }

    Ok(())
}
