use clap::Parser;
use humansize::{DECIMAL, format_size};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use sublify::{
    Credentials, LanguageSet, LanguageTag, ProgressEvent, ProviderKind, RunConfiguration,
    fetch_subtitles,
};

/// Environment variables carrying the optional provider login
const USERNAME_VAR: &str = "OPENSUBTITLES_USERNAME";
const PASSWORD_VAR: &str = "OPENSUBTITLES_PASSWORD";

/// Fetch subtitles for files or folders from online subtitle providers.
#[derive(Parser)]
#[command(name = "sublify", version, about, long_about = None)]
struct Args {
    /// File or directory to fetch subtitles for
    path: PathBuf,

    /// Language(s) to fetch, e.g. en, fr, pt-BR. Can be used multiple times
    #[arg(
        short = 'l',
        long = "language",
        value_name = "TAG",
        value_parser = parse_language,
        default_value = "en"
    )]
    languages: Vec<LanguageTag>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Prefer hearing-impaired subtitles
    #[arg(long = "hi")]
    hearing_impaired: bool,

    /// Fetch and overwrite even if subtitles already exist
    #[arg(long)]
    force: bool,

    /// Show what would be fetched without downloading or saving anything
    #[arg(long)]
    dry_run: bool,

    /// Subtitle providers to use. Can be specified multiple times
    /// [default: opensubtitles podnapisi tvsubtitles]
    #[arg(long = "provider", value_name = "NAME", value_parser = ProviderKind::parse)]
    providers: Vec<ProviderKind>,

    /// Minimum score a subtitle must reach to be accepted
    #[arg(long, value_name = "SCORE", default_value_t = 0.0)]
    min_score: f32,

    /// Seconds to pause between videos (helps avoid rate limits)
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    delay: f64,

    /// Retries per provider request on transient failures
    #[arg(long, value_name = "N", default_value_t = 1)]
    retries: u32,
}

fn parse_language(value: &str) -> Result<LanguageTag, String> {
    LanguageTag::parse(value).map_err(|e| e.to_string())
}

/// Shortens a path to its file name for progress output
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started { root, languages } => {
            println!(
                "Sublify: scanning {} for language(s): {}",
                root.display(),
                languages
            );
        }
        ProgressEvent::VideosFound { count } => {
            if count == 0 {
                println!("No video files found.");
            } else {
                println!("Found {} video file(s)\n", count);
            }
        }
        ProgressEvent::ProviderSkipped { provider, reason } => {
            println!("[warn] provider {} unavailable: {}", provider, reason);
        }
        ProgressEvent::ProcessingFile { index, total, path } => {
            println!("[{}/{}] {}", index + 1, total, file_name(&path));
        }
        ProgressEvent::AlreadySatisfied { languages, .. } => {
            println!(
                "  already satisfied: {} (use --force to refetch)",
                join_languages(&languages)
            );
        }
        ProgressEvent::WouldFetch { languages, .. } => {
            println!("  [dry-run] would fetch: {}", join_languages(&languages));
        }
        ProgressEvent::Searching { languages, .. } => {
            println!("  searching: {}", join_languages(&languages));
        }
        ProgressEvent::SubtitleWritten {
            path,
            provider,
            score,
            size,
            ..
        } => {
            println!(
                "  saved {} from {} (score={:.1}, {})",
                file_name(&path),
                provider,
                score,
                format_size(size, DECIMAL)
            );
        }
        ProgressEvent::SubtitleExists { path, .. } => {
            println!("  exists, left untouched: {}", file_name(&path));
        }
        ProgressEvent::NoMatch { language, .. } => {
            println!("  no suitable subtitle found for {}", language);
        }
        ProgressEvent::FetchFailed {
            language, error, ..
        } => {
            println!("  [error] {}: {}", language, error);
        }
        ProgressEvent::WriteFailed {
            language, error, ..
        } => {
            println!("  [error] saving {}: {}", language, error);
        }
        ProgressEvent::Complete { summary } => {
            println!(
                "\nDone. Processed: {}, written: {}, skipped: {}, errors: {}",
                summary.files_processed,
                summary.subtitles_written,
                summary.subtitles_skipped,
                summary.errors
            );
        }
    }
}

fn join_languages(languages: &[LanguageTag]) -> String {
    languages
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reads the optional provider login from the environment
///
/// Absence is not an error; providers then run in anonymous mode with
/// reduced rate limits.
fn read_credentials() -> Option<Credentials> {
    let username = env::var(USERNAME_VAR).ok()?;
    let password = env::var(PASSWORD_VAR).ok()?;

    if username.is_empty() || password.is_empty() {
        return None;
    }

    Some(Credentials { username, password })
}

fn main() {
    let args = Args::parse();

    let providers = if args.providers.is_empty() {
        ProviderKind::baseline()
    } else {
        args.providers
    };

    let delay = if args.delay.is_finite() && args.delay > 0.0 {
        Duration::from_secs_f64(args.delay)
    } else {
        Duration::ZERO
    };

    let config = RunConfiguration {
        root: args.path,
        languages: LanguageSet::new(args.languages),
        recursive: args.recursive,
        hearing_impaired: args.hearing_impaired,
        force: args.force,
        dry_run: args.dry_run,
        providers,
        min_score: args.min_score,
        delay,
        retries: args.retries,
        credentials: read_credentials(),
    };

    // Exit 0 whenever the batch completes, even with recorded failures;
    // non-zero is reserved for fatal aborts before any file is processed
    if let Err(error) = fetch_subtitles(&config, handle_progress_event) {
        eprintln!("\nError: {}", error);
        process::exit(1);
    }
}
