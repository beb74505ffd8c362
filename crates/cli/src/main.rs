//! SnapCap console executable
//!
//! Captures the primary monitor to a PNG file. Silent by default; the
//! process exit code is the capture result's wire value, so automation can
//! switch on it without parsing output.

use capture_wgc::{capture_to_file, describe_code, CaptureOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "\
Usage:
  snapcap <output_path>                 Silent mode (hide border & cursor)
  snapcap --verbose <output_path>       Verbose mode with console output
  snapcap --show-border <output_path>   Keep capture border visible
  snapcap --show-cursor <output_path>   Keep mouse cursor visible
  snapcap --help                        Show this help

Examples:
  snapcap C:\\screenshot.png             Clean capture (recommended)
  snapcap --verbose D:\\capture.png      With detailed logs
  snapcap --show-border test.png        Keep border visible
";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    verbose: bool,
    hide_border: bool,
    hide_cursor: bool,
    output_path: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum ParseOutcome {
    Run(CliArgs),
    Help,
    Invalid(String),
}

fn parse_args(args: &[String]) -> ParseOutcome {
    if args.is_empty() {
        return ParseOutcome::Invalid("output path required".into());
    }

    let mut verbose = false;
    let mut hide_border = true;
    let mut hide_cursor = true;
    let mut output_path: Option<PathBuf> = None;

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" | "/?" => return ParseOutcome::Help,
            "--verbose" | "-v" => verbose = true,
            "--show-border" => hide_border = false,
            "--show-cursor" => hide_cursor = false,
            other if other.starts_with('-') => {
                return ParseOutcome::Invalid(format!("unknown option: {other}"));
            }
            path => {
                // First non-flag argument is the output path.
                output_path = Some(PathBuf::from(path));
                break;
            }
        }
    }

    match output_path {
        Some(output_path) => ParseOutcome::Run(CliArgs {
            verbose,
            hide_border,
            hide_cursor,
            output_path,
        }),
        None => ParseOutcome::Invalid("output path required".into()),
    }
}

/// Make sure the parent directory exists before handing the path to the
/// capture core.
fn prepare_output_path(path: &Path) -> anyhow::Result<()> {
    if path.extension().map_or(true, |ext| ext != "png") {
        info!("output file does not carry a .png extension");
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("creating directory {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cli = match parse_args(&args) {
        ParseOutcome::Help => {
            print!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        ParseOutcome::Invalid(reason) => {
            eprintln!("error: {reason}");
            print!("{USAGE}");
            return ExitCode::FAILURE;
        }
        ParseOutcome::Run(cli) => cli,
    };

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
        info!("SnapCap console application");
        info!("output path: {}", cli.output_path.display());
        info!("hide border: {}", cli.hide_border);
        info!("hide cursor: {}", cli.hide_cursor);
    }

    if let Err(e) = prepare_output_path(&cli.output_path) {
        error!("invalid output path: {e}");
        return ExitCode::FAILURE;
    }

    let options = CaptureOptions {
        hide_border: cli.hide_border,
        hide_cursor: cli.hide_cursor,
    };

    match capture_to_file(&cli.output_path, options) {
        Ok(()) => {
            info!("screenshot captured successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e.code();
            error!("capture failed ({code}): {}", describe_code(code));
            ExitCode::from(code as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_path_defaults_to_clean_capture() {
        let outcome = parse_args(&args(&["shot.png"]));
        let ParseOutcome::Run(cli) = outcome else {
            panic!("expected run");
        };
        assert!(!cli.verbose);
        assert!(cli.hide_border);
        assert!(cli.hide_cursor);
        assert_eq!(cli.output_path, PathBuf::from("shot.png"));
    }

    #[test]
    fn flags_combine_before_the_path() {
        let outcome = parse_args(&args(&["--verbose", "--show-border", "--show-cursor", "out.png"]));
        let ParseOutcome::Run(cli) = outcome else {
            panic!("expected run");
        };
        assert!(cli.verbose);
        assert!(!cli.hide_border);
        assert!(!cli.hide_cursor);
    }

    #[test]
    fn help_wins() {
        assert_eq!(parse_args(&args(&["--help"])), ParseOutcome::Help);
        assert_eq!(parse_args(&args(&["-h"])), ParseOutcome::Help);
        assert_eq!(parse_args(&args(&["/?"])), ParseOutcome::Help);
    }

    #[test]
    fn missing_path_is_invalid() {
        assert!(matches!(parse_args(&[]), ParseOutcome::Invalid(_)));
        assert!(matches!(
            parse_args(&args(&["--verbose"])),
            ParseOutcome::Invalid(_)
        ));
    }

    #[test]
    fn unknown_flag_is_invalid() {
        assert!(matches!(
            parse_args(&args(&["--frobnicate", "out.png"])),
            ParseOutcome::Invalid(_)
        ));
    }
}
