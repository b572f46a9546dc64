//! Command line interface

use clap::Parser;

use crate::config::{validate_hold_ms, DEFAULT_HOLD_MS};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "clean-screen",
    about = "Blank every display and block the keyboard while you clean. Hold Command+Escape to exit.",
    version
)]
pub struct Cli {
    /// How long Command+Escape must be held to exit (ms)
    #[arg(long = "hold-ms", default_value_t = DEFAULT_HOLD_MS, value_parser = parse_hold_ms)]
    pub hold_ms: u64,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// Stop asking for Accessibility permission at startup (remembered)
    #[arg(long = "skip-onboarding", default_value_t = false)]
    pub skip_onboarding: bool,

    /// Ask for Accessibility permission at startup again (remembered)
    #[arg(long = "reset-onboarding", default_value_t = false, conflicts_with = "skip_onboarding")]
    pub reset_onboarding: bool,
}

fn parse_hold_ms(raw: &str) -> Result<u64, String> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a whole number of milliseconds"))?;
    validate_hold_ms(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["clean-screen"]).unwrap();
        assert_eq!(cli.hold_ms, DEFAULT_HOLD_MS);
        assert!(!cli.verbose);
        assert!(!cli.skip_onboarding);
    }

    #[test]
    fn test_hold_ms_validated() {
        let cli = Cli::try_parse_from(["clean-screen", "--hold-ms", "1200"]).unwrap();
        assert_eq!(cli.hold_ms, 1200);
        assert!(Cli::try_parse_from(["clean-screen", "--hold-ms", "5"]).is_err());
        assert!(Cli::try_parse_from(["clean-screen", "--hold-ms", "soon"]).is_err());
    }

    #[test]
    fn test_onboarding_flags_conflict() {
        assert!(
            Cli::try_parse_from(["clean-screen", "--skip-onboarding", "--reset-onboarding"])
                .is_err()
        );
    }
}
