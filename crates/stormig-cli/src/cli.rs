use clap::Parser;
use std::path::PathBuf;

use stormig_core::{Direction, MigrationOptions};

/// Migrate the file fields of stored records to another storage engine
#[derive(Parser, Debug)]
#[command(name = "stormig")]
#[command(version)]
pub struct Cli {
    /// Record types to migrate, as <namespace>.<TypeName>
    #[arg(required = true, value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Configuration file
    #[arg(short, long, env = "STORMIG_CONFIG", default_value = "stormig.json")]
    pub config: PathBuf,

    /// Overwrite files that exist in the destination storage engine
    #[arg(short = 'f', long)]
    pub overwrite: bool,

    /// Copy from the new mapping side back to the old one
    #[arg(long)]
    pub reverse: bool,

    /// Copy from each field's current engine to the new mapping side
    #[arg(long, conflicts_with = "reverse")]
    pub to_new: bool,

    /// Show which files would be created without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn options(&self) -> MigrationOptions {
        MigrationOptions {
            overwrite: self.overwrite,
            direction: match (self.reverse, self.to_new) {
                (true, _) => Direction::Reverse,
                (false, true) => Direction::ToNew,
                (false, false) => Direction::Forward,
            },
            dry_run: self.dry_run,
        }
    }

    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["stormig", "app.Document"]).unwrap();
        assert_eq!(cli.labels, vec!["app.Document"]);
        assert_eq!(cli.options(), MigrationOptions::default());
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "stormig",
            "-f",
            "--to-new",
            "--dry-run",
            "-vv",
            "-c",
            "other.json",
            "app.Document",
            "app.Image",
        ])
        .unwrap();
        let options = cli.options();
        assert!(options.overwrite);
        assert!(options.dry_run);
        assert_eq!(options.direction, Direction::ToNew);
        assert_eq!(cli.config, PathBuf::from("other.json"));
        assert_eq!(cli.labels.len(), 2);
        assert_eq!(cli.log_level(), "trace");
    }

    #[test]
    fn test_direction_flags() {
        let cli = Cli::try_parse_from(["stormig", "--reverse", "app.Document"]).unwrap();
        assert_eq!(cli.options().direction, Direction::Reverse);

        let cli = Cli::try_parse_from(["stormig", "--to-new", "app.Document"]).unwrap();
        assert_eq!(cli.options().direction, Direction::ToNew);

        assert!(Cli::try_parse_from(["stormig", "--reverse", "--to-new", "app.Document"]).is_err());
    }

    #[test]
    fn test_requires_a_label() {
        assert!(Cli::try_parse_from(["stormig"]).is_err());
    }
}
