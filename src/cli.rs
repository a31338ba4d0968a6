use clap::Parser;

use crate::config::Config;

/// Download media for linkding bookmarks and attach it as assets.
#[derive(Debug, Default, Parser)]
#[command(name = "linkding-media-archiver", version, about)]
pub struct Cli {
    /// Download media but do not upload it to linkding
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Exit after processing bookmarks once
    #[arg(short = 's', long)]
    pub single_run: bool,

    /// Wait one scan interval before the first scan
    #[arg(long)]
    pub skip_first_run: bool,
}

impl Cli {
    /// Flags set on the command line override the environment.
    pub fn apply(&self, config: &mut Config) {
        config.dry_run |= self.dry_run;
        config.single_run |= self.single_run;
        config.skip_first_run |= self.skip_first_run;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_flags() {
        let cli = Cli::parse_from(["linkding-media-archiver", "-n", "-s"]);
        assert!(cli.dry_run);
        assert!(cli.single_run);
        assert!(!cli.skip_first_run);
    }

    #[test]
    fn test_apply_only_enables() {
        let mut config = Config {
            dry_run: true,
            single_run: false,
            ..Config::for_testing()
        };
        Cli {
            single_run: true,
            ..Cli::default()
        }
        .apply(&mut config);

        assert!(config.dry_run);
        assert!(config.single_run);
        assert!(!config.skip_first_run);
    }
}
