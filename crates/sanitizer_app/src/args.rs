use std::path::{Path, PathBuf};

use clap::Parser;
use sanitizer_engine::DEFAULT_CONFIG_FILE;

/// Strips vendor branding from an exported site template.
#[derive(Debug, Parser)]
#[command(name = "sanitize-template", version, about)]
pub struct Args {
    /// Template root directory
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Settings file (YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Report every change without touching the filesystem or the network
    #[arg(long)]
    pub dry_run: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// The settings file to load. A relative path that does not exist in the
    /// working directory is looked up under the template root.
    pub fn config_path(&self) -> PathBuf {
        resolve_config(&self.config, &self.dir)
    }
}

fn resolve_config(config: &Path, dir: &Path) -> PathBuf {
    if config.is_absolute() || config.exists() {
        return config.to_path_buf();
    }
    let under_root = dir.join(config);
    if under_root.exists() {
        under_root
    } else {
        config.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_config, Args};
    use clap::Parser;
    use std::fs;
    use std::path::Path;

    #[test]
    fn defaults_match_documented_cli() {
        let args = Args::parse_from(["sanitize-template"]);
        assert_eq!(args.dir, Path::new("."));
        assert_eq!(args.config, Path::new("sanitize-config.yml"));
        assert!(!args.dry_run);
        assert!(!args.verbose);
        assert!(args.log_file.is_none());
    }

    #[test]
    fn flags_are_parsed() {
        let args = Args::parse_from([
            "sanitize-template",
            "--dir",
            "site",
            "--dry-run",
            "--verbose",
            "--log-file",
            "run.log",
        ]);
        assert_eq!(args.dir, Path::new("site"));
        assert!(args.dry_run);
        assert!(args.verbose);
        assert_eq!(args.log_file.as_deref(), Some(Path::new("run.log")));
    }

    #[test]
    fn relative_config_falls_back_to_template_root() {
        let dir = tempfile::tempdir().unwrap();
        let name = Path::new("sanitize-config-fallback-test.yml");
        fs::write(dir.path().join(name), "").unwrap();
        assert_eq!(resolve_config(name, dir.path()), dir.path().join(name));
    }
}
