//! Indexing an image root into the catalogue.

use anyhow::Context;
use clap::Args;
use rawdex_core::{Config, IndexJob};
use std::path::PathBuf;

/// Arguments for an indexing run.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Root of the directory tree to scan
    #[arg(long, value_name = "PATH")]
    pub image_root: PathBuf,

    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    pub database: PathBuf,

    /// Use the name of the N-th parent directory as the project (0 disables)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub project_name_from_parent: u16,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of RAW workers (overrides the config file)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Create the `image` table if it does not exist
    #[arg(long)]
    pub create_schema: bool,
}

/// Load the config file named by `args` and apply command-line overrides.
pub fn load_config(args: &IndexArgs) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load default config".to_string(),
    })?;
    if let Some(workers) = args.workers {
        config.pipeline.worker_count = workers;
    }
    config.validate()?;
    Ok(config)
}

/// Execute an indexing run.
pub async fn execute(args: IndexArgs, config: Config) -> anyhow::Result<()> {
    let job = IndexJob {
        image_root: args.image_root,
        database: args.database,
        project_name_from_parent: args.project_name_from_parent,
        create_schema: args.create_schema,
    };

    tracing::info!(
        image_root = %job.image_root.display(),
        database = %job.database.display(),
        workers = config.pipeline.worker_count,
        "Indexing started"
    );
    let start = std::time::Instant::now();

    let summary = rawdex_core::run_index(&config, &job).await?;

    tracing::info!(
        picked_up = summary.picked_up,
        persisted = summary.persisted,
        failed = summary.failed,
        insert_failures = summary.insert_failures,
        peak_workers = summary.peak_leased,
        "Indexing finished in {:.1}s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        index: IndexArgs,
    }

    #[test]
    fn test_parse_required_flags() {
        let cli = TestCli::parse_from(["rawdex", "--image-root", "/photos", "--database", "x.db"]);
        assert_eq!(cli.index.image_root, PathBuf::from("/photos"));
        assert_eq!(cli.index.project_name_from_parent, 0);
        assert!(!cli.index.create_schema);
    }

    #[test]
    fn test_missing_database_is_an_error() {
        assert!(TestCli::try_parse_from(["rawdex", "--image-root", "/photos"]).is_err());
    }

    #[test]
    fn test_negative_depth_is_rejected() {
        let result = TestCli::try_parse_from([
            "rawdex",
            "--image-root",
            "/photos",
            "--database",
            "x.db",
            "--project-name-from-parent",
            "-1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_workers_override() {
        let cli = TestCli::parse_from([
            "rawdex", "--image-root", "/p", "--database", "x.db", "--workers", "3",
        ]);
        let config = load_config(&cli.index).unwrap();
        assert_eq!(config.pipeline.worker_count, 3);

        let cli = TestCli::parse_from([
            "rawdex", "--image-root", "/p", "--database", "x.db", "--workers", "0",
        ]);
        assert!(load_config(&cli.index).is_err());
    }

    #[tokio::test]
    async fn test_execute_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        let args = IndexArgs {
            image_root: dir.path().to_path_buf(),
            database: dir.path().join("catalogue.db"),
            project_name_from_parent: 0,
            config: None,
            workers: None,
            create_schema: true,
        };
        execute(args, Config::default()).await.unwrap();
        assert!(dir.path().join("catalogue.db").exists());
    }
}
