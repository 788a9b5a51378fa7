//! Command line entry point.

use std::io::{
    BufRead,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;

use clap::{
    Args,
    Parser,
    Subcommand,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{
    EnvFilter,
    Layer,
    fmt,
};
use translations_import::config::{
    ConfigError,
    ConfigManager,
};
use translations_import::engine::{
    EngineError,
    ExportEngine,
    ExportOptions,
    ImportEngine,
    ImportOptions,
};
use translations_import::filter::{
    FilterSpec,
    parse_patterns,
};
use translations_import::input::translation::FileLoader;
use translations_import::scanner::{
    Scanner,
    ScannerError,
    seed_candidates,
};
use translations_import::store::sqlite::SqliteStore;
use translations_import::store::{
    StoreError,
    TableSchema,
    TranslationStore,
};

/// Synchronize translation files with the translations table.
#[derive(Debug, Parser)]
#[command(name = "translations", version, about)]
struct Cli {
    /// Project root holding `translations-import.json`
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Log level; overrides `RUST_LOG`
    #[arg(long, global = true, value_parser = ["error", "warn", "info", "debug", "trace"])]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Answer yes to confirmation prompts
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// Operation to run
    #[command(subcommand)]
    command: Command,
}

/// Comma separated group and locale filters.
#[derive(Debug, Args)]
struct FilterArgs {
    /// Locales to leave out
    #[arg(long, value_delimiter = ',')]
    ignore_locales: Option<Vec<String>>,

    /// Groups to leave out (`admin/*` matches a prefix)
    #[arg(long, value_delimiter = ',')]
    ignore_groups: Option<Vec<String>>,

    /// Only these groups (`admin/*` matches a prefix)
    #[arg(long, value_delimiter = ',')]
    only_groups: Option<Vec<String>>,
}

impl From<FilterArgs> for FilterSpec {
    fn from(args: FilterArgs) -> Self {
        Self {
            ignore_locales: args.ignore_locales,
            ignore_groups: args.ignore_groups,
            only_groups: args.only_groups,
        }
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Import translation files into the database
    Import {
        /// Replace values that are already set
        #[arg(long)]
        overwrite: bool,

        /// Also import vendor package translations
        #[arg(long)]
        allow_vendor: bool,

        /// Also import `<locale>.json` files
        #[arg(long)]
        allow_json: bool,

        /// Filters
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Write translation files from the database
    Export {
        /// Also export vendor package translations
        #[arg(long)]
        allow_vendor: bool,

        /// Also export `<locale>.json` files
        #[arg(long)]
        allow_json: bool,

        /// Filters
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Find translation keys in source files and add the missing ones
    Find {
        /// Directory to scan; defaults to the project root
        #[arg(long)]
        path: Option<PathBuf>,

        /// Locale to seed found keys for; overrides `find.defaultLocale`
        #[arg(long)]
        locale: Option<String>,
    },

    /// Remove rows without any translation
    Clean,

    /// Remove all rows, or only the rows of the given groups
    Nuke {
        /// Groups to remove (`admin/*` matches a prefix)
        #[arg(value_delimiter = ',')]
        groups: Vec<String>,
    },
}

/// Any error that ends a run.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Import/export failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Find failure
    #[error(transparent)]
    Scanner(#[from] ScannerError),

    /// Prompt I/O
    #[error("Failed to read confirmation: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Installs the console layer and, with `--log-file`, a file layer.
///
/// The returned guard flushes the file layer when dropped.
fn init_tracing(log_level: Option<&str>, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = || {
        log_level.map_or_else(
            || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            EnvFilter::new,
        )
    };

    let console_layer =
        fmt::layer().with_target(false).with_writer(std::io::stderr).with_filter(filter());

    let (file_layer, guard) = log_file
        .map(|path| {
            let directory =
                path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path.file_name().unwrap_or(path.as_os_str());
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(filter());
            (layer, guard)
        })
        .unzip();

    tracing_subscriber::registry().with(console_layer).with(file_layer).init();
    guard
}

/// Asks a yes/no question on the terminal. Anything but `y`/`yes` is a no.
fn confirm(question: &str) -> Result<bool, std::io::Error> {
    {
        let mut stderr = std::io::stderr().lock();
        write!(stderr, "{question} [y/N] ")?;
        stderr.flush()?;
    }

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Warns about filter lists holding an empty entry.
fn warn_empty_entries(filter: &FilterSpec) {
    for name in filter.lists_with_empty_entries() {
        tracing::warn!("--{} contains an empty entry, which matches no group or locale", name);
    }
}

/// Loads configuration, opens the database and runs the subcommand.
fn run(cli: Cli) -> Result<(), CliError> {
    let mut manager = ConfigManager::new();
    manager.load_settings(cli.project.clone())?;
    if let Command::Find { locale: Some(locale), .. } = &cli.command {
        let mut overridden = manager.get_settings().clone();
        overridden.find.default_locale.clone_from(locale);
        manager.update_settings(overridden)?;
    }
    let settings = manager.get_settings();

    let mut store =
        SqliteStore::open(&manager.database_path(), TableSchema::from_settings(settings))?;
    store.ensure_schema()?;
    let loader = FileLoader::new(manager.lang_dir());

    match cli.command {
        Command::Import { overwrite, allow_vendor, allow_json, filter } => {
            let filter = FilterSpec::from(filter);
            warn_empty_entries(&filter);

            let options = ImportOptions { overwrite, allow_vendor, allow_json, filter };
            let summary = ImportEngine::new(manager.lang_dir(), options).run(&mut store, &loader)?;
            tracing::info!("Done importing, processed {} items!", summary.changed());
        }
        Command::Export { allow_vendor, allow_json, filter } => {
            let filter = FilterSpec::from(filter);
            warn_empty_entries(&filter);

            if !cli.yes
                && !confirm("Existing translation files will be overwritten. Continue?")?
            {
                tracing::info!("Export cancelled");
                return Ok(());
            }

            let options = ExportOptions { allow_vendor, allow_json, filter };
            ExportEngine::new(manager.lang_dir(), options).run(&mut store)?;
            tracing::info!("Done writing language files!");
        }
        Command::Find { path, .. } => {
            let root = path.unwrap_or_else(|| manager.project_root().to_path_buf());
            let scanner = Scanner::new(&settings.find)?;
            let candidates = scanner.scan(&root)?;

            let summary =
                seed_candidates(&mut store, &loader, &candidates, &settings.find.default_locale)?;
            tracing::info!(
                "Done importing, processed {} items! ({} keys found)",
                summary.changed(),
                summary.candidates
            );
        }
        Command::Clean => {
            let removed = store.delete_where_all_locales_empty()?;
            tracing::info!("Done cleaning translations! {} rows removed", removed);
        }
        Command::Nuke { groups } => {
            let question = if groups.is_empty() {
                "All translations will be deleted. Continue?".to_string()
            } else {
                format!("Translations of {} will be deleted. Continue?", groups.join(", "))
            };
            if !cli.yes && !confirm(&question)? {
                tracing::info!("Nuke cancelled");
                return Ok(());
            }

            let patterns = (!groups.is_empty()).then(|| parse_patterns(&groups));
            let removed = store.delete_by_group_pattern(patterns.as_deref())?;
            tracing::info!("All translations are deleted! {} rows removed", removed);
        }
    }

    Ok(())
}

/// Parses the command line and runs it.
fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_level.as_deref(), cli.log_file.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use clap::CommandFactory;
    use googletest::prelude::*;

    use super::*;

    #[googletest::test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[googletest::test]
    fn import_filters_split_on_commas() {
        let cli = Cli::try_parse_from([
            "translations",
            "import",
            "--overwrite",
            "--only-groups",
            "admin/*,auth",
            "--ignore-locales",
            "de",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        let Command::Import { overwrite, allow_vendor, filter, .. } = cli.command else {
            panic!("expected import");
        };
        let filter = FilterSpec::from(filter);
        expect_that!(overwrite, eq(true));
        expect_that!(allow_vendor, eq(false));
        expect_that!(filter.only_groups, some(elements_are![eq("admin/*"), eq("auth")]));
        expect_that!(filter.ignore_locales, some(elements_are![eq("de")]));
        expect_that!(filter.ignore_groups, none());
    }

    #[googletest::test]
    fn global_options_after_subcommand() {
        let cli =
            Cli::try_parse_from(["translations", "nuke", "vendor/*", "--yes", "--project", "app"])
                .unwrap_or_else(|e| panic!("{e}"));

        expect_that!(cli.yes, eq(true));
        assert_eq!(cli.project, PathBuf::from("app"));
        let Command::Nuke { groups } = cli.command else {
            panic!("expected nuke");
        };
        expect_that!(groups, elements_are![eq("vendor/*")]);
    }
}
