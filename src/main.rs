use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::add::AddOptions;
use tracing_subscriber::EnvFilter;

mod commands;

/// Yuki - a package manager for Zig projects
#[derive(Parser)]
#[command(name = "yuki")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a dependency and declare it in yuki.toml
    Add {
        /// Repository locator with an optional version (e.g. zigzap/zap@^0.9.0)
        package: String,

        /// Add as a development dependency
        #[arg(long, conflicts_with = "build")]
        dev: bool,

        /// Add as a build dependency
        #[arg(long)]
        build: bool,

        /// Dependency name (defaults to the repository name)
        #[arg(long = "as", value_name = "NAME")]
        alias: Option<String>,

        /// Track a branch instead of a version
        #[arg(long)]
        branch: Option<String>,

        /// Root source file of the dependency
        #[arg(long = "root-file", alias = "root_file", value_name = "PATH")]
        root_file: Option<String>,
    },

    /// Fetch every dependency in yuki.toml and write yuki.lock
    Install,

    /// Check that yuki.lock matches yuki.toml and every dependency is reachable
    Sync,

    /// Report locked dependencies with newer releases
    Update {
        /// Only report this dependency
        package: Option<String>,
    },

    /// Remove a dependency from yuki.toml and yuki.lock
    Remove {
        /// Dependency name
        name: String,
    },

    /// Verify installed dependencies against their locked checksums
    Verify,

    /// List declared dependencies and their locked versions
    List,

    /// Explain why a dependency is part of the project
    Why {
        /// Dependency name
        name: String,
    },

    /// Show repository details and recent releases
    Info {
        /// Repository locator (owner/repo or URL)
        package: String,
    },

    /// Diagnose the local setup
    Doctor,

    /// Manage the fetch cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached dependencies
    List,

    /// Remove every cached dependency
    Clear,

    /// Print the cache location
    Path,
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "yuki=error"
    } else {
        match verbose {
            0 => "yuki=warn",
            1 => "yuki=info",
            _ => "yuki=debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Add {
            package,
            dev,
            build,
            alias,
            branch,
            root_file,
        } => commands::add::run(AddOptions {
            package,
            dev,
            build,
            alias,
            branch,
            root_file,
        }),
        Commands::Install => commands::install::run(),
        Commands::Sync => commands::sync::run(),
        Commands::Update { package } => commands::update::run(package),
        Commands::Remove { name } => commands::remove::run(name),
        Commands::Verify => commands::verify::run(),
        Commands::List => commands::list::run(),
        Commands::Why { name } => commands::why::run(name),
        Commands::Info { package } => commands::info::run(package),
        Commands::Doctor => commands::doctor::run(),
        Commands::Cache { action } => match action {
            CacheAction::List => commands::cache::run_list(),
            CacheAction::Clear => commands::cache::run_clear(),
            CacheAction::Path => commands::cache::run_path(),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "yuki", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_levels() {
        assert_eq!(Cli::parse_from(["yuki", "sync"]).verbose, 0);
        assert_eq!(Cli::parse_from(["yuki", "-v", "sync"]).verbose, 1);
        assert_eq!(Cli::parse_from(["yuki", "sync", "-vv"]).verbose, 2);
        assert!(Cli::parse_from(["yuki", "-q", "install"]).quiet);
    }

    #[test]
    fn test_add_flags() {
        let cli = Cli::parse_from([
            "yuki",
            "add",
            "acme/lib",
            "--dev",
            "--as",
            "lib2",
            "--root_file",
            "lib.zig",
        ]);
        match cli.command {
            Commands::Add {
                package,
                dev,
                build,
                alias,
                root_file,
                ..
            } => {
                assert_eq!(package, "acme/lib");
                assert!(dev && !build);
                assert_eq!(alias.as_deref(), Some("lib2"));
                assert_eq!(root_file.as_deref(), Some("lib.zig"));
            }
            _ => panic!("expected add"),
        }

        assert!(Cli::try_parse_from(["yuki", "add", "acme/lib", "--dev", "--build"]).is_err());
    }
}
