mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::init::AllocationArg;
use cmd::runtime::RuntimeOpts;
use pods_core::config::Config;
use pods_core::platform::HostProfile;
use pods_core::runtime::RuntimeAction;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pods",
    about = "Local Docker dev environment: register services, allocate port blocks, drive compose",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .pods/ or .git/)
    #[arg(long, global = true, env = "PODS_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .pods/, the shared base image, entrypoint and compose file
    Init {
        /// How port blocks are assigned
        #[arg(long, value_enum)]
        allocation: Option<AllocationArg>,
    },

    /// Register a new service: allocate its port block and write its skeleton
    #[command(alias = "new")]
    Register { name: String },

    /// List registered services and their port blocks
    List,

    /// Show one service, its ports and launch commands
    Show { name: String },

    /// Release a service's port block (registry allocation only)
    Remove {
        name: String,
        /// Also delete the service's source, build, notebook and output directories
        #[arg(long)]
        purge: bool,
    },

    /// Record service directories that have no registry entry yet
    Adopt,

    /// Print the docker-compose entry for a service
    Compose { name: String },

    /// Cross-check the registry against service directories
    Audit,

    /// Build one service image, or all of them
    Build {
        service: Option<String>,
        #[command(flatten)]
        opts: RuntimeOpts,
    },

    /// Start one service (or all) in the background
    Up {
        service: Option<String>,
        #[command(flatten)]
        opts: RuntimeOpts,
    },

    /// Run a one-off container: [jupyter|api|debug|shell|<command>...]
    ///
    /// Put `--` before a command whose own arguments start with `-`.
    Run {
        service: String,
        args: Vec<String>,
        #[command(flatten)]
        opts: RuntimeOpts,
    },

    /// Open a shell in a running service container
    Shell {
        service: String,
        #[command(flatten)]
        opts: RuntimeOpts,
    },

    /// Show container logs
    Logs {
        service: Option<String>,
        #[arg(long, short = 'f')]
        follow: bool,
        #[command(flatten)]
        opts: RuntimeOpts,
    },

    /// Stop and remove all containers
    Down {
        #[command(flatten)]
        opts: RuntimeOpts,
    },

    /// Remove one service's container, or all containers, local images and volumes
    Clean {
        service: Option<String>,
        #[command(flatten)]
        opts: RuntimeOpts,
    },

    /// Print the commands that set up a local virtualenv for a service
    Venv { name: String },

    /// Inspect and validate .pods/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let shell_override = Config::load(&root).ok().and_then(|c| c.host.shell);
    let host = HostProfile::detect(shell_override);
    tracing::debug!(root = %root.display(), shell = %host.shell, "resolved host profile");

    let json = cli.json;
    let result = match cli.command {
        Commands::Init { allocation } => cmd::init::run(&root, allocation.map(Into::into)),
        Commands::Register { name } => cmd::service::register(&root, &name, json),
        Commands::List => cmd::service::list(&root, json),
        Commands::Show { name } => cmd::service::show(&root, &name, json),
        Commands::Remove { name, purge } => cmd::service::remove(&root, &name, purge, json),
        Commands::Adopt => cmd::service::adopt(&root, json),
        Commands::Compose { name } => cmd::service::compose(&root, &name),
        Commands::Audit => cmd::service::audit(&root, json),
        Commands::Build { service, opts } => {
            cmd::runtime::run(&root, &host, RuntimeAction::Build { service }, opts)
        }
        Commands::Up { service, opts } => {
            cmd::runtime::run(&root, &host, RuntimeAction::Up { service }, opts)
        }
        Commands::Run {
            service,
            args,
            opts,
        } => cmd::runtime::run(&root, &host, RuntimeAction::Run { service, args }, opts),
        Commands::Shell { service, opts } => {
            cmd::runtime::run(&root, &host, RuntimeAction::Shell { service }, opts)
        }
        Commands::Logs {
            service,
            follow,
            opts,
        } => cmd::runtime::run(&root, &host, RuntimeAction::Logs { service, follow }, opts),
        Commands::Down { opts } => cmd::runtime::run(&root, &host, RuntimeAction::Down, opts),
        Commands::Clean { service, opts } => {
            cmd::runtime::run(&root, &host, RuntimeAction::Clean { service }, opts)
        }
        Commands::Venv { name } => cmd::venv::run(&root, &host, &name, json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
