use clap::{Parser, Subcommand};

mod commands;
mod prompt;

#[derive(Parser)]
#[command(
    name = "berth",
    about = "Berth — single-host container deployment manager",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the proxy infrastructure and global settings.
    ///
    /// Creates the config root, writes berth.toml, emits the proxy
    /// compose and static config, creates the shared network, and
    /// starts the proxy. Safe to re-run.
    Init {
        /// Secret store download endpoint (prompted if omitted)
        #[arg(long)]
        secret_endpoint: Option<String>,
        /// Email for the ACME certificate resolver
        #[arg(long)]
        acme_email: Option<String>,
    },
    /// Register and start a new service (prompts for missing inputs)
    Add {
        /// Service name (letter first, then letters/digits/underscore)
        #[arg(long)]
        name: Option<String>,
        /// Public routing hostname
        #[arg(long)]
        hostname: Option<String>,
        /// Container image reference
        #[arg(long)]
        image: Option<String>,
        /// Secret store token for this service
        #[arg(long)]
        token: Option<String>,
        /// HTTP health-check path (e.g. /healthz)
        #[arg(long)]
        health_path: Option<String>,
        /// Env file with declared defaults (secrets win on collision)
        #[arg(long)]
        defaults: Option<String>,
    },
    /// Re-fetch secrets, pull the latest image, and restart a service
    Upgrade {
        #[arg(long)]
        name: Option<String>,
    },
    /// Restart a service's container without changing its configuration
    Restart {
        #[arg(long)]
        name: Option<String>,
    },
    /// Permanently remove a service, its container, and its volumes
    Remove {
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the state of all registered services and the proxy
    Status,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("berth=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { secret_endpoint, acme_email } => {
            commands::init::run(secret_endpoint.as_deref(), acme_email.as_deref())
        }
        Commands::Add { name, hostname, image, token, health_path, defaults } => {
            commands::add::run(commands::add::AddArgs {
                name,
                hostname,
                image,
                token,
                health_path,
                defaults_file: defaults,
            })
        }
        Commands::Upgrade { name } => commands::upgrade::run(name.as_deref()),
        Commands::Restart { name } => commands::restart::run(name.as_deref()),
        Commands::Remove { name } => commands::remove::run(name.as_deref()),
        Commands::Status => commands::status::run(),
    }
}
