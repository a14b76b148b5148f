use clap::{Parser, Subcommand};
use log::info;

use aguja::config::{Config, ConfigError, ServerRole};
use aguja::core::backend::{Backend, BackendList};
use aguja::core::{status, Server, ServerRef};
use aguja::routing::{ConnectionType, Router, RouterSettings};
use aguja::{RouterBackend, Session};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "aguja")]
#[command(about = "Backend selection core for a read/write-split database proxy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the selection core against a configured pool and report the
    /// resulting connection distribution
    Simulate {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/dev.toml")]
        config: PathBuf,
        /// Number of client sessions to bring up
        #[arg(short, long, default_value_t = 100)]
        sessions: usize,
    },
    /// Generate an example configuration file
    Config {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { config, sessions } => {
            simulate(config, sessions)?;
        }
        Commands::Config { output } => {
            generate_config(output)?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}

/// Build the shared pool the way the monitor layer would publish it.
fn build_pool(config: &Config) -> Vec<Arc<ServerRef>> {
    config
        .servers
        .iter()
        .map(|entry| {
            let server = Arc::new(Server::new(
                entry.name.clone(),
                entry.address.clone(),
                entry.port,
            ));

            let role_bits = match entry.role {
                ServerRole::Master => status::MASTER,
                ServerRole::Slave => status::SLAVE,
                ServerRole::Relay => status::RELAY,
            };
            server.set_status(status::RUNNING | role_bits);

            if let Some(rlag) = entry.rlag {
                server.set_rlag(rlag);
            }
            if let Some(response_time) = entry.response_time {
                server.set_response_time_average(response_time);
            }

            Arc::new(ServerRef::new(server, entry.weight))
        })
        .collect()
}

fn simulate(config_path: PathBuf, sessions: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_from_file(&config_path)
        .map_err(|e| format!("Failed to load config from {:?}: {}", config_path, e))?;

    init_logging(&config)?;

    if config.servers.is_empty() {
        return Err("No servers configured; nothing to simulate".into());
    }

    info!("Starting aguja v{} simulation", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {:?}", config_path);
    info!(
        "Policy: {:?}, max slave connections: {}",
        config.router.slave_selection_criteria, config.router.max_slave_connections
    );

    let pool = build_pool(&config);
    let threads = config.router.threads;
    let settings = RouterSettings::from(&config.router);

    let mut refused_total = 0usize;
    std::thread::scope(|scope| {
        let mut workers = Vec::new();

        for worker_index in 0..threads {
            let pool = &pool;
            let settings = settings.clone();
            // Sessions are spread round-robin over the workers; each
            // worker owns its sessions for their whole lifetime.
            let share = (sessions + threads - 1 - worker_index) / threads;

            workers.push(scope.spawn(move || {
                let router = Router::new(settings);
                let mut open_sessions = Vec::with_capacity(share);
                let mut refused = 0usize;

                for _ in 0..share {
                    let session = Session::default();
                    let backends: BackendList = pool
                        .iter()
                        .map(|server_ref| {
                            Arc::new(RouterBackend::new(server_ref.clone())) as Arc<dyn Backend>
                        })
                        .collect();

                    match router.select_connect_backends(
                        &session,
                        &backends,
                        None,
                        ConnectionType::All,
                    ) {
                        Ok(_) => open_sessions.push(backends),
                        Err(e) => {
                            log::warn!("Session refused: {}", e);
                            refused += 1;
                        }
                    }
                }

                refused
            }));
        }

        for worker in workers {
            refused_total += worker.join().expect("simulation worker panicked");
        }
    });

    println!(
        "Brought up {} sessions ({} refused) across {} workers",
        sessions - refused_total,
        refused_total,
        threads
    );
    println!();
    println!(
        "{:<16} {:>8} {:>12} {:>8}  {}",
        "server", "weight", "connections", "rlag", "status"
    );
    for server_ref in &pool {
        let server = server_ref.server();
        println!(
            "{:<16} {:>8.1} {:>12} {:>8}  {}",
            server.name(),
            server_ref.weight(),
            server_ref.connections(),
            server.rlag(),
            server.status_string()
        );
    }

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Generating configuration file: {:?}", output);

    Config::create_example_config(&output)
        .map_err(|e| format!("Failed to generate config: {}", e))?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to match your pool and run:");
    println!("  aguja simulate --config {:?}", output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration file: {:?}", config_path);

    match Config::load_from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!(
                "  Selection policy: {:?}",
                config.router.slave_selection_criteria
            );
            println!(
                "  Max slave connections: {}",
                config.router.max_slave_connections
            );
            println!(
                "  Master failure mode: {:?}",
                config.router.master_failure_mode
            );
            println!("  Worker threads: {}", config.router.threads);
            println!("  Servers: {} configured", config.servers.len());
            for (i, server) in config.servers.iter().enumerate() {
                println!(
                    "    {}: {} [{}]:{} ({:?}, weight {})",
                    i + 1,
                    server.name,
                    server.address,
                    server.port,
                    server.role,
                    server.weight
                );
            }
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::ValidationError(msg) => eprintln!("  Validation error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
            }
            return Err(Box::new(e));
        }
    }

    Ok(())
}

fn show_version() {
    println!("aguja v{}", env!("CARGO_PKG_VERSION"));
    println!("Backend selection core for a read/write-split database proxy");
    println!();
    println!("Features:");
    println!("  • Five slave selection policies, from connection counts to");
    println!("    response-time weighted adaptive routing");
    println!("  • Priority-grouped read routing with busy-server demotion");
    println!("  • Idempotent session bring-up with per-session slave quotas");
    println!("  • Worker-local randomness, no cross-worker locking");
}

fn init_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match config.logging.level.as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Logging initialized at level: {:?}", log_level);
    Ok(())
}
