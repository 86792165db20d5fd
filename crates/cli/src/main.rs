use clap::{Parser, Subcommand};
use std::io::{self, Write};

#[derive(Parser)]
#[command(name = "goalplan")]
#[command(about = "Goal Planner CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default config file.
    Init {
        /// Config file path (default: GOALPLAN_CONFIG_PATH or ~/.goalplan/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the planning server (accounts, login, chat turns).
    Serve {
        /// Config file path (default: GOALPLAN_CONFIG_PATH or ~/.goalplan/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Create an account on the planning server.
    Register {
        /// Config file path (default: GOALPLAN_CONFIG_PATH or ~/.goalplan/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Username (prompted for when omitted)
        #[arg(long, short)]
        username: Option<String>,
    },

    /// Log in and store the session token.
    Login {
        /// Config file path (default: GOALPLAN_CONFIG_PATH or ~/.goalplan/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Username (prompted for when omitted)
        #[arg(long, short)]
        username: Option<String>,
    },

    /// Remove the stored session token.
    Logout,

    /// Chat with the planner (interactive). Requires a stored session token.
    Chat {
        /// Config file path (default: GOALPLAN_CONFIG_PATH or ~/.goalplan/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("goalplan {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("server failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Register { config, username }) => {
            if let Err(e) = run_register(config, username).await {
                log::error!("register failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Login { config, username }) => {
            if let Err(e) = run_login(config, username).await {
                log::error!("login failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Logout) => {
            if let Err(e) = run_logout() {
                log::error!("logout failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config }) => {
            if let Err(e) = run_chat(config).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting planning server on {}:{}",
        config.server.bind,
        config.server.port
    );
    lib::server::run_server(config, path).await
}

/// Read one line from stdin after printing a label ("username: ").
fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Resolve username and password from the optional flag and stdin prompts.
fn credentials(username: Option<String>) -> anyhow::Result<(String, String)> {
    let username = match username {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => prompt("username")?,
    };
    let password = prompt("password")?;
    if username.is_empty() || password.is_empty() {
        anyhow::bail!("username and password are required");
    }
    Ok((username, password))
}

fn api_client(config_path: Option<std::path::PathBuf>) -> anyhow::Result<lib::api::ApiClient> {
    let (config, _) = lib::config::load_config(config_path)?;
    Ok(lib::api::ApiClient::new(lib::config::resolve_server_url(
        &config,
    )))
}

async fn run_register(
    config_path: Option<std::path::PathBuf>,
    username: Option<String>,
) -> anyhow::Result<()> {
    let client = api_client(config_path)?;
    let (username, password) = credentials(username)?;
    client.register(&username, &password).await?;
    println!("registered; log in with `goalplan login`");
    Ok(())
}

async fn run_login(
    config_path: Option<std::path::PathBuf>,
    username: Option<String>,
) -> anyhow::Result<()> {
    let client = api_client(config_path)?;
    let (username, password) = credentials(username)?;
    let token = client.login(&username, &password).await?;
    lib::token::TokenStore::default_location().save(&token)?;
    println!("logged in as {}", username);
    Ok(())
}

fn run_logout() -> anyhow::Result<()> {
    lib::token::TokenStore::default_location().clear()?;
    println!("logged out");
    Ok(())
}

async fn run_chat(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let tokens = lib::token::TokenStore::default_location();
    if !tokens.is_authorized() {
        anyhow::bail!("not logged in; run `goalplan login` first");
    }
    let client = api_client(config_path)?;

    let mut conversation = lib::conversation::Conversation::new();
    println!("conversation {} (/exit to quit)", conversation.id());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        let Some(message) = conversation.submit(input) else {
            continue;
        };
        let result = client.chat(&message, conversation.id()).await;
        conversation.resolve(result);
        if let Some(m) = conversation.messages().last() {
            println!("< {}", m.content.trim());
        }
    }

    Ok(())
}
