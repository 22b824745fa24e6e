use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reskit_adaptor_terminal::render::search_results;
use reskit_adaptor_terminal::{LogTailConfig, Route, Terminal, TerminalConfig};
use reskit_core::utils::init_logging;
use reskit_core::{
    get_env_bool, load_env, load_env_from_path, ApiClient, ClientConfig, HttpResearchApi,
    LoginRequest, ProjectId, RegisterRequest, ResearchApi, SearchCategory, Session,
};
use reskit_provider_live::LiveConfig;
use reskit_view_search::SearchView;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "reskit", about = "Chat with your research projects and search papers")]
struct Cli {
    #[arg(long, env = "RESKIT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Service root, e.g. http://127.0.0.1:5000
    #[arg(long, env = "RESKIT_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Open the interactive client (default)
    App {
        #[arg(long)]
        project_id: Option<ProjectId>,
    },
    /// Run one search and print the results
    Search {
        query: Vec<String>,
        #[arg(long, default_value = "all")]
        category: SearchCategory,
    },
    /// Sign in and store the token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RESKIT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and store the token
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "RESKIT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
}

fn read_password() -> anyhow::Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password is required");
    }
    Ok(password)
}

fn main() -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    rt.block_on(run())
}

/// Load `.env` (or `RESKIT_ENV_FILE`) first so clap's env fallbacks see it
fn parse_cli_from<I, T>(args: I) -> anyhow::Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match std::env::var_os("RESKIT_ENV_FILE") {
        Some(path) => load_env_from_path(path)?,
        None => load_env()?,
    }
    Ok(Cli::try_parse_from(args)?)
}

async fn run() -> anyhow::Result<()> {
    let cli = match parse_cli_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => match e.downcast::<clap::Error>() {
            Ok(e) => e.exit(),
            Err(e) => return Err(e),
        },
    };
    std::env::set_var("RESKIT_LOG_LEVEL", &cli.log_level);
    init_logging();

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        let token_path = config.token_path.clone();
        config = ClientConfig::new(base_url)?.with_token_path(token_path);
    }
    let session = Session::from_file(&config.token_path);
    let live = LiveConfig::from_client_config(&config)?;
    let api: Arc<dyn ResearchApi> = Arc::new(HttpResearchApi::new(ApiClient::new(
        config,
        session.clone(),
    )?));

    match cli.command.unwrap_or(Cmd::App { project_id: None }) {
        Cmd::App { project_id } => {
            let route = Route::App { project_id };
            let terminal = Terminal::new(
                api,
                session,
                live,
                TerminalConfig {
                    log_tail: LogTailConfig {
                        enabled: get_env_bool("RESKIT_TERMINAL_LOGS", false),
                        target_filter: std::env::var("RESKIT_TERMINAL_TARGET").ok(),
                        verbose: get_env_bool("RESKIT_TERMINAL_VERBOSE", false),
                    },
                },
            );
            terminal.run(route).await?;
        }
        Cmd::Search { query, category } => {
            let (tx, _rx) = mpsc::unbounded_channel();
            let mut view = SearchView::new(api, tx);
            view.set_query(query.join(" "));
            view.set_category(category);
            if !view.search_now().await {
                bail!("nothing to search for");
            }
            match view.error() {
                Some(message) => bail!("{}", message),
                None => println!("{}", search_results(view.results())),
            }
        }
        Cmd::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let response = api.login(LoginRequest { email, password }).await?;
            match response.token {
                Some(_) => println!("Signed in."),
                None => bail!(
                    "{}",
                    response.message.unwrap_or_else(|| "Login failed".to_string())
                ),
            }
        }
        Cmd::Register {
            username,
            email,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let response = api
                .register(RegisterRequest {
                    username,
                    email,
                    password,
                })
                .await?;
            match response.token {
                Some(_) => println!("Account created. Signed in."),
                None => bail!(
                    "{}",
                    response.message.unwrap_or_else(|| "Registration failed".to_string())
                ),
            }
        }
        Cmd::Logout => {
            api.logout().await?;
            println!("Signed out.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_env_file_feeds_cli_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "RESKIT_BASE_URL=http://10.0.0.9:5000").unwrap();
        std::env::set_var("RESKIT_ENV_FILE", file.path());
        std::env::remove_var("RESKIT_BASE_URL");
        std::env::remove_var("RESKIT_LOG_LEVEL");

        let cli = parse_cli_from(["reskit", "logout"]).unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://10.0.0.9:5000"));
        assert_eq!(cli.log_level, "info");
        assert!(matches!(cli.command, Some(Cmd::Logout)));

        std::env::remove_var("RESKIT_ENV_FILE");
        std::env::remove_var("RESKIT_BASE_URL");
    }
}
