mod cli;

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use connect_core::ConnectClient;
use tokio::io::BufReader;

use checklistd::config::SyncConfig;
use checklistd::context::WorkspaceContext;
use checklistd::host::{ChecklistHost, SharedChecklist};
use checklistd::session::{finish, render_items, run_session};
use checklistd::storage::{LocalStore, TokenStorage};
use checklistd::sync::controller::{SyncController, SyncSettings};
use checklistd::token_provider::TokenProvider;

use cli::{Cli, Commands};

type Controller = SyncController<TokenProvider, Arc<SharedChecklist>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("CHECKLIST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("checklistd=warn,connect_core=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.action() {
        Commands::Login { token } => return login(token),
        Commands::Logout => {
            TokenStorage::new()?.delete_token()?;
            eprintln!("[checklistd] saved token removed");
            return Ok(());
        }
        _ => {}
    }

    let config = SyncConfig::from_env();
    let context = WorkspaceContext::resolve(cli.project.clone(), cli.path.clone(), cli.email.clone());
    if !context.is_project_known() {
        tracing::warn!("no project id given; sync will target project \"unknown\"");
    }
    let store = LocalStore::new(&config.data_dir, &context);
    tracing::debug!(file = %store.path().display(), "local checklist");
    let list = Arc::new(SharedChecklist::persistent(store, |message| {
        eprintln!("[checklistd] {message}")
    }));

    let mut stdout = std::io::stdout();
    match cli.action() {
        Commands::List => render_items(&list.items(), &mut stdout)?,
        Commands::Add { text } => {
            let item = list.add(&text.join(" "))?;
            println!("added #{}: {}", list.len(), item.text);
        }
        Commands::Toggle { position } => {
            let done = list.toggle(position as usize - 1)?;
            println!("#{position} is {}", if done { "done" } else { "open" });
        }
        Commands::Delete { position } => {
            let item = list.remove(position as usize - 1)?;
            println!("deleted: {}", item.text);
        }
        Commands::Pull => {
            let controller = build_controller(&config, context, Arc::clone(&list))?;
            controller.pull_now().await?;
            render_items(&list.items(), &mut stdout)?;
        }
        Commands::Push => {
            let controller = build_controller(&config, context, Arc::clone(&list))?;
            let outcome = controller.push_now().await?;
            println!("pushed {} items", outcome.items);
        }
        Commands::Session => {
            let controller = build_controller(&config, context, list)?;
            eprintln!("[checklistd] type `help` for commands");
            let input = BufReader::new(tokio::io::stdin());
            tokio::select! {
                result = run_session(&controller, input, &mut stdout) => result?,
                _ = tokio::signal::ctrl_c() => {
                    finish(&controller).await;
                }
            }
        }
        Commands::Login { .. } | Commands::Logout => {}
    }
    stdout.flush()?;
    Ok(())
}

fn build_controller(
    config: &SyncConfig,
    context: WorkspaceContext,
    list: Arc<SharedChecklist>,
) -> anyhow::Result<Controller> {
    let client = ConnectClient::with_base_url(&config.api_base)
        .with_context(|| format!("invalid CHECKLIST_API_BASE: {}", config.api_base))?;
    let tokens = TokenProvider::from_env()?;
    Ok(SyncController::new(
        client,
        tokens,
        list,
        context,
        SyncSettings {
            folder_name: config.folder_name.clone(),
            debounce: config.debounce,
        },
    ))
}

fn login(token: Option<String>) -> anyhow::Result<()> {
    let token = match token {
        Some(token) => token,
        None => {
            eprint!("access token: ");
            std::io::stderr().flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line
        }
    };
    let token = token.trim();
    anyhow::ensure!(!token.is_empty(), "no token given");
    TokenStorage::new()?.save_token(token)?;
    eprintln!("[checklistd] token saved to keyring");
    Ok(())
}
