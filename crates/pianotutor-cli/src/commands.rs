//! Command parsing and execution.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local, Utc};
use tracing::warn;

use pianotutor_core::{
    open_storage, AuthError, AuthService, Config, KeyValueStore, MemoryStore, ThemeManager,
    ThemeMode,
};

pub const USAGE: &str = "\
Usage: pianotutor [--ephemeral] <command>

Commands:
  login [username]     Sign in and store the session token
  register             Create an account
  forgot-password      Set a new password
  logout               End the session (always clears the local token)
  status               Show whether a valid session is stored
  theme [mode]         Show or change the theme: light, dark, system, toggle
  help                 Show this message

Options:
  --ephemeral          Keep everything in memory for this run only";

const ENV_USERNAME: &str = "PIANOTUTOR_USERNAME";
const ENV_PASSWORD: &str = "PIANOTUTOR_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeChange {
    Set(ThemeMode),
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: Option<String> },
    Register,
    ForgotPassword,
    Logout,
    Status,
    Theme(Option<ThemeChange>),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub ephemeral: bool,
}

pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut ephemeral = false;
    let mut help = false;
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--ephemeral" => ephemeral = true,
            "-h" | "--help" => help = true,
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            _ => positional.push(arg.clone()),
        }
    }

    if help {
        return Ok(Invocation {
            command: Command::Help,
            ephemeral,
        });
    }

    let mut rest = positional.into_iter();
    let command = match rest.next().as_deref() {
        None | Some("help") => Command::Help,
        Some("login") => Command::Login {
            username: rest.next(),
        },
        Some("register") => Command::Register,
        Some("forgot-password") => Command::ForgotPassword,
        Some("logout") => Command::Logout,
        Some("status") => Command::Status,
        Some("theme") => match rest.next() {
            None => Command::Theme(None),
            Some(arg) if arg == "toggle" => Command::Theme(Some(ThemeChange::Toggle)),
            Some(arg) => {
                let mode = ThemeMode::from_str(&arg)
                    .ok_or_else(|| anyhow!("Unknown theme: {}", arg))?;
                Command::Theme(Some(ThemeChange::Set(mode)))
            }
        },
        Some(other) => bail!("Unknown command: {}", other),
    };

    if let Some(extra) = rest.next() {
        bail!("Unexpected argument: {}", extra);
    }

    Ok(Invocation { command, ephemeral })
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("{}: ", label))?;
    Ok(password)
}

/// Surface a failed flow the way the user should see it
fn report(err: AuthError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn run(config: &mut Config, invocation: Invocation) -> Result<()> {
    let storage: Arc<dyn KeyValueStore> = if invocation.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        open_storage(config)?
    };

    match invocation.command {
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        Command::Theme(change) => run_theme(storage, change).await,
        command => {
            let service = AuthService::connect(config, storage).await?;
            match command {
                Command::Login { username } => run_login(config, &service, username).await,
                Command::Register => run_register(&service).await,
                Command::ForgotPassword => run_forgot_password(&service).await,
                Command::Logout => run_logout(&service).await,
                Command::Status => {
                    run_status(&service).await;
                    Ok(())
                }
                Command::Help | Command::Theme(_) => Ok(()),
            }
        }
    }
}

async fn run_login(config: &mut Config, service: &AuthService, username: Option<String>) -> Result<()> {
    let username = match username
        .or_else(|| std::env::var(ENV_USERNAME).ok())
        .or_else(|| config.last_username.clone())
    {
        Some(name) if !name.trim().is_empty() => name,
        _ => prompt_line("Username")?,
    };
    let password = match std::env::var(ENV_PASSWORD) {
        Ok(password) if !password.is_empty() => password,
        _ => prompt_password("Password")?,
    };

    service.login(&username, &password).await.map_err(report)?;

    config.last_username = Some(username.trim().to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {}", username.trim());
    Ok(())
}

async fn run_register(service: &AuthService) -> Result<()> {
    let username = prompt_line("Username")?;
    let password = prompt_password("Password")?;
    let confirm = prompt_password("Confirm password")?;

    let message = service
        .register(&username, &password, &confirm)
        .await
        .map_err(report)?;
    println!("Registered {}: {}", username.trim(), message);
    println!("Run `pianotutor login` to sign in.");
    Ok(())
}

async fn run_forgot_password(service: &AuthService) -> Result<()> {
    let username = prompt_line("Username")?;
    let password = prompt_password("New password")?;
    let confirm = prompt_password("Confirm new password")?;

    let message = service
        .forgot_password(&username, &password, &confirm)
        .await
        .map_err(report)?;
    println!("Password updated: {}", message);
    Ok(())
}

async fn run_logout(service: &AuthService) -> Result<()> {
    match service.logout().await {
        Ok(()) => {
            println!("Signed out");
            Ok(())
        }
        Err(e) => {
            // Local session is already gone; the server just didn't confirm
            println!("Signed out locally ({})", e.user_message());
            Ok(())
        }
    }
}

async fn run_status(service: &AuthService) {
    let session = service.session();
    let snapshot = session.snapshot();

    if session.read().is_none() {
        if snapshot.token.is_some() {
            // The background expiry clear would not outlive this process
            session.clear().await;
            println!("Session expired");
        } else {
            println!("Not signed in");
        }
        return;
    }

    let issued_at = snapshot.issued_at;
    let expires_at = issued_at.saturating_add(session.policy().max_age.num_milliseconds());
    println!("Signed in");
    println!("  server:  {}", service.api().base_url());
    println!("  issued:  {}", format_millis(issued_at));
    println!("  expires: {}", format_millis(expires_at));
}

async fn run_theme(storage: Arc<dyn KeyValueStore>, change: Option<ThemeChange>) -> Result<()> {
    let manager = ThemeManager::load(storage).await;
    let mode = match change {
        None => manager.current(),
        Some(ThemeChange::Toggle) => manager.toggle().await,
        Some(ThemeChange::Set(mode)) => {
            manager.set(mode).await;
            mode
        }
    };
    println!("Theme: {}", mode.name());
    Ok(())
}
