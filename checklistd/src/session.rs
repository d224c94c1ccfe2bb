use std::io::Write;
use std::sync::Arc;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::checklist::Checklist;
use crate::host::{ChecklistHost, SharedChecklist};
use crate::sync::controller::SyncController;
use crate::token_provider::TokenSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Add(String),
    /// 1-based position as shown by `list`.
    Toggle(usize),
    Delete(usize),
    List,
    Pull,
    Push,
    On,
    Off,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid item number: {0}")]
    InvalidPosition(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        "add" | "a" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("add"));
            }
            SessionCommand::Add(rest.to_string())
        }
        "toggle" | "t" => SessionCommand::Toggle(parse_position("toggle", rest)?),
        "delete" | "del" | "rm" => SessionCommand::Delete(parse_position("delete", rest)?),
        "list" | "ls" => SessionCommand::List,
        "pull" => SessionCommand::Pull,
        "push" => SessionCommand::Push,
        "on" => SessionCommand::On,
        "off" => SessionCommand::Off,
        "status" => SessionCommand::Status,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_position(command: &'static str, value: &str) -> Result<usize, CommandError> {
    if value.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    match value.parse::<usize>() {
        Ok(position) if position > 0 => Ok(position),
        _ => Err(CommandError::InvalidPosition(value.to_string())),
    }
}

pub fn render_items(items: &Checklist, out: &mut impl Write) -> std::io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "(empty)");
    }
    for (index, item) in items.iter().enumerate() {
        let mark = if item.done { 'x' } else { ' ' };
        writeln!(out, "{:>3}. [{mark}] {}", index + 1, item.text)?;
    }
    Ok(())
}

const HELP: &str = "\
commands:
  add <text>     append an item
  toggle <n>     flip item n
  delete <n>     remove item n
  list           show the checklist
  pull | push    sync now
  on | off       enable or disable project sync
  status         show sync state
  quit";

/// Interactive editing loop with sync enabled.
///
/// Sync is turned on first; edits arm the debounced push. On `quit` or end
/// of input a push that is still waiting is sent before returning.
pub async fn run_session<T, R, W>(
    controller: &SyncController<T, Arc<SharedChecklist>>,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: TokenSource + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    // failures are already reported through the status sink
    let _ = controller.turn_on().await;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                writeln!(out, "{err}")?;
                continue;
            }
        };
        if command == SessionCommand::Quit {
            break;
        }
        execute(controller, command, out).await?;
        out.flush()?;
    }

    finish(controller).await;
    Ok(())
}

async fn execute<T, W>(
    controller: &SyncController<T, Arc<SharedChecklist>>,
    command: SessionCommand,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: TokenSource + 'static,
    W: Write,
{
    let list = controller.host();
    match command {
        SessionCommand::Add(text) => match list.add(&text) {
            Ok(_) => {
                writeln!(out, "added #{}", list.len())?;
                controller.schedule_push();
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        SessionCommand::Toggle(position) => match list.toggle(position - 1) {
            Ok(done) => {
                let state = if done { "done" } else { "open" };
                writeln!(out, "#{position} is {state}")?;
                controller.schedule_push();
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        SessionCommand::Delete(position) => match list.remove(position - 1) {
            Ok(item) => {
                writeln!(out, "deleted: {}", item.text)?;
                controller.schedule_push();
            }
            Err(err) => writeln!(out, "{err}")?,
        },
        SessionCommand::List => render_items(&list.items(), out)?,
        SessionCommand::Pull => {
            if controller.pull_now().await.is_ok() {
                render_items(&list.items(), out)?;
            }
        }
        SessionCommand::Push => {
            let _ = controller.push_now().await;
        }
        SessionCommand::On => {
            let _ = controller.turn_on().await;
        }
        SessionCommand::Off => controller.turn_off(),
        SessionCommand::Status => render_status(controller, out)?,
        SessionCommand::Help => writeln!(out, "{HELP}")?,
        SessionCommand::Quit => {}
    }
    Ok(())
}

fn render_status<T, W>(
    controller: &SyncController<T, Arc<SharedChecklist>>,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: TokenSource + 'static,
    W: Write,
{
    let state = controller.snapshot();
    let context = controller.context();
    writeln!(
        out,
        "project {} path {} as {}",
        context.project_id, context.path, context.user_email
    )?;
    writeln!(
        out,
        "sync {} ({})",
        if state.on { "on" } else { "off" },
        state.filename
    )?;
    let last_push = match state.last_push {
        Some(at) => at.format(&Rfc3339)?,
        None => "never".to_string(),
    };
    writeln!(out, "last push: {last_push}")?;
    if controller.is_push_pending() {
        writeln!(out, "push pending")?;
    }
    Ok(())
}

/// Sends a push still waiting for its quiet period, waits for pushes already
/// on their way, then disables sync.
pub async fn finish<T>(controller: &SyncController<T, Arc<SharedChecklist>>)
where
    T: TokenSource + 'static,
{
    controller.flush().await;
    controller.turn_off();
    tracing::debug!(items = controller.host().len(), "session finished");
}
