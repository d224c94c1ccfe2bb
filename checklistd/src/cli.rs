use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "checklistd")]
#[command(about = "Project checklist kept in sync with a Trimble Connect folder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project id (defaults to CHECKLIST_PROJECT_ID)
    #[arg(long, global = true, value_name = "ID")]
    pub project: Option<String>,

    /// Folder path inside the project (defaults to CHECKLIST_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub path: Option<String>,

    /// User the edits are attributed to (defaults to CHECKLIST_USER_EMAIL)
    #[arg(long, global = true, value_name = "EMAIL")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Show the local checklist
    #[command(alias = "ls")]
    List,
    /// Append an item
    Add {
        /// Item text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Flip the done flag of item N
    Toggle {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
    },
    /// Remove item N
    #[command(alias = "rm")]
    Delete {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
    },
    /// Replace the local list with the project copy
    Pull,
    /// Upload the local list to the project
    Push,
    /// Edit interactively with debounced sync (default)
    Session,
    /// Save an access token in the system keyring
    Login {
        /// Token value; read from stdin when omitted
        token: Option<String>,
    },
    /// Remove the saved access token
    Logout,
}

impl Cli {
    /// The subcommand to run; a bare invocation opens a session.
    pub fn action(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Session)
    }
}
