use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "padd", about = concat!("padd v", env!("CARGO_PKG_VERSION"), " - nested tasks, one tree at a time"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .padd/ in the current directory
    Init(InitArgs),
    /// Show the task tree
    List(ListArgs),
    /// Show one task with its parents and dossier
    Show(ShowArgs),
    /// Add a task at the root or under a parent
    Add(AddArgs),
    /// Flip a task between open and done
    Toggle(IdArg),
    /// Change a task's text, due date, or dossier
    Edit(EditArgs),
    /// Delete a task and everything under it
    Rm(IdArg),
    /// Move a task under another task or to the root
    Mv(MvArgs),
    /// Upcoming due tasks, grouped by day
    Agenda(AgendaArgs),
    /// Search text, details, and personnel by regex
    Search(SearchArgs),
    /// Print the tree again whenever the store changes
    Watch,
}

#[derive(Args)]
pub struct InitArgs {
    /// Owner id for this data dir (default: $USER)
    #[arg(long)]
    pub owner: Option<String>,
    /// Overwrite an existing .padd/config.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// One line per task, depth shown as a number
    #[arg(long)]
    pub flat: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: String,
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Parent task ID
    #[arg(long)]
    pub parent: Option<String>,
    /// Due time, local: YYYY-MM-DDTHH:MM (or YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New task text
    #[arg(long)]
    pub text: Option<String>,
    /// Replace the details note
    #[arg(long)]
    pub details: Option<String>,
    /// New due time, local: YYYY-MM-DDTHH:MM (or YYYY-MM-DD)
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,
    /// Append an image URL (repeatable)
    #[arg(long = "image", value_name = "URL")]
    pub images: Vec<String>,
    /// Append a personnel assignment NAME:ROLE (repeatable)
    #[arg(long = "person", value_name = "NAME:ROLE")]
    pub personnel: Vec<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task ID to move
    pub id: String,
    /// New parent task ID
    #[arg(long, conflicts_with = "root", required_unless_present = "root")]
    pub under: Option<String>,
    /// Move to the root list
    #[arg(long)]
    pub root: bool,
}

#[derive(Args)]
pub struct AgendaArgs {
    /// First day, local: YYYY-MM-DD (default: today)
    #[arg(long)]
    pub from: Option<String>,
    /// Number of days to show
    #[arg(long, default_value_t = 7)]
    pub days: u64,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern
    pub pattern: String,
}
