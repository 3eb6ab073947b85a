use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::types::StateFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "ghi")]
#[command(about = "Browse and search the issues of a GitHub repository", version)]
#[command(after_help = "EXAMPLES:
    ghi issues                        List open issues
    ghi issues --search \"panic\"       Search issues
    ghi issue view 42 --comments      View an issue with its comments
    ghi browse                        Page through issues interactively")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Output as JSON (alias for --format json)
    #[arg(long, global = true, hide = true)]
    pub json: bool,

    /// Suppress informational messages
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Log debug output and show detailed error information
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Get the effective output format, considering --json flag
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect issues
    #[command(
        alias = "i",
        after_help = "EXAMPLES:
    ghi issue list --state closed
    ghi issue view 42
    ghi issue comments 42 --all"
    )]
    Issue {
        #[command(subcommand)]
        action: IssueCommands,
    },
    /// List issues (alias for 'issue list')
    #[command(
        alias = "is",
        after_help = "EXAMPLES:
    ghi issues --state all --limit 50
    ghi issues --search \"memory leak\" --page 2"
    )]
    Issues(IssueListArgs),
    /// Page through issues interactively
    #[command(after_help = "COMMANDS (at the prompt):
    n              next page
    p              previous page
    /TEXT          search for TEXT (a lone / clears the search)
    state STATE    show open, closed or all issues
    r              refresh the current page, mark everything else stale
    x              reset all filters
    NUMBER         show that issue
    q              quit")]
    Browse(BrowseArgs),
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    ghi completions bash > ~/.bash_completion.d/ghi
    ghi completions zsh > ~/.zfunc/_ghi")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    Init,
}

#[derive(Subcommand)]
pub enum IssueCommands {
    /// List issues
    #[command(alias = "ls")]
    List(IssueListArgs),
    /// View issue details
    #[command(
        alias = "show",
        after_help = "EXAMPLES:
    ghi issue view 42
    ghi issue view 42 --comments"
    )]
    View(IssueViewArgs),
    /// List comments on an issue
    #[command(after_help = "EXAMPLES:
    ghi issue comments 42
    ghi issue comments 42 --all")]
    Comments(CommentsArgs),
}

#[derive(Args, Clone, Debug)]
pub struct IssueListArgs {
    /// Full-text search term
    #[arg(long, short)]
    pub search: Option<String>,

    /// Issue state to include
    #[arg(long, value_enum, default_value = "open")]
    pub state: StateFilter,

    /// Issues per page (defaults to the configured page size)
    #[arg(long, short)]
    pub limit: Option<u32>,

    /// Page number to show, starting at 1
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,
}

#[derive(Args, Clone, Debug)]
pub struct IssueViewArgs {
    /// Issue number
    pub number: u64,

    /// Also list the comments
    #[arg(long, short)]
    pub comments: bool,
}

#[derive(Args, Clone, Debug)]
pub struct CommentsArgs {
    /// Issue number
    pub number: u64,

    /// Load every page of comments
    #[arg(long, short)]
    pub all: bool,

    /// Comments per page (defaults to the configured page size)
    #[arg(long, short)]
    pub limit: Option<u32>,
}

#[derive(Args, Clone, Debug)]
pub struct BrowseArgs {
    /// Start with this search term
    #[arg(long, short)]
    pub search: Option<String>,

    /// Start with this state filter
    #[arg(long, value_enum, default_value = "open")]
    pub state: StateFilter,

    /// Issues per page
    #[arg(long, short)]
    pub limit: Option<u32>,
}
