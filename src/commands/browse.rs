//! Line-driven issue browser.
//!
//! Each command moves the list state and re-renders. Pages and issues
//! already in the cache render at once; stale ones render immediately
//! and refresh in the background.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use super::issues::{print_detail, print_list};
use super::{check_error, Context};
use crate::cli::BrowseArgs;
use crate::error::{GhiError, Result};
use crate::key::keys;
use crate::output;
use crate::search::IssueSearch;
use crate::types::StateFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseCommand {
    Next,
    Previous,
    /// Empty text clears the search.
    Search(String),
    State(StateFilter),
    Refresh,
    Reset,
    Open(u64),
    Help,
    Quit,
}

fn parse(line: &str) -> std::result::Result<Option<BrowseCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(term) = line.strip_prefix('/') {
        return Ok(Some(BrowseCommand::Search(term.trim().to_string())));
    }
    if let Ok(number) = line.trim_start_matches('#').parse::<u64>() {
        return Ok(Some(BrowseCommand::Open(number)));
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));
    let command = match word {
        "n" | "next" => BrowseCommand::Next,
        "p" | "prev" | "previous" => BrowseCommand::Previous,
        "r" | "refresh" => BrowseCommand::Refresh,
        "x" | "reset" => BrowseCommand::Reset,
        "q" | "quit" | "exit" => BrowseCommand::Quit,
        "h" | "help" | "?" => BrowseCommand::Help,
        "state" | "s" => BrowseCommand::State(rest.parse()?),
        other => return Err(format!("unknown command '{other}' (h for help)")),
    };
    Ok(Some(command))
}

const HELP: &str = "n next page · p previous page · /TEXT search · state open|closed|all · \
r refresh · x reset · NUMBER view issue · q quit";

pub async fn run(ctx: &Context, args: BrowseArgs) -> Result<()> {
    let mut search = ctx.issue_search(ctx.listing_filters(args.limit));
    search.set_state_filter(args.state);
    if let Some(term) = args.search {
        search.set_search_term(term);
    }

    render_page(&search).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", search.filters().state);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        tracing::debug!(?command, "browse command");

        let result = match command {
            BrowseCommand::Quit => break,
            BrowseCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            BrowseCommand::Next => {
                if search.load_next_page() {
                    render_page(&search).await
                } else {
                    output::print_message("Already on the last page");
                    Ok(())
                }
            }
            BrowseCommand::Previous => {
                if search.load_previous_page() {
                    render_page(&search).await
                } else {
                    output::print_message("Already on the first page");
                    Ok(())
                }
            }
            BrowseCommand::Search(term) => {
                search.set_search_term(term);
                render_page(&search).await
            }
            BrowseCommand::State(state) => {
                search.set_state_filter(state);
                render_page(&search).await
            }
            BrowseCommand::Refresh => {
                // Other pages and issues refetch the next time they are shown.
                ctx.client
                    .invalidate(&keys::repository(&ctx.repo.owner, &ctx.repo.name));
                print_list(&search.refresh().await)
            }
            BrowseCommand::Reset => {
                search.reset_filters();
                render_page(&search).await
            }
            BrowseCommand::Open(number) => render_issue(ctx, number).await,
        };

        // Errors stay local to the page or issue that failed.
        if let Err(err) = result {
            eprintln!("Error: {err}");
        }
    }

    Ok(())
}

async fn render_page(search: &IssueSearch) -> Result<()> {
    let view = search.view();
    if view.is_loading || view.items.is_empty() {
        return print_list(&search.load().await);
    }
    print_list(&view)?;
    if view.is_fetching {
        output::print_message("(refreshing in the background)");
    }
    Ok(())
}

async fn render_issue(ctx: &Context, number: u64) -> Result<()> {
    let query = ctx.issue_detail(number);

    let early = query.view();
    if early.is_showing_cached_data {
        print_detail(&early, false);
    } else if early.issue.is_some() && !early.is_fetching {
        print_detail(&early, true);
        return Ok(());
    }

    let loaded = query.load().await;
    let found = loaded.issue.is_some();
    check_error(loaded.error.as_ref(), found)?;
    if !found {
        return Err(GhiError::IssueNotFound(number));
    }
    print_detail(&loaded, true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("n", BrowseCommand::Next)]
    #[case("  next ", BrowseCommand::Next)]
    #[case("p", BrowseCommand::Previous)]
    #[case("r", BrowseCommand::Refresh)]
    #[case("x", BrowseCommand::Reset)]
    #[case("q", BrowseCommand::Quit)]
    #[case("?", BrowseCommand::Help)]
    #[case("/memory leak", BrowseCommand::Search("memory leak".into()))]
    #[case("/", BrowseCommand::Search(String::new()))]
    #[case("state closed", BrowseCommand::State(StateFilter::Closed))]
    #[case("s all", BrowseCommand::State(StateFilter::All))]
    #[case("42", BrowseCommand::Open(42))]
    #[case("#7", BrowseCommand::Open(7))]
    fn test_parse(#[case] line: &str, #[case] expected: BrowseCommand) {
        assert_eq!(parse(line), Ok(Some(expected)));
    }

    #[test]
    fn test_parse_blank_and_unknown() {
        assert_eq!(parse("   "), Ok(None));
        assert!(parse("frobnicate").is_err());
        assert!(parse("state merged").is_err());
        assert!(parse("state").is_err());
    }
}
