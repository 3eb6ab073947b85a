use tabled::Tabled;

use super::{check_error, Context};
use crate::cli::{IssueListArgs, IssueViewArgs};
use crate::detail::IssueDetailView;
use crate::error::{GhiError, Result};
use crate::output::{self, format_date, format_relative, labels_colored, truncate};
use crate::search::IssueListView;
use crate::types::{Comment, Issue, IssueDetail};

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "#")]
    number: u64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Comments")]
    comments: u64,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Issue> for IssueRow {
    fn from(issue: &Issue) -> Self {
        Self {
            number: issue.number,
            title: truncate(&issue.title, 50),
            state: issue.state.colored(),
            author: issue
                .author
                .as_ref()
                .map(|a| a.login.clone())
                .unwrap_or_else(|| "ghost".to_string()),
            labels: labels_colored(issue.labels.nodes.iter().map(|l| (&l.name[..], &l.color[..]))),
            comments: issue.comments.map_or(0, |c| c.total_count),
            updated: format_relative(&issue.updated_at),
        }
    }
}

#[derive(Tabled)]
pub(crate) struct CommentRow {
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Comment")]
    body: String,
    #[tabled(rename = "When")]
    created_at: String,
}

impl From<&Comment> for CommentRow {
    fn from(comment: &Comment) -> Self {
        Self {
            author: comment
                .author
                .as_ref()
                .map(|a| a.login.clone())
                .unwrap_or_else(|| "ghost".to_string()),
            body: truncate(&comment.body.replace('\n', " "), 60),
            created_at: format_relative(&comment.created_at),
        }
    }
}

pub async fn list(ctx: &Context, args: IssueListArgs) -> Result<()> {
    let mut search = ctx.issue_search(ctx.listing_filters(args.limit));
    search.set_state_filter(args.state);
    if let Some(term) = args.search {
        search.set_search_term(term);
    }

    let mut view = search.load().await;
    for page in 2..=args.page {
        check_error(view.error.as_ref(), !view.items.is_empty())?;
        if !search.load_next_page() {
            return Err(GhiError::InvalidInput(format!(
                "page {page} does not exist (last page is {})",
                page - 1
            )));
        }
        view = search.load().await;
    }

    print_list(&view)
}

/// Render one page of issues followed by a pagination footer.
pub fn print_list(view: &IssueListView) -> Result<()> {
    check_error(view.error.as_ref(), !view.items.is_empty())?;

    if view.items.is_empty() {
        let scope = if view.search_term.trim().is_empty() {
            format!("No {} issues", view.state)
        } else {
            format!("No {} issues matching '{}'", view.state, view.search_term.trim())
        };
        output::print_message(&scope);
        return Ok(());
    }

    output::print_table(&view.items, |i| IssueRow::from(i));
    output::print_message(&page_footer(view));
    Ok(())
}

fn page_footer(view: &IssueListView) -> String {
    let mut footer = format!(
        "Page {} · {} issue{} on this page · {} total",
        view.page_number,
        view.items.len(),
        if view.items.len() == 1 { "" } else { "s" },
        view.total_count
    );
    if view.has_next_page {
        footer.push_str(" · more available");
    }
    footer
}

pub async fn view(ctx: &Context, args: IssueViewArgs) -> Result<()> {
    let query = ctx.issue_detail(args.number);

    let early = query.view();
    if early.is_showing_cached_data && !output::is_json_output() {
        print_detail(&early, false);
    }

    let loaded = query.load().await;
    let issue = loaded.issue.is_some();
    check_error(loaded.error.as_ref(), issue)?;
    if !issue {
        return Err(GhiError::IssueNotFound(args.number));
    }
    print_detail(&loaded, args.comments);
    Ok(())
}

/// Print an issue. A placeholder built from a cached summary is marked as
/// such and never lists comments. JSON output already carries the comments.
pub fn print_detail(view: &IssueDetailView, with_comments: bool) {
    let Some(issue) = &view.issue else {
        return;
    };

    output::print_item(issue, |issue| print_issue_body(issue, view));

    if with_comments && !view.is_showing_cached_data && !output::is_json_output() {
        if view.comments.is_empty() {
            output::print_message("No comments");
        } else {
            output::print_table(&view.comments, |c| CommentRow::from(c));
            if view.comments_page_info.has_next_page {
                output::print_message(&format!(
                    "Showing {} of {} comments. Use 'ghi issue comments {} --all' for the rest.",
                    view.comments.len(),
                    view.comments_total,
                    issue.number
                ));
            }
        }
    }
}

fn print_issue_body(issue: &IssueDetail, view: &IssueDetailView) {
    println!("#{} {}", issue.number, issue.title);
    if view.is_showing_cached_data {
        println!("(cached summary, loading full issue...)");
    }
    println!();

    println!("State:     {}", issue.state.colored());
    println!(
        "Author:    {}",
        issue.author.as_ref().map_or("ghost", |a| &a.login[..])
    );
    println!("Created:   {}", format_date(&issue.created_at));
    println!("Updated:   {}", format_relative(&issue.updated_at));
    if let Some(closed) = &issue.closed_at {
        println!("Closed:    {}", format_date(closed));
    }
    if !issue.labels.nodes.is_empty() {
        let labels = labels_colored(issue.labels.nodes.iter().map(|l| (&l.name[..], &l.color[..])));
        println!("Labels:    {labels}");
    }
    if !issue.assignees.nodes.is_empty() {
        let logins: Vec<&str> = issue.assignees.nodes.iter().map(|a| &a.login[..]).collect();
        println!("Assignees: {}", logins.join(", "));
    }
    println!("Comments:  {}", view.comments_total);
    if !view.is_showing_cached_data {
        println!("Reactions: {}", issue.reactions.total_count);
    }

    if let Some(body) = issue.body.as_deref().filter(|b| !b.trim().is_empty()) {
        println!();
        println!("{body}");
    }
    println!();
}
