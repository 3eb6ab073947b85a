use super::issues::CommentRow;
use super::{check_error, Context};
use crate::cli::CommentsArgs;
use crate::error::Result;
use crate::output;

pub async fn list(ctx: &Context, args: CommentsArgs) -> Result<()> {
    let feed = ctx.comment_feed(args.number, args.limit);

    let mut view = feed.load().await;
    check_error(view.error.as_ref(), !view.comments.is_empty())?;

    if args.all {
        while view.has_more {
            let before = view.comments.len();
            view = feed.load_more().await;
            check_error(view.error.as_ref(), !view.comments.is_empty())?;
            if view.comments.len() == before {
                break;
            }
        }
    }

    if view.comments.is_empty() {
        output::print_message(&format!("No comments on #{}", args.number));
        return Ok(());
    }

    output::print_table(&view.comments, |c| CommentRow::from(c));

    if view.has_more {
        output::print_message(&format!(
            "Showing {} of {} comments. Pass --all to load the rest.",
            view.comments.len(),
            view.total_count
        ));
    }

    Ok(())
}
