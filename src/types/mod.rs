mod comment;
mod connection;
mod issue;
mod label;
mod state;
mod user;

pub use comment::Comment;
pub use connection::{Connection, Count, Nodes, PageInfo};
pub use issue::{Issue, IssueDetail};
pub use label::{DetailLabel, Label};
pub use state::{IssueState, StateFilter};
pub use user::Author;
