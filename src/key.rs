//! Structured cache keys.

use std::fmt;

/// One element of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    Absent,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Absent => write!(f, "-"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Ordered tuple identifying a cacheable request.
///
/// Two requests with equal keys are interchangeable for caching and
/// de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part, builder style.
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, "]")
    }
}

/// Key factory for every request the application caches.
pub mod keys {
    use super::QueryKey;
    use crate::types::StateFilter;

    pub fn root() -> QueryKey {
        QueryKey::new().with("github")
    }

    pub fn repository(owner: &str, name: &str) -> QueryKey {
        root().with("repository").with(owner).with(name)
    }

    /// One page of the issue list. The cursor is part of the key so every
    /// page is cached on its own.
    pub fn issues(
        owner: &str,
        name: &str,
        state: StateFilter,
        search_term: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> QueryKey {
        repository(owner, name)
            .with("issues")
            .with(state.as_str())
            .with(search_term)
            .with(cursor.unwrap_or("initial"))
            .with(page_size)
    }

    pub fn issue(owner: &str, name: &str, number: u64) -> QueryKey {
        repository(owner, name).with("issue").with(number)
    }

    pub fn issue_detail(owner: &str, name: &str, number: u64) -> QueryKey {
        issue(owner, name, number).with("detail")
    }

    /// Accumulated comment pages for one issue; the cursor is deliberately
    /// left out so pages merge into one entry.
    pub fn issue_comments(owner: &str, name: &str, number: u64) -> QueryKey {
        issue(owner, name, number).with("comments")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateFilter;

    #[test]
    fn test_cursor_distinguishes_pages() {
        let first = keys::issues("o", "r", StateFilter::Open, "", None, 20);
        let second = keys::issues("o", "r", StateFilter::Open, "", Some("Y3Vy"), 20);
        assert_ne!(first, second);
        assert_eq!(
            first,
            keys::issues("o", "r", StateFilter::Open, "", None, 20)
        );
    }

    #[test]
    fn test_prefix_matching() {
        let page = keys::issues("o", "r", StateFilter::All, "crash", None, 20);
        assert!(page.starts_with(&keys::root()));
        assert!(page.starts_with(&keys::repository("o", "r")));
        assert!(!page.starts_with(&keys::repository("o", "other")));
        assert!(!keys::root().starts_with(&page));
    }

    #[test]
    fn test_display() {
        let key = keys::issue_detail("o", "r", 7);
        assert_eq!(key.to_string(), "[github, repository, o, r, issue, 7, detail]");
        assert_eq!(QueryKey::new().with(None::<&str>).to_string(), "[-]");
    }
}
