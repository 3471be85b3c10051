//! Heading slugs and per-document anchor allocation.

use std::collections::HashSet;

/// Turn a heading title into a URL fragment.
///
/// Lowercases, keeps alphanumerics, maps whitespace, `-` and `_` to single
/// dashes, and drops everything else. Never returns an empty string.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Hands out anchors that are unique within one document.
#[derive(Debug, Default)]
pub struct AnchorSet {
    used: HashSet<String>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an anchor for `title`. The flag is `true` when the plain slug
    /// was already taken and a numeric suffix had to be added.
    pub fn allocate(&mut self, title: &str) -> (String, bool) {
        let base = slugify(title);
        if self.used.insert(base.clone()) {
            return (base, false);
        }

        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return (candidate, true);
            }
            n += 1;
        }
    }
}
