//! Validated id and branch-name types, plus the slug sanitization rules
//! shared between filenames and branch names.

use std::fmt;

use rand::Rng;

/// A bean's globally-unique identity. Permanent once assigned; never renamed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BeanId(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdError {
    pub value: String,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid bean id: {:?}", self.value)
    }
}

impl std::error::Error for IdError {}

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

impl BeanId {
    /// Validate an id read from disk or supplied by a caller. Ids must be
    /// non-empty, ASCII, and contain no whitespace or path separators.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty()
            || !raw.is_ascii()
            || raw.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\')
        {
            return Err(IdError { value: raw });
        }
        Ok(BeanId(raw))
    }

    /// Generate a fresh id: `prefix` followed by `id_length` random
    /// lowercase-alphanumeric characters.
    #[must_use]
    pub fn generate(prefix: &str, id_length: usize) -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..id_length)
            .map(|_| {
                let idx = rng.random_range(0..ID_ALPHABET.len());
                ID_ALPHABET[idx] as char
            })
            .collect();
        BeanId(format!("{prefix}{suffix}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BeanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BeanId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sanitize a free-form slug for use in a filename or branch name:
/// lowercase, replace every character outside `[a-z0-9-]` with `-`, collapse
/// consecutive `-`, trim leading/trailing `-`, and cap the result at 50
/// characters without a trailing `-`.
#[must_use]
pub fn sanitize_slug(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut collapsed = String::with_capacity(lowered.len());
    let mut prev_dash = false;
    for c in lowered.chars() {
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if mapped == '-' {
            if prev_dash {
                continue;
            }
            prev_dash = true;
        } else {
            prev_dash = false;
        }
        collapsed.push(mapped);
    }
    let trimmed = collapsed.trim_matches('-');
    let capped: String = trimmed.chars().take(50).collect();
    capped.trim_end_matches('-').to_string()
}

/// `{id}[-{slug}].md`
#[must_use]
pub fn build_filename(id: &BeanId, slug: &str) -> String {
    if slug.is_empty() {
        format!("{id}.md")
    } else {
        format!("{id}-{slug}.md")
    }
}

/// Split a `.md` filename stem back into `(id, slug)`. `id_total_len` is the
/// configured prefix length plus `id_length` — the caller knows this from
/// `BeansConfig`, since the split point can't be recovered from the filename
/// alone once the slug itself contains hyphens.
#[must_use]
pub fn parse_filename_stem(stem: &str, id_total_len: usize) -> Option<(String, String)> {
    if stem.len() < id_total_len {
        return None;
    }
    let (id_part, rest) = stem.split_at(id_total_len);
    if rest.is_empty() {
        return Some((id_part.to_string(), String::new()));
    }
    let slug = rest.strip_prefix('-')?;
    Some((id_part.to_string(), slug.to_string()))
}

/// `{id}/{sanitize(slug)}` or just `{id}` when slug is empty.
#[must_use]
pub fn build_branch_name(id: &BeanId, slug: &str) -> String {
    let sanitized = sanitize_slug(slug);
    if sanitized.is_empty() {
        id.to_string()
    } else {
        format!("{id}/{sanitized}")
    }
}
