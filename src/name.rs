//! Case-insensitive domain names (RFC 1035 §3.1, RFC 6762 §16).
//!
//! Unlike `bramp-rustdns`'s `Message::add_question`/`write_qname`, which
//! store a domain purely as a `String`, names here additionally carry a
//! lowercased comparison key so equality and `is_subdomain_of` don't
//! re-derive it on every call. mDNS labels are carried as raw UTF-8 on
//! the wire (RFC 6762 §16), never Punycode/ACE, so unlike the teacher's
//! client-resolver path this crate has no use for `idna`.

use std::fmt;

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_LABEL_LEN: usize = 63;

/// A fully-qualified domain name, e.g. `appletv.local.`.
///
/// Construction never fails on oversize input; callers that read names off
/// the wire should validate length themselves (`io.rs` does, returning
/// `Error::MalformedMessage`). This type is for in-memory use once a name
/// is already known good.
#[derive(Clone, Debug, Eq)]
pub struct Name {
    /// Original-case labels, for Display/wire-writing.
    labels: Vec<String>,

    /// Lowercased labels, used for comparison only.
    key: Vec<String>,
}

impl Name {
    pub fn root() -> Name {
        Name {
            labels: Vec::new(),
            key: Vec::new(),
        }
    }

    /// Builds a `Name` from labels in presentation order (most specific
    /// first), e.g. `["appletv", "local"]`.
    pub fn from_labels<I, S>(labels: I) -> Name
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let key = labels.iter().map(|l| l.to_ascii_lowercase()).collect();
        Name { labels, key }
    }

    /// Parses a dotted presentation-format name, with or without a
    /// trailing dot.
    pub fn parse(s: &str) -> Name {
        let trimmed = s.trim_end_matches('.');
        if trimmed.is_empty() {
            return Name::root();
        }
        Name::from_labels(trimmed.split('.'))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// True if `self` is `other`, or a descendant of `other`
    /// (`appletv.local.is_subdomain_of("local")`).
    pub fn is_subdomain_of(&self, other: &Name) -> bool {
        if other.key.len() > self.key.len() {
            return false;
        }
        let offset = self.key.len() - other.key.len();
        self.key[offset..] == other.key[..]
    }

    /// Returns a new name with `label` prepended, e.g.
    /// `"local".parse().prepend("appletv")` -> `appletv.local`.
    pub fn prepend(&self, label: &str) -> Name {
        let mut labels = Vec::with_capacity(self.labels.len() + 1);
        labels.push(label.to_string());
        labels.extend(self.labels.iter().cloned());
        Name::from_labels(labels)
    }

    /// Returns a new name with `other`'s labels appended.
    pub fn join(&self, other: &Name) -> Name {
        let mut labels = self.labels.clone();
        labels.extend(other.labels.iter().cloned());
        Name::from_labels(labels)
    }

    /// Wire length in octets, including the length octets and the
    /// terminating zero label, ignoring compression.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }
        for label in &self.labels {
            write!(f, "{}.", label)?;
        }
        Ok(())
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Name {
        Name::parse(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Name {
        Name::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_trailing_dot() {
        assert_eq!(Name::parse("appletv.local"), Name::parse("appletv.local."));
    }

    #[test]
    fn equality_is_case_insensitive() {
        assert_eq!(Name::parse("AppleTV.Local"), Name::parse("appletv.local"));
    }

    #[test]
    fn is_subdomain_of_is_case_insensitive() {
        let child = Name::parse("AppleTV.local");
        let parent = Name::parse("LOCAL");
        assert!(child.is_subdomain_of(&parent));
        assert!(!parent.is_subdomain_of(&child));
    }

    #[test]
    fn root_is_subdomain_of_itself_only() {
        let root = Name::root();
        assert!(root.is_subdomain_of(&root));
        assert!(!Name::parse("local").is_subdomain_of(&Name::parse("com")));
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Name::parse("a.b.com").to_string(), "a.b.com.");
        assert_eq!(Name::root().to_string(), ".");
    }
}
