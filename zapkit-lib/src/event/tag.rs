//! Event tags.

use serde::{Deserialize, Serialize};

/// A single tag: a key followed by zero or more values, e.g. `["p", <pubkey>]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub Vec<String>);

impl Tag {
    /// Create a tag from a key and its values.
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = vec![key.into()];
        parts.extend(values.into_iter().map(Into::into));
        Self(parts)
    }

    /// Tag key (first element). Empty tags have no key.
    pub fn key(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// First value after the key.
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    /// All values after the key.
    pub fn values(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }
}

/// Ordered tag list. Keys may repeat; order is significant for event ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
    /// Empty tag list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag.
    pub fn push(&mut self, tag: Tag) {
        self.0.push(tag);
    }

    /// The first tag whose key is `key`, or `None`.
    ///
    /// This is the only lookup rule: later tags with the same key are ignored.
    pub fn first(&self, key: &str) -> Option<&Tag> {
        self.0.iter().find(|t| t.key() == Some(key))
    }

    /// First value of the first tag with `key`.
    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.first(key).and_then(Tag::value)
    }

    /// Iterate over tags in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags as a slice.
    pub fn as_slice(&self) -> &[Tag] {
        &self.0
    }
}

impl From<Vec<Tag>> for Tags {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
