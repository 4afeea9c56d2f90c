use std::borrow::Borrow;
use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// A port, parameter or object name.
///
/// Names follow the RTLIL convention: user-visible names may be written with
/// a leading `\` which is stripped on construction, generated names start
/// with `$` and keep it.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct IdString(Arc<str>);

impl IdString {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name.strip_prefix('\\').unwrap_or(name)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generated (`$`-prefixed) names are not public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        !self.0.starts_with('$')
    }
}

impl Display for IdString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_public() {
            write!(f, "\\{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Deref for IdString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for IdString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IdString {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl PartialEq<str> for IdString {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for IdString {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for IdString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
