// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input source naming.
//!
//! Line-dialect receivers (Telnet, RS-232) only report a numeric input code,
//! so names come from a user-configured [`SourceMap`]. TCP receivers select
//! sources by name directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Table from a receiver's numeric source code to a display name.
///
/// Codes are kept in ascending order. When two codes share a name, lookups
/// by name return the lowest code.
///
/// # Examples
///
/// ```
/// use nadav_lib::types::SourceMap;
///
/// let map: SourceMap = [(1, "CD"), (2, "Tuner")].into_iter().collect();
/// assert_eq!(map.code_for("Tuner"), Some(2));
/// assert_eq!(map.name_for(1), Some("CD"));
/// assert_eq!(map.names(), vec!["CD".to_string(), "Tuner".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceMap(BTreeMap<u8, String>);

impl SourceMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the name for `code`.
    pub fn insert(&mut self, code: u8, name: impl Into<String>) {
        self.0.insert(code, name.into());
    }

    /// Returns the name configured for `code`.
    #[must_use]
    pub fn name_for(&self, code: u8) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    /// Returns the first code (ascending) whose name equals `name`.
    #[must_use]
    pub fn code_for(&self, name: &str) -> Option<u8> {
        self.0
            .iter()
            .find_map(|(code, n)| (n == name).then_some(*code))
    }

    /// All names in code order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.values().cloned().collect()
    }

    /// Returns true if no sources are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of configured sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>> FromIterator<(u8, S)> for SourceMap {
    fn from_iter<I: IntoIterator<Item = (u8, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(c, n)| (c, n.into())).collect())
    }
}

/// How a source is addressed on the wire, resolved before any I/O.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceSelector {
    /// Select by display name (TCP dialect).
    Name(String),
    /// Select by numeric code (line dialect).
    Code(u8),
}
