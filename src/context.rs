// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Free-text urban context notes

use serde::{Deserialize, Serialize};

/// Accumulated context notes, typed or transcribed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextText(String);

impl ContextText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Replace the text (direct edit)
    pub fn set(&mut self, text: impl Into<String>) {
        self.0 = text.into();
    }

    /// Append a fragment, separated from existing text by one space
    pub fn append(&mut self, fragment: &str) {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        self.0.push_str(fragment);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// True when there is nothing worth sending
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for ContextText {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}
