//! Code block extraction and routing.
//!
//! Splits a free-text model response into one block per logical language.
//! Blocks are found by a single linear scan over triple-backtick fences,
//! their tags are resolved through a fixed table, and each slot keeps the
//! first block that resolves to it.

mod extract;
mod scanner;

pub use extract::{extract, extract_for_editor, resolve_tag, route_to_editor};
pub use scanner::{FenceScanner, FencedSegment};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A destination for an extracted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeSlot {
    /// Explanatory pseudocode.
    #[serde(rename = "pseudoCode")]
    PseudoCode,
    #[serde(rename = "python")]
    Python,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "cpp")]
    Cpp,
    #[serde(rename = "javascript")]
    JavaScript,
    /// Block tagged with the editor's current language when that language has
    /// no fixed slot.
    #[serde(rename = "editor")]
    Editor,
}

impl CodeSlot {
    /// The five fixed slots, in the order they are presented.
    pub const FIXED: [Self; 5] =
        [Self::PseudoCode, Self::Python, Self::Java, Self::Cpp, Self::JavaScript];

    /// JSON key of the slot.
    pub const fn key(self) -> &'static str {
        match self {
            Self::PseudoCode => "pseudoCode",
            Self::Python => "python",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::JavaScript => "javascript",
            Self::Editor => "editor",
        }
    }

    /// Tag written on the opening fence when this slot is sent back to a model.
    pub const fn fence_tag(self) -> &'static str {
        match self {
            Self::PseudoCode => "pseudo",
            Self::Python => "python",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::JavaScript => "javascript",
            Self::Editor => "",
        }
    }
}

impl fmt::Display for CodeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CodeSlot {
    type Err = String;

    /// Accepts slot keys and any tag from the resolution table.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if normalized == "editor" {
            return Ok(Self::Editor);
        }
        resolve_tag(&normalized).ok_or_else(|| format!("Unknown code slot: {}", s))
    }
}

/// One model response split into per-language blocks.
///
/// An absent block is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeBlockResponse {
    pub pseudo_code: String,
    pub python: String,
    pub java: String,
    pub cpp: String,
    pub javascript: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub editor: String,
}

impl CodeBlockResponse {
    /// Returns the block held in `slot`.
    pub fn get(&self, slot: CodeSlot) -> &str {
        match slot {
            CodeSlot::PseudoCode => &self.pseudo_code,
            CodeSlot::Python => &self.python,
            CodeSlot::Java => &self.java,
            CodeSlot::Cpp => &self.cpp,
            CodeSlot::JavaScript => &self.javascript,
            CodeSlot::Editor => &self.editor,
        }
    }

    fn slot_mut(&mut self, slot: CodeSlot) -> &mut String {
        match slot {
            CodeSlot::PseudoCode => &mut self.pseudo_code,
            CodeSlot::Python => &mut self.python,
            CodeSlot::Java => &mut self.java,
            CodeSlot::Cpp => &mut self.cpp,
            CodeSlot::JavaScript => &mut self.javascript,
            CodeSlot::Editor => &mut self.editor,
        }
    }

    /// Stores the trimmed `body` in `slot` unless the slot already holds a block.
    ///
    /// Returns `true` when the slot was written.
    pub fn fill(&mut self, slot: CodeSlot, body: &str) -> bool {
        let target = self.slot_mut(slot);
        if !target.is_empty() {
            return false;
        }
        body.trim().clone_into(target);
        !target.is_empty()
    }

    /// Whether every slot is empty ("no code found").
    pub fn is_empty(&self) -> bool {
        CodeSlot::FIXED.iter().all(|slot| self.get(*slot).is_empty()) && self.editor.is_empty()
    }

    /// Non-empty fixed slots, in presentation order.
    pub fn filled_slots(&self) -> Vec<CodeSlot> {
        CodeSlot::FIXED.into_iter().filter(|slot| !self.get(*slot).is_empty()).collect()
    }

    /// Overwrites fixed slots with every non-empty fixed slot of `newer`.
    ///
    /// Returns the slots whose content changed.
    pub fn merge_non_empty(&mut self, newer: &Self) -> Vec<CodeSlot> {
        let mut changed = Vec::new();
        for slot in CodeSlot::FIXED {
            let incoming = newer.get(slot);
            if incoming.is_empty() {
                continue;
            }
            let target = self.slot_mut(slot);
            if target.as_str() != incoming {
                incoming.clone_into(target);
                changed.push(slot);
            }
        }
        changed
    }
}
