use serde::{Deserialize, Serialize};

use crate::{RouterError, WindowHandle};

/// Input-method event coming from the host.
///
/// Wire form is JSON with a `type` tag, e.g.
/// `{"type":"commit","handle":7,"text":"hello"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImeMessage {
    Commit {
        handle: WindowHandle,
        text: String,
    },
    PreeditChanged {
        handle: WindowHandle,
        text: String,
        #[serde(default)]
        commit: String,
    },
    PreeditStart,
    PreeditEnd,
    DeleteRange {
        handle: WindowHandle,
        index: i32,
        length: u32,
    },
}

impl ImeMessage {
    pub fn from_json(s: &str) -> Result<Self, RouterError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String, RouterError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Target window, if the event carries one. Preedit start/end do not.
    pub fn handle(&self) -> Option<WindowHandle> {
        match self {
            Self::Commit { handle, .. }
            | Self::PreeditChanged { handle, .. }
            | Self::DeleteRange { handle, .. } => Some(*handle),
            Self::PreeditStart | Self::PreeditEnd => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Commit { .. } => "commit",
            Self::PreeditChanged { .. } => "preedit_changed",
            Self::PreeditStart => "preedit_start",
            Self::PreeditEnd => "preedit_end",
            Self::DeleteRange { .. } => "delete_range",
        }
    }
}

/// Message sent back to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Ask the host to drop any composition state for this window.
    ImeReset { handle: WindowHandle },
}
