use log::Level;
use serde::{Deserialize, Serialize};

use crate::RouterError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Level used when an event arrives for a window with no live context.
    pub missing_context_level: Level,
    /// Forget the focused window when the host channel goes away.
    pub clear_focus_on_channel_loss: bool,
    /// Send `ImeReset` for a window when its context is unregistered.
    pub reset_on_unregister: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            missing_context_level: Level::Info,
            clear_focus_on_channel_loss: true,
            reset_on_unregister: false,
        }
    }
}

impl RouterConfig {
    pub fn from_json_str(s: &str) -> Result<Self, RouterError> {
        Ok(serde_json::from_str(s)?)
    }
}
