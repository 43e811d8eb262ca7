// panel/mod.rs
use tracing::info;

use crate::models::LightState;

/// Presentation seam. The panel always shows the reported state, never the
/// desired one.
pub trait Panel: Send + Sync {
    fn render(&self, reported: LightState);
    fn set_enabled(&self, enabled: bool);
}

/// Console rendition of the indicator and toggle button.
pub struct TerminalPanel;

impl Panel for TerminalPanel {
    fn render(&self, reported: LightState) {
        match reported {
            LightState::On => info!("Light is ON  [*], press enter to turn it off"),
            LightState::Off => info!("Light is OFF [ ], press enter to turn it on"),
        }
    }

    fn set_enabled(&self, enabled: bool) {
        if enabled {
            info!("Toggle enabled");
        } else {
            info!("Toggle disabled, waiting for device");
        }
    }
}
