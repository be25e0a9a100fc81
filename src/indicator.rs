//! Layer indicator
//!
//! Turns the [`Output::Layers`](crate::Output::Layers) notifications into a
//! color for the indicator LEDs.  The LED drivers themselves live with the
//! board.

use smart_leds::RGB8;

use crate::layers::{LayerState, MAX_LAYERS};
use crate::settings::IndicatorSettings;

pub struct LayerIndicator {
    colors: [RGB8; MAX_LAYERS],
    enabled: bool,
    brightness: u8,
}

impl LayerIndicator {
    /// Colors are given per layer, layers past the end of `colors` are dark.
    pub fn new(colors: &[RGB8], settings: &IndicatorSettings) -> LayerIndicator {
        let mut table = [RGB8::default(); MAX_LAYERS];
        for (slot, color) in table.iter_mut().zip(colors) {
            *slot = *color;
        }
        LayerIndicator {
            colors: table,
            enabled: settings.layer_change,
            brightness: settings.brightness,
        }
    }

    /// The color to show for these layers, or `None` if the indicator is
    /// turned off and the LEDs should be left to whatever else drives them.
    pub fn color(&self, layers: &LayerState) -> Option<RGB8> {
        if !self.enabled {
            return None;
        }
        let base = self.colors[layers.highest() as usize % MAX_LAYERS];
        Some(RGB8 {
            r: scale(base.r, self.brightness),
            g: scale(base.g, self.brightness),
            b: scale(base.b, self.brightness),
        })
    }
}

fn scale(value: u8, brightness: u8) -> u8 {
    ((value as u16 * brightness as u16) / 255) as u8
}
