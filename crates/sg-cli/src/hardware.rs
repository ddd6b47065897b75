//! Console stand-ins for the actuation collaborators: dialer lights,
//! the centre indicator, and the audio clips. Every call is fire and
//! forget; the real hardware sits behind the same shape of interface
//! and returns nothing either.

use rand::Rng;

use sg_core::{CueContext, Symbol};

const DIALER_CLIPS: [&str; 3] = ["dhd_press_1", "dhd_press_2", "dhd_press_3"];
const OPEN_CLIPS: [&str; 2] = ["wormhole_open_1", "wormhole_open_2"];
const CLOSE_CLIPS: [&str; 1] = ["wormhole_close"];

/// Tracks which lights are on so the console mirror stays honest about
/// what a physical dialer would show.
#[derive(Debug, Default)]
pub struct ConsoleHardware {
    lit: Vec<Symbol>,
    centre_lit: bool,
}

impl ConsoleHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_symbol_on(&mut self, symbol: Symbol) {
        if !self.lit.contains(&symbol) {
            self.lit.push(symbol);
        }
        tracing::info!("glyph {symbol} lit ({} of the address)", self.lit.len());
    }

    pub fn set_centre_on(&mut self) {
        self.centre_lit = true;
        tracing::info!("centre indicator lit");
    }

    pub fn clear(&mut self) {
        self.lit.clear();
        self.centre_lit = false;
        tracing::info!("dialer lights released");
    }

    pub fn close_wormhole(&mut self) {
        tracing::info!("wormhole torn down");
    }

    pub fn play_cue(&mut self, context: CueContext) {
        let clips: &[&str] = match context {
            CueContext::DialerKey => &DIALER_CLIPS,
            CueContext::WormholeOpen => &OPEN_CLIPS,
            CueContext::WormholeClose => &CLOSE_CLIPS,
        };
        // The physical gate shuffles its clip bank per press.
        let clip = clips[rand::rng().random_range(0..clips.len())];
        tracing::debug!("playing clip {clip}");
    }
}
