//! The dialing state machine.
//!
//! Owns the address buffer and wormhole state exclusively. Everything
//! the machine cannot do alone (lights, audio, subspace traffic,
//! process shutdown) comes back to the caller as [`Effect`]s, so the
//! session itself stays free of hardware and network concerns.

use std::net::IpAddr;

use crate::address::DialAddress;
use crate::book::AddressBook;
use crate::codec::DialInput;
use crate::constants::{BLACK_HOLE, STATUS_IDLE};
use crate::symbol::Symbol;

/// Connection state of the gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WormholeState {
    /// No buffer activity committed.
    #[default]
    Idle,
    /// Destination committed, peer not yet confirmed. The centre
    /// indicator is lit but no wormhole is open.
    CentreButtonPressed,
    /// A wormhole this gate initiated.
    Outgoing,
    /// A wormhole a remote gate initiated.
    Incoming,
}

impl WormholeState {
    /// True while a wormhole is open in either direction.
    pub fn is_active(self) -> bool {
        matches!(self, WormholeState::Outgoing | WormholeState::Incoming)
    }

    /// The token this state answers a status query with.
    pub fn status_token(self) -> &'static str {
        match self {
            WormholeState::Outgoing => "outgoing",
            WormholeState::Incoming => "incoming",
            WormholeState::Idle | WormholeState::CentreButtonPressed => STATUS_IDLE,
        }
    }
}

/// Which side initiated a wormhole.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// External inputs to the state machine. Processed strictly in arrival
/// order by a single owner; there is no queue beyond the one address
/// buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Input(DialInput),
    WormholeOpened(Direction),
    WormholeClosed,
}

/// Audio cue contexts for the actuation collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CueContext {
    DialerKey,
    WormholeOpen,
    WormholeClose,
}

/// Side effects a transition asks the surrounding runtime to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    LightSymbol(Symbol),
    LightCentre,
    ClearLights,
    PlayCue(CueContext),
    /// A destination was committed; the runtime establishes the
    /// wormhole and reports back with [`SessionEvent::WormholeOpened`].
    AddressCommitted(DialAddress),
    /// Tell this peer our centre button interrupted the connection.
    NotifyCentreButton(IpAddr),
    /// Tear down any open wormhole indication.
    CloseWormhole,
    /// Operator abort: stop the whole gate process.
    RequestShutdown,
}

/// The dialing session. [`DialingSession::apply`] is the only mutation
/// path; disallowed events are silently ignored, except abort, which is
/// always accepted.
#[derive(Debug)]
pub struct DialingSession {
    buffer: DialAddress,
    state: WormholeState,
    book: AddressBook,
}

impl DialingSession {
    /// Start a session over a fresh address-book snapshot.
    pub fn new(book: AddressBook) -> Self {
        Self {
            buffer: DialAddress::new(),
            state: WormholeState::Idle,
            book,
        }
    }

    pub fn state(&self) -> WormholeState {
        self.state
    }

    pub fn buffer(&self) -> &DialAddress {
        &self.buffer
    }

    pub fn book(&self) -> &AddressBook {
        &self.book
    }

    /// Whether the buffered destination is the reserved permanent
    /// connection, which the cancel gesture does not close.
    pub fn dialed_black_hole(&self) -> bool {
        self.buffer.symbols().len() == BLACK_HOLE.len()
            && self
                .buffer
                .symbols()
                .iter()
                .zip(BLACK_HOLE)
                .all(|(symbol, number)| symbol.number() == number)
    }

    /// Process one event, returning the effects the runtime should
    /// perform, in order.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::Input(DialInput::Abort) => self.abort(),
            SessionEvent::Input(DialInput::Symbol(symbol)) => self.symbol_entered(symbol),
            SessionEvent::Input(DialInput::CentreButton) => self.centre_button(),
            SessionEvent::Input(DialInput::Unrecognized) => Vec::new(),
            SessionEvent::WormholeOpened(direction) => self.wormhole_opened(direction),
            SessionEvent::WormholeClosed => self.wormhole_closed(),
        }
    }

    fn abort(&mut self) -> Vec<Effect> {
        self.buffer.clear();
        self.state = WormholeState::Idle;
        vec![
            Effect::ClearLights,
            Effect::CloseWormhole,
            Effect::RequestShutdown,
        ]
    }

    fn symbol_entered(&mut self, symbol: Symbol) -> Vec<Effect> {
        // Every dialer press clicks, whether or not the glyph lands.
        let mut effects = vec![Effect::PlayCue(CueContext::DialerKey)];
        if self.state != WormholeState::Idle || self.buffer.contains(symbol) {
            return effects;
        }
        self.buffer.push(symbol);
        effects.push(Effect::LightSymbol(symbol));
        effects
    }

    fn centre_button(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::PlayCue(CueContext::DialerKey)];
        if self.state == WormholeState::Idle && !self.buffer.is_empty() {
            self.state = WormholeState::CentreButtonPressed;
            effects.push(Effect::LightCentre);
            effects.push(Effect::AddressCommitted(self.buffer.clone()));
        } else if self.state == WormholeState::Outgoing {
            // Cancel gesture on an active outgoing wormhole.
            if let Some(ip) = self.book.resolve_peer(&self.buffer) {
                effects.push(Effect::NotifyCentreButton(ip));
            }
            if !self.dialed_black_hole() {
                self.buffer.clear();
                self.state = WormholeState::Idle;
                effects.push(Effect::CloseWormhole);
                effects.push(Effect::ClearLights);
            }
        }
        // Empty buffer while idle, incoming wormholes, and repeated
        // presses after a commit are all no-ops.
        effects
    }

    fn wormhole_opened(&mut self, direction: Direction) -> Vec<Effect> {
        if self.state.is_active() {
            return Vec::new();
        }
        self.state = match direction {
            Direction::Outgoing if self.state == WormholeState::CentreButtonPressed => {
                WormholeState::Outgoing
            }
            Direction::Incoming if self.state == WormholeState::Idle => WormholeState::Incoming,
            _ => return Vec::new(),
        };
        vec![Effect::PlayCue(CueContext::WormholeOpen)]
    }

    fn wormhole_closed(&mut self) -> Vec<Effect> {
        if self.state == WormholeState::Idle {
            return Vec::new();
        }
        self.buffer.clear();
        self.state = WormholeState::Idle;
        vec![
            Effect::PlayCue(CueContext::WormholeClose),
            Effect::CloseWormhole,
            Effect::ClearLights,
        ]
    }
}
