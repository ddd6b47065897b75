//! The gate runtime.
//!
//! One session task owns the dialing state machine; the keyboard pump
//! and the subspace listener only produce events into a single channel,
//! so every transition happens in strict arrival order. Effects come
//! back out of the session as data and are interpreted here: lights
//! and cues go to the hardware stub, subspace traffic goes through the
//! client, and shutdown trips the cancellation token.

use std::collections::VecDeque;
use std::io::Write as _;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use sg_core::{
    AddressBook, DialAddress, DialInput, DialingSession, Direction, Effect, SessionEvent,
    SubspaceMessage, WormholeState, classify,
};

use crate::hardware::ConsoleHardware;
use crate::subspace::SubspaceClient;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct GateOptions {
    pub bind: String,
    pub port: u16,
    pub timeout: Duration,
    pub with_keyboard: bool,
}

/// Owns the session and interprets its effects. Only `run` mutates
/// session state, and only in event-arrival order.
struct GateRuntime {
    session: DialingSession,
    client: SubspaceClient,
    hardware: ConsoleHardware,
    state_tx: watch::Sender<WormholeState>,
    cancel: CancellationToken,
    /// Reachability of the dialed peer, recorded at establishment time.
    peer_online: bool,
}

impl GateRuntime {
    fn new(
        book: AddressBook,
        client: SubspaceClient,
        cancel: CancellationToken,
    ) -> (Self, watch::Receiver<WormholeState>) {
        let (state_tx, state_rx) = watch::channel(WormholeState::Idle);
        (
            Self {
                session: DialingSession::new(book),
                client,
                hardware: ConsoleHardware::new(),
                state_tx,
                cancel,
                peer_online: false,
            },
            state_rx,
        )
    }

    async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.dispatch(event).await;
        }
    }

    /// Apply one event plus any follow-up events its effects produce,
    /// before touching the next external event.
    async fn dispatch(&mut self, event: SessionEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let effects = self.session.apply(event);
            let _ = self.state_tx.send(self.session.state());
            for effect in effects {
                if let Some(follow_up) = self.perform(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn perform(&mut self, effect: Effect) -> Option<SessionEvent> {
        match effect {
            Effect::LightSymbol(symbol) => self.hardware.set_symbol_on(symbol),
            Effect::LightCentre => self.hardware.set_centre_on(),
            Effect::ClearLights => self.hardware.clear(),
            Effect::PlayCue(context) => self.hardware.play_cue(context),
            Effect::CloseWormhole => self.hardware.close_wormhole(),
            Effect::RequestShutdown => {
                tracing::info!("abort requested: closing any active wormhole, stopping the gate");
                self.cancel.cancel();
            }
            Effect::AddressCommitted(address) => {
                return Some(self.establish_outgoing(&address).await);
            }
            Effect::NotifyCentreButton(ip) => {
                if self.peer_online {
                    self.client
                        .send(ip, &SubspaceMessage::CentreButtonIncoming)
                        .await;
                } else {
                    tracing::debug!("peer {ip} offline, skipping centre-button notice");
                }
            }
        }
        None
    }

    /// Establish the committed destination. Known peers get the dialed
    /// address over subspace first; the local wormhole opens either
    /// way, and delivery failure never rolls the dial back.
    async fn establish_outgoing(&mut self, address: &DialAddress) -> SessionEvent {
        self.peer_online = false;
        match self.session.book().resolve_peer(address) {
            Some(ip) => {
                let name = self.session.book().resolve_name(ip).to_string();
                if self.client.query_status(ip).await {
                    tracing::warn!("{name} ({ip}) is busy or unreachable, dialing without subspace");
                } else {
                    let delivery = self
                        .client
                        .send(ip, &SubspaceMessage::Dial(address.clone()))
                        .await;
                    self.peer_online = delivery.delivered;
                    if delivery.delivered {
                        tracing::info!("notified {name} ({ip}) of the incoming wormhole");
                    }
                }
            }
            None => tracing::info!("unable to get an ip for {address}, dialing locally"),
        }
        SessionEvent::WormholeOpened(Direction::Outgoing)
    }
}

/// Blocking crossterm poll loop on its own thread-backed task.
///
/// Crossterm hands keys over with modifiers already resolved, so this
/// pump is the single owner of the shift state the raw hardware path
/// used to share across callbacks.
fn spawn_key_pump(
    events: mpsc::Sender<SessionEvent>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match event::poll(KEY_POLL_INTERVAL) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::warn!("keyboard poll failed: {e}");
                    return;
                }
            }
            let key = match event::read() {
                Ok(ev) => key_char(&ev),
                Err(e) => {
                    tracing::warn!("keyboard read failed: {e}");
                    return;
                }
            };
            let Some(key) = key else { continue };
            let input = classify(key);
            if input == DialInput::Unrecognized {
                tracing::debug!("key {key:?} maps to no glyph");
            }
            if events.blocking_send(SessionEvent::Input(input)).is_err() {
                return;
            }
        }
    })
}

/// Extract the raw identifier from a key press. Ctrl-C arrives as the
/// break character the codec reserves for abort.
fn key_char(ev: &Event) -> Option<char> {
    let Event::Key(KeyEvent {
        code,
        modifiers,
        kind,
        ..
    }) = ev
    else {
        return None;
    };
    if *kind != KeyEventKind::Press {
        return None;
    }
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some('\x03'),
        KeyCode::Char(c) => Some(*c),
        _ => None,
    }
}

/// Run the gate until an abort or Ctrl-C. With a keyboard this is the
/// full dialer; without one it is a receive-only gate answering peers.
pub async fn run_gate(book: AddressBook, opts: GateOptions) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let client = SubspaceClient::new(opts.port, opts.timeout);
    let (runtime, state_rx) = GateRuntime::new(book.clone(), client, cancel.clone());

    let (listener, local) = crate::listener::SubspaceListener::bind(
        &opts.bind,
        opts.port,
        events_tx.clone(),
        state_rx,
        book,
        opts.timeout,
    )
    .await?;

    let mut out = std::io::stdout();
    writeln!(out, "subspace listener on {local}")?;
    out.flush()?;

    let listener_task = tokio::spawn(listener.run(cancel.clone()));

    // Ctrl-C outside raw mode (and any signal while serving) funnels
    // through the same abort path as the '-' key.
    let signal_events = events_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_events
                .send(SessionEvent::Input(DialInput::Abort))
                .await;
        }
    });

    let key_task = if opts.with_keyboard {
        println!("listening for input from the dialer; abort with the '-' key");
        enable_raw_mode()?;
        Some(spawn_key_pump(events_tx.clone(), cancel.clone()))
    } else {
        None
    };

    runtime.run(events_rx).await;

    cancel.cancel();
    let _ = listener_task.await;
    if let Some(task) = key_task {
        let _ = task.await;
        disable_raw_mode()?;
    }
    Ok(())
}
