//! Scenario tests exercising the full engine: key classification →
//! session transitions → resolver and wire layers, across module
//! boundaries.

use proptest::prelude::*;
use sg_core::{
    AddressBook, BLACK_HOLE, DialAddress, DialInput, DialingSession, Direction, Effect, GateEntry,
    SessionEvent, Symbol, SubspaceMessage, WormholeState, classify, decode_header, encode_header,
};

fn symbol(number: u8) -> Symbol {
    Symbol::new(number).unwrap()
}

fn type_keys(session: &mut DialingSession, keys: &str) -> Vec<Effect> {
    let mut effects = Vec::new();
    for key in keys.chars() {
        effects.extend(session.apply(SessionEvent::Input(classify(key))));
    }
    effects
}

fn fan_gate_book() -> AddressBook {
    AddressBook::new(vec![GateEntry {
        name: "P1".to_string(),
        address: DialAddress::from_numbers(&[7, 32]).unwrap(),
        ip: "10.0.0.5".parse().unwrap(),
    }])
}

/// Keys '5', '9', 'R' dial glyphs 7, 32, 27; the buffer mirrors the
/// typed order exactly.
#[test]
fn keyed_dial_sequence_matches_buffer() {
    let mut session = DialingSession::new(AddressBook::default());
    type_keys(&mut session, "59R");

    let numbers: Vec<u8> = session.buffer().symbols().iter().map(|s| s.number()).collect();
    assert_eq!(numbers, vec![7, 32, 27]);
    assert_eq!(session.state(), WormholeState::Idle);
}

/// Unknown keys pass through the whole stack without touching anything.
#[test]
fn unknown_keys_change_nothing() {
    let mut session = DialingSession::new(AddressBook::default());
    type_keys(&mut session, "5*?!9");

    let numbers: Vec<u8> = session.buffer().symbols().iter().map(|s| s.number()).collect();
    assert_eq!(numbers, vec![7, 32]);
}

/// Full outgoing lifecycle: dial, commit, establish, cancel.
#[test]
fn outgoing_wormhole_lifecycle() {
    let mut session = DialingSession::new(fan_gate_book());

    let effects = type_keys(&mut session, "59RA");
    assert_eq!(session.state(), WormholeState::CentreButtonPressed);
    let committed = effects.iter().find_map(|e| match e {
        Effect::AddressCommitted(address) => Some(address.clone()),
        _ => None,
    });
    assert_eq!(committed.unwrap().to_string(), "[7, 32, 27]");

    // The runtime reports the wormhole open.
    session.apply(SessionEvent::WormholeOpened(Direction::Outgoing));
    assert_eq!(session.state(), WormholeState::Outgoing);
    assert_eq!(session.state().status_token(), "outgoing");

    // Centre button again is the cancel gesture: the fan gate gets
    // notified, then everything resets.
    let effects = type_keys(&mut session, "A");
    assert!(effects.contains(&Effect::NotifyCentreButton("10.0.0.5".parse().unwrap())));
    assert_eq!(session.state(), WormholeState::Idle);
    assert!(session.buffer().is_empty());
}

/// Incoming wormholes block dialing until the peer hangs up.
#[test]
fn incoming_wormhole_blocks_dialing() {
    let mut session = DialingSession::new(AddressBook::default());
    session.apply(SessionEvent::WormholeOpened(Direction::Incoming));
    assert_eq!(session.state().status_token(), "incoming");

    type_keys(&mut session, "59R");
    assert!(session.buffer().is_empty());

    // Centre button during an incoming wormhole is a no-op too.
    type_keys(&mut session, "A");
    assert_eq!(session.state(), WormholeState::Incoming);

    session.apply(SessionEvent::WormholeClosed);
    assert_eq!(session.state(), WormholeState::Idle);
    type_keys(&mut session, "5");
    assert_eq!(session.buffer().len(), 1);
}

/// A black-hole dial survives the cancel gesture but not an abort.
#[test]
fn black_hole_survives_cancel_but_not_abort() {
    let mut session = DialingSession::new(AddressBook::default());
    for number in BLACK_HOLE {
        session.apply(SessionEvent::Input(DialInput::Symbol(symbol(number))));
    }
    type_keys(&mut session, "A");
    session.apply(SessionEvent::WormholeOpened(Direction::Outgoing));

    type_keys(&mut session, "A");
    assert_eq!(session.state(), WormholeState::Outgoing);

    type_keys(&mut session, "-");
    assert_eq!(session.state(), WormholeState::Idle);
    assert!(session.buffer().is_empty());
}

/// A two-glyph prefix hit resolves to the peer's network address;
/// anything else misses without erroring.
#[test]
fn resolver_prefix_contract() {
    let book = fan_gate_book();
    let hit = DialAddress::from_numbers(&[7, 32, 27]).unwrap();
    let miss = DialAddress::from_numbers(&[1, 2, 3]).unwrap();
    assert_eq!(book.resolve_peer(&hit), Some("10.0.0.5".parse().unwrap()));
    assert_eq!(book.resolve_peer(&miss), None);
    assert_eq!(book.resolve_name("10.0.0.5".parse().unwrap()), "P1");
    assert_eq!(book.resolve_name("10.9.9.9".parse().unwrap()), "Unknown");
}

/// Encoding a committed address and decoding the frame reconstructs the
/// payload bytes exactly.
#[test]
fn committed_address_round_trips_the_wire() {
    let address = DialAddress::from_numbers(&[7, 32]).unwrap();
    let payload = SubspaceMessage::Dial(address).render();
    assert_eq!(payload, "[7, 32]");

    let header = encode_header(payload.len()).unwrap();
    assert_eq!(&header, b"7       ");

    let len = decode_header(&header).unwrap();
    let reconstructed = &payload.as_bytes()[..len];
    assert_eq!(
        SubspaceMessage::parse(std::str::from_utf8(reconstructed).unwrap()),
        Some(SubspaceMessage::Dial(
            DialAddress::from_numbers(&[7, 32]).unwrap()
        ))
    );
}

proptest! {
    /// Any duplicate-free entry sequence lands in the buffer in order;
    /// duplicates vanish without reordering what came before.
    #[test]
    fn entry_order_preserved(numbers in prop::collection::vec(1u8..=39, 0..12)) {
        let mut session = DialingSession::new(AddressBook::default());
        let mut expected: Vec<Symbol> = Vec::new();
        for number in numbers {
            let sym = Symbol::new(number).unwrap();
            session.apply(SessionEvent::Input(DialInput::Symbol(sym)));
            if !expected.contains(&sym) {
                expected.push(sym);
            }
        }
        prop_assert_eq!(session.buffer().symbols(), expected.as_slice());
    }

    /// Abort lands on idle + empty from every reachable state.
    #[test]
    fn abort_always_resets(
        numbers in prop::collection::vec(1u8..=39, 0..8),
        press_centre in any::<bool>(),
        open in prop::option::of(any::<bool>()),
    ) {
        let mut session = DialingSession::new(fan_gate_book());
        for number in numbers {
            session.apply(SessionEvent::Input(DialInput::Symbol(Symbol::new(number).unwrap())));
        }
        if press_centre {
            session.apply(SessionEvent::Input(DialInput::CentreButton));
        }
        match open {
            Some(true) => {
                session.apply(SessionEvent::WormholeOpened(Direction::Outgoing));
            }
            Some(false) => {
                session.apply(SessionEvent::WormholeOpened(Direction::Incoming));
            }
            None => {}
        }

        let effects = session.apply(SessionEvent::Input(DialInput::Abort));
        prop_assert_eq!(session.state(), WormholeState::Idle);
        prop_assert!(session.buffer().is_empty());
        prop_assert!(effects.contains(&Effect::RequestShutdown));
    }

    /// Header round-trip over the full representable range.
    #[test]
    fn header_round_trip(len in 0usize..=99_999_999) {
        let header = encode_header(len).unwrap();
        prop_assert_eq!(decode_header(&header).unwrap(), len);
    }
}
