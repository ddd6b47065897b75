use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::address::DialAddress;
use crate::constants::UNKNOWN_GATE;

/// One known peer-operated gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateEntry {
    pub name: String,
    pub address: DialAddress,
    pub ip: IpAddr,
}

/// Read-only snapshot of every known peer gate.
///
/// Peer gates are guaranteed a locally-unique two-glyph address prefix,
/// so resolution only ever inspects the first two glyphs of a dialed
/// address. Sessions take a snapshot once at start; the book is never
/// mutated mid-dial.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    entries: Vec<GateEntry>,
}

impl AddressBook {
    pub fn new(entries: Vec<GateEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[GateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Network address of the gate whose two-glyph prefix matches the
    /// dialed address. Misses are an absent result, not an error.
    pub fn resolve_peer(&self, dialed: &DialAddress) -> Option<IpAddr> {
        self.entries
            .iter()
            .find(|entry| entry.address.shares_prefix(dialed))
            .map(|entry| entry.ip)
    }

    /// Reverse lookup by exact network address; unknown addresses
    /// resolve to the `"Unknown"` sentinel.
    pub fn resolve_name(&self, ip: IpAddr) -> &str {
        self.entries
            .iter()
            .find(|entry| entry.ip == ip)
            .map_or(UNKNOWN_GATE, |entry| entry.name.as_str())
    }

    /// Exact lookup by gate name.
    pub fn find(&self, name: &str) -> Option<&GateEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}
