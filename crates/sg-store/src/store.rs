use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;

use rusqlite::{Connection, params};

use sg_core::{AddressBook, DialAddress, GateEntry};

use crate::error::{Result, StoreError};
use crate::schema;

/// SQLite-backed address book of known peer gates.
///
/// Rows store the dial address in its wire rendering (`"[7, 32]"`) so
/// the table stays readable from the sqlite shell.
pub struct BookStore {
    conn: Connection,
}

impl BookStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Snapshot every known gate, ordered by name. Sessions take this
    /// once at start and never see later edits.
    pub fn load_book(&self) -> Result<AddressBook> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, address, ip FROM gates ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (name, address, ip) = row?;
            entries.push(decode_entry(&name, &address, &ip)?);
        }
        tracing::debug!("loaded {} gates from the address book", entries.len());
        Ok(AddressBook::new(entries))
    }

    /// Exact lookup by gate name.
    pub fn gate(&self, name: &str) -> Result<Option<GateEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, address, ip FROM gates WHERE name = ?1")?;
        let row = stmt
            .query_row([name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .ok();
        match row {
            Some((name, address, ip)) => Ok(Some(decode_entry(&name, &address, &ip)?)),
            None => Ok(None),
        }
    }

    pub fn upsert_gate(&self, entry: &GateEntry) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO gates (name, address, ip) VALUES (?1, ?2, ?3)",
            params![
                entry.name,
                entry.address.to_string(),
                entry.ip.to_string()
            ],
        )?;
        Ok(())
    }

    /// Returns whether a row was actually removed.
    pub fn remove_gate(&self, name: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM gates WHERE name = ?1", [name])?;
        Ok(changed > 0)
    }

    /// Add-or-replace gates from a JSON export. Returns how many
    /// entries were loaded.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let entries: Vec<GateEntry> = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidData(format!("address book JSON: {e}")))?;

        let tx = self.conn.unchecked_transaction()?;
        for entry in &entries {
            tx.execute(
                "INSERT OR REPLACE INTO gates (name, address, ip) VALUES (?1, ?2, ?3)",
                params![
                    entry.name,
                    entry.address.to_string(),
                    entry.ip.to_string()
                ],
            )?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn export_json(&self) -> Result<String> {
        let book = self.load_book()?;
        serde_json::to_string_pretty(book.entries())
            .map_err(|e| StoreError::InvalidData(format!("address book JSON: {e}")))
    }
}

fn decode_entry(name: &str, address: &str, ip: &str) -> Result<GateEntry> {
    let address = DialAddress::from_str(address)
        .map_err(|e| StoreError::InvalidData(format!("gate {name}: {e}")))?;
    let ip = IpAddr::from_str(ip)
        .map_err(|_| StoreError::InvalidData(format!("gate {name}: bad ip {ip:?}")))?;
    Ok(GateEntry {
        name: name.to_string(),
        address,
        ip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, numbers: &[u8], ip: &str) -> GateEntry {
        GateEntry {
            name: name.to_string(),
            address: DialAddress::from_numbers(numbers).unwrap(),
            ip: ip.parse().unwrap(),
        }
    }

    #[test]
    fn test_upsert_and_load() {
        let store = BookStore::open_in_memory().unwrap();
        store.upsert_gate(&entry("Abydos", &[27, 7, 15], "10.0.0.5")).unwrap();
        store.upsert_gate(&entry("Chulak", &[9, 2, 23], "10.0.0.9")).unwrap();

        let book = store.load_book().unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.find("Abydos").unwrap().ip, "10.0.0.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_upsert_replaces_by_name() {
        let store = BookStore::open_in_memory().unwrap();
        store.upsert_gate(&entry("Abydos", &[27, 7], "10.0.0.5")).unwrap();
        store.upsert_gate(&entry("Abydos", &[27, 7, 15], "10.0.0.6")).unwrap();

        let book = store.load_book().unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.find("Abydos").unwrap().ip, "10.0.0.6".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_remove_gate() {
        let store = BookStore::open_in_memory().unwrap();
        store.upsert_gate(&entry("Abydos", &[27, 7], "10.0.0.5")).unwrap();

        assert!(store.remove_gate("Abydos").unwrap());
        assert!(!store.remove_gate("Abydos").unwrap());
        assert!(store.load_book().unwrap().is_empty());
    }

    #[test]
    fn test_gate_lookup() {
        let store = BookStore::open_in_memory().unwrap();
        store.upsert_gate(&entry("Abydos", &[27, 7], "10.0.0.5")).unwrap();

        let found = store.gate("Abydos").unwrap().unwrap();
        assert_eq!(found.address.to_string(), "[27, 7]");
        assert!(store.gate("Chulak").unwrap().is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let store = BookStore::open_in_memory().unwrap();
        store.upsert_gate(&entry("Abydos", &[27, 7, 15], "10.0.0.5")).unwrap();
        store.upsert_gate(&entry("Chulak", &[9, 2, 23], "10.0.0.9")).unwrap();

        let json = store.export_json().unwrap();
        let other = BookStore::open_in_memory().unwrap();
        assert_eq!(other.import_json(&json).unwrap(), 2);
        assert_eq!(other.load_book().unwrap(), store.load_book().unwrap());
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let store = BookStore::open_in_memory().unwrap();
        assert!(store.import_json("not json").is_err());
        // A repeated glyph inside an address is invalid data, not a crash.
        let bad = r#"[{"name": "X", "address": [7, 7], "ip": "10.0.0.1"}]"#;
        assert!(store.import_json(bad).is_err());
    }

    #[test]
    fn test_malformed_row_surfaces_as_invalid_data() {
        let store = BookStore::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO gates (name, address, ip) VALUES ('X', 'garbage', '10.0.0.1')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.load_book(),
            Err(StoreError::InvalidData(_))
        ));
    }
}
