//! table - BTS entries keyed by (site, bts), each with a management leg and an optional
//! signalling leg

use ipa::net::ConnId;
use ipa::{Error, Result, UnitId};
use std::collections::HashMap;
use std::fmt;

pub type UnitKey = (u16, u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    Oml,
    Rsl,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Oml => write!(f, "OML"),
            Leg::Rsl => write!(f, "RSL"),
        }
    }
}

pub struct BtsEntry<S> {
    pub unit: UnitId,
    pub oml: ConnId,
    pub rsl: Option<ConnId>,
    /// Per-BTS resources that live exactly as long as the management leg.
    pub sockets: S,
}

impl<S> BtsEntry<S> {
    pub fn conn(&self, leg: Leg) -> Option<ConnId> {
        match leg {
            Leg::Oml => Some(self.oml),
            Leg::Rsl => self.rsl,
        }
    }
}

/// What removing a leg took with it.
pub enum Removed<S> {
    /// The management leg went, and the whole entry with it.
    Oml(BtsEntry<S>),
    Rsl(UnitKey),
}

pub struct BtsTable<S> {
    entries: HashMap<UnitKey, BtsEntry<S>>,
    legs: HashMap<ConnId, (UnitKey, Leg)>,
}

impl<S> Default for BtsTable<S> {
    fn default() -> Self {
        BtsTable {
            entries: HashMap::new(),
            legs: HashMap::new(),
        }
    }
}

impl<S> BtsTable<S> {
    /// Attach connection `conn` as `leg` of the BTS identified by `unit`.  A management leg
    /// creates the entry, calling `make_sockets` for its resources.  Nothing is changed on
    /// failure.
    pub fn correlate(
        &mut self,
        conn: ConnId,
        leg: Leg,
        unit: UnitId,
        make_sockets: impl FnOnce() -> Result<S>,
    ) -> Result<UnitKey> {
        let key = (unit.site_id, unit.bts_id);
        if self.legs.contains_key(&conn) {
            return Err(Error::ProtocolViolation(format!(
                "connection already identified, now claims {unit}"
            )));
        }
        match leg {
            Leg::Oml => {
                if self.entries.contains_key(&key) {
                    return Err(Error::ProtocolViolation(format!(
                        "{unit} already has an OML connection"
                    )));
                }
                let sockets = make_sockets()?;
                self.entries.insert(
                    key,
                    BtsEntry {
                        unit,
                        oml: conn,
                        rsl: None,
                        sockets,
                    },
                );
            }
            Leg::Rsl => {
                let Some(entry) = self.entries.get_mut(&key) else {
                    return Err(Error::ProtocolViolation(format!(
                        "RSL connection for {unit} before its OML connection"
                    )));
                };
                if entry.rsl.is_some() {
                    return Err(Error::ProtocolViolation(format!(
                        "{unit} already has an RSL connection"
                    )));
                }
                entry.rsl = Some(conn);
            }
        }
        self.legs.insert(conn, (key, leg));
        Ok(key)
    }

    /// Forget connection `conn`.  None if it never got as far as being correlated.
    pub fn remove_leg(&mut self, conn: ConnId) -> Option<Removed<S>> {
        let (key, leg) = self.legs.remove(&conn)?;
        match leg {
            Leg::Oml => {
                let entry = self.entries.remove(&key)?;
                if let Some(rsl) = entry.rsl {
                    self.legs.remove(&rsl);
                }
                Some(Removed::Oml(entry))
            }
            Leg::Rsl => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.rsl = None;
                }
                Some(Removed::Rsl(key))
            }
        }
    }

    pub fn leg_of(&self, conn: ConnId) -> Option<(UnitKey, Leg)> {
        self.legs.get(&conn).copied()
    }

    pub fn get(&self, key: &UnitKey) -> Option<&BtsEntry<S>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &UnitKey) -> Option<&mut BtsEntry<S>> {
        self.entries.get_mut(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &BtsEntry<S>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
