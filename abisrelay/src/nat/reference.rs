//! reference - controller local reference <-> NAT reference mapping
//!
//! Every controller numbers its SCCP connections independently, so two controllers can both
//! use reference 0x000001.  Toward the MSC each connection is renumbered with a reference that
//! is unique across all controllers.

use index_pool::IndexPool;
use ipa::net::ConnId;
use ipa::{Error, Result};
use sccp::LocalRef;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub owner: ConnId,
    pub controller_ref: LocalRef,
    pub nat_ref: LocalRef,
    /// The MSC's own reference, learned from its Connection Confirm.
    pub core_ref: Option<LocalRef>,
}

pub struct ReferenceTranslator {
    pool: IndexPool,
    by_nat: HashMap<LocalRef, Mapping>,
    by_controller: HashMap<(ConnId, LocalRef), LocalRef>,
    // MSC reference -> NAT reference, for connections the MSC has confirmed.
    by_core: HashMap<LocalRef, LocalRef>,
    owned: HashMap<ConnId, HashSet<LocalRef>>,
}

impl Default for ReferenceTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceTranslator {
    pub fn new() -> Self {
        let mut pool = IndexPool::new();
        // Reference 0 is never handed out.
        let _ = pool.request_id(0);
        ReferenceTranslator {
            pool,
            by_nat: HashMap::new(),
            by_controller: HashMap::new(),
            by_core: HashMap::new(),
            owned: HashMap::new(),
        }
    }

    /// Allocate a NAT reference for a new connection from `owner`.
    pub fn open(&mut self, owner: ConnId, controller_ref: LocalRef) -> Result<LocalRef> {
        if self.by_controller.contains_key(&(owner, controller_ref)) {
            return Err(Error::ProtocolViolation(format!(
                "reference {controller_ref} already in use"
            )));
        }
        let id = self.pool.new_id();
        let Some(nat_ref) = u32::try_from(id).ok().and_then(LocalRef::new) else {
            let _ = self.pool.return_id(id);
            return Err(Error::ResourceExhaustion(
                "no free SCCP references".to_string(),
            ));
        };
        self.by_nat.insert(
            nat_ref,
            Mapping {
                owner,
                controller_ref,
                nat_ref,
                core_ref: None,
            },
        );
        self.by_controller.insert((owner, controller_ref), nat_ref);
        self.owned.entry(owner).or_default().insert(nat_ref);
        Ok(nat_ref)
    }

    pub fn close(&mut self, nat_ref: LocalRef) -> Result<Mapping> {
        let mapping = self
            .by_nat
            .remove(&nat_ref)
            .ok_or_else(|| Error::NotFound(format!("NAT reference {nat_ref}")))?;
        self.by_controller
            .remove(&(mapping.owner, mapping.controller_ref));
        self.forget_core_ref(&mapping);
        if let Some(refs) = self.owned.get_mut(&mapping.owner) {
            refs.remove(&nat_ref);
            if refs.is_empty() {
                self.owned.remove(&mapping.owner);
            }
        }
        let _ = self.pool.return_id(nat_ref.value() as usize);
        Ok(mapping)
    }

    /// Remove every mapping owned by `owner`.
    pub fn close_all(&mut self, owner: ConnId) -> Vec<Mapping> {
        let Some(refs) = self.owned.remove(&owner) else {
            return vec![];
        };
        let mut closed: Vec<Mapping> = refs
            .into_iter()
            .filter_map(|nat_ref| self.by_nat.remove(&nat_ref))
            .collect();
        for mapping in &closed {
            self.by_controller.remove(&(owner, mapping.controller_ref));
            self.forget_core_ref(mapping);
            let _ = self.pool.return_id(mapping.nat_ref.value() as usize);
        }
        closed.sort_by_key(|m| m.nat_ref);
        closed
    }

    /// Remove every mapping.  Used when the MSC connection is lost.
    pub fn clear(&mut self) -> Vec<Mapping> {
        let mut owners: Vec<ConnId> = self.owned.keys().copied().collect();
        owners.sort();
        owners
            .into_iter()
            .flat_map(|owner| self.close_all(owner))
            .collect()
    }

    fn forget_core_ref(&mut self, mapping: &Mapping) {
        if let Some(core_ref) = mapping.core_ref {
            if self.by_core.get(&core_ref) == Some(&mapping.nat_ref) {
                self.by_core.remove(&core_ref);
            }
        }
    }

    pub fn lookup_nat(&self, nat_ref: LocalRef) -> Result<&Mapping> {
        self.by_nat
            .get(&nat_ref)
            .ok_or_else(|| Error::NotFound(format!("NAT reference {nat_ref}")))
    }

    pub fn lookup_controller(&self, owner: ConnId, controller_ref: LocalRef) -> Result<&Mapping> {
        self.by_controller
            .get(&(owner, controller_ref))
            .and_then(|nat_ref| self.by_nat.get(nat_ref))
            .ok_or_else(|| Error::NotFound(format!("controller reference {controller_ref}")))
    }

    /// The mapping the MSC knows as `core_ref`, provided `owner` owns it.  Another controller's
    /// connection is reported exactly as if it did not exist.
    pub fn lookup_core(&self, owner: ConnId, core_ref: LocalRef) -> Result<&Mapping> {
        self.by_core
            .get(&core_ref)
            .and_then(|nat_ref| self.by_nat.get(nat_ref))
            .filter(|mapping| mapping.owner == owner)
            .ok_or_else(|| Error::NotFound(format!("MSC reference {core_ref}")))
    }

    pub fn set_core_ref(&mut self, nat_ref: LocalRef, core_ref: LocalRef) -> Result<()> {
        let mapping = self
            .by_nat
            .get_mut(&nat_ref)
            .ok_or_else(|| Error::NotFound(format!("NAT reference {nat_ref}")))?;
        let previous = mapping.core_ref.replace(core_ref);
        if let Some(previous) = previous {
            if self.by_core.get(&previous) == Some(&nat_ref) {
                self.by_core.remove(&previous);
            }
        }
        self.by_core.insert(core_ref, nat_ref);
        Ok(())
    }

    pub fn live_count(&self) -> usize {
        self.by_nat.len()
    }

    pub fn owned_count(&self, owner: ConnId) -> usize {
        self.owned.get(&owner).map_or(0, HashSet::len)
    }
}
