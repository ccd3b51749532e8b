//! Addresses barred from sending or receiving

use std::collections::HashSet;
use std::sync::RwLock;

use lazy_static::lazy_static;
use log::info;

use crypto::Address;

#[derive(Debug, Default)]
pub struct Blacklist(RwLock<HashSet<Address>>);

impl Blacklist {
    pub fn new() -> Self {
        Blacklist::default()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.0
            .read()
            .map(|set| set.contains(address))
            .unwrap_or_else(|poisoned| poisoned.into_inner().contains(address))
    }

    pub fn add(&self, address: Address) {
        let mut set = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if set.insert(address) {
            info!("Blacklisted {}", address);
        }
    }

    pub fn remove(&self, address: &Address) -> bool {
        self.0
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(address)
    }

    /// Replaces every entry
    pub fn reset<I: IntoIterator<Item = Address>>(&self, addresses: I) {
        *self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            addresses.into_iter().collect();
    }
}

lazy_static! {
    static ref GLOBAL: Blacklist = Blacklist::new();
}

/// The process wide blacklist
pub fn global_blacklist() -> &'static Blacklist {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        let list = Blacklist::new();
        let bad = Address::from_name(b"bad");
        assert!(!list.contains(&bad));

        list.add(bad);
        assert!(list.contains(&bad));
        assert!(list.remove(&bad));
        assert!(!list.contains(&bad));

        list.reset(vec![bad]);
        assert!(list.contains(&bad));
        list.reset(Vec::new());
        assert!(!list.contains(&bad));
    }
}
