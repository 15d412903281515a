//! Prefixed ULID identifiers.
//!
//! Save attempts are tagged `att_<ulid>` and coordinators `cor_<ulid>`, so
//! log lines from concurrent editors can be told apart and sorted by age.

use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    /// One persist invocation.
    Attempt,
    Coordinator,
}

impl IdPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Attempt => "att",
            IdPrefix::Coordinator => "cor",
        }
    }
}

pub struct Identifier;

impl Identifier {
    /// New identifier; later calls sort after earlier ones.
    pub fn ascending(prefix: IdPrefix) -> String {
        let ulid = Ulid::new().to_string().to_lowercase();
        format!("{}_{ulid}", prefix.as_str())
    }

    pub fn attempt() -> String {
        Self::ascending(IdPrefix::Attempt)
    }

    pub fn coordinator() -> String {
        Self::ascending(IdPrefix::Coordinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_ids_are_prefixed_ulids() {
        let id = Identifier::attempt();
        assert!(id.starts_with("att_"));
        assert_eq!(id.len(), 4 + 26);
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let first = Identifier::attempt();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(first < Identifier::attempt());
    }

    #[test]
    fn suffix_is_a_lowercase_ulid() {
        let id = Identifier::coordinator();
        let (prefix, ulid) = id.split_once('_').unwrap();
        assert_eq!(prefix, IdPrefix::Coordinator.as_str());
        assert_eq!(ulid, ulid.to_lowercase());
        assert!(Ulid::from_string(ulid).is_ok());
    }
}
