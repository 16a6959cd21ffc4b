//! Identifier management using string interning for efficient storage and comparison
//!
//! BPMN documents reference the same element ids many times over (flow
//! endpoints, arc lists, layout keys). This module provides the [`Id`] type
//! with an efficient string-interner based approach so ids are `Copy` and
//! compare by symbol.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for efficient identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

/// Efficient identifier type using string interning
///
/// This type provides efficient storage and comparison of BPMN element ids
/// through string interning.
///
/// # Examples
///
/// ```
/// use bpmnio_core::identifier::Id;
///
/// let task_id = Id::new("Activity_1gk9dfa");
/// let flow_id = Id::new("Flow_0c7x2pn");
///
/// assert_ne!(task_id, flow_id);
/// assert_eq!(task_id, "Activity_1gk9dfa");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from &str.
    ///
    /// # Arguments
    ///
    /// * `name` - The string representation of the identifier
    pub fn new(name: &str) -> Self {
        let mut interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        let symbol = interner.get_or_intern(name);
        Self(symbol)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        let str_value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{}", str_value)
    }
}

impl From<&str> for Id {
    /// Creates an `Id` from a string slice
    ///
    /// This is a convenience implementation that calls `Id::new`.
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    /// Allows direct comparison with string slices: `id == "string"`
    fn eq(&self, other: &str) -> bool {
        let interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        self_str == other
    }
}

impl PartialEq<&str> for Id {
    /// Allows direct comparison with string references: `id == &string`
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let id1 = Id::new("StartEvent_1");
        let id2 = Id::new("StartEvent_1");
        let id3 = Id::new("EndEvent_1");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "StartEvent_1");
    }

    #[test]
    fn test_display_trait() {
        let id = Id::new("Gateway_0a1b2c");
        assert_eq!(format!("{}", id), "Gateway_0a1b2c");
    }

    #[test]
    fn test_from_trait() {
        let id1: Id = "Flow_1".into();
        let id2 = Id::new("Flow_1");

        assert_eq!(id1, id2);
        assert_eq!(id1, "Flow_1");
    }

    #[test]
    fn test_hash_and_eq() {
        use std::collections::HashMap;

        let id1 = Id::new("Task_A");
        let id2 = Id::new("Task_A");
        let id3 = Id::new("Task_B");

        let mut map = HashMap::new();
        map.insert(id1, "value1");
        map.insert(id3, "value2");

        assert_eq!(map.get(&id2), Some(&"value1"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_partial_eq_str() {
        let id = Id::new("Participant_1");

        assert!(id == "Participant_1");
        assert!(id != "Participant_2");

        let empty = Id::new("");
        assert!(empty == "");
        assert!(empty != "non-empty");
    }

    #[test]
    fn test_copy_trait() {
        let id1 = Id::new("copy_test");
        let id2 = id1;
        let id3 = id1;

        assert_eq!(id1, id2);
        assert_eq!(id2, id3);
        assert_eq!(id1, "copy_test");
    }
}
