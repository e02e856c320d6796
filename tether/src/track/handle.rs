//! Handle identifying one tracked operation.

use serde::{Deserialize, Serialize};

/// Identifier for one tracked operation.
///
/// Handles are assigned by a tracker's monotonic counter, starting at 0 and
/// unique for the lifetime of that tracker. A handle is never reused, even
/// after its operation settles or is cancelled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Handle(pub(crate) u64);

impl Handle {
    /// Returns the raw counter value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display_and_value() {
        let handle = Handle(42);
        assert_eq!(handle.to_string(), "42");
        assert_eq!(handle.value(), 42);
    }

    #[test]
    fn test_handle_ordering() {
        assert!(Handle(0) < Handle(1));
        assert_eq!(Handle(7), Handle(7));
    }

    #[test]
    fn test_handle_serde_roundtrip() {
        let handle = Handle(3);
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "3");
        let back: Handle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }
}
