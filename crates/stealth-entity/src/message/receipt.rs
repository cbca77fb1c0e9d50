//! Delivery and read receipt state.

/// A receipt update to apply to a stored message.
///
/// Flags only ever move from `false` to `true`; a `false` here means
/// "leave unchanged", never "clear".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReceiptPatch {
    /// Set the delivered flag.
    pub delivered: bool,
    /// Set the read flag (implies delivered).
    pub read: bool,
}

impl ReceiptPatch {
    /// Patch for a delivery acknowledgement.
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            read: false,
        }
    }

    /// Patch for a read acknowledgement. Sets delivered as well.
    pub fn read() -> Self {
        Self {
            delivered: true,
            read: true,
        }
    }

    /// Apply the patch to a pair of flags, returning the new flags and
    /// whether anything changed.
    pub fn apply(&self, delivered: bool, read: bool) -> (bool, bool, bool) {
        let new_read = read || self.read;
        let new_delivered = delivered || self.delivered || new_read;
        let changed = new_read != read || new_delivered != delivered;
        (new_delivered, new_read, changed)
    }
}
