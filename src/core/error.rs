//! Error types for txtick
//!
//! Uses Rust's Result pattern instead of C-style status flags.

/// Service error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OsError {
    /// No error
    None = 0,

    // ============ ISR errors ============
    /// Cannot submit transmit data from ISR
    SubmitIsr = 10001,
    /// Cannot register a timeout from ISR
    RegisterIsr = 10002,
    /// Cannot unregister a timeout from ISR
    UnregisterIsr = 10003,

    // ============ Serial errors ============
    /// Hardware refused or failed to start the transfer
    TransferFailed = 26001,

    // ============ Dispatch errors ============
    /// Dispatch table has no free entry for a new identity
    DispatchFull = 27001,

    // ============ Timeout errors ============
    /// All timeout slots are armed
    NoFreeSlot = 29501,
    /// Handle does not address a slot
    InvalidHandle = 29502,
}

/// Result type alias for service operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == OsError::None
    }

    #[inline]
    pub fn is_err(self) -> bool {
        self != OsError::None
    }
}
