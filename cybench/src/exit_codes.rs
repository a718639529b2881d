#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// All transactions succeeded.
    Success = 0,

    /// Runtime error, or at least one transaction failed.
    Failed = 1,

    /// Invalid CLI arguments.
    InvalidInput = 2,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
