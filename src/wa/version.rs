/// WA Web protocol version tuple reported in the client payload/user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaWebVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl WaWebVersion {
    /// Snapshot used when no fresher version has been configured.
    pub const fn fallback() -> Self {
        Self {
            major: 2,
            minor: 3000,
            patch: 1033846690,
        }
    }
}

impl Default for WaWebVersion {
    fn default() -> Self {
        Self::fallback()
    }
}
