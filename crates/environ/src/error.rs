use thiserror::Error;

/// An error while producing relocation data for a compilation.
///
/// Either variant aborts relocation data generation for the compilation; no
/// partial buffer is ever returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelocationError {
    /// A collaborator could not supply data a record needs.
    #[error("AOT data generation failed: {0}")]
    AotDataGenerationFailed(String),

    /// The allocation service refused the relocation buffer.
    #[error("failed to allocate {size} bytes of relocation data")]
    AllocationFailed {
        /// Size of the refused request, in bytes.
        size: usize,
    },
}
