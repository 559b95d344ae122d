//! Error types for the DMA stream driver
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Construction and configuration failures
//! - [`DmaError`]: Descriptor pool, channel binding and transfer issues
//! - [`IoError`]: Runtime state and timeout failures
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most driver methods.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and construction errors
///
/// These errors occur while creating queues and streams or while
/// applying transfer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Backing storage could not be allocated
    OutOfMemory,
    /// Requested capacity is zero or exceeds the supported maximum
    InvalidCapacity,
    /// Channel number exceeds the registry size
    InvalidChannel,
    /// Burst size exceeds the channel FIFO
    BurstTooLarge,
    /// Burst transfers requested on a fixed (non-incrementing) address
    FixedAddressBurst,
    /// Operation is not allowed while the stream owns its channel
    StreamActive,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::OutOfMemory => "out of memory",
            ConfigError::InvalidCapacity => "invalid capacity",
            ConfigError::InvalidChannel => "invalid channel number",
            ConfigError::BurstTooLarge => "burst exceeds channel FIFO",
            ConfigError::FixedAddressBurst => "burst not allowed with fixed address",
            ConfigError::StreamActive => "stream is active",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Descriptor and channel errors
///
/// These errors relate to descriptor pool management, channel binding
/// and hardware transfer faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Channel is already bound to another stream
    ChannelBusy,
    /// No free descriptors left in the pool
    PoolFull,
    /// Transfer size is zero or not a multiple of the element width
    InvalidLength,
    /// Address violates the natural alignment of the element width
    Misaligned,
    /// Element count exceeds the single-descriptor maximum
    TransferTooLarge,
    /// Active descriptor changed while the residue was being read
    ResidueUnstable,
    /// Bus error reported by the DMA controller
    BusError,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::ChannelBusy => "channel busy",
            DmaError::PoolFull => "descriptor pool full",
            DmaError::InvalidLength => "invalid transfer length",
            DmaError::Misaligned => "misaligned address",
            DmaError::TransferTooLarge => "transfer too large for descriptor",
            DmaError::ResidueUnstable => "residue unstable, retry",
            DmaError::BusError => "DMA bus error",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Runtime state errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Invalid state for operation (e.g., enabling an empty stream)
    InvalidState,
    /// Operation or transfer timed out
    Timeout,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::InvalidState => "invalid state for operation",
            IoError::Timeout => "operation timed out",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match stream.enable() {
///     Err(Error::Dma(DmaError::ChannelBusy)) => { /* retry later */ }
///     Err(Error::Io(IoError::InvalidState)) => { /* nothing queued */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// I/O error
    Io(IoError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

/// Result type alias for driver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for descriptor/channel operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for runtime state operations
pub type IoResult<T> = core::result::Result<T, IoError>;

// =============================================================================
// Unit Tests
// =============================================================================
