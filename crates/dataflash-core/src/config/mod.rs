//! Driver configuration
//!
//! Selects when the driver waits for the device to become ready, whether
//! the device is put into deep power-down between operations, and how long
//! ready-polling may take before giving up.
//!
//! With the `std` feature the configuration can be loaded from TOML, see
//! [`DriverConfig::from_toml_str`].

#[cfg(feature = "std")]
mod toml;

#[cfg(feature = "std")]
pub use self::toml::ConfigError;

/// When to wait for the device's ready bit around an erase or program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum BusyWaitPolicy {
    /// Wait before issuing the next command and leave the device busy
    /// afterwards; other work can overlap the internal operation
    #[default]
    PreOperation,
    /// Wait right after issuing each command
    PostOperation,
}

/// Whether the device sleeps between multi-page operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "kebab-case"))]
pub enum PowerPolicy {
    /// Leave the device powered
    #[default]
    AlwaysOn,
    /// Resume before and deep power-down after every erase/program/read
    SleepBetweenOperations,
}

/// Bounded ready-polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct WaitPolicy {
    /// Delay between two status reads, in microseconds
    pub poll_interval_us: u32,
    /// Give up after this many microseconds
    pub timeout_us: u32,
}

impl WaitPolicy {
    /// Create a wait policy
    pub const fn new(poll_interval_us: u32, timeout_us: u32) -> Self {
        Self {
            poll_interval_us,
            timeout_us,
        }
    }

    /// Maximum number of status reads before [`Error::Timeout`](crate::Error::Timeout)
    ///
    /// Always at least one.
    pub const fn max_polls(&self) -> u32 {
        let polls = if self.poll_interval_us > 0 {
            self.timeout_us / self.poll_interval_us
        } else {
            // Fall back to polling once per microsecond
            self.timeout_us
        };
        if polls == 0 {
            1
        } else {
            polls
        }
    }
}

impl Default for WaitPolicy {
    /// 10us between polls, 200ms timeout: covers page erase, page program
    /// and block erase on every density
    fn default() -> Self {
        Self::new(10, 200_000)
    }
}

/// Runtime configuration of the Flash Command Layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct DriverConfig {
    /// Wait before or after erase/program commands
    pub busy_wait_policy: BusyWaitPolicy,
    /// Deep power-down between operations
    pub power_policy: PowerPolicy,
    /// Settle time after resume from deep power-down, in microseconds
    pub resume_settle_us: u32,
    /// Ready-polling for page and block operations
    pub wait: WaitPolicy,
    /// Ready-polling for chip erase
    pub chip_erase_wait: WaitPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            busy_wait_policy: BusyWaitPolicy::default(),
            power_policy: PowerPolicy::default(),
            wait: WaitPolicy::default(),
            // Chip erase of the 64 Mbit part takes minutes
            chip_erase_wait: WaitPolicy::new(10_000, 300_000_000),
            resume_settle_us: 50,
        }
    }
}

impl DriverConfig {
    /// Set the busy-wait policy
    pub fn with_busy_wait_policy(mut self, policy: BusyWaitPolicy) -> Self {
        self.busy_wait_policy = policy;
        self
    }

    /// Set the power policy
    pub fn with_power_policy(mut self, policy: PowerPolicy) -> Self {
        self.power_policy = policy;
        self
    }

    /// Set the page/block wait policy
    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }
}
