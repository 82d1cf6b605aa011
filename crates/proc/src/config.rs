//! TEAM_452: Lifecycle configuration.

/// TEAM_452: Tunables for the process lifecycle core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// First PID handed out. PID 0 is reserved for the kernel/idle context.
    pub first_pid: usize,
    /// Highest PID ever handed out. PIDs are not recycled.
    pub max_pid: usize,
    /// Name given to processes created by fork.
    pub child_name: &'static str,
}

impl LifecycleConfig {
    /// Same as the traditional `PID_MAX` default on Linux.
    pub const DEFAULT_MAX_PID: usize = 32767;

    pub const fn new() -> Self {
        Self {
            first_pid: 1,
            max_pid: Self::DEFAULT_MAX_PID,
            child_name: "child",
        }
    }

    #[must_use]
    pub const fn with_max_pid(mut self, max_pid: usize) -> Self {
        self.max_pid = max_pid;
        self
    }

    #[must_use]
    pub const fn with_first_pid(mut self, first_pid: usize) -> Self {
        self.first_pid = if first_pid == 0 { 1 } else { first_pid };
        self
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::new()
    }
}
