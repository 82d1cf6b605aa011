//! TEAM_452: Wait status encoding, waitpid options, and the status destination.
//!
//! Status words use the Linux layout so userspace `WIFEXITED`/`WEXITSTATUS`
//! work unchanged:
//!
//! | bits  | normal exit  | killed by signal |
//! |-------|--------------|------------------|
//! | 0-6   | 0            | signal number    |
//! | 7     | 0            | core dumped      |
//! | 8-15  | exit code    | 0                |

use core::fmt;

use bitflags::bitflags;
use linux_raw_sys::general::{WCONTINUED, WEXITED, WNOHANG, WNOWAIT, WUNTRACED};

use crate::error::ProcError;

/// TEAM_452: Encoded wait status as written to the waiter.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WaitStatus(i32);

impl WaitStatus {
    /// [WS1] Normal exit keeps only the low 8 bits of the code.
    pub const fn exited(code: i32) -> Self {
        Self((code & 0xff) << 8)
    }

    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// [WS2] `WIFEXITED`
    pub const fn is_exited(self) -> bool {
        self.0 & 0x7f == 0
    }

    /// [WS2] `WEXITSTATUS`, only meaningful for a normal exit.
    pub const fn exit_code(self) -> Option<i32> {
        if self.is_exited() {
            Some((self.0 >> 8) & 0xff)
        } else {
            None
        }
    }

    /// [WS3] `WIFSIGNALED`. This core never produces one, but callers decoding
    /// statuses from elsewhere still need to tell the cases apart.
    pub const fn is_signaled(self) -> bool {
        let sig = self.0 & 0x7f;
        sig != 0 && sig != 0x7f
    }

    /// [WS3] `WTERMSIG`
    pub const fn term_signal(self) -> Option<i32> {
        if self.is_signaled() {
            Some(self.0 & 0x7f)
        } else {
            None
        }
    }
}

impl fmt::Debug for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_code(), self.term_signal()) {
            (Some(code), _) => write!(f, "WaitStatus::Exited({code})"),
            (None, Some(sig)) => write!(f, "WaitStatus::Signaled({sig})"),
            (None, None) => write!(f, "WaitStatus(0x{:x})", self.0),
        }
    }
}

bitflags! {
    /// TEAM_452: waitpid option bits as defined by the Linux ABI.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WaitOptions: u32 {
        const NOHANG = WNOHANG;
        const UNTRACED = WUNTRACED;
        const EXITED = WEXITED;
        const CONTINUED = WCONTINUED;
        const NOWAIT = WNOWAIT;
    }
}

impl WaitOptions {
    /// Only blocking waits on an exact child are implemented, so any option
    /// bit is refused. Known bits are decoded first for the log line.
    pub fn validate(raw: u32) -> Result<Self, ProcError> {
        if raw == 0 {
            return Ok(Self::empty());
        }
        match Self::from_bits(raw) {
            Some(flags) => log::debug!("[PROC] waitpid: unsupported options {:?}", flags),
            None => log::debug!("[PROC] waitpid: unknown option bits 0x{:x}", raw),
        }
        Err(ProcError::InvalidArgument)
    }
}

/// TEAM_452: Destination for a reaped child's wait status.
///
/// Mirrors a user pointer: validity is checked before the caller blocks, and
/// the write itself may still fault.
pub trait StatusOut {
    /// False when the destination can never be written (null pointer).
    fn is_writable(&self) -> bool;

    fn write(&mut self, status: WaitStatus) -> Result<(), ProcError>;
}

impl StatusOut for Option<&mut i32> {
    fn is_writable(&self) -> bool {
        self.is_some()
    }

    fn write(&mut self, status: WaitStatus) -> Result<(), ProcError> {
        match self {
            Some(slot) => {
                **slot = status.raw();
                Ok(())
            }
            None => Err(ProcError::InvalidOutputLocation),
        }
    }
}

impl StatusOut for &mut i32 {
    fn is_writable(&self) -> bool {
        true
    }

    fn write(&mut self, status: WaitStatus) -> Result<(), ProcError> {
        **self = status.raw();
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
