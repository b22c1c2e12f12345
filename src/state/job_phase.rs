//! Phases of a wave orchestrator
//!
//! ```text
//! Init -> WaveCompute -> WaveDispatch -> WaveJoin -> Advance -> WaveCompute ...
//!              |                                        |
//!              +----------------> Done <----------------+
//!                                   |
//!                                Terminal
//! ```
use std::fmt;

/// Represents the current phase of one seed job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    /// Seed inserted into the frontier, depth budget set
    Init,

    /// Computing the pending wave from the frontier
    WaveCompute,

    /// Spawning one dispatcher per URL of the wave
    WaveDispatch,

    /// Waiting on the wave barrier
    WaveJoin,

    /// Spending one unit of depth budget
    Advance,

    /// No further waves will run
    Done,

    /// Completion signalled to the job scheduler
    Terminal,
}

impl JobPhase {
    /// Returns true if no work remains for the job
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Terminal)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        use JobPhase::*;
        matches!(
            (self, next),
            (Init, WaveCompute)
                | (WaveCompute, WaveDispatch)
                | (WaveCompute, Done)
                | (WaveDispatch, WaveJoin)
                | (WaveJoin, Advance)
                | (WaveJoin, Done)
                | (Advance, WaveCompute)
                | (Advance, Done)
                | (Done, Terminal)
        )
    }

    /// Short lowercase name used in logs and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::WaveCompute => "wave_compute",
            Self::WaveDispatch => "wave_dispatch",
            Self::WaveJoin => "wave_join",
            Self::Advance => "advance",
            Self::Done => "done",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
