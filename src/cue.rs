use std::fmt;
use std::io::{self, Write};

use crate::error::CapabilityError;

/// Short audible signals emitted at session boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// A phase began (start of session or an Inhale/Exhale boundary).
    Phase,
    /// The session reached its time limit.
    Complete,
}

/// Fire-and-forget cue playback. Errors are only ever logged.
pub trait CuePlayer: fmt::Debug {
    fn play(&mut self, cue: Cue) -> Result<(), CapabilityError>;
}

/// Rings the terminal bell on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl TerminalBell {
    fn ring<W: Write>(out: &mut W, cue: Cue) -> io::Result<()> {
        let bells: &[u8] = match cue {
            Cue::Phase => b"\x07",
            Cue::Complete => b"\x07\x07",
        };
        out.write_all(bells)?;
        out.flush()
    }
}

impl CuePlayer for TerminalBell {
    fn play(&mut self, cue: Cue) -> Result<(), CapabilityError> {
        Self::ring(&mut io::stdout(), cue).map_err(|e| CapabilityError::io("terminal bell", e))
    }
}

#[derive(Debug, Default)]
pub struct Silent;

impl CuePlayer for Silent {
    fn play(&mut self, _cue: Cue) -> Result<(), CapabilityError> {
        Ok(())
    }
}
