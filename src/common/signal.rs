/// Signal numbers reported to GDB in `Snn` stop replies.
///
/// Numbering follows GDB's `signals.def`. The stub only ever reports a
/// breakpoint trap, or no signal at all while the program is running.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signal(pub u8);

#[allow(clippy::upper_case_acronyms)]
#[rustfmt::skip]
impl Signal {
    #[doc = "No signal (target is not stopped)"] pub const SIGZERO: Self = Self(0);
    #[doc = "Trace/breakpoint trap"]             pub const SIGTRAP: Self = Self(5);
}

impl core::fmt::Display for Signal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        #[rustfmt::skip]
        let s = match *self {
            Signal::SIGZERO => "SIGZERO - No signal",
            Signal::SIGTRAP => "SIGTRAP - Trace/breakpoint trap",
            _ => return write!(f, "signal {}", self.0),
        };

        write!(f, "{}", s)
    }
}
