//! Host architecture detection and override decisions.
//!
//! A 32-bit process on 64-bit Windows runs under WOW64, where accesses to
//! the system directory are transparently redirected to the 32-bit copy.
//! The functions here decide whether a command targeting a given
//! architecture needs that redirection switched off.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CPU bitness a command is meant to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// 32-bit subsystem.
    I386,
    /// 64-bit subsystem.
    X86_64,
    /// Host could not be probed; never triggers an override.
    #[default]
    Unknown,
}

impl Architecture {
    /// Architecture matching the pointer width this binary was compiled for.
    pub const fn of_current_build() -> Self {
        if cfg!(target_pointer_width = "64") {
            Architecture::X86_64
        } else {
            Architecture::I386
        }
    }

    /// Check if this is a concrete (known) architecture.
    pub fn is_known(&self) -> bool {
        !matches!(self, Architecture::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::I386 => "i386",
            Architecture::X86_64 => "x86_64",
            Architecture::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an architecture name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseArchitectureError(String);

impl fmt::Display for ParseArchitectureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown architecture '{}' (expected i386 or x86_64)",
            self.0
        )
    }
}

impl std::error::Error for ParseArchitectureError {}

impl FromStr for Architecture {
    type Err = ParseArchitectureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "i386" | "x86" | "32" => Ok(Architecture::I386),
            "x86_64" | "amd64" | "x64" | "64" => Ok(Architecture::X86_64),
            _ => Err(ParseArchitectureError(s.to_string())),
        }
    }
}

/// Read-only view of the host's bitness.
///
/// Implementations must not fail: anything that cannot be determined is
/// reported as [`Architecture::Unknown`].
pub trait ArchitectureProbe {
    /// Bitness of the operating system.
    fn os_architecture(&self) -> Architecture;

    /// Bitness of the current process, which is also the default for
    /// processes it spawns while redirection is active.
    fn process_architecture(&self) -> Architecture;
}

/// Native bitness of the operating system.
pub fn native_architecture<P: ArchitectureProbe + ?Sized>(probe: &P) -> Architecture {
    probe.os_architecture()
}

/// Resolve the architecture new processes get by default.
///
/// `X86_64` only when both the OS and the current process are 64-bit,
/// `Unknown` when the OS cannot be probed, `I386` otherwise.
pub fn resolve<P: ArchitectureProbe + ?Sized>(probe: &P) -> Architecture {
    match probe.os_architecture() {
        Architecture::Unknown => Architecture::Unknown,
        Architecture::X86_64 if probe.process_architecture() == Architecture::X86_64 => {
            Architecture::X86_64
        }
        _ => Architecture::I386,
    }
}

/// Decide whether running for `requested` needs redirection disabled.
///
/// True iff the OS is 64-bit and the default architecture differs from the
/// requested one. An unknown request never requires an override.
pub fn override_required<P: ArchitectureProbe + ?Sized>(probe: &P, requested: Architecture) -> bool {
    if !requested.is_known() || probe.os_architecture() != Architecture::X86_64 {
        return false;
    }
    resolve(probe) != requested
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        os: Architecture,
        process: Architecture,
    }

    fn probe(os: Architecture, process: Architecture) -> Probe {
        Probe { os, process }
    }

    impl ArchitectureProbe for Probe {
        fn os_architecture(&self) -> Architecture {
            self.os
        }

        fn process_architecture(&self) -> Architecture {
            self.process
        }
    }

    use Architecture::*;

    #[test]
    fn test_resolve_native_64() {
        assert_eq!(resolve(&probe(X86_64, X86_64)), X86_64);
    }

    #[test]
    fn test_resolve_wow64_process() {
        assert_eq!(resolve(&probe(X86_64, I386)), I386);
    }

    #[test]
    fn test_resolve_32_bit_os() {
        assert_eq!(resolve(&probe(I386, I386)), I386);
    }

    #[test]
    fn test_resolve_unknown_host() {
        assert_eq!(resolve(&probe(Unknown, Unknown)), Unknown);
        assert_eq!(resolve(&probe(Unknown, X86_64)), Unknown);
    }

    #[test]
    fn test_32_bit_os_never_overrides() {
        for process in [I386, X86_64, Unknown] {
            for requested in [I386, X86_64, Unknown] {
                assert!(!override_required(&probe(I386, process), requested));
            }
        }
    }

    #[test]
    fn test_64_bit_os_same_architecture() {
        assert!(!override_required(&probe(X86_64, X86_64), X86_64));
        assert!(!override_required(&probe(X86_64, I386), I386));
    }

    #[test]
    fn test_64_bit_os_differing_architecture() {
        assert!(override_required(&probe(X86_64, I386), X86_64));
        assert!(override_required(&probe(X86_64, X86_64), I386));
    }

    #[test]
    fn test_unknown_request_never_overrides() {
        assert!(!override_required(&probe(X86_64, I386), Unknown));
        assert!(!override_required(&probe(Unknown, I386), X86_64));
    }

    #[test]
    fn test_native_architecture() {
        assert_eq!(native_architecture(&probe(X86_64, I386)), X86_64);
    }

    #[test]
    fn test_parse() {
        assert_eq!("i386".parse::<Architecture>().unwrap(), I386);
        assert_eq!("X86".parse::<Architecture>().unwrap(), I386);
        assert_eq!("amd64".parse::<Architecture>().unwrap(), X86_64);
        assert_eq!(" x86_64 ".parse::<Architecture>().unwrap(), X86_64);
        assert!("arm".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        for arch in [I386, X86_64] {
            assert_eq!(arch.to_string().parse::<Architecture>().unwrap(), arch);
        }
        assert_eq!(Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&X86_64).unwrap(), "\"x86_64\"");
        let arch: Architecture = serde_json::from_str("\"i386\"").unwrap();
        assert_eq!(arch, I386);
    }
}
