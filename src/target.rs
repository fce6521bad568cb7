//! The target descriptor (§9 "Dual-target duplication" design note).
//!
//! The two VMs share almost every control path but differ in word width,
//! global-slot bound, checksum algorithm, and header layout. Rather than
//! duplicate the output assembler, every component that needs a
//! target-dependent constant asks a [`Target`] value for it.

/// Which VM bytecode family this compilation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The 16-bit word-oriented VM, versions 3-8.
    ZMachine { version: u8 },
    /// The 32-bit word-oriented VM.
    Glulx,
}

/// How a target's story-file checksum is computed (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    /// Unsigned 16-bit sum of every byte from offset 64 to end-of-file.
    ZMachineByteSum,
    /// 32-bit wrapping sum of the whole file read as big-endian 32-bit
    /// words, with the checksum field itself treated as zero.
    GlulxWordSum,
}

impl Target {
    /// Word size in bytes: 2 on the 16-bit target, 4 on the 32-bit target.
    pub fn word_size(self) -> u8 {
        match self {
            Target::ZMachine { .. } => 2,
            Target::Glulx => 4,
        }
    }

    /// Upper bound on the number of global-variable slots (§3 "Global
    /// Variable Slot"): fixed at 240 on the 16-bit target, configurable up
    /// to 512 on the 32-bit target.
    pub fn max_global_slots(self) -> u16 {
        match self {
            Target::ZMachine { .. } => 240,
            Target::Glulx => 512,
        }
    }

    /// Default slot count before any configuration override.
    pub fn default_global_slots(self) -> u16 {
        match self {
            Target::ZMachine { .. } => 240,
            Target::Glulx => 256,
        }
    }

    pub fn checksum_kind(self) -> ChecksumKind {
        match self {
            Target::ZMachine { .. } => ChecksumKind::ZMachineByteSum,
            Target::Glulx => ChecksumKind::GlulxWordSum,
        }
    }

    /// Whether float literals (`$+`, `$-`, ...) are legal on this target.
    /// Per §4.2, they are 32-bit-only.
    pub fn supports_float_literals(self) -> bool {
        matches!(self, Target::Glulx)
    }

    /// The VM's code-scale factor for packed addresses, per the GLOSSARY.
    pub fn code_scale_factor(self) -> u32 {
        match self {
            Target::ZMachine { version } if version <= 3 => 2,
            Target::ZMachine { version } if version <= 5 => 4,
            Target::ZMachine { .. } => 8,
            Target::Glulx => 1,
        }
    }

    pub fn is_zmachine(self) -> bool {
        matches!(self, Target::ZMachine { .. })
    }

    pub fn is_glulx(self) -> bool {
        matches!(self, Target::Glulx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_sizes_match_spec() {
        assert_eq!(Target::ZMachine { version: 5 }.word_size(), 2);
        assert_eq!(Target::Glulx.word_size(), 4);
    }

    #[test]
    fn only_glulx_supports_float_literals() {
        assert!(!Target::ZMachine { version: 8 }.supports_float_literals());
        assert!(Target::Glulx.supports_float_literals());
    }

    #[test]
    fn packed_address_scale_follows_version() {
        assert_eq!(Target::ZMachine { version: 3 }.code_scale_factor(), 2);
        assert_eq!(Target::ZMachine { version: 5 }.code_scale_factor(), 4);
        assert_eq!(Target::ZMachine { version: 8 }.code_scale_factor(), 8);
        assert_eq!(Target::Glulx.code_scale_factor(), 1);
    }
}
