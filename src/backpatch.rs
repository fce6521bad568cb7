//! The Backpatch Table (§4.5): deferred relocation of forward or
//! target-dependent references.

/// Marker classes (§4.5), non-exhaustive per the spec but covering every
/// named case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Marker {
    DictionaryWord = 1,
    StringLiteral = 2,
    SystemConstant = 3,
    InternalRoutine = 4,
    VeneerRoutine = 5,
    Array = 6,
    ObjectCount = 7,
    InheritedProperty = 8,
    IndividualPropertyTable = 9,
    InheritedIndividualProperty = 10,
    MainRoutine = 11,
    GenericSymbolValue = 12,
    GlobalVariable = 13,
    IndividualPropertyIdentifier = 14,
    Action = 15,
    Object = 16,
}

/// Which byte range the relocation targets (§4.5 "Entry format").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArea {
    DynamicData,
    Code,
    StringTable,
    GlobalVariableRegion,
    IndividualPropertyTable,
    ClassPrototypeTable,
    Header,
}

/// Width of the placeholder being patched, in bytes. The 32-bit target
/// allows 1/2/4; the 16-bit target effectively always uses 2 (its "long vs.
/// short" distinction is folded into `width` here rather than a separate
/// flag, since the bit is otherwise redundant with this field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte = 1,
    Word = 2,
    Dword = 4,
}

impl Width {
    pub fn bytes(self) -> usize {
        self as usize
    }
}

/// One backpatch record (§3 "Backpatch Entry").
#[derive(Debug, Clone, Copy)]
pub struct BackpatchEntry {
    pub marker: Marker,
    pub area: TargetArea,
    pub offset: u32,
    pub width: Width,
}

/// A per-area log of backpatch entries, plus the in-code log the output
/// assembler drives in lock-step with the dead-function map (§4.5
/// "Per-area backpatch logs").
#[derive(Debug, Default)]
pub struct BackpatchTable {
    code: Vec<BackpatchEntry>,
    dynamic_data: Vec<BackpatchEntry>,
    header: Vec<BackpatchEntry>,
}

/// A diagnostic raised when a resolved value does not fit its declared
/// width, per the §4.5 "Contract".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthOverflow {
    pub marker: Marker,
    pub offset: u32,
    pub width: Width,
    pub value: i64,
}

impl BackpatchTable {
    pub fn new() -> Self {
        BackpatchTable::default()
    }

    pub fn record(&mut self, marker: Marker, area: TargetArea, offset: u32, width: Width) {
        let entry = BackpatchEntry {
            marker,
            area,
            offset,
            width,
        };
        match area {
            TargetArea::DynamicData => self.dynamic_data.push(entry),
            TargetArea::Header => self.header.push(entry),
            _ => self.code.push(entry),
        }
    }

    pub fn code_entries(&self) -> &[BackpatchEntry] {
        &self.code
    }

    pub fn dynamic_data_entries(&self) -> &[BackpatchEntry] {
        &self.dynamic_data
    }

    pub fn header_entries(&self) -> &[BackpatchEntry] {
        &self.header
    }

    /// Check that a transformed value fits its declared width, per the
    /// §4.5 contract. Returns the value truncated to width on success.
    pub fn check_fits(entry: &BackpatchEntry, value: i64) -> Result<u32, WidthOverflow> {
        let max = match entry.width {
            Width::Byte => 0xFFu64,
            Width::Word => 0xFFFFu64,
            Width::Dword => 0xFFFF_FFFFu64,
        };
        if value < 0 || value as u64 > max {
            return Err(WidthOverflow {
                marker: entry.marker,
                offset: entry.offset,
                width: entry.width,
                value,
            });
        }
        Ok(value as u32)
    }

    /// Verify no two code-area entries straddle a boundary offset (used by
    /// the output assembler's rewrite loop, §4.7 step 3, to assert
    /// `j <= next_boundary`).
    pub fn assert_no_straddle(entry: &BackpatchEntry, boundary: u32) -> bool {
        entry.offset + entry.width.bytes() as u32 <= boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_filed_into_the_right_per_area_log() {
        let mut table = BackpatchTable::new();
        table.record(Marker::GlobalVariable, TargetArea::DynamicData, 4, Width::Word);
        table.record(Marker::InternalRoutine, TargetArea::Code, 100, Width::Dword);
        assert_eq!(table.dynamic_data_entries().len(), 1);
        assert_eq!(table.code_entries().len(), 1);
    }

    #[test]
    fn value_exceeding_width_is_rejected() {
        let entry = BackpatchEntry {
            marker: Marker::Object,
            area: TargetArea::Code,
            offset: 0,
            width: Width::Byte,
        };
        assert!(BackpatchTable::check_fits(&entry, 255).is_ok());
        assert!(BackpatchTable::check_fits(&entry, 256).is_err());
    }

    #[test]
    fn straddle_check_catches_boundary_crossing() {
        let entry = BackpatchEntry {
            marker: Marker::InternalRoutine,
            area: TargetArea::Code,
            offset: 98,
            width: Width::Dword,
        };
        assert!(!BackpatchTable::assert_no_straddle(&entry, 100));
        assert!(BackpatchTable::assert_no_straddle(&entry, 102));
    }
}
