//! Globals & Arrays (§4.4): the dynamic data area, starting with the fixed
//! global-variable slots and followed by the user's arrays.

use crate::backpatch::{BackpatchTable, Marker, TargetArea, Width};
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::source::SourceLocation;
use crate::target::Target;

/// The four array shapes from §3 "Dynamic Data Area".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayShape {
    /// `->`: N entries of 1 byte each, no header.
    Byte,
    /// `-->`: N entries of the target's word width, no header.
    Word,
    /// `string`: 1-byte length header, then up to 256 byte entries.
    StringArray,
    /// `table`: W-byte length header, then N word/dword entries.
    Table,
    /// `buffer`: W-byte capacity header, then N byte entries.
    Buffer,
}

/// One value to be written into a global slot or array entry: a known
/// constant, optionally carrying a relocation marker if it was a symbol
/// reference.
#[derive(Debug, Clone, Copy)]
pub struct ArrayValue {
    pub value: i64,
    pub marker: Option<Marker>,
}

impl ArrayValue {
    pub fn constant(value: i64) -> Self {
        ArrayValue { value, marker: None }
    }
}

/// A defined array's bookkeeping entry, stored in the parallel arrays named
/// by §3.
#[derive(Debug, Clone)]
pub struct ArrayRecord {
    pub symbol_index: usize,
    pub entries: usize,
    pub shape: ArrayShape,
    pub base_offset: u32,
}

/// One of the `G` global-variable slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalSlot {
    pub initial_value: i64,
    pub marker: Option<Marker>,
}

/// Manages the dynamic data area for one compilation (§4.4).
pub struct GlobalsAndArrays {
    target: Target,
    slot_count: u16,
    slots: Vec<GlobalSlot>,
    arrays: Vec<ArrayRecord>,
    bytes: Vec<u8>,
    /// Monotonic running total of globals + arrays emitted so far. Kept
    /// separate from `current_array_entry0_offset` per the Open Question
    /// decision recorded in DESIGN.md.
    dynamic_area_size: u32,
    /// Valid only while building one array: the offset of that array's
    /// entry 0 (i.e. just past its header).
    current_array_entry0_offset: Option<u32>,
    max_dynamic_area_size: u32,
}

impl GlobalsAndArrays {
    pub fn new(target: Target, slot_count: u16, max_dynamic_area_size: u32) -> Self {
        let slot_count = slot_count.min(target.max_global_slots());
        let word_size = target.word_size() as u32;
        let header_size = slot_count as u32 * word_size;
        GlobalsAndArrays {
            target,
            slot_count,
            slots: vec![GlobalSlot::default(); slot_count as usize],
            arrays: Vec::new(),
            bytes: vec![0; header_size as usize],
            dynamic_area_size: header_size,
            current_array_entry0_offset: None,
            max_dynamic_area_size,
        }
    }

    pub fn slot_count(&self) -> u16 {
        self.slot_count
    }

    pub fn dynamic_area_size(&self) -> u32 {
        self.dynamic_area_size
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn header_size(&self) -> u32 {
        self.slot_count as u32 * self.target.word_size() as u32
    }

    /// `Global NAME [ = EXPR ]` with an initializer expression (§4.4). If
    /// `value` carries a relocation marker, record a backpatch entry
    /// pointing at the slot.
    pub fn define_global(
        &mut self,
        slot: u16,
        value: ArrayValue,
        backpatch: &mut BackpatchTable,
    ) -> Result<(), String> {
        if slot as usize >= self.slots.len() {
            return Err(format!(
                "global variable slot {slot} exceeds the configured slot count {}",
                self.slots.len()
            ));
        }
        self.slots[slot as usize] = GlobalSlot {
            initial_value: value.value,
            marker: value.marker,
        };
        let word_size = self.target.word_size() as usize;
        let offset = slot as usize * word_size;
        self.write_word_at(offset, value.value, word_size);
        if let Some(marker) = value.marker {
            backpatch.record(
                marker,
                TargetArea::GlobalVariableRegion,
                offset as u32,
                width_for(word_size),
            );
        }
        Ok(())
    }

    /// `Array NAME <shape> <body>` (§4.4). Returns the symbol value to
    /// assign: on the 32-bit target this is the offset relative to the
    /// start of the array region (after the global block); on the 16-bit
    /// target it is the offset relative to the dynamic-data-area base.
    pub fn define_array(
        &mut self,
        symbol_index: usize,
        shape: ArrayShape,
        mut values: Vec<ArrayValue>,
        diagnostics: &mut DiagnosticSink,
        location: SourceLocation,
        backpatch: &mut BackpatchTable,
    ) -> Result<u32, String> {
        let word_size = self.target.word_size() as usize;

        if matches!(shape, ArrayShape::StringArray) && values.len() > 256 {
            diagnostics.error(
                format!(
                    "string array has {} entries, more than the maximum of 256; truncated",
                    values.len()
                ),
                Some(location),
            );
            values.truncate(256);
        }

        if matches!(shape, ArrayShape::Byte | ArrayShape::Buffer | ArrayShape::StringArray) {
            for v in &mut values {
                if v.marker.is_none() && !(0..=255).contains(&v.value) {
                    diagnostics.warning(
                        format!(
                            "byte array entry {} out of range 0..255; stored as 0",
                            v.value
                        ),
                        Some(location),
                    );
                    v.value = 0;
                }
            }
        }

        let header_bytes: usize = match shape {
            ArrayShape::Byte | ArrayShape::Word => 0,
            ArrayShape::StringArray => 1,
            ArrayShape::Table | ArrayShape::Buffer => word_size,
        };
        let entry_size: usize = match shape {
            ArrayShape::Byte | ArrayShape::StringArray | ArrayShape::Buffer => 1,
            ArrayShape::Word | ArrayShape::Table => word_size,
        };

        let base_offset = self.dynamic_area_size;
        let entry0_offset = base_offset + header_bytes as u32;
        self.current_array_entry0_offset = Some(entry0_offset);

        let total_bytes = header_bytes + values.len() * entry_size;
        let new_size = self.dynamic_area_size + total_bytes as u32;
        if new_size > self.max_dynamic_area_size {
            return Err(format!(
                "memory overflow: dynamic data area would exceed MAX_DYNAMIC_STRINGS/MAX_ARRAYS-style setting ({} > {})",
                new_size, self.max_dynamic_area_size
            ));
        }

        self.bytes.resize(new_size as usize, 0);

        if header_bytes > 0 {
            let header_value = match shape {
                ArrayShape::StringArray => values.len() as i64,
                _ => values.len() as i64,
            };
            self.write_word_at(base_offset as usize, header_value, header_bytes);
        }

        for (i, v) in values.iter().enumerate() {
            let offset = entry0_offset as usize + i * entry_size;
            self.write_word_at(offset, v.value, entry_size);
            if let Some(marker) = v.marker {
                backpatch.record(marker, TargetArea::DynamicData, offset as u32, width_for(entry_size));
            }
        }

        self.arrays.push(ArrayRecord {
            symbol_index,
            entries: values.len(),
            shape,
            base_offset,
        });

        self.dynamic_area_size = new_size;
        self.current_array_entry0_offset = None;

        let symbol_value = if self.target.is_glulx() {
            base_offset - self.header_size()
        } else {
            base_offset
        };
        Ok(symbol_value)
    }

    pub fn arrays(&self) -> &[ArrayRecord] {
        &self.arrays
    }

    fn write_word_at(&mut self, offset: usize, value: i64, width: usize) {
        let bytes = (value as u32).to_be_bytes();
        let start = 4 - width;
        self.bytes[offset..offset + width].copy_from_slice(&bytes[start..]);
    }
}

fn width_for(bytes: usize) -> Width {
    match bytes {
        1 => Width::Byte,
        2 => Width::Word,
        _ => Width::Dword,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_array_lays_out_big_endian_entries() {
        let mut g = GlobalsAndArrays::new(Target::ZMachine { version: 5 }, 240, 0x10000);
        let mut bp = BackpatchTable::new();
        let mut diags = DiagnosticSink::new();
        let value = g
            .define_array(
                0,
                ArrayShape::Word,
                vec![
                    ArrayValue::constant(1),
                    ArrayValue::constant(2),
                    ArrayValue::constant(3),
                ],
                &mut diags,
                SourceLocation::synthetic(),
                &mut bp,
            )
            .unwrap();
        assert_eq!(value, 480);
        let base = 480usize;
        assert_eq!(&g.bytes()[base..base + 6], &[0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);
    }

    #[test]
    fn string_array_has_length_prefixed_header() {
        let mut g = GlobalsAndArrays::new(Target::ZMachine { version: 5 }, 240, 0x10000);
        let mut bp = BackpatchTable::new();
        let mut diags = DiagnosticSink::new();
        let base = g
            .define_array(
                0,
                ArrayShape::StringArray,
                vec![ArrayValue::constant(b'a' as i64), ArrayValue::constant(b'b' as i64)],
                &mut diags,
                SourceLocation::synthetic(),
                &mut bp,
            )
            .unwrap() as usize;
        assert_eq!(g.bytes()[base], 2);
        assert_eq!(&g.bytes()[base + 1..base + 3], b"ab");
    }

    #[test]
    fn string_array_over_256_entries_is_truncated_with_error() {
        let mut g = GlobalsAndArrays::new(Target::ZMachine { version: 5 }, 240, 0x100000);
        let mut bp = BackpatchTable::new();
        let mut diags = DiagnosticSink::new();
        let values: Vec<_> = (0..257).map(|_| ArrayValue::constant(1)).collect();
        g.define_array(
            0,
            ArrayShape::StringArray,
            values,
            &mut diags,
            SourceLocation::synthetic(),
            &mut bp,
        )
        .unwrap();
        assert!(diags.has_errors());
        assert_eq!(g.arrays()[0].entries, 256);
    }

    #[test]
    fn byte_array_entry_of_256_warns_and_stores_zero() {
        let mut g = GlobalsAndArrays::new(Target::ZMachine { version: 5 }, 240, 0x10000);
        let mut bp = BackpatchTable::new();
        let mut diags = DiagnosticSink::new();
        let base = g
            .define_array(
                0,
                ArrayShape::Byte,
                vec![ArrayValue::constant(256)],
                &mut diags,
                SourceLocation::synthetic(),
                &mut bp,
            )
            .unwrap() as usize;
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(g.bytes()[base], 0);
    }

    #[test]
    fn dynamic_area_overflow_is_fatal() {
        let mut g = GlobalsAndArrays::new(Target::ZMachine { version: 5 }, 240, 10);
        let mut bp = BackpatchTable::new();
        let mut diags = DiagnosticSink::new();
        let result = g.define_array(
            0,
            ArrayShape::Byte,
            vec![ArrayValue::constant(1); 100],
            &mut diags,
            SourceLocation::synthetic(),
            &mut bp,
        );
        assert!(result.is_err());
    }

    #[test]
    fn glulx_array_symbol_value_is_relative_to_array_region() {
        let mut g = GlobalsAndArrays::new(Target::Glulx, 100, 0x10000);
        let mut bp = BackpatchTable::new();
        let mut diags = DiagnosticSink::new();
        let value = g
            .define_array(
                0,
                ArrayShape::Byte,
                vec![ArrayValue::constant(1)],
                &mut diags,
                SourceLocation::synthetic(),
                &mut bp,
            )
            .unwrap();
        assert_eq!(value, 0);
    }
}
