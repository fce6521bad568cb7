//! The Output Assembler (§4.7): shared code-rewrite plumbing used by both
//! the [`zmachine`] and [`glulx`] target writers.

pub mod debug_info;
pub mod glulx;
pub mod zmachine;

use crate::backpatch::{BackpatchEntry, BackpatchTable};
use crate::deadcode::DeadFunctionMap;

/// A trait for a growable output buffer, matching the teacher's
/// `WritableBuffer` (`src/write/util.rs`): reserve once, then append.
pub trait OutputBuffer {
    fn write_bytes(&mut self, bytes: &[u8]);
    fn resize(&mut self, new_len: usize);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputBuffer for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
    fn resize(&mut self, new_len: usize) {
        if new_len > self.len() {
            std::vec::Vec::resize(self, new_len, 0);
        }
    }
    fn len(&self) -> usize {
        Vec::len(self)
    }
}

fn read_be(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for &b in bytes {
        value = (value << 8) | b as u64;
    }
    value
}

fn write_be(out: &mut Vec<u8>, value: u32, width: usize) {
    let full = value.to_be_bytes();
    out.extend_from_slice(&full[4 - width..]);
}

/// The §4.7 "Code rewrite protocol": walk `code` in tandem with the
/// (offset-ascending) backpatch `entries`, copying live bytes through
/// unchanged, transforming backpatch placeholders via `transform`, and
/// discarding bytes that belong to a dead (stripped) function.
///
/// `transform` receives the entry and the raw placeholder value and returns
/// the value to substitute; it is expected to consult the symbol table and
/// [`DeadFunctionMap::translate`] as appropriate for the entry's marker.
pub fn rewrite_code(
    code: &[u8],
    entries: &[BackpatchEntry],
    dead: &DeadFunctionMap,
    mut transform: impl FnMut(&BackpatchEntry, u64) -> Result<u32, String>,
) -> Result<Vec<u8>, String> {
    let boundaries: Vec<(u32, bool)> = dead.iter_boundaries().collect();
    let mut boundary_idx = 0usize;
    let mut current_live = boundaries.first().map(|b| b.1).unwrap_or(true);
    let mut out = Vec::with_capacity(code.len());
    let mut j: u32 = 0;

    let advance_boundary = |j: u32, boundary_idx: &mut usize, current_live: &mut bool| {
        while *boundary_idx < boundaries.len() && j >= boundaries[*boundary_idx].0 {
            *boundary_idx += 1;
            if *boundary_idx < boundaries.len() {
                *current_live = boundaries[*boundary_idx].1;
            }
        }
    };

    for entry in entries {
        while j < entry.offset {
            advance_boundary(j, &mut boundary_idx, &mut current_live);
            if current_live {
                out.push(code[j as usize]);
            }
            j += 1;
        }
        advance_boundary(j, &mut boundary_idx, &mut current_live);

        let width = entry.width.bytes();
        let raw = read_be(&code[j as usize..j as usize + width]);

        if current_live {
            let transformed = transform(entry, raw)?;
            let fit = BackpatchTable::check_fits(entry, transformed as i64)
                .map_err(|e| format!("relocated value {:?} does not fit width {:?}", e.value, e.width))?;
            write_be(&mut out, fit, width);
        }
        j += width as u32;

        if boundary_idx < boundaries.len() {
            let next_boundary = boundaries[boundary_idx].0;
            if j > next_boundary {
                return Err(format!(
                    "backpatch record at offset {} straddles a function boundary at {}",
                    entry.offset, next_boundary
                ));
            }
        }
    }

    while (j as usize) < code.len() {
        advance_boundary(j, &mut boundary_idx, &mut current_live);
        if current_live {
            out.push(code[j as usize]);
        }
        j += 1;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backpatch::{Marker, TargetArea, Width};
    use crate::source::SourceLocation;

    #[test]
    fn dead_function_bytes_are_dropped_and_live_ones_kept() {
        let code = vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
        let mut dead = DeadFunctionMap::new(true);
        let loc = SourceLocation::synthetic();
        let a = dead.begin_function("A", loc, false, 0, false); // dead
        dead.end_function(a, 3);
        let b = dead.begin_function("B", loc, false, 3, false); // live
        dead.end_function(b, 6);
        dead.mark_main(b);
        dead.compute_reachability(|_| None);
        dead.close();

        let entries = [];
        let result = rewrite_code(&code, &entries, &dead, |_, _| Ok(0)).unwrap();
        assert_eq!(result, vec![0xDD, 0xEE, 0xFF]);
    }

    #[test]
    fn backpatch_entry_is_transformed_in_place() {
        let mut code = vec![0u8; 8];
        code[4..8].copy_from_slice(&0xDEADBEEFu32.to_be_bytes());
        let mut dead = DeadFunctionMap::new(true);
        let loc = SourceLocation::synthetic();
        let f = dead.begin_function("F", loc, false, 0, false);
        dead.end_function(f, 8);
        dead.mark_main(f);
        dead.compute_reachability(|_| None);
        dead.close();

        let entry = BackpatchEntry {
            marker: Marker::GenericSymbolValue,
            area: TargetArea::Code,
            offset: 4,
            width: Width::Dword,
        };
        let result = rewrite_code(&code, &[entry], &dead, |_, _| Ok(0x1234_5678)).unwrap();
        assert_eq!(&result[4..8], &0x1234_5678u32.to_be_bytes());
    }
}
