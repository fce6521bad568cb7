//! The 16-bit target's story-file layout (§4.7): a 64-byte header, the
//! header-paged dynamic memory region, the compiled-code area, the static
//! strings area, and (in module mode) trailing link-data.

use crate::diagnostics::DiagnosticSink;
use crate::target::Target;

/// Fields the caller supplies for the 64-byte header; everything not named
/// here (interpreter number, screen dimensions, and the rest of the runtime
/// negotiation fields) is outside the core's scope per §1 and is left zero.
#[derive(Debug, Clone)]
pub struct HeaderFields {
    pub version: u8,
    pub release_number: u16,
    pub serial_number: [u8; 6],
    pub flags1: u8,
    pub flags2: u16,
    pub initial_pc: u16,
    pub dictionary_address: u16,
    pub object_table_address: u16,
    pub abbreviations_address: u16,
}

const HEADER_SIZE: usize = 64;

/// Assemble a complete story file. `dynamic_data` is the globals+arrays
/// region (already built by [`crate::globals::GlobalsAndArrays`]);
/// `code` is the dead-code-stripped, backpatched routine area; `static_strings`
/// is the packed string-literal area. When `module_mode` is set, the file is
/// an unresolved `.zix`-style module and `link_data` (a serialized record of
/// the remaining unresolved backpatch entries) is appended before the final
/// padding instead of being silently discarded.
pub fn assemble(
    target: Target,
    header: &HeaderFields,
    dynamic_data: &[u8],
    code: &[u8],
    static_strings: &[u8],
    module_mode: bool,
    link_data: &[u8],
    diagnostics: &mut DiagnosticSink,
) -> Vec<u8> {
    assert!(target.is_zmachine(), "zmachine::assemble called with a non-zmachine target");
    let scale = target.code_scale_factor() as usize;

    let mut buf = vec![0u8; HEADER_SIZE];
    buf.extend_from_slice(dynamic_data);

    pad_to(&mut buf, scale);
    let code_start = buf.len();
    buf.extend_from_slice(code);

    pad_to(&mut buf, scale);
    let static_strings_start = buf.len();
    buf.extend_from_slice(static_strings);

    if module_mode {
        buf.extend_from_slice(link_data);
    }

    pad_to(&mut buf, 512);

    if buf.len() > 0x0002_0000 && header.version <= 3 {
        diagnostics.warning(
            format!("story file is {} bytes, beyond what version 3 can address", buf.len()),
            None,
        );
    }

    write_header(&mut buf, header, code_start, static_strings_start);
    let checksum = checksum_bytes(&buf[HEADER_SIZE..]);
    buf[28..30].copy_from_slice(&checksum.to_be_bytes());

    buf
}

fn pad_to(buf: &mut Vec<u8>, align: usize) {
    while buf.len() % align != 0 {
        buf.push(0);
    }
}

fn write_header(buf: &mut [u8], header: &HeaderFields, code_start: usize, static_strings_start: usize) {
    buf[0] = header.version;
    buf[1] = header.flags1;
    buf[2..4].copy_from_slice(&header.release_number.to_be_bytes());
    buf[4..6].copy_from_slice(&(code_start as u16).to_be_bytes());
    buf[6..8].copy_from_slice(&header.initial_pc.to_be_bytes());
    buf[8..10].copy_from_slice(&header.dictionary_address.to_be_bytes());
    buf[10..12].copy_from_slice(&header.object_table_address.to_be_bytes());
    buf[12..14].copy_from_slice(&(HEADER_SIZE as u16).to_be_bytes());
    buf[14..16].copy_from_slice(&(static_strings_start as u16).to_be_bytes());
    buf[16..18].copy_from_slice(&header.flags2.to_be_bytes());
    buf[18..24].copy_from_slice(&header.serial_number);
    buf[24..26].copy_from_slice(&header.abbreviations_address.to_be_bytes());

    let divisor = match header.version {
        1..=3 => 2u32,
        4 | 5 => 4,
        _ => 8,
    };
    let length_field = (buf.len() as u32 / divisor) as u16;
    buf[26..28].copy_from_slice(&length_field.to_be_bytes());
}

/// Unsigned 16-bit sum of every byte, per the §4.7 checksum rule.
fn checksum_bytes(bytes: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    for &b in bytes {
        sum = sum.wrapping_add(b as u32);
    }
    (sum & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> HeaderFields {
        HeaderFields {
            version: 5,
            release_number: 1,
            serial_number: *b"260801",
            flags1: 0,
            flags2: 0,
            initial_pc: 0,
            dictionary_address: 0,
            object_table_address: 0,
            abbreviations_address: 0,
        }
    }

    #[test]
    fn file_is_padded_to_a_512_byte_boundary() {
        let mut diags = DiagnosticSink::new();
        let file = assemble(
            Target::ZMachine { version: 5 },
            &sample_header(),
            &[0u8; 10],
            &[0u8; 3],
            &[0u8; 1],
            false,
            &[],
            &mut diags,
        );
        assert_eq!(file.len() % 512, 0);
    }

    #[test]
    fn dynamic_data_area_starts_right_after_the_header() {
        let mut diags = DiagnosticSink::new();
        let file = assemble(
            Target::ZMachine { version: 5 },
            &sample_header(),
            &[0xAB, 0xCD],
            &[],
            &[],
            false,
            &[],
            &mut diags,
        );
        assert_eq!(u16::from_be_bytes([file[12], file[13]]), 64);
        assert_eq!(&file[64..66], &[0xAB, 0xCD]);
    }

    #[test]
    fn checksum_is_sum_of_bytes_after_the_header() {
        let mut diags = DiagnosticSink::new();
        let file = assemble(
            Target::ZMachine { version: 5 },
            &sample_header(),
            &[1, 2, 3],
            &[],
            &[],
            false,
            &[],
            &mut diags,
        );
        let expected = checksum_bytes(&file[64..]);
        let actual = u16::from_be_bytes([file[28], file[29]]);
        assert_eq!(actual, expected);
    }

    #[test]
    fn module_mode_appends_link_data_before_padding() {
        let mut diags = DiagnosticSink::new();
        let file = assemble(
            Target::ZMachine { version: 5 },
            &sample_header(),
            &[],
            &[0xEE],
            &[],
            true,
            &[0x01, 0x02, 0x03, 0x04],
            &mut diags,
        );
        assert!(file.windows(4).any(|w| w == [0x01, 0x02, 0x03, 0x04]));
    }
}
