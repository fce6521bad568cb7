//! The optional debugging-information file (§6): a separate, non-essential
//! sidecar that lets an external debugger map addresses back to source.

/// A line-reference record: 4 bytes, file index plus a big-endian line
/// number split high/low, plus column (§6 "line-reference format").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef {
    pub file_index: u8,
    pub line: u16,
    pub column: u8,
}

impl LineRef {
    pub fn encode(self) -> [u8; 4] {
        let [hi, lo] = self.line.to_be_bytes();
        [self.file_index, hi, lo, self.column]
    }
}

#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone)]
pub struct SourceFileRecord {
    pub name: String,
    pub includer_file_index: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct CodeLineRecord {
    pub function_name: String,
    pub code_offset: u32,
    pub source: LineRef,
}

const MAGIC: [u8; 2] = [0xDE, 0xBF];
const FORMAT_VERSION: u16 = 1;

/// Accumulates debug records and serializes them to the sidecar file format.
#[derive(Debug, Default)]
pub struct DebugInfoWriter {
    symbols: Vec<SymbolRecord>,
    source_files: Vec<SourceFileRecord>,
    code_lines: Vec<CodeLineRecord>,
}

impl DebugInfoWriter {
    pub fn new() -> Self {
        DebugInfoWriter::default()
    }

    pub fn add_symbol(&mut self, name: impl Into<String>, value: u32) {
        self.symbols.push(SymbolRecord { name: name.into(), value });
    }

    pub fn add_source_file(&mut self, name: impl Into<String>, includer_file_index: Option<u8>) {
        self.source_files.push(SourceFileRecord {
            name: name.into(),
            includer_file_index,
        });
    }

    pub fn add_code_line(&mut self, function_name: impl Into<String>, code_offset: u32, source: LineRef) {
        self.code_lines.push(CodeLineRecord {
            function_name: function_name.into(),
            code_offset,
            source,
        });
    }

    /// Serialize every accumulated record into the sidecar file's bytes.
    pub fn finish(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());

        write_section(&mut buf, b'S', self.symbols.len() as u32, |out| {
            for s in &self.symbols {
                write_pascal_string(out, &s.name);
                out.extend_from_slice(&s.value.to_be_bytes());
            }
        });

        write_section(&mut buf, b'F', self.source_files.len() as u32, |out| {
            for f in &self.source_files {
                write_pascal_string(out, &f.name);
                out.push(f.includer_file_index.unwrap_or(0xFF));
            }
        });

        write_section(&mut buf, b'L', self.code_lines.len() as u32, |out| {
            for l in &self.code_lines {
                write_pascal_string(out, &l.function_name);
                out.extend_from_slice(&l.code_offset.to_be_bytes());
                out.extend_from_slice(&l.source.encode());
            }
        });

        buf
    }
}

fn write_pascal_string(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    out.push(bytes.len().min(255) as u8);
    out.extend_from_slice(&bytes[..bytes.len().min(255)]);
}

fn write_section(buf: &mut Vec<u8>, tag: u8, count: u32, body: impl FnOnce(&mut Vec<u8>)) {
    buf.push(tag);
    buf.extend_from_slice(&count.to_be_bytes());
    body(buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_ref_encodes_to_four_bytes() {
        let r = LineRef { file_index: 2, line: 300, column: 5 };
        assert_eq!(r.encode(), [2, 1, 44, 5]); // 300 = 0x012C
    }

    #[test]
    fn finished_buffer_starts_with_magic_and_version() {
        let writer = DebugInfoWriter::new();
        let bytes = writer.finish();
        assert_eq!(&bytes[0..2], &[0xDE, 0xBF]);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 1);
    }

    #[test]
    fn symbol_records_round_trip_into_the_section() {
        let mut writer = DebugInfoWriter::new();
        writer.add_symbol("Foo", 0x1234);
        let bytes = writer.finish();
        assert!(bytes.windows(3).any(|w| w == b"Foo"));
    }
}
