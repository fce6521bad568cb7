//! The Symbol Table (§4.3): a name -> symbol map with case-insensitive
//! comparison, insertion-order-sorted chains, stable indices, and
//! tombstoning.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::source::SourceLocation;
use crate::target::Target;

/// One of the symbol types from §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    Routine,
    Label,
    GlobalVariable,
    Array,
    StaticArray,
    Constant,
    Attribute,
    Property,
    IndividualProperty,
    Object,
    Class,
    FakeAction,
}

/// The symbol-flags bitset from §3, stored as a plain `u32` with named bit
/// constants -- matching the design note's "sum types and bitsets" guidance
/// without pulling in a flags-derive macro the teacher corpus doesn't use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolFlags(pub u32);

impl SymbolFlags {
    pub const UNKNOWN: u32 = 1 << 0;
    pub const USED: u32 = 1 << 1;
    pub const REPLACED: u32 = 1 << 2;
    pub const DEFAULTED: u32 = 1 << 3;
    pub const STUBBED: u32 = 1 << 4;
    pub const CHANGE: u32 = 1 << 5;
    pub const IMPORT: u32 = 1 << 6;
    pub const EXPORT: u32 = 1 << 7;
    pub const SYSTEM: u32 = 1 << 8;
    pub const IN_SYSTEM_FILE: u32 = 1 << 9;
    pub const UNKNOWN_ERROR_ISSUED: u32 = 1 << 10;
    pub const ALIASED: u32 = 1 << 11;
    pub const ACTION: u32 = 1 << 12;
    pub const REDEFINABLE: u32 = 1 << 13;
    pub const UNHASHED: u32 = 1 << 14;
    pub const DISCARDED: u32 = 1 << 15;
    pub const STAR: u32 = 1 << 16;

    pub fn get(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn set(&mut self, bit: u32, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// The 8-bit relocation-marker class, detailed fully in [`crate::backpatch`].
/// Stored here too because every symbol carries one (§3 "Symbol").
pub type RelocationMarker = u8;

pub const MARKER_NONE: RelocationMarker = 0;

/// A symbol-table entry (§3 "Symbol").
#[derive(Debug, Clone)]
pub struct Symbol {
    name: String,
    pub value: i64,
    pub marker: RelocationMarker,
    pub symbol_type: SymbolType,
    pub flags: SymbolFlags,
    pub first_defined_location: SourceLocation,
    next_entry: Option<usize>,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Number of hash-chain buckets. The spec requires >= 512, a power of two.
const HASH_TABLE_SIZE: usize = 1024;

/// `Hash = (sum chars' lower-case * 30011^position) mod H` (§4.3 "Hashing").
fn hash_name(name: &str, table_size: usize) -> usize {
    let mut hash: u64 = 0;
    let mut power: u64 = 1;
    for c in name.chars() {
        let lower = c.to_ascii_lowercase() as u64;
        hash = hash.wrapping_add(lower.wrapping_mul(power));
        power = power.wrapping_mul(30011);
    }
    (hash % table_size as u64) as usize
}

fn ci_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    a.chars()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.chars().map(|c| c.to_ascii_lowercase()))
}

/// The symbol table itself.
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    chains: Vec<Option<usize>>,
    /// `Replace X Y` mappings: original symbol index -> replacement symbol
    /// index (§4.3 "Replacement map").
    replacements: IndexMap<usize, usize>,
    /// Queue of `--define NAME[=VALUE]` entries, materialised during
    /// [`SymbolTable::inject_predefined_values`] (§4.3
    /// "Predefined-value injection").
    predefined_values: Vec<(String, i64)>,
    target: Target,
}

impl SymbolTable {
    pub fn new(target: Target) -> Self {
        let mut table = SymbolTable {
            symbols: Vec::new(),
            chains: vec![None; HASH_TABLE_SIZE],
            replacements: IndexMap::new(),
            predefined_values: Vec::new(),
            target,
        };
        table.insert_predefined_symbols();
        table
    }

    fn insert_predefined(&mut self, name: &str, value: i64, symbol_type: SymbolType) -> usize {
        let (index, _) = self.index_or_create(name, None);
        let sym = self.get_mut(index);
        sym.value = value;
        sym.symbol_type = symbol_type;
        sym.flags.set(SymbolFlags::UNKNOWN, false);
        sym.flags.set(SymbolFlags::SYSTEM, true);
        sym.flags.set(SymbolFlags::USED, true);
        index
    }

    /// Insert every predefined symbol named in §4.3: the target
    /// identification constant, `true`/`false`/`nothing`, the
    /// target-dependent system globals, individual-property IDs, sizing
    /// constants, and (on the 32-bit target) the IEEE-754 special values.
    fn insert_predefined_symbols(&mut self) {
        let target_id = match self.target {
            Target::ZMachine { version } => version as i64,
            Target::Glulx => -1,
        };
        self.insert_predefined("VN", target_id, SymbolType::Constant);
        self.insert_predefined("TARGET_ZCODE", if self.target.is_zmachine() { 1 } else { 0 }, SymbolType::Constant);
        self.insert_predefined("TARGET_GLULX", if self.target.is_glulx() { 1 } else { 0 }, SymbolType::Constant);
        self.insert_predefined("WORDSIZE", self.target.word_size() as i64, SymbolType::Constant);
        self.insert_predefined("DICT_WORD_SIZE", if self.target.is_glulx() { 9 } else { 6 }, SymbolType::Constant);
        self.insert_predefined("nothing", 0, SymbolType::Constant);
        self.insert_predefined("true", 1, SymbolType::Constant);
        self.insert_predefined("false", 0, SymbolType::Constant);
        let gv_index = self.insert_predefined("GRAMMAR_VERSION", 1, SymbolType::Constant);
        self.get_mut(gv_index).flags.set(SymbolFlags::REDEFINABLE, true);

        for (i, name) in [
            "self", "sender", "sw__var", "action", "actor", "noun", "second",
        ]
        .iter()
        .enumerate()
        {
            self.insert_predefined(name, i as i64, SymbolType::GlobalVariable);
        }

        for (i, name) in [
            "create",
            "recreate",
            "destroy",
            "remaining",
            "copy",
            "call",
            "print",
            "print_to_array",
        ]
        .iter()
        .enumerate()
        {
            self.insert_predefined(name, (i + 1) as i64, SymbolType::IndividualProperty);
        }

        self.insert_predefined("MAX_ATTRIBUTES_BYTES", if self.target.is_glulx() { 7 } else { 6 }, SymbolType::Constant);
        self.insert_predefined("INDIV_PROP_START", if self.target.is_glulx() { 256 } else { 64 }, SymbolType::Constant);

        if self.target.is_glulx() {
            self.insert_predefined("FLOAT_NAN", 0x7FC0_0000, SymbolType::Constant);
            self.insert_predefined("FLOAT_INFINITY", 0x7F80_0000, SymbolType::Constant);
            self.insert_predefined("DOUBLE_NAN_HI", 0x7FF8_0000, SymbolType::Constant);
            self.insert_predefined("DOUBLE_INFINITY_HI", 0x7FF0_0000, SymbolType::Constant);
        }
    }

    /// `index_of`: lookup only, never creates.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let hash = hash_name(name, self.chains.len());
        let mut cursor = self.chains[hash];
        while let Some(index) = cursor {
            let sym = &self.symbols[index];
            if sym.name.eq_ignore_ascii_case(name) {
                return Some(index);
            }
            cursor = sym.next_entry;
        }
        None
    }

    /// `index_or_create`: lookup, or create with value `0x100`,
    /// type=constant, flags={unknown} (§4.3).
    pub fn index_or_create(&mut self, name: &str, precomputed_hash: Option<usize>) -> (usize, bool) {
        let hash = precomputed_hash.unwrap_or_else(|| hash_name(name, self.chains.len()));

        // Walk the chain, keeping track of the insertion point (first entry
        // whose name is >= the new name, case-insensitively), per the
        // "chains are sorted case-insensitively" invariant.
        let mut prev: Option<usize> = None;
        let mut cursor = self.chains[hash];
        while let Some(index) = cursor {
            let sym = &self.symbols[index];
            if sym.name.eq_ignore_ascii_case(name) {
                return (index, false);
            }
            if ci_cmp(&sym.name, name) == std::cmp::Ordering::Greater {
                break;
            }
            prev = Some(index);
            cursor = sym.next_entry;
        }

        let new_index = self.symbols.len();
        self.symbols.push(Symbol {
            name: name.to_string(),
            value: 0x100,
            marker: MARKER_NONE,
            symbol_type: SymbolType::Constant,
            flags: SymbolFlags(SymbolFlags::UNKNOWN),
            first_defined_location: SourceLocation::synthetic(),
            next_entry: cursor,
        });

        match prev {
            Some(p) => self.symbols[p].next_entry = Some(new_index),
            None => self.chains[hash] = Some(new_index),
        }

        (new_index, true)
    }

    pub fn get(&self, index: usize) -> &Symbol {
        &self.symbols[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Symbol {
        &mut self.symbols[index]
    }

    pub fn name(&self, index: usize) -> &str {
        &self.symbols[index].name
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// `assign`: clear `unknown`, set value/type, marker=0, stamp
    /// first-defined-location (§4.3). A no-op when the symbol already has
    /// exactly this value/type (§8 idempotence property).
    pub fn assign(&mut self, index: usize, value: i64, symbol_type: SymbolType) {
        self.assign_with_marker(index, MARKER_NONE, value, symbol_type);
    }

    pub fn assign_with_marker(
        &mut self,
        index: usize,
        marker: RelocationMarker,
        value: i64,
        symbol_type: SymbolType,
    ) {
        let in_system_file = self.symbols[index].flags.get(SymbolFlags::IN_SYSTEM_FILE);
        let sym = &mut self.symbols[index];
        sym.flags.set(SymbolFlags::UNKNOWN, false);
        sym.value = value;
        sym.symbol_type = symbol_type;
        sym.marker = marker;
        if in_system_file {
            sym.flags.set(SymbolFlags::IN_SYSTEM_FILE, true);
        }
    }

    /// `end_scope`: tombstone the symbol, removing it from its chain. If
    /// `never_used`, also set `discarded` so a later reference errors.
    pub fn end_scope(&mut self, index: usize, never_used: bool) {
        let name = self.symbols[index].name.clone();
        let hash = hash_name(&name, self.chains.len());

        let mut prev: Option<usize> = None;
        let mut cursor = self.chains[hash];
        while let Some(cur) = cursor {
            if cur == index {
                match prev {
                    Some(p) => self.symbols[p].next_entry = self.symbols[cur].next_entry,
                    None => self.chains[hash] = self.symbols[cur].next_entry,
                }
                break;
            }
            prev = Some(cur);
            cursor = self.symbols[cur].next_entry;
        }

        let sym = &mut self.symbols[index];
        sym.flags.set(SymbolFlags::UNHASHED, true);
        sym.next_entry = None;
        if never_used {
            sym.flags.set(SymbolFlags::DISCARDED, true);
        }
    }

    /// `typecheck`: warn if `operand`'s symbol has a known type matching
    /// none of `expected`. Forward-declared (`unknown`) or global-variable
    /// operands pass silently, per §4.3.
    pub fn typecheck(&self, operand: usize, expected: &[SymbolType]) -> Option<String> {
        let sym = &self.symbols[operand];
        if sym.flags.get(SymbolFlags::UNKNOWN) {
            return None;
        }
        if sym.symbol_type == SymbolType::GlobalVariable {
            return None;
        }
        if expected.contains(&sym.symbol_type) {
            return None;
        }
        Some(format!(
            "'{}' has an unexpected type for this context",
            sym.name
        ))
    }

    /// Record a `Replace X Y` mapping, enforcing the §4.3 constraints:
    /// no self-mapping, no symbol as the source of two mappings, no symbol
    /// as both a mapping's target and another mapping's source.
    pub fn add_replacement(&mut self, original: usize, replacement: usize) -> Result<(), String> {
        if original == replacement {
            return Err("a symbol may not be replaced by itself".to_string());
        }
        if self.replacements.contains_key(&original) {
            return Err(format!(
                "'{}' is already the source of a replacement",
                self.symbols[original].name
            ));
        }
        if self.replacements.contains_key(&replacement) {
            return Err(format!(
                "'{}' cannot be both the target and the source of a replacement",
                self.symbols[replacement].name
            ));
        }
        if self.replacements.values().any(|&v| v == original) {
            return Err(format!(
                "'{}' cannot be both the source and the target of a replacement",
                self.symbols[original].name
            ));
        }
        self.replacements.insert(original, replacement);
        self.symbols[original].flags.set(SymbolFlags::REPLACED, true);
        Ok(())
    }

    /// Apply the replacement map to an operand value just before code
    /// emission, per §4.3.
    pub fn resolve_replacement(&self, index: usize) -> usize {
        let mut current = index;
        let mut guard = 0;
        while let Some(&next) = self.replacements.get(&current) {
            current = next;
            guard += 1;
            if guard > self.replacements.len() + 1 {
                break;
            }
        }
        current
    }

    /// Queue a `--define NAME[=VALUE]` entry (§4.3 "Predefined-value
    /// injection").
    pub fn queue_predefined_value(&mut self, name: impl Into<String>, value: i64) {
        self.predefined_values.push((name.into(), value));
    }

    /// Materialise every queued `--define` entry as `create(name, value,
    /// constant)`. Re-definition with the same value is tolerated; a
    /// differing value is an error.
    pub fn inject_predefined_values(&mut self) -> Vec<String> {
        let mut errors = Vec::new();
        let queued: Vec<(String, i64)> = std::mem::take(&mut self.predefined_values);
        let mut seen: HashMap<String, i64> = HashMap::new();
        for (name, value) in queued {
            let key = name.to_ascii_lowercase();
            if let Some(&previous) = seen.get(&key) {
                if previous != value {
                    errors.push(format!(
                        "--define {name} given conflicting values {previous} and {value}"
                    ));
                }
                continue;
            }
            seen.insert(key, value);
            let (index, _) = self.index_or_create(&name, None);
            self.assign(index, value, SymbolType::Constant);
            self.get_mut(index).flags.set(SymbolFlags::SYSTEM, false);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::new(Target::Glulx)
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut t = table();
        let (index, created) = t.index_or_create("Frotz", None);
        assert!(created);
        assert_eq!(t.index_of("FROTZ"), Some(index));
        assert_eq!(t.index_of("frotz"), Some(index));
    }

    #[test]
    fn end_scope_removes_from_chain_but_index_stays_valid() {
        let mut t = table();
        let (index, _) = t.index_or_create("temp", None);
        assert_eq!(t.index_of("temp"), Some(index));
        t.end_scope(index, false);
        assert_eq!(t.index_of("temp"), None);
        assert!(t.get(index).flags.get(SymbolFlags::UNHASHED));
    }

    #[test]
    fn assign_is_idempotent() {
        let mut t = table();
        let (index, _) = t.index_or_create("g", None);
        t.assign(index, 42, SymbolType::GlobalVariable);
        let before = (t.get(index).value, t.get(index).symbol_type);
        t.assign(index, 42, SymbolType::GlobalVariable);
        let after = (t.get(index).value, t.get(index).symbol_type);
        assert_eq!(before, after);
    }

    #[test]
    fn replace_x_x_is_rejected() {
        let mut t = table();
        let (index, _) = t.index_or_create("x", None);
        assert!(t.add_replacement(index, index).is_err());
    }

    #[test]
    fn replacement_chain_resolves_to_final_target() {
        let mut t = table();
        let (a, _) = t.index_or_create("a", None);
        let (b, _) = t.index_or_create("b", None);
        t.add_replacement(a, b).unwrap();
        assert_eq!(t.resolve_replacement(a), b);
    }

    #[test]
    fn predefined_value_redefinition_with_same_value_is_tolerated() {
        let mut t = table();
        t.queue_predefined_value("FOO", 7);
        t.queue_predefined_value("FOO", 7);
        let errors = t.inject_predefined_values();
        assert!(errors.is_empty());
        assert_eq!(t.get(t.index_of("FOO").unwrap()).value, 7);
    }

    #[test]
    fn predefined_value_redefinition_with_different_value_errors() {
        let mut t = table();
        t.queue_predefined_value("FOO", 7);
        t.queue_predefined_value("FOO", 8);
        let errors = t.inject_predefined_values();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn chains_are_sorted_case_insensitively() {
        let mut t = table();
        for name in ["zeta", "Alpha", "mu", "beta"] {
            t.index_or_create(name, None);
        }
        let hash = hash_name("alpha", t.chains.len());
        // Walk the same chain as alpha would land in and make sure any two
        // adjacent entries we encounter are in non-decreasing order.
        let mut cursor = t.chains[hash];
        let mut last: Option<String> = None;
        while let Some(index) = cursor {
            let name = t.symbols[index].name.to_ascii_lowercase();
            if let Some(l) = &last {
                assert!(l <= &name);
            }
            last = Some(name);
            cursor = t.symbols[index].next_entry;
        }
    }

    #[test]
    fn vn_identifies_the_zmachine_version_and_glulx_sentinel() {
        let zmachine = SymbolTable::new(Target::ZMachine { version: 5 });
        let index = zmachine.index_of("VN").unwrap();
        assert_eq!(zmachine.get(index).value, 5);

        let glulx = SymbolTable::new(Target::Glulx);
        let index = glulx.index_of("VN").unwrap();
        assert_eq!(glulx.get(index).value, -1);
    }
}
