//! The Dead-Function Map (§4.6): optionally elides never-called routines and
//! produces the final code-offset translation the output assembler applies
//! while rewriting backpatch entries.

use indexmap::IndexSet;

use crate::source::SourceLocation;

/// Why a function was retained, per §3 "Function Record" `usage` bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage(pub u8);

impl Usage {
    pub const GLOBAL: u8 = 1 << 0;
    pub const EMBEDDED: u8 = 1 << 1;
    pub const MAIN: u8 = 1 << 2;
    pub const CALLED_BY_FUNCTION: u8 = 1 << 3;

    pub fn set(&mut self, bit: u8) {
        self.0 |= bit;
    }

    pub fn get(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn is_retained(self) -> bool {
        self.0 != 0
    }
}

/// A function's bookkeeping record (§3 "Function Record"). `offset == -1`
/// is reserved for the sentinel top-level scope, represented here as
/// [`FunctionId::TOP_LEVEL`] rather than a magic offset.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub name: String,
    pub location: SourceLocation,
    pub system_file: bool,
    pub start_offset: u32,
    pub length: u32,
    pub new_offset: Option<u32>,
    pub usage: Usage,
    pub embedded: bool,
}

/// Stable id of a function record; index `0` is always the sentinel
/// top-level scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

impl FunctionId {
    pub const TOP_LEVEL: FunctionId = FunctionId(0);
}

/// Records function boundaries and cross-function symbol references,
/// computes reachability, and remaps surviving function addresses.
pub struct DeadFunctionMap {
    functions: Vec<FunctionRecord>,
    /// `(caller function id, symbol index)` edges, de-duplicated as a hash
    /// set with insertion order preserved (§3 "Function-Reference Entry").
    edges: IndexSet<(FunctionId, usize)>,
    outbound: Vec<Vec<usize>>,
    closed: bool,
    enabled: bool,
}

impl DeadFunctionMap {
    pub fn new(enabled: bool) -> Self {
        let sentinel = FunctionRecord {
            name: "<top level>".to_string(),
            location: SourceLocation::synthetic(),
            system_file: false,
            start_offset: 0,
            length: 0,
            new_offset: Some(0),
            usage: Usage(Usage::GLOBAL),
            embedded: false,
        };
        DeadFunctionMap {
            functions: vec![sentinel],
            edges: IndexSet::new(),
            outbound: vec![Vec::new()],
            closed: false,
            enabled,
        }
    }

    /// `begin_function`: open a new function record.
    pub fn begin_function(
        &mut self,
        name: impl Into<String>,
        location: SourceLocation,
        system_file: bool,
        start_offset: u32,
        embedded: bool,
    ) -> FunctionId {
        assert!(!self.closed, "cannot record a new function after the map is closed");
        self.functions.push(FunctionRecord {
            name: name.into(),
            location,
            system_file,
            start_offset,
            length: 0,
            new_offset: None,
            usage: Usage(if embedded { Usage::EMBEDDED } else { 0 }),
            embedded,
        });
        self.outbound.push(Vec::new());
        FunctionId(self.functions.len() - 1)
    }

    pub fn end_function(&mut self, id: FunctionId, end_offset: u32) {
        let f = &mut self.functions[id.0];
        f.length = end_offset - f.start_offset;
    }

    /// Record a `(caller, symbol)` edge, suppressing duplicates, as every
    /// symbol reference that resolves to a routine is emitted (§4.6
    /// "Recording").
    pub fn record_reference(&mut self, caller: FunctionId, symbol_index: usize) {
        assert!(!self.closed, "cannot record a new edge after the map is closed");
        if self.edges.insert((caller, symbol_index)) {
            self.outbound[caller.0].push(symbol_index);
        }
    }

    pub fn mark_main(&mut self, id: FunctionId) {
        self.functions[id.0].usage.set(Usage::MAIN);
    }

    /// Breadth-first reachability from the root set: everything the
    /// top-level sentinel references, every embedded routine, and anything
    /// marked `MAIN` (§4.6 "Reachability").
    ///
    /// `resolve` maps a referenced symbol index to the [`FunctionId`] it
    /// names, if any (a forward-declared constant that never becomes a
    /// routine resolves to `None`).
    pub fn compute_reachability(&mut self, resolve: impl Fn(usize) -> Option<FunctionId>) {
        if !self.enabled {
            for f in self.functions.iter_mut().skip(1) {
                f.usage.set(Usage::GLOBAL);
            }
            return;
        }

        let mut reachable = vec![false; self.functions.len()];
        reachable[0] = true;
        let mut queue: Vec<FunctionId> = Vec::new();

        for (i, f) in self.functions.iter().enumerate().skip(1) {
            if f.embedded || f.usage.get(Usage::MAIN) {
                if !reachable[i] {
                    reachable[i] = true;
                    queue.push(FunctionId(i));
                }
            }
        }
        queue.push(FunctionId::TOP_LEVEL);

        while let Some(current) = queue.pop() {
            for &symbol_index in &self.outbound[current.0] {
                if let Some(callee) = resolve(symbol_index) {
                    if !reachable[callee.0] {
                        reachable[callee.0] = true;
                        if current != FunctionId::TOP_LEVEL {
                            self.functions[callee.0].usage.set(Usage::CALLED_BY_FUNCTION);
                        } else {
                            self.functions[callee.0].usage.set(Usage::GLOBAL);
                        }
                        queue.push(callee);
                    }
                }
            }
        }
    }

    /// Assign each retained function a contiguous new offset in emission
    /// order; unreachable functions contribute nothing (§4.6 "Address
    /// remapping"). Returns `(total_before, total_after)`.
    pub fn assign_new_offsets(&mut self, scale_factor: u32) -> Result<(u32, u32), String> {
        let total_before: u32 = self.functions.iter().skip(1).map(|f| f.length).sum();
        let mut running = 0u32;
        for f in self.functions.iter_mut().skip(1) {
            if f.usage.is_retained() {
                if running % scale_factor != 0 {
                    return Err(format!(
                        "packed alignment invariant violated: offset {running} is not a multiple of {scale_factor}"
                    ));
                }
                f.new_offset = Some(running);
                running += f.length;
            }
        }
        Ok((total_before, running))
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn function(&self, id: FunctionId) -> &FunctionRecord {
        &self.functions[id.0]
    }

    pub fn is_live(&self, id: FunctionId) -> bool {
        self.functions[id.0].usage.is_retained()
    }

    /// `translate`: map an original packed/raw code offset to its new
    /// offset. Fails loudly on a stripped address (§4.6 "Client queries").
    pub fn translate(&self, id: FunctionId) -> Result<u32, String> {
        self.functions[id.0]
            .new_offset
            .ok_or_else(|| format!("attempted to translate a stripped function '{}'", self.functions[id.0].name))
    }

    /// `translate_offset`: for debug info. Returns `(raw_offset, stripped)`
    /// using a binary search over start offsets built on first call.
    pub fn translate_offset(&self, raw_offset: u32) -> (u32, bool) {
        let idx = self
            .functions
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, f)| f.start_offset <= raw_offset)
            .max_by_key(|(_, f)| f.start_offset);
        match idx {
            Some((_, f)) if f.usage.is_retained() => {
                let delta = raw_offset - f.start_offset;
                (f.new_offset.unwrap() + delta, false)
            }
            Some(_) => (raw_offset, true),
            None => (raw_offset, true),
        }
    }

    /// Iterate retained/dead function boundaries in emission order, driving
    /// the output assembler's code-copy loop (§4.7).
    pub fn iter_boundaries(&self) -> impl Iterator<Item = (u32, bool)> + '_ {
        self.functions
            .iter()
            .skip(1)
            .map(|f| (f.start_offset + f.length, f.usage.is_retained()))
    }

    pub fn functions(&self) -> &[FunctionRecord] {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreferenced_function_is_pruned_when_stripping_enabled() {
        let mut map = DeadFunctionMap::new(true);
        let location = SourceLocation::synthetic();
        let a = map.begin_function("A", location, false, 0, false);
        map.end_function(a, 10);
        let b = map.begin_function("B", location, false, 10, false);
        map.end_function(b, 20);

        // Main calls B only.
        let main = map.begin_function("Main", location, false, 20, false);
        map.end_function(main, 25);
        map.mark_main(main);
        map.record_reference(main, 999);

        map.compute_reachability(|sym| if sym == 999 { Some(b) } else { None });
        map.close();

        assert!(!map.is_live(a));
        assert!(map.is_live(b));
        assert!(map.is_live(main));

        let (before, after) = map.assign_new_offsets(1).unwrap();
        assert_eq!(before, 25);
        assert_eq!(after, 15); // B (10) + Main (5)
    }

    #[test]
    fn translate_fails_on_stripped_function() {
        let mut map = DeadFunctionMap::new(true);
        let location = SourceLocation::synthetic();
        let a = map.begin_function("A", location, false, 0, false);
        map.end_function(a, 10);
        map.compute_reachability(|_| None);
        map.assign_new_offsets(1).unwrap();
        assert!(map.translate(a).is_err());
    }

    #[test]
    fn translate_is_idempotent_for_live_functions() {
        let mut map = DeadFunctionMap::new(true);
        let location = SourceLocation::synthetic();
        let main = map.begin_function("Main", location, false, 0, false);
        map.end_function(main, 10);
        map.mark_main(main);
        map.compute_reachability(|_| None);
        map.assign_new_offsets(1).unwrap();
        let once = map.translate(main).unwrap();
        let twice = map.translate(main).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn disabled_stripping_retains_every_function() {
        let mut map = DeadFunctionMap::new(false);
        let location = SourceLocation::synthetic();
        let a = map.begin_function("A", location, false, 0, false);
        map.end_function(a, 10);
        map.compute_reachability(|_| None);
        assert!(map.is_live(a));
    }

    #[test]
    fn alignment_violation_is_reported() {
        let mut map = DeadFunctionMap::new(true);
        let location = SourceLocation::synthetic();
        let a = map.begin_function("A", location, false, 0, false);
        map.end_function(a, 3);
        let main = map.begin_function("Main", location, false, 3, false);
        map.end_function(main, 5);
        map.mark_main(main);
        map.record_reference(main, 1);
        map.compute_reachability(|sym| if sym == 1 { Some(a) } else { None });
        assert!(map.assign_new_offsets(4).is_err());
    }
}
