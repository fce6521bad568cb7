//! Worked end-to-end scenarios for the backpatch table, the dead-function
//! map, and the output assembler's code-rewrite step, driven entirely
//! through the crate's public API.

use ficc::backpatch::{BackpatchEntry, Marker, TargetArea, Width};
use ficc::deadcode::DeadFunctionMap;
use ficc::output::rewrite_code;
use ficc::source::SourceLocation;
use ficc::target::Target;

/// A routine `R` references `foo` before `foo` is itself compiled; once
/// `foo` is laid out as a retained routine, the reference site in `R`'s
/// code is rewritten to `foo`'s packed address.
#[test]
fn forward_reference_to_a_later_defined_routine_resolves_to_its_packed_address() {
    let target = Target::ZMachine { version: 5 };
    let scale = target.code_scale_factor();

    // R occupies bytes 0..8; the operand at 4..8 is a placeholder for
    // `foo`'s eventual packed address. `foo` occupies bytes 8..16.
    let code = vec![0u8; 16];

    let mut dead = DeadFunctionMap::new(true);
    let loc = SourceLocation::synthetic();

    let r = dead.begin_function("R", loc, false, 0, false);
    dead.end_function(r, 8);
    dead.mark_main(r);
    let foo_symbol = 7usize;
    dead.record_reference(r, foo_symbol);

    let foo = dead.begin_function("foo", loc, false, 8, false);
    dead.end_function(foo, 16);

    dead.compute_reachability(|sym| if sym == foo_symbol { Some(foo) } else { None });
    assert!(dead.is_live(foo));
    dead.assign_new_offsets(scale).unwrap();
    dead.close();

    let entry = BackpatchEntry {
        marker: Marker::InternalRoutine,
        area: TargetArea::Code,
        offset: 4,
        width: Width::Dword,
    };

    let rewritten = rewrite_code(&code, &[entry], &dead, |e, _raw| {
        assert_eq!(e.marker, Marker::InternalRoutine);
        Ok(dead.translate(foo)? / scale)
    })
    .unwrap();

    let packed_address = dead.translate(foo).unwrap() / scale;
    assert_eq!(&rewritten[4..8], &packed_address.to_be_bytes());
}

/// Of two routines `A` and `B`, only `B` is reachable from `Main`. With
/// stripping enabled, `A`'s bytes vanish from the output, `B` is relaid
/// out immediately after `Main`, and the final size accounts for exactly
/// the two retained routines.
#[test]
fn unreferenced_routine_is_stripped_and_the_survivor_is_repacked_after_main() {
    let mut dead = DeadFunctionMap::new(true);
    let loc = SourceLocation::synthetic();

    let length_a = 10u32;
    let length_main = 5u32;
    let length_b = 15u32;

    let a = dead.begin_function("A", loc, false, 0, false);
    dead.end_function(a, length_a);

    let main = dead.begin_function("Main", loc, false, length_a, false);
    dead.end_function(main, length_a + length_main);
    dead.mark_main(main);
    let b_symbol = 3usize;
    dead.record_reference(main, b_symbol);

    let b = dead.begin_function("B", loc, false, length_a + length_main, false);
    dead.end_function(b, length_a + length_main + length_b);

    dead.compute_reachability(|sym| if sym == b_symbol { Some(b) } else { None });
    assert!(!dead.is_live(a));
    assert!(dead.is_live(b));

    let (total_before, total_after) = dead.assign_new_offsets(1).unwrap();
    assert_eq!(total_before, length_a + length_main + length_b);
    assert_eq!(total_after, length_main + length_b);
    assert_eq!(dead.translate(main).unwrap(), 0);
    assert_eq!(dead.translate(b).unwrap(), length_main);
    dead.close();

    let a_bytes = vec![0xAAu8; length_a as usize];
    let main_bytes = vec![0x11u8; length_main as usize];
    let b_bytes = vec![0x22u8; length_b as usize];
    let code: Vec<u8> = a_bytes.into_iter().chain(main_bytes.clone()).chain(b_bytes.clone()).collect();

    let rewritten = rewrite_code(&code, &[], &dead, |_, _| Ok(0)).unwrap();
    let expected: Vec<u8> = main_bytes.into_iter().chain(b_bytes).collect();
    assert_eq!(rewritten, expected);
    assert_eq!(rewritten.len() as u32, total_after);
}
