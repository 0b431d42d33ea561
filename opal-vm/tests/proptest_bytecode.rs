// opal-vm - Property-based tests for bytecode and interpretation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests covering:
//! - Line-table round-trips for arbitrary write sequences
//! - String interning identity
//! - Arithmetic agreement with host evaluation

mod common;

use common::run;
use opal_vm::{Chunk, Heap, OpCode, Value};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Line numbers drawn small enough to force repeats and large runs.
fn arb_lines(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..6, 1..=max_len)
}

fn arb_word() -> impl Strategy<Value = String> {
    "[a-z]{0,8}".prop_map(|s| s)
}

// =============================================================================
// Line table round-trips
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every written byte maps back to the line it was written with,
    /// whatever order lines arrive in.
    #[test]
    fn line_roundtrip(lines in arb_lines(600)) {
        let mut chunk = Chunk::new();
        for &line in &lines {
            chunk.write(0, line);
        }
        for (offset, &line) in lines.iter().enumerate() {
            prop_assert_eq!(chunk.get_line(offset), Some(line));
        }
        prop_assert_eq!(chunk.get_line(lines.len()), None);
    }

    /// Run counts always sum to the number of bytes written.
    #[test]
    fn line_runs_cover_code(lines in arb_lines(600)) {
        let mut chunk = Chunk::new();
        for &line in &lines {
            chunk.write(0, line);
        }
        let total: usize = chunk.line_runs().iter().map(|r| r.count as usize).sum();
        prop_assert_eq!(total, chunk.code.len());
    }

    /// The emitter picks the operand form from the constant's index: one
    /// byte below 255, two bytes from there up.
    #[test]
    fn constant_form_matches_index(prefill in 0usize..600) {
        let mut chunk = Chunk::new();
        for _ in 0..prefill {
            chunk.add_constant(Value::Null);
        }
        let before = chunk.code.len();
        prop_assert!(chunk.write_constant(Value::Number(1.0), 1));
        if prefill < 255 {
            prop_assert_eq!(chunk.code[before], OpCode::Constant as u8);
            prop_assert_eq!(chunk.code.len() - before, 2);
        } else {
            prop_assert_eq!(chunk.code[before], OpCode::ConstantLong as u8);
            prop_assert_eq!(chunk.code.len() - before, 3);
        }
    }

    /// A single line repeated past the 8-bit counter still round-trips.
    #[test]
    fn long_single_line_roundtrip(len in 256usize..700) {
        let mut chunk = Chunk::new();
        for _ in 0..len {
            chunk.write(0, 42);
        }
        prop_assert_eq!(chunk.get_line(0), Some(42));
        prop_assert_eq!(chunk.get_line(len - 1), Some(42));
        for run in chunk.line_runs() {
            prop_assert_eq!(run.line, 42);
        }
    }
}

// =============================================================================
// Interning
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Two interned strings are the same object exactly when their content
    /// is equal.
    #[test]
    fn interning_identity(a in arb_word(), b in arb_word()) {
        let mut heap = Heap::new();
        let sa = heap.take_string(a.clone());
        let sb = heap.take_string(b.clone());
        prop_assert_eq!(std::rc::Rc::ptr_eq(&sa, &sb), a == b);
    }

    /// Interning n words allocates one object per distinct word.
    #[test]
    fn interning_allocates_once_per_content(words in prop::collection::vec(arb_word(), 0..20)) {
        let mut heap = Heap::new();
        for word in &words {
            heap.take_string(word.clone());
        }
        let mut distinct: Vec<&String> = Vec::new();
        for word in &words {
            if !distinct.contains(&word) {
                distinct.push(word);
            }
        }
        prop_assert_eq!(heap.object_count(), distinct.len());
    }
}

// =============================================================================
// Arithmetic agreement
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Integer addition and multiplication agree with the host.
    #[test]
    fn integer_arithmetic_matches_host(a in -1000i64..1000, b in -1000i64..1000) {
        let source = format!("print {} + {}; print {} * {};", a, b, a, b);
        let expected = format!("{}\n{}\n", a + b, a * b);
        prop_assert_eq!(run(&source).unwrap(), expected);
    }

    /// Truncating integer division and modulo agree with the host's `/` and
    /// `%` on i64.
    #[test]
    fn integer_division_matches_host(a in -1000i64..1000, b in 1i64..100) {
        let source = format!("print {} // {}; print {} % {};", a, b, a, b);
        let expected = format!("{}\n{}\n", a / b, a % b);
        prop_assert_eq!(run(&source).unwrap(), expected);
    }

    /// Comparison operators agree with the host.
    #[test]
    fn comparisons_match_host(a in -100i64..100, b in -100i64..100) {
        let source = format!("print {} < {}; print {} >= {};", a, b, a, b);
        let expected = format!("{}\n{}\n", a < b, a >= b);
        prop_assert_eq!(run(&source).unwrap(), expected);
    }

    /// Concatenation of any two words equals host concatenation, and the
    /// result compares equal to the equivalent literal.
    #[test]
    fn concatenation_matches_host(a in arb_word(), b in arb_word()) {
        let source = format!("print \"{}\" + \"{}\";", a, b);
        let expected = format!("{}{}\n", a, b);
        prop_assert_eq!(run(&source).unwrap(), expected);
    }
}
