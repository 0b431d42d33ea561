// opal-vm - Shared helpers for integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use opal_vm::{InterpretError, VM};

/// Interpret a source string in a fresh VM, returning captured print output.
pub fn run(source: &str) -> Result<String, InterpretError> {
    let mut vm = VM::with_output(Vec::new());
    vm.interpret(source)?;
    Ok(String::from_utf8(vm.into_output()).expect("output is utf-8"))
}

/// Interpret several source strings in one VM session, returning the
/// combined output. Panics on any error.
pub fn run_session(sources: &[&str]) -> String {
    let mut vm = VM::with_output(Vec::new());
    for source in sources {
        vm.interpret(source)
            .unwrap_or_else(|e| panic!("error interpreting {:?}: {}", source, e));
    }
    String::from_utf8(vm.into_output()).expect("output is utf-8")
}

/// Assert that interpreting `source` fails with an error whose rendering
/// contains `expected_pattern` (case-insensitive).
pub fn expect_error(source: &str, expected_pattern: &str) {
    match run(source) {
        Err(e) => {
            let rendered = e.to_string();
            assert!(
                rendered
                    .to_lowercase()
                    .contains(&expected_pattern.to_lowercase()),
                "Error '{}' should contain '{}' for source: {}",
                rendered,
                expected_pattern,
                source
            );
        }
        Ok(output) => {
            panic!(
                "Expected error containing '{}', but got output {:?} for source: {}",
                expected_pattern, output, source
            );
        }
    }
}

/// Assert that `source` fails at compile time.
pub fn expect_compile_error(source: &str, expected_pattern: &str) {
    match run(source) {
        Err(InterpretError::Compile(e)) => {
            let rendered = e.to_string();
            assert!(
                rendered.contains(expected_pattern),
                "Compile error '{}' should contain '{}' for source: {}",
                rendered,
                expected_pattern,
                source
            );
        }
        Err(InterpretError::Runtime(e)) => {
            panic!(
                "Expected compile error containing '{}', but failed at runtime: {} for source: {}",
                expected_pattern, e, source
            );
        }
        Ok(output) => {
            panic!(
                "Expected compile error containing '{}', but got output {:?} for source: {}",
                expected_pattern, output, source
            );
        }
    }
}
