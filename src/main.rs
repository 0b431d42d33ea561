// opal - A small scripting language written in Rust
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use opal_vm::{InterpretError, VM};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle --version flag
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("Opal v0.1.0");
        return;
    }

    // If files provided, run them; otherwise start REPL
    if args.len() > 1 {
        run_files(&args[1..]);
    } else {
        run_repl();
    }
}

/// Run a sequence of script files in one VM session.
///
/// Exit codes distinguish failures: 1 for usage and I/O problems, 65 for
/// compile errors, 70 for runtime errors.
fn run_files(files: &[String]) {
    let mut vm = VM::new();
    for file_path in files {
        if let Err((message, code)) = run_file(file_path, &mut vm) {
            eprintln!("{}", message);
            process::exit(code);
        }
    }
}

/// Run a single script file.
fn run_file(file_path: &str, vm: &mut VM) -> Result<(), (String, i32)> {
    let path = Path::new(file_path);

    // Validate file extension
    match path.extension().and_then(|e| e.to_str()) {
        Some("opal") => {}
        Some(ext) => {
            return Err((
                format!(
                    "Error: unsupported file extension '.{}' for '{}'",
                    ext, file_path
                ),
                1,
            ));
        }
        None => {
            return Err((
                format!(
                    "Error: file '{}' has no extension (expected .opal)",
                    file_path
                ),
                1,
            ));
        }
    }

    let source = fs::read_to_string(path)
        .map_err(|e| (format!("Error reading '{}': {}", file_path, e), 1))?;

    vm.interpret(&source).map_err(|e| {
        let code = match e {
            InterpretError::Compile(_) => 65,
            InterpretError::Runtime(_) => 70,
        };
        (format!("{}", e), code)
    })
}

/// Run the interactive REPL. Globals and interned strings persist for the
/// whole session.
fn run_repl() {
    println!("Opal v0.1.0");

    let mut vm = VM::new();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                if let Err(e) = vm.interpret(input) {
                    eprintln!("{}", e);
                }
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}
