// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Heap objects and string interning.
//!
//! The only object kind in this core is the immutable string: a byte sequence
//! with a precomputed FNV-1a hash. Every live object is owned by the [`Heap`]
//! registry; values hold shared handles into it. Two handles to equal content
//! are always the same handle, so identity comparison substitutes for content
//! comparison.
//!
//! # Memory behaviour
//!
//! Nothing is collected while a session runs. Objects live until the heap
//! (and with it the owning VM) is dropped. This is intentional: the registry
//! is the seam where a future collector would trace reachability from the
//! value stack and global table as roots.

use std::rc::Rc;

use crate::table::Table;
use crate::value::Value;

/// An immutable heap-allocated string with its precomputed content hash.
#[derive(Debug)]
pub struct ObjString {
    chars: String,
    hash: u32,
}

impl ObjString {
    /// The string content.
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    /// The content hash, computed once at construction.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Check whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The content with control characters re-encoded as two-character
    /// escapes, for REPL/debug display.
    pub fn escaped(&self) -> String {
        let mut out = String::with_capacity(self.chars.len());
        for c in self.chars.chars() {
            match c {
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\u{8}' => out.push_str("\\b"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        }
        out
    }
}

/// FNV-1a over the given bytes: 32-bit offset basis, xor then multiply per byte.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Decode recognized two-character escape sequences into their single-character
/// equivalents. Unrecognized sequences keep their backslash verbatim.
fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            Some('"') => {
                out.push('"');
                chars.next();
            }
            Some('b') => {
                out.push('\u{8}');
                chars.next();
            }
            Some('\\') => {
                out.push('\\');
                chars.next();
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// The owning registry for heap objects, plus the intern table.
///
/// Shared between the compiler (string and identifier constants) and the VM
/// (runtime concatenation), so both intern into the same pool and identity
/// equality holds across compile time and run time.
pub struct Heap {
    /// Every object allocated this session. Freed only when the heap drops.
    objects: Vec<Rc<ObjString>>,

    /// Intern set: string -> ignored placeholder, existence-only.
    strings: Table,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Heap {
            objects: Vec::new(),
            strings: Table::new(),
        }
    }

    /// Intern a string from caller-owned raw text, decoding escape sequences.
    ///
    /// The hash is computed over the decoded bytes. Returns the existing
    /// handle when equal content is already interned.
    pub fn copy_string(&mut self, raw: &str) -> Rc<ObjString> {
        let decoded = decode_escapes(raw);
        self.take_string(decoded)
    }

    /// Intern a string from an exactly-sized owned buffer (no escape
    /// processing). On an intern hit the buffer is discarded.
    pub fn take_string(&mut self, chars: String) -> Rc<ObjString> {
        let hash = hash_bytes(chars.as_bytes());
        if let Some(existing) = self.strings.find_interned(&chars, hash) {
            return existing;
        }
        self.allocate(chars, hash)
    }

    /// Register a fresh string in the object list and the intern table.
    fn allocate(&mut self, chars: String, hash: u32) -> Rc<ObjString> {
        let string = Rc::new(ObjString { chars, hash });
        self.objects.push(Rc::clone(&string));
        self.strings.set(Rc::clone(&string), Value::Null);
        string
    }

    /// Number of live objects, for tests and diagnostics.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
