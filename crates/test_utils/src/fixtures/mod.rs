//! WAT fixtures for the wasmtime engine.
//!
//! wasmtime accepts the text format directly, so each fixture is returned as
//! the bytes of a `.wat` document. All fixtures share a bump allocator and a
//! one-page memory; the data segment at offset 0 holds the key `k`.

const PRELUDE: &str = r#"
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 1024))
  (data (i32.const 0) "k")
  (func (export "allocate") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $len)))
    (local.get $ptr))
  (func $region (param $ptr i32) (param $len i32) (result i64)
    (i64.or
      (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
      (i64.extend_i32_u (local.get $len))))
"#;

const MARKER: &str = r#"(func (export "light_client_abi_v1"))"#;

const STORE_IMPORTS: &str = r#"
  (import "env" "db_read" (func $db_read (param i32 i32) (result i64)))
  (import "env" "db_write" (func $db_write (param i32 i32 i32 i32)))
"#;

/// `instantiate` and `sudo` store their input under `k` and echo it;
/// `query` returns the value stored under `k`, or an empty region.
const ECHO_ENTRY_POINTS: &str = r#"
  (func $store_and_echo (param $ptr i32) (param $len i32) (result i64)
    (call $db_write (i32.const 0) (i32.const 1) (local.get $ptr) (local.get $len))
    (call $region (local.get $ptr) (local.get $len)))
  (func (export "instantiate") (param i32 i32) (result i64)
    (call $store_and_echo (local.get 0) (local.get 1)))
  (func (export "sudo") (param i32 i32) (result i64)
    (call $store_and_echo (local.get 0) (local.get 1)))
  (func (export "query") (param i32 i32) (result i64)
    (local $found i64)
    (local.set $found (call $db_read (i32.const 0) (i32.const 1)))
    (if (result i64) (i64.eq (local.get $found) (i64.const -1))
      (then (i64.const 0))
      (else (local.get $found))))
"#;

/// `instantiate` writes and then hits `unreachable`, `sudo` writes and then
/// loops forever, and `query` attempts a write.
const HOSTILE_ENTRY_POINTS: &str = r#"
  (func (export "instantiate") (param i32 i32) (result i64)
    (call $db_write (i32.const 0) (i32.const 1) (local.get 0) (local.get 1))
    unreachable)
  (func (export "sudo") (param i32 i32) (result i64)
    (call $db_write (i32.const 0) (i32.const 1) (local.get 0) (local.get 1))
    (loop $spin (br $spin))
    (i64.const 0))
  (func (export "query") (param i32 i32) (result i64)
    (call $db_write (i32.const 0) (i32.const 1) (local.get 0) (local.get 1))
    (i64.const 0))
"#;

fn module(imports: &str, body: &str, marker: bool) -> Vec<u8> {
    let marker = if marker { MARKER } else { "" };
    format!("(module {imports} {PRELUDE} {body} {marker})").into_bytes()
}

/// A well-formed module that stores and echoes its input.
pub fn echo_module() -> Vec<u8> {
    module(STORE_IMPORTS, ECHO_ENTRY_POINTS, true)
}

/// A well-formed module whose entry points trap, spin or violate read-only access.
pub fn hostile_module() -> Vec<u8> {
    module(STORE_IMPORTS, HOSTILE_ENTRY_POINTS, true)
}

/// The echo module without the ABI marker export.
pub fn unmarked_module() -> Vec<u8> {
    module(STORE_IMPORTS, ECHO_ENTRY_POINTS, false)
}

/// The echo module with an additional import the host does not provide.
pub fn clock_importing_module() -> Vec<u8> {
    let imports = format!(
        r#"{STORE_IMPORTS} (import "env" "now" (func $now (result i64)))"#
    );
    module(&imports, ECHO_ENTRY_POINTS, true)
}
