//! Unit tests for the generated bootstrap script templates.
//!
//! The templates are pure string producers, so the handshake's remote-side
//! behavior is pinned here without a connection.

use repl_uplink::bootstrap::scripts;

/// The import hook routes loader-relative paths through the bulk-volume
/// native — module bytes never traverse the command socket.
#[test]
fn import_hook_delegates_to_the_bulk_volume_native() {
    let script = scripts::install_import_hook();

    assert!(script.contains("CLOSURE_IMPORT_SCRIPT = function(src)"));
    assert!(script.contains(&format!("{}('goog/' + src)", scripts::IMPORT_NATIVE)));
}

/// The loader runtime loads through the hook from its conventional path.
#[test]
fn loader_runtime_loads_goog_base() {
    assert_eq!(
        scripts::load_loader_runtime(),
        "UPLINK_IMPORT_SCRIPT('goog/base.js');"
    );
}

/// The manifest path is embedded as a quoted literal.
#[test]
fn manifest_load_embeds_the_configured_path() {
    assert_eq!(
        scripts::load_dependency_manifest("app_deps.js"),
        "UPLINK_IMPORT_SCRIPT('app_deps.js');"
    );
}

/// The provided check is forced negative so out-of-band module definitions
/// do not trigger duplicate warnings.
#[test]
fn provided_check_always_answers_negative() {
    let script = scripts::suppress_provided_check();
    assert!(script.contains("goog.isProvided_"));
    assert!(script.contains("return false"));
}

/// A module require is a single small control instruction.
#[test]
fn require_module_is_a_single_instruction() {
    assert_eq!(
        scripts::require_module("app.main"),
        "goog.require('app.main');"
    );
}

/// The print sink installation wires the core runtime to the inline-output
/// native.
#[test]
fn print_sink_routes_through_the_inline_output_native() {
    let script = scripts::install_print_sink("runtime.core");
    assert_eq!(script, "runtime.core.setPrintSink(UPLINK_PRINT);");
}

// ── Loaded-set require patch ─────────────────────────────────────────────────

/// The patched require consults the loaded-set before importing: a module
/// already present is skipped unless a reload is forced.
#[test]
fn patched_require_consults_the_loaded_set() {
    let script = scripts::patch_require();

    assert!(
        script.contains("if (goog.uplinkLoaded_[name] && !reload) { return; }"),
        "the guard must skip present modules unless reloading: {script}"
    );
}

/// A fresh import is recorded in the loaded-set before going through the
/// hook, so the next require of the same name is a no-op.
#[test]
fn patched_require_records_then_imports() {
    let script = scripts::patch_require();

    let records_at = script
        .find("goog.uplinkLoaded_[name] = true;")
        .expect("the patch must record the module");
    let imports_at = script
        .find("CLOSURE_IMPORT_SCRIPT(path)")
        .expect("the patch must import through the hook");

    assert!(
        records_at < imports_at,
        "recording must precede the import: {script}"
    );
}
