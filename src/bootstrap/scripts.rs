//! Script templates evaluated during the bootstrap handshake.
//!
//! Each template is a pure string-producing function, so the generated
//! scripts are testable without a connection. The remote embedding shell
//! provides two natives the templates rely on:
//!
//! - `UPLINK_IMPORT_SCRIPT(path)` — resolves `path` against the provisioned
//!   bulk file volume, reads the bytes there, and evaluates them in the
//!   engine. Module payloads therefore never traverse the command socket.
//! - `UPLINK_PRINT(text)` — emits `text` as an inline-output frame on the
//!   command socket.
//!
//! Bump [`TEMPLATE_REVISION`] whenever any generated script changes shape.

/// Revision of the generated script set.
pub const TEMPLATE_REVISION: u32 = 1;

/// Host-native function that imports a module file from the bulk volume.
pub const IMPORT_NATIVE: &str = "UPLINK_IMPORT_SCRIPT";

/// Host-native function that routes text to the inline-output channel.
pub const PRINT_NATIVE: &str = "UPLINK_PRINT";

/// Step 1 — define `CLOSURE_IMPORT_SCRIPT` to route loader imports through
/// the bulk-volume native. The loader passes paths relative to its own
/// directory, so they are prefixed with `goog/`.
#[must_use]
pub fn install_import_hook() -> String {
    format!(
        "CLOSURE_IMPORT_SCRIPT = function(src) {{ {IMPORT_NATIVE}('goog/' + src); return true; }};"
    )
}

/// Step 2 — load the module loader's own runtime through the hook.
#[must_use]
pub fn load_loader_runtime() -> String {
    format!("{IMPORT_NATIVE}('goog/base.js');")
}

/// Step 3 — load the generated dependency manifest (module name → relative
/// path) so later lookups can resolve by name.
#[must_use]
pub fn load_dependency_manifest(manifest_path: &str) -> String {
    format!("{IMPORT_NATIVE}({});", js_string(manifest_path))
}

/// Step 4 — answer the loader's already-present check negatively.
///
/// Modules arrive outside the loader's normal expectations, so the stock
/// check would fire spurious duplicate-definition warnings.
#[must_use]
pub fn suppress_provided_check() -> String {
    "goog.isProvided_ = function(name) { return false; };".to_owned()
}

/// Small control instruction requiring one module by name.
///
/// Also used for step 5 (the core runtime) and by the host `load`
/// operation for already-compiled modules.
#[must_use]
pub fn require_module(name: &str) -> String {
    format!("goog.require({});", js_string(name))
}

/// Step 5 — wire the core runtime's print function to the inline-output
/// native, so remote prints surface in the caller's console.
#[must_use]
pub fn install_print_sink(core_module: &str) -> String {
    format!("{core_module}.setPrintSink({PRINT_NATIVE});")
}

/// Step 6 — replace `goog.require` with a loaded-set-aware version: a
/// module already in the set is skipped unless a reload is forced,
/// otherwise it is imported through the hook and recorded.
#[must_use]
pub fn patch_require() -> String {
    "goog.uplinkLoaded_ = goog.uplinkLoaded_ || {};\n\
     goog.require = function(name, reload) {\n\
       if (goog.uplinkLoaded_[name] && !reload) { return; }\n\
       goog.uplinkLoaded_[name] = true;\n\
       var path = goog.dependencies_.nameToPath[name];\n\
       if (path) { CLOSURE_IMPORT_SCRIPT(path); }\n\
     };"
        .to_owned()
}

/// Quote `value` as a single-quoted JS string literal.
fn js_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
