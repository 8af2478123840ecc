//! FFI layer for the mobile shell.
//!
//! The shell owns the network providers; it hands snapshots and write
//! results to the engine and renders whatever the view holds. All data
//! crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `eventdeck_*` functions are allocated by Rust
//! - Caller must free them with `eventdeck_string_free`
//! - View pointers must be freed with `eventdeck_view_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::validation::{validate_credentials, validate_event, CredentialMode};
use crate::{Document, EventDraft, Fields, LocalViewState, Schema};
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

fn error_json(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `eventdeck_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|_| CString::from(c"{\"error\":\"string contained null bytes\"}"))
        .into_raw()
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Parse a JSON argument, naming it in the error.
unsafe fn parse_arg<T: serde::de::DeserializeOwned>(
    ptr: *const c_char,
    name: &str,
) -> Result<T, String> {
    let raw = from_c_string(ptr).ok_or_else(|| format!("invalid {}", name))?;
    serde_json::from_str(&raw).map_err(|e| format!("parse error in {}: {}", name, e))
}

// ============================================================================
// View Lifecycle
// ============================================================================

/// Create an empty view.
///
/// # Safety
/// Caller must free the returned pointer with `eventdeck_view_free`.
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_new() -> *mut LocalViewState {
    Box::into_raw(Box::new(LocalViewState::new()))
}

/// Free a view.
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_free(view: *mut LocalViewState) {
    if !view.is_null() {
        drop(Box::from_raw(view));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from an `eventdeck_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn eventdeck_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// View Operations
// ============================================================================

/// Overwrite the view with a snapshot.
///
/// # Arguments
/// - `documents_json`: JSON array of Document, in delivery order
///
/// # Returns
/// JSON string: `{"ok": <document count>}` or `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
/// - `documents_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_replace(
    view: *mut LocalViewState,
    documents_json: *const c_char,
) -> *mut c_char {
    let view = match view.as_mut() {
        Some(v) => v,
        None => return error_json("null view pointer"),
    };

    let documents: Vec<Document> = match parse_arg(documents_json, "documents") {
        Ok(d) => d,
        Err(e) => return error_json(e),
    };

    view.replace(documents);
    to_c_string(FfiResult::ok(view.len()).to_json())
}

/// All documents in view order.
///
/// # Returns
/// JSON string: `{"ok": [Document, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_all(view: *const LocalViewState) -> *mut c_char {
    match view.as_ref() {
        Some(v) => to_c_string(FfiResult::ok(v.all()).to_json()),
        None => error_json("null view pointer"),
    }
}

/// Get a document by id.
///
/// # Returns
/// JSON string: `{"ok": Document}` or `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
/// - `id` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_get(
    view: *const LocalViewState,
    id: *const c_char,
) -> *mut c_char {
    let view = match view.as_ref() {
        Some(v) => v,
        None => return error_json("null view pointer"),
    };
    let id = match from_c_string(id) {
        Some(s) => s,
        None => return error_json("invalid id"),
    };

    to_c_string(FfiResult::ok(view.get(&id)).to_json())
}

/// Apply a speculative change to one document.
///
/// # Arguments
/// - `changes_json`: JSON object of field name to value
///
/// # Returns
/// JSON string: `{"ok": <prior fields>}` or `{"error": "message"}`. Keep the
/// prior fields to pass to `eventdeck_view_revert_speculative`.
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
/// - `id` and `changes_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_apply_speculative(
    view: *mut LocalViewState,
    id: *const c_char,
    changes_json: *const c_char,
) -> *mut c_char {
    let view = match view.as_mut() {
        Some(v) => v,
        None => return error_json("null view pointer"),
    };
    let id = match from_c_string(id) {
        Some(s) => s,
        None => return error_json("invalid id"),
    };
    let changes: Fields = match parse_arg(changes_json, "changes") {
        Ok(c) => c,
        Err(e) => return error_json(e),
    };

    match view.apply_speculative(&id, &changes) {
        Some(prior) => to_c_string(FfiResult::ok(prior).to_json()),
        None => error_json(format!("document not in view: {}", id)),
    }
}

/// Revert a speculative change.
///
/// # Returns
/// JSON string: `{"ok": true}` if reverted, `{"ok": false}` if a snapshot
/// superseded the change, or `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
/// - `id` and `prior_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_revert_speculative(
    view: *mut LocalViewState,
    id: *const c_char,
    prior_json: *const c_char,
) -> *mut c_char {
    let view = match view.as_mut() {
        Some(v) => v,
        None => return error_json("null view pointer"),
    };
    let id = match from_c_string(id) {
        Some(s) => s,
        None => return error_json("invalid id"),
    };
    let prior: Fields = match parse_arg(prior_json, "prior") {
        Ok(p) => p,
        Err(e) => return error_json(e),
    };

    to_c_string(FfiResult::ok(view.revert_speculative(&id, &prior)).to_json())
}

/// Mark a speculative change as confirmed by the store.
///
/// # Returns
/// 1 if a pending change was resolved, 0 if none was pending, -1 on bad input.
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
/// - `id` must be a valid null-terminated C string or null
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_resolve_speculative(
    view: *mut LocalViewState,
    id: *const c_char,
) -> i32 {
    let (Some(view), Some(id)) = (view.as_mut(), from_c_string(id)) else {
        return -1;
    };
    i32::from(view.resolve_speculative(&id))
}

/// Remove a document ahead of a remote delete.
///
/// # Returns
/// JSON string: `{"ok": Document}` (the removed document), `{"ok": null}`, or
/// `{"error": "message"}`
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
/// - `id` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_remove(
    view: *mut LocalViewState,
    id: *const c_char,
) -> *mut c_char {
    let view = match view.as_mut() {
        Some(v) => v,
        None => return error_json("null view pointer"),
    };
    let id = match from_c_string(id) {
        Some(s) => s,
        None => return error_json("invalid id"),
    };

    to_c_string(FfiResult::ok(view.remove(&id)).to_json())
}

/// Number of documents in the view.
///
/// # Safety
/// - `view` must be a valid pointer from `eventdeck_view_new` or null
#[no_mangle]
pub unsafe extern "C" fn eventdeck_view_len(view: *const LocalViewState) -> i64 {
    match view.as_ref() {
        Some(v) => v.len() as i64,
        None => -1,
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validate an event form.
///
/// # Arguments
/// - `draft_json`: `{"title": ..., "description": ..., "date": ...}`
///
/// # Returns
/// JSON string: `{"ok": <trimmed draft>}` or `{"error": "message"}`
///
/// # Safety
/// - `draft_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_validate_event(draft_json: *const c_char) -> *mut c_char {
    let draft: EventDraft = match parse_arg(draft_json, "draft") {
        Ok(d) => d,
        Err(e) => return error_json(e),
    };

    match validate_event(&draft) {
        Ok(valid) => to_c_string(FfiResult::ok(valid).to_json()),
        Err(e) => error_json(e.to_string()),
    }
}

/// Validate an account form.
///
/// # Arguments
/// - `register`: non-zero for the registration form, 0 for sign-in
///
/// # Returns
/// JSON string: `{"ok": {"email": ..., "password": ...}}` (trimmed) or
/// `{"error": "message"}`
///
/// # Safety
/// - `email` and `password` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_validate_credentials(
    email: *const c_char,
    password: *const c_char,
    register: i32,
) -> *mut c_char {
    let email = from_c_string(email).unwrap_or_default();
    let password = from_c_string(password).unwrap_or_default();
    let mode = if register != 0 {
        CredentialMode::Register
    } else {
        CredentialMode::SignIn
    };

    match validate_credentials(&email, &password, mode) {
        Ok(credentials) => to_c_string(FfiResult::ok(credentials).to_json()),
        Err(e) => error_json(e.to_string()),
    }
}

/// Check fields against the `events` collection schema.
///
/// # Arguments
/// - `fields_json`: JSON object of field name to value
/// - `create`: non-zero to require every field, 0 for a partial update
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `collection` and `fields_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `eventdeck_string_free`
#[no_mangle]
pub unsafe extern "C" fn eventdeck_schema_check(
    collection: *const c_char,
    fields_json: *const c_char,
    create: i32,
) -> *mut c_char {
    let collection = match from_c_string(collection) {
        Some(s) => s,
        None => return error_json("invalid collection"),
    };
    let fields: Fields = match parse_arg(fields_json, "fields") {
        Ok(f) => f,
        Err(e) => return error_json(e),
    };

    let schema = Schema::events();
    let result = schema.collection(&collection).and_then(|c| {
        if create != 0 {
            c.validate_create(&fields)
        } else {
            c.validate_update(&fields)
        }
    });

    match result {
        Ok(()) => to_c_string(FfiResult::ok(()).to_json()),
        Err(e) => error_json(e.to_string()),
    }
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn eventdeck_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
