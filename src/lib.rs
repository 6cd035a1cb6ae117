//! # Scenario Editor Core
//!
//! Engine behind the EdgeSimPy scenario editor. It loads JSON scenario files,
//! lets a front end browse and edit their collections, bulk-generates
//! synthetic records with consistent cross-references, and exports the result
//! back to the simulator's JSON format.
//!
//! ## Features
//!
//! - **Typed scenario model**: relationship fields are classified once at load
//!   time (reference, reference array, nested object, ...)
//! - **Bidirectional sync**: generated records get their back-references
//!   installed on the records they point at
//! - **Infinity-aware codec**: the simulator's bare `Infinity` token survives a
//!   load/export round trip
//! - **Snapshots**: whole documents can be parked in a local LMDB store
//! - **FFI-friendly**: every operation is also exposed as a C function
//!   returning a JSON response envelope
//!
//! ## Quick Start
//!
//! ```no_run
//! use scenario_editor_core::{create_editor, load_scenario, generate_items, export_scenario};
//! use std::ffi::CString;
//!
//! let editor = create_editor(std::ptr::null());
//!
//! let json = CString::new(r#"{"Application": [{"attributes": {"id": 1}, "relationships": {"users": []}}]}"#).unwrap();
//! let loaded = load_scenario(editor, json.as_ptr());
//!
//! let collection = CString::new("User").unwrap();
//! let generated = generate_items(editor, collection.as_ptr(), 5, true);
//! let exported = export_scenario(editor);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_editor`] / [`close_editor`] - Session lifecycle
//! - [`load_scenario`], [`load_scenario_file`], [`load_scenario_url`], [`load_example_scenario`] - Loading
//! - [`export_scenario`], [`download_scenario`] - Export
//! - [`list_collections`], [`search_scenario`], [`get_item`], [`get_reference_options`] - Browsing
//! - [`new_item_template`], [`add_item`], [`update_item`], [`delete_item`] - Editing
//! - [`generate_items`] - Bulk generation
//! - [`save_snapshot`], [`restore_snapshot`], [`list_snapshots`] - Snapshots
//! - [`free_response`] - Releases any string returned by the functions above

pub mod app_response;
pub mod derived_sync;
pub mod editor_config;
pub mod editor_state;
pub mod record_factory;
pub mod reference_resolver;
pub mod relationship_schema;
pub mod relationship_sync;
pub mod scenario_codec;
pub mod scenario_loader;
pub mod scenario_model;
pub mod scenario_store;
mod test;

use crate::editor_config::EditorConfig;
use crate::editor_state::EditorState;

use log::{info, warn};
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::app_response::AppResponse;

/// Creates a new editor session.
///
/// # Parameters
///
/// * `config_json` - Null-terminated JSON configuration, or null for defaults
///
/// # Returns
///
/// Returns a pointer to the [`EditorState`] on success, or a null pointer on
/// failure. Release it with [`close_editor`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use scenario_editor_core::create_editor;
///
/// let config = CString::new(r#"{"seed": 7, "store_path": "scenario_snapshots"}"#).unwrap();
/// let editor = create_editor(config.as_ptr());
///
/// if !editor.is_null() {
///     // Session ready
/// }
/// ```
///
/// # Errors
///
/// Returns null pointer if:
/// - The configuration is not valid UTF-8 or not valid JSON
/// - The configuration fails validation
/// - The snapshot store cannot be opened
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_editor(config_json: *const c_char) -> *mut EditorState {
    let config = if config_json.is_null() {
        EditorConfig::default()
    } else {
        let text = match unsafe { CStr::from_ptr(config_json).to_str() } {
            Ok(s) => s,
            Err(e) => {
                warn!("Invalid UTF-8 in config parameter: {e}");
                return std::ptr::null_mut();
            }
        };
        match EditorConfig::from_json_str(text) {
            Ok(config) => config,
            Err(e) => {
                warn!("Rejected editor configuration: {e}");
                return std::ptr::null_mut();
            }
        }
    };

    match EditorState::init(config) {
        Ok(state) => {
            info!("✅ Editor session initialized");
            Box::into_raw(Box::new(state))
        }
        Err(e) => {
            warn!("❌ Failed to initialize editor session: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Ends an editor session and releases its memory.
///
/// The pointer must not be used after this call.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_editor(state: *mut EditorState) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_editor".to_string());
        return response_to_c_string(&error);
    }

    drop(unsafe { Box::from_raw(state) });
    response_to_c_string(&AppResponse::success("Editor session closed"))
}

/// Releases a string returned by any function of this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(response: *mut c_char) {
    if response.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(response) });
}

/// Loads a scenario from JSON text, replacing the current document.
///
/// The bare token `Infinity` is accepted. On success the response carries
/// the collection summaries of the new document; on failure the previous
/// document is kept.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use scenario_editor_core::{create_editor, load_scenario};
///
/// let editor = create_editor(std::ptr::null());
/// let json = CString::new(r#"{"EdgeServer": [{"attributes": {"id": 1, "ttl": Infinity}}]}"#).unwrap();
/// let result = load_scenario(editor, json.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn load_scenario(state: *mut EditorState, json_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "load_scenario") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(err) => return err,
    };

    match state.load_from_str(&json_str) {
        Ok(_) => respond_json(&state.collections()),
        Err(e) => response_to_c_string(&e),
    }
}

/// Loads a scenario from a local file path.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn load_scenario_file(state: *mut EditorState, path_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "load_scenario_file") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let path = match c_ptr_to_string(path_ptr, "path") {
        Ok(path) => path,
        Err(err) => return err,
    };

    match state.load_from_file(&path) {
        Ok(_) => respond_json(&state.collections()),
        Err(e) => response_to_c_string(&e),
    }
}

/// Loads a scenario from an arbitrary URL.
///
/// Network failures and non-success HTTP statuses come back as
/// `TransportError`; the current document is kept.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn load_scenario_url(state: *mut EditorState, url_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "load_scenario_url") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let url = match c_ptr_to_string(url_ptr, "url") {
        Ok(url) => url,
        Err(err) => return err,
    };

    match state.load_from_url(&url) {
        Ok(_) => respond_json(&state.collections()),
        Err(e) => response_to_c_string(&e),
    }
}

/// Loads the bundled example scenario from the configured default URL.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn load_example_scenario(state: *mut EditorState) -> *const c_char {
    let state = match state_mut(state, "load_example_scenario") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match state.load_example() {
        Ok(_) => respond_json(&state.collections()),
        Err(e) => response_to_c_string(&e),
    }
}

/// Serializes the current document to scenario JSON.
///
/// The `Ok` payload is the file content itself, with `Infinity` restored.
/// An empty document is rejected with `ValidationError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn export_scenario(state: *mut EditorState) -> *const c_char {
    let state = match state_ref(state, "export_scenario") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match state.export_string() {
        Ok(text) => response_to_c_string(&AppResponse::Ok(text)),
        Err(e) => response_to_c_string(&e),
    }
}

/// Writes `edgesimpy-scenario.json` into the given directory.
///
/// The `Ok` payload is the written file path.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn download_scenario(state: *mut EditorState, dir_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "download_scenario") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let dir = match c_ptr_to_string(dir_ptr, "directory") {
        Ok(dir) => dir,
        Err(err) => return err,
    };

    match state.export_to_dir(&dir) {
        Ok(path) => response_to_c_string(&AppResponse::Ok(path.display().to_string())),
        Err(e) => response_to_c_string(&e),
    }
}

/// Lists collection names with their record counts, in document order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_collections(state: *mut EditorState) -> *const c_char {
    match state_ref(state, "list_collections") {
        Ok(state) => respond_json(&state.collections()),
        Err(err) => err,
    }
}

/// Case-insensitive search over collection names and record content.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn search_scenario(state: *mut EditorState, query_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "search_scenario") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let query = match c_ptr_to_string(query_ptr, "query") {
        Ok(query) => query,
        Err(err) => return err,
    };

    respond_json(&state.filter(&query))
}

/// Returns one record as scenario JSON.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use scenario_editor_core::{create_editor, get_item};
///
/// let editor = create_editor(std::ptr::null());
/// let collection = CString::new("EdgeServer").unwrap();
/// let result = get_item(editor, collection.as_ptr(), 0);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_item(state: *mut EditorState, collection_ptr: *const c_char, index: i64) -> *const c_char {
    let state = match state_ref(state, "get_item") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let collection = match c_ptr_to_string(collection_ptr, "collection") {
        Ok(collection) => collection,
        Err(err) => return err,
    };

    let index = match to_index(index) {
        Ok(index) => index,
        Err(err) => return err,
    };

    let result = state
        .get_item(&collection, index)
        .and_then(|record| state.codec().serialize_record(record));

    match result {
        Ok(text) => response_to_c_string(&AppResponse::Ok(text)),
        Err(e) => response_to_c_string(&e),
    }
}

/// Returns the selectable targets for a foreign-key picker over `collection`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_reference_options(state: *mut EditorState, collection_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "get_reference_options") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let collection = match c_ptr_to_string(collection_ptr, "collection") {
        Ok(collection) => collection,
        Err(err) => return err,
    };

    respond_json(&state.reference_options(&collection))
}

/// Returns a pre-filled record for the "add" form of `collection`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn new_item_template(state: *mut EditorState, collection_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "new_item_template") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let collection = match c_ptr_to_string(collection_ptr, "collection") {
        Ok(collection) => collection,
        Err(err) => return err,
    };

    let result = state
        .new_item_template(&collection)
        .and_then(|template| state.codec().serialize_record(&template));

    match result {
        Ok(text) => response_to_c_string(&AppResponse::Ok(text)),
        Err(e) => response_to_c_string(&e),
    }
}

/// Appends a record given as JSON text to `collection`.
///
/// The `Ok` payload is the index of the new record.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_item(state: *mut EditorState, collection_ptr: *const c_char, json_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "add_item") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let collection = match c_ptr_to_string(collection_ptr, "collection") {
        Ok(collection) => collection,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(err) => return err,
    };

    match state.add_item_json(&collection, &json_str) {
        Ok(index) => response_to_c_string(&AppResponse::Ok(index.to_string())),
        Err(e) => response_to_c_string(&e),
    }
}

/// Replaces the record at `index` of `collection` with JSON text.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_item(
    state: *mut EditorState,
    collection_ptr: *const c_char,
    index: i64,
    json_ptr: *const c_char,
) -> *const c_char {
    let state = match state_mut(state, "update_item") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let collection = match c_ptr_to_string(collection_ptr, "collection") {
        Ok(collection) => collection,
        Err(err) => return err,
    };

    let index = match to_index(index) {
        Ok(index) => index,
        Err(err) => return err,
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(err) => return err,
    };

    match state.update_item_json(&collection, index, &json_str) {
        Ok(()) => response_to_c_string(&AppResponse::success("Item updated!")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Deletes the record at `index` of `collection`.
///
/// The remaining records keep their relative order; no other collection is
/// touched.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_item(state: *mut EditorState, collection_ptr: *const c_char, index: i64) -> *const c_char {
    let state = match state_mut(state, "delete_item") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let collection = match c_ptr_to_string(collection_ptr, "collection") {
        Ok(collection) => collection,
        Err(err) => return err,
    };

    let index = match to_index(index) {
        Ok(index) => index,
        Err(err) => return err,
    };

    match state.delete_item(&collection, index) {
        Ok(_) => response_to_c_string(&AppResponse::success("Item deleted!")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Generates `count` synthetic records of `collection`.
///
/// `count` must be between 1 and the configured maximum (10 000 by default).
/// With `add_dependencies`, back-references are installed and companion
/// records (access patterns, network links) are created. The `Ok` payload
/// is the number of records appended.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use scenario_editor_core::{create_editor, generate_items};
///
/// let editor = create_editor(std::ptr::null());
/// let collection = CString::new("NetworkSwitch").unwrap();
/// let result = generate_items(editor, collection.as_ptr(), 10, true);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_items(
    state: *mut EditorState,
    collection_ptr: *const c_char,
    count: i64,
    add_dependencies: bool,
) -> *const c_char {
    let state = match state_mut(state, "generate_items") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let collection = match c_ptr_to_string(collection_ptr, "collection") {
        Ok(collection) => collection,
        Err(err) => return err,
    };

    match state.generate_items(&collection, count, add_dependencies) {
        Ok(created) => response_to_c_string(&AppResponse::Ok(created.to_string())),
        Err(e) => response_to_c_string(&e),
    }
}

/// Stores the current document under `name` in the snapshot store.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn save_snapshot(state: *mut EditorState, name_ptr: *const c_char) -> *const c_char {
    let state = match state_ref(state, "save_snapshot") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let name = match c_ptr_to_string(name_ptr, "name") {
        Ok(name) => name,
        Err(err) => return err,
    };

    match state.save_snapshot(&name) {
        Ok(()) => response_to_c_string(&AppResponse::Ok(format!("Snapshot '{name}' saved"))),
        Err(e) => response_to_c_string(&e),
    }
}

/// Replaces the current document with the snapshot stored under `name`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn restore_snapshot(state: *mut EditorState, name_ptr: *const c_char) -> *const c_char {
    let state = match state_mut(state, "restore_snapshot") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let name = match c_ptr_to_string(name_ptr, "name") {
        Ok(name) => name,
        Err(err) => return err,
    };

    match state.restore_snapshot(&name) {
        Ok(_) => respond_json(&state.collections()),
        Err(e) => response_to_c_string(&e),
    }
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_snapshots(state: *mut EditorState) -> *const c_char {
    let state = match state_ref(state, "list_snapshots") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match state.list_snapshots() {
        Ok(names) => respond_json(&names),
        Err(e) => response_to_c_string(&e),
    }
}

/// Converts an [`AppResponse`] to a C-compatible string.
///
/// Returns a null pointer if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Wraps any serializable payload in `AppResponse::Ok` as JSON text.
fn respond_json<T: Serialize>(payload: &T) -> *const c_char {
    match serde_json::to_string(payload) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Converts a C string pointer to a Rust String.
///
/// # Returns
///
/// * `Ok(String)` - If conversion was successful
/// * `Err(*const c_char)` - Pointer to error message in C format if conversion failed
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn state_ref<'a>(state: *mut EditorState, caller: &str) -> Result<&'a EditorState, *const c_char> {
    match unsafe { state.as_ref() } {
        Some(s) => Ok(s),
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn state_mut<'a>(state: *mut EditorState, caller: &str) -> Result<&'a mut EditorState, *const c_char> {
    match unsafe { state.as_mut() } {
        Some(s) => Ok(s),
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn to_index(index: i64) -> Result<usize, *const c_char> {
    usize::try_from(index).map_err(|_| {
        let error = AppResponse::BadRequest(format!("Invalid index: {index}"));
        response_to_c_string(&error)
    })
}
