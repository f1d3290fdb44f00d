//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! Navigation sessions cross the boundary as an opaque `Long` handle
//! created by `createSession` and released by `destroySession`. All
//! other data crosses as JSON (see [`crate::bridge`]). Failures throw
//! `IllegalArgumentException`.

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jboolean, jdouble, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use std::fmt::Display;

use crate::bridge::{self, NavigationSession};

const ILLEGAL_ARGUMENT: &str = "java/lang/IllegalArgumentException";

fn read_string(env: &mut JNIEnv, s: &JString) -> Result<String, String> {
    env.get_string(s).map(String::from).map_err(|e| e.to_string())
}

fn throw(env: &mut JNIEnv, message: impl Display) {
    if let Err(e) = env.throw_new(ILLEGAL_ARGUMENT, message.to_string()) {
        log::error!("failed to throw {ILLEGAL_ARGUMENT}: {e}");
    }
}

/// Convert a result into a Java string, throwing on error.
fn into_jstring<E: Display>(env: &mut JNIEnv, result: Result<String, E>) -> jstring {
    match result {
        Ok(value) => match env.new_string(value) {
            Ok(s) => s.into_raw(),
            Err(e) => {
                throw(env, e);
                std::ptr::null_mut()
            }
        },
        Err(e) => {
            throw(env, e);
            std::ptr::null_mut()
        }
    }
}

/// Borrow the session behind a handle from `createSession`.
///
/// # Safety
/// `handle` must be 0 or a live handle not yet passed to `destroySession`.
unsafe fn session<'a>(handle: jlong) -> Option<&'a NavigationSession> {
    (handle as *const NavigationSession).as_ref()
}

/// Returns the rust-core library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_version(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    into_jstring(&mut env, Ok::<_, String>(crate::VERSION.to_string()))
}

/// Installs the logcat logger.
/// Maps to: RustBridge.init()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_init(_env: JNIEnv, _class: JClass) {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("navcore"),
    );
    log::info!("navcore {} initialized", crate::VERSION);
}

/// Maps to: RustBridge.decodePolyline(encoded: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_decodePolyline(
    mut env: JNIEnv,
    _class: JClass,
    encoded: JString,
) -> jstring {
    let result = read_string(&mut env, &encoded)
        .and_then(|s| bridge::decode_polyline_json(&s).map_err(|e| e.to_string()));
    into_jstring(&mut env, result)
}

/// Maps to: RustBridge.encodePolyline(coordinatesJson: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_encodePolyline(
    mut env: JNIEnv,
    _class: JClass,
    coordinates_json: JString,
) -> jstring {
    let result = read_string(&mut env, &coordinates_json)
        .and_then(|s| bridge::encode_polyline_json(&s).map_err(|e| e.to_string()));
    into_jstring(&mut env, result)
}

/// Maps to: RustBridge.simplifyPolyline(encoded: String, toleranceM: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_simplifyPolyline(
    mut env: JNIEnv,
    _class: JClass,
    encoded: JString,
    tolerance_m: jdouble,
) -> jstring {
    let result = read_string(&mut env, &encoded)
        .and_then(|s| bridge::simplify_polyline(&s, tolerance_m).map_err(|e| e.to_string()));
    into_jstring(&mut env, result)
}

/// Maps to: RustBridge.filterAlongRoute(candidatesJson: String, polyline: String, toleranceM: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_filterAlongRoute(
    mut env: JNIEnv,
    _class: JClass,
    candidates_json: JString,
    encoded_polyline: JString,
    tolerance_m: jdouble,
) -> jstring {
    let result = read_string(&mut env, &candidates_json).and_then(|candidates| {
        let polyline = read_string(&mut env, &encoded_polyline)?;
        bridge::filter_along_route_json(&candidates, &polyline, tolerance_m)
            .map_err(|e| e.to_string())
    });
    into_jstring(&mut env, result)
}

/// Maps to: RustBridge.wantsAlongRoute(query: String) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_wantsAlongRoute(
    mut env: JNIEnv,
    _class: JClass,
    query: JString,
) -> jboolean {
    match read_string(&mut env, &query) {
        Ok(q) if bridge::wants_along_route(&q) => JNI_TRUE,
        Ok(_) => JNI_FALSE,
        Err(e) => {
            throw(&mut env, e);
            JNI_FALSE
        }
    }
}

/// Maps to: RustBridge.routeFromGpx(data: ByteArray, toleranceM: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_routeFromGpx(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
    tolerance_m: jdouble,
) -> jstring {
    let result = env
        .convert_byte_array(&data)
        .map_err(|e| e.to_string())
        .and_then(|bytes| bridge::route_from_gpx_json(&bytes, tolerance_m).map_err(|e| e.to_string()));
    into_jstring(&mut env, result)
}

/// Maps to: RustBridge.createSession(configJson: String) -> Long
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_createSession(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jlong {
    let result = read_string(&mut env, &config_json)
        .and_then(|s| NavigationSession::from_config_json(&s).map_err(|e| e.to_string()));
    match result {
        Ok(session) => Box::into_raw(Box::new(session)) as jlong,
        Err(e) => {
            throw(&mut env, e);
            0
        }
    }
}

/// Maps to: RustBridge.destroySession(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_destroySession(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: the handle came from createSession and is released once.
        drop(unsafe { Box::from_raw(handle as *mut NavigationSession) });
    }
}

/// Maps to: RustBridge.startNavigation(handle: Long, routeJson: String,
///     safetyBlocked: Boolean, entitled: Boolean) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_startNavigation(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    route_json: JString,
    safety_blocked: jboolean,
    entitled: jboolean,
) -> jboolean {
    // SAFETY: see `session`.
    let Some(session) = (unsafe { session(handle) }) else {
        throw(&mut env, "invalid session handle");
        return JNI_FALSE;
    };
    let result = read_string(&mut env, &route_json).and_then(|json| {
        session
            .start(&json, safety_blocked != JNI_FALSE, entitled != JNI_FALSE)
            .map_err(|e| e.to_string())
    });
    match result {
        Ok(true) => JNI_TRUE,
        Ok(false) => JNI_FALSE,
        Err(e) => {
            throw(&mut env, e);
            JNI_FALSE
        }
    }
}

/// Maps to: RustBridge.updateLocation(handle: Long, lat: Double, lon: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_updateLocation(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    latitude: jdouble,
    longitude: jdouble,
) -> jstring {
    // SAFETY: see `session`.
    let result = match unsafe { session(handle) } {
        Some(session) => session.update(latitude, longitude).map_err(|e| e.to_string()),
        None => Err("invalid session handle".to_string()),
    };
    into_jstring(&mut env, result)
}

/// Maps to: RustBridge.stopNavigation(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_stopNavigation(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `session`.
    if let Some(session) = unsafe { session(handle) } {
        session.stop();
    }
}

/// Maps to: RustBridge.requestRecalculation(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_requestRecalculation(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `session`.
    if let Some(session) = unsafe { session(handle) } {
        session.request_recalculation();
    }
}

/// Maps to: RustBridge.updateRoute(handle: Long, routeJson: String)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_updateRoute(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    route_json: JString,
) {
    // SAFETY: see `session`.
    let Some(session) = (unsafe { session(handle) }) else {
        throw(&mut env, "invalid session handle");
        return;
    };
    let result = read_string(&mut env, &route_json)
        .and_then(|json| session.update_route(&json).map_err(|e| e.to_string()));
    if let Err(e) = result {
        throw(&mut env, e);
    }
}

/// Maps to: RustBridge.navigationState(handle: Long) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_navigationState(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    // SAFETY: see `session`.
    let result = match unsafe { session(handle) } {
        Some(session) => session.state_json().map_err(|e| e.to_string()),
        None => Err("invalid session handle".to_string()),
    };
    into_jstring(&mut env, result)
}

/// Maps to: RustBridge.pollEvents(handle: Long) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_pollEvents(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    // SAFETY: see `session`.
    let result = match unsafe { session(handle) } {
        Some(session) => session.poll_events_json().map_err(|e| e.to_string()),
        None => Err("invalid session handle".to_string()),
    };
    into_jstring(&mut env, result)
}
