// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identity map of public objects.

use super::{NotifierLog, ObjectKey, ObjectRef, ObjectType, WeakObjectRef};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Pattern used for generated publicIDs.
pub const DEFAULT_ID_PATTERN: &str = "@classname@/@time/%Y%m%d%H%M%S.%f@.@id@";

static GLOBAL_ID: AtomicU64 = AtomicU64::new(0);

/// Maps publicIDs to live objects.
///
/// The map holds weak handles only: registration never keeps an object
/// alive, and a dropped object removes its own entry. Each registry also
/// carries the pending change notifiers produced by its objects.
pub struct ObjectRegistry {
    objects: Mutex<HashMap<String, WeakObjectRef>>,
    registration_enabled: AtomicBool,
    id_generation_enabled: AtomicBool,
    id_pattern: RwLock<String>,
    id_counter: AtomicU64,
    notifiers: NotifierLog,
}

impl ObjectRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(HashMap::new()),
            registration_enabled: AtomicBool::new(true),
            id_generation_enabled: AtomicBool::new(true),
            id_pattern: RwLock::new(DEFAULT_ID_PATTERN.to_string()),
            id_counter: AtomicU64::new(0),
            notifiers: NotifierLog::new(),
        })
    }

    /// Process-wide registry used when no other one is given.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ObjectRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(ObjectRegistry::new).clone()
    }

    /// Live object registered under `public_id`.
    pub fn find(&self, public_id: &str) -> Option<ObjectRef> {
        self.objects.lock().get(public_id)?.upgrade()
    }

    /// Typed variant of [`find`](Self::find).
    pub fn find_as<T: ObjectType>(&self, public_id: &str) -> Option<Arc<RwLock<T>>> {
        self.find(public_id)?.downcast::<T>()
    }

    /// Bind `public_id` to `object`. Fails on an empty id or when a live
    /// object already holds it; stale entries are replaced.
    pub fn register(&self, public_id: &str, object: &WeakObjectRef) -> bool {
        if public_id.is_empty() {
            return false;
        }
        let mut objects = self.objects.lock();
        if let Some(existing) = objects.get(public_id) {
            if existing.is_alive() && existing.key() != object.key() {
                log::debug!(
                    "[registry] publicID {} already taken by {}",
                    public_id,
                    existing.class_name()
                );
                return false;
            }
        }
        objects.insert(public_id.to_string(), object.clone());
        true
    }

    /// Remove the entry of `public_id` if it belongs to the object `key`.
    pub fn deregister(&self, public_id: &str, key: ObjectKey) -> bool {
        let mut objects = self.objects.lock();
        match objects.get(public_id) {
            Some(entry) if entry.key() == key => {
                objects.remove(public_id);
                true
            }
            _ => false,
        }
    }

    /// Number of registered live objects.
    pub fn object_count(&self) -> usize {
        self.objects
            .lock()
            .values()
            .filter(|entry| entry.is_alive())
            .count()
    }

    pub fn is_registration_enabled(&self) -> bool {
        self.registration_enabled.load(Ordering::Acquire)
    }

    /// Disabled registration lets several objects share a publicID, as
    /// needed when loading independent copies of the same data.
    pub fn set_registration_enabled(&self, enabled: bool) {
        self.registration_enabled.store(enabled, Ordering::Release);
    }

    pub fn is_id_generation_enabled(&self) -> bool {
        self.id_generation_enabled.load(Ordering::Acquire)
    }

    /// Whether objects read without a publicID get a generated one.
    pub fn set_id_generation_enabled(&self, enabled: bool) {
        self.id_generation_enabled.store(enabled, Ordering::Release);
    }

    pub fn id_pattern(&self) -> String {
        self.id_pattern.read().clone()
    }

    pub fn set_id_pattern(&self, pattern: &str) {
        *self.id_pattern.write() = pattern.to_string();
    }

    pub fn set_id_counter(&self, value: u64) {
        self.id_counter.store(value, Ordering::Release);
    }

    /// Expand the id pattern for an object of `class_name`.
    ///
    /// Variables are enclosed in `@`: `classname`, `id` (per-registry
    /// counter), `globalid` (process counter) and `time/<strftime format>`.
    /// `%f` in a time format stands for microseconds. Unknown variables
    /// expand to nothing.
    pub fn generate_id(&self, class_name: &str) -> String {
        let pattern = self.id_pattern();
        let mut out = String::with_capacity(pattern.len() + 16);
        let mut rest = pattern.as_str();
        while let Some(start) = rest.find('@') {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 1..];
            let Some(end) = tail.find('@') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            self.expand_variable(&tail[..end], class_name, &mut out);
            rest = &tail[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn expand_variable(&self, variable: &str, class_name: &str, out: &mut String) {
        let (name, format) = match variable.split_once('/') {
            Some((name, format)) => (name, Some(format)),
            None => (variable, None),
        };
        match name {
            "classname" => out.push_str(class_name),
            "id" => {
                let id = self.id_counter.fetch_add(1, Ordering::AcqRel) + 1;
                let _ = write!(out, "{}", id);
            }
            "globalid" => {
                let id = GLOBAL_ID.fetch_add(1, Ordering::AcqRel) + 1;
                let _ = write!(out, "{}", id);
            }
            "time" => {
                let format = format.unwrap_or("%FT%T.%f").replace("%f", "%6f");
                let mut text = String::new();
                if write!(text, "{}", Utc::now().format(&format)).is_ok() {
                    out.push_str(&text);
                } else {
                    log::warn!("[registry] invalid time format in id pattern: {}", variable);
                }
            }
            other => log::debug!("[registry] unknown id pattern variable: {}", other),
        }
    }

    /// Pending change notifiers of objects bound to this registry.
    pub fn notifiers(&self) -> &NotifierLog {
        &self.notifiers
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("objects", &self.object_count())
            .field("registration_enabled", &self.is_registration_enabled())
            .field("pending_notifiers", &self.notifiers.len())
            .finish()
    }
}
