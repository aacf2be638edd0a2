// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference data model.
//!
//! A small slice of a seismological event catalogue built on the generic
//! object pattern: embedded value types, enumerations, public objects with
//! child containers and non-public children identified by a composite index.
//!
//! ```text
//! EventParameters
//!   ├── Pick*        ── Comment*
//!   └── Origin*      ── Comment*
//!                    └─ Arrival*
//! ```

#[macro_use]
mod macros;

mod arrival;
mod children;
mod comment;
mod enums;
mod event_parameters;
mod origin;
mod pick;
mod types;

pub use arrival::{Arrival, ArrivalIndex, ARRIVAL_TYPE};
pub use comment::{Comment, CommentIndex, COMMENT_TYPE};
pub use enums::{EvaluationMode, PickOnset};
pub use event_parameters::{EventParameters, EVENT_PARAMETERS_TYPE};
pub use origin::{Origin, ORIGIN_TYPE};
pub use pick::{Pick, PICK_TYPE};
pub use types::{
    CreationInfo, RealQuantity, TimeQuantity, CREATION_INFO_TYPE, REAL_QUANTITY_TYPE,
    TIME_QUANTITY_TYPE,
};

use crate::archive::{Archive, Version};
use crate::factory::{ClassEntry, ClassFactory, FactoryError};
use crate::object::{Class, ObjectRef, ObjectType};

/// Schema version written by this data model.
pub const VERSION: Version = Version::new(0, 13);

/// Register every class of the data model with `factory`.
pub fn register(factory: &ClassFactory) -> Result<(), FactoryError> {
    factory.register(value_entry::<RealQuantity>())?;
    factory.register(value_entry::<TimeQuantity>())?;
    factory.register(value_entry::<CreationInfo>())?;
    factory.register(object_entry::<Comment>())?;
    factory.register(object_entry::<Arrival>())?;
    factory.register(object_entry::<Pick>())?;
    factory.register(object_entry::<Origin>())?;
    factory.register(object_entry::<EventParameters>())?;
    Ok(())
}

fn value_entry<T: Class + Clone + Default>() -> ClassEntry {
    ClassEntry::value(T::type_info(), T::meta_object, || Box::new(T::default()))
}

fn object_entry<T: ObjectType>() -> ClassEntry {
    ClassEntry::object(T::type_info(), T::meta_object, |registry| {
        ObjectRef::new(T::instantiate(registry))
    })
}

/// Refuse archives newer than [`VERSION`]: the object is skipped and the
/// archive marked invalid.
pub(crate) fn version_supported(ar: &mut dyn Archive, class_name: &str) -> bool {
    if ar.is_higher_version(VERSION.major, VERSION.minor) {
        log::error!(
            "Archive version {} too high: {} skipped",
            ar.version(),
            class_name
        );
        ar.set_validity(false);
        return false;
    }
    true
}
