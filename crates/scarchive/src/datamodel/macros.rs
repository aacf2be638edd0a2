// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

/// Implements the object traits of an embedded value class whose
/// `serialize` body is the generic property walk.
macro_rules! value_class {
    ($ty:ident, $rtti:ident) => {
        impl $crate::object::BaseObject for $ty {
            fn rtti(&self) -> &'static $crate::rtti::Rtti {
                &$rtti
            }

            fn meta(&self) -> &'static $crate::meta::MetaObject {
                <$ty as $crate::object::Class>::meta_object()
            }

            fn serialize(&mut self, ar: &mut dyn $crate::archive::Archive) {
                if $crate::datamodel::version_supported(ar, stringify!($ty)) {
                    ar.reflect(self);
                }
            }

            fn clone_box(&self) -> Box<dyn $crate::object::BaseObject> {
                Box::new(self.clone())
            }

            fn equals(&self, other: &dyn $crate::object::BaseObject) -> bool {
                other
                    .as_any()
                    .downcast_ref::<$ty>()
                    .is_some_and(|other| other == self)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }

        impl $crate::meta::PropertyValue for $ty {
            fn value_type() -> $crate::meta::ValueType {
                $crate::meta::ValueType::scalar($crate::meta::ValueKind::Class)
            }
        }

        impl $crate::meta::FromValue for $ty {
            fn from_value(value: &$crate::meta::Value) -> Result<Self, $crate::meta::MetaError> {
                match value {
                    $crate::meta::Value::Class(object) => object
                        .as_any()
                        .downcast_ref::<$ty>()
                        .cloned()
                        .ok_or_else(|| $crate::meta::MetaError::TypeMismatch {
                            expected: stringify!($ty).to_string(),
                            got: object.class_name().to_string(),
                        }),
                    other => Err($crate::meta::MetaError::TypeMismatch {
                        expected: stringify!($ty).to_string(),
                        got: other.describe(),
                    }),
                }
            }
        }

        impl $crate::meta::IntoValue for $ty {
            fn into_value(self) -> $crate::meta::Value {
                $crate::meta::Value::Class(Box::new(self))
            }
        }

        $crate::impl_archivable_class!($ty);
    };
}

/// Implements the constructors shared by public classes.
macro_rules! public_constructors {
    ($ty:ident) => {
        impl $ty {
            /// New instance with a generated publicID.
            pub fn create(
                registry: &::std::sync::Arc<$crate::object::ObjectRegistry>,
            ) -> Option<::std::sync::Arc<::parking_lot::RwLock<$ty>>> {
                let public_id = registry.generate_id(stringify!($ty));
                Self::create_with_id(registry, &public_id)
            }

            /// New instance registered under `public_id`. Fails while
            /// registration is enabled and the id is taken.
            pub fn create_with_id(
                registry: &::std::sync::Arc<$crate::object::ObjectRegistry>,
                public_id: &str,
            ) -> Option<::std::sync::Arc<::parking_lot::RwLock<$ty>>> {
                $crate::object::create_public::<$ty>(registry, public_id)
            }

            /// Registered instance with `public_id`.
            pub fn find(
                registry: &$crate::object::ObjectRegistry,
                public_id: &str,
            ) -> Option<::std::sync::Arc<::parking_lot::RwLock<$ty>>> {
                registry.find_as::<$ty>(public_id)
            }
        }
    };
}
