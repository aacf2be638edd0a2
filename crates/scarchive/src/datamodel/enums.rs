// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::meta::{EnumType, MetaEnum};

/// How an object was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EvaluationMode {
    #[default]
    Manual,
    Automatic,
}

static EVALUATION_MODE: MetaEnum =
    MetaEnum::new("EvaluationMode", &[(0, "manual"), (1, "automatic")]);

impl EnumType for EvaluationMode {
    fn meta_enum() -> &'static MetaEnum {
        &EVALUATION_MODE
    }

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Manual),
            1 => Some(Self::Automatic),
            _ => None,
        }
    }
}

crate::impl_archivable_enum!(EvaluationMode);

/// Sharpness of a phase onset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PickOnset {
    #[default]
    Emergent,
    Impulsive,
    Questionable,
}

static PICK_ONSET: MetaEnum = MetaEnum::new(
    "PickOnset",
    &[(0, "emergent"), (1, "impulsive"), (2, "questionable")],
);

impl EnumType for PickOnset {
    fn meta_enum() -> &'static MetaEnum {
        &PICK_ONSET
    }

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Emergent),
            1 => Some(Self::Impulsive),
            2 => Some(Self::Questionable),
            _ => None,
        }
    }
}

crate::impl_archivable_enum!(PickOnset);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        assert_eq!(EvaluationMode::Automatic.to_name(), "automatic");
        assert_eq!(EvaluationMode::from_name("manual"), Some(EvaluationMode::Manual));
        assert_eq!(EvaluationMode::from_name("Manual"), None);
        assert_eq!(PickOnset::from_name("questionable"), Some(PickOnset::Questionable));
        assert_eq!(PickOnset::from_i32(3), None);
        assert_eq!(PickOnset::meta_enum().key_count(), 3);
    }
}
