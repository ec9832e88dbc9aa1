//! Index newtypes used across the crate.
//!
//! Every table of the planning task (types, objects, functions, grounded variables and SAS values)
//! is addressed by a plain position. Wrapping those positions into distinct types keeps an object
//! index from being used as a variable index by accident.
use serde::{Deserialize, Serialize};
use std::{fmt::Display, ops::Deref};

use crate::error::{Error, Result};

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Copy, Clone, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl Deref for $name {
            type Target = usize;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<usize> for $name {
            fn from(val: usize) -> Self {
                Self(val)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl $name {
            /// Get the position, i.e. the corresponding [usize]
            pub fn value(self) -> usize {
                self.0
            }
        }
    };
}

index_type!(
    /// Position of a type in the type table of a [ParsedTask][crate::datatypes::ParsedTask]
    TypeId,
    "Type"
);
index_type!(
    /// Position of an object in the object table of a [ParsedTask][crate::datatypes::ParsedTask]
    ObjectId,
    "Object"
);
index_type!(
    /// Position of a predicate or function in a [ParsedTask][crate::datatypes::ParsedTask]
    FunctionId,
    "Function"
);
index_type!(
    /// Position of a [GroundedVar][crate::datatypes::GroundedVar] in a [GroundedTask][crate::datatypes::GroundedTask]
    VarId,
    "Var"
);
index_type!(
    /// Position of a value in the global value table of a [SasTask][crate::sas::SasTask]
    ValueId,
    "Value"
);

impl TypeId {
    /// The built-in type of truth values
    pub const BOOLEAN: TypeId = TypeId(0);
    /// The built-in type of numbers
    pub const NUMBER: TypeId = TypeId(1);
}

impl ObjectId {
    /// The object standing for `false`
    pub const FALSE: ObjectId = ObjectId(0);
    /// The object standing for `true`
    pub const TRUE: ObjectId = ObjectId(1);

    /// Returns true if the object is one of the two truth-value objects
    pub fn is_truth_value(&self) -> bool {
        *self == Self::FALSE || *self == Self::TRUE
    }
}

impl ValueId {
    /// The value `<true>`
    pub const TRUE: ValueId = ValueId(0);
    /// The value `<false>`
    pub const FALSE: ValueId = ValueId(1);
    /// The value `<undefined>`, used for "none of those" and for deleted propositions
    pub const UNDEFINED: ValueId = ValueId(2);
}

/// Packed `(variable, value)` pair of a SAS variable assignment.
///
/// The variable sits in the upper 16 bits and the value in the lower 16 bits, so both
/// indices are limited to [VarValue::CAPACITY].
#[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Copy, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarValue(u32);

impl VarValue {
    /// Number of distinct variables (and values) a code can address
    pub const CAPACITY: usize = 1 << 16;

    /// Packs a variable and a value into a single code.
    /// Fails with [Error::CapacityExceeded] if either index does not fit into 16 bits.
    pub fn new(var: usize, value: ValueId) -> Result<Self> {
        if var >= Self::CAPACITY {
            return Err(Error::CapacityExceeded {
                what: "variable",
                index: var,
            });
        }
        if value.0 >= Self::CAPACITY {
            return Err(Error::CapacityExceeded {
                what: "value",
                index: value.0,
            });
        }
        Ok(Self(((var as u32) << 16) + value.0 as u32))
    }

    /// The SAS variable of the pair
    pub fn var(self) -> usize {
        (self.0 >> 16) as usize
    }

    /// The value of the pair
    pub fn value(self) -> ValueId {
        ValueId((self.0 & 0xFFFF) as usize)
    }

    /// The raw code
    pub fn code(self) -> u32 {
        self.0
    }
}

impl Display for VarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}={})", self.var(), self.value().0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;
    use test_log::test;

    #[quickcheck]
    fn deref_display_from(value: usize) -> bool {
        assert_eq!(*ObjectId(value), value);
        assert_eq!(ObjectId::from(value), ObjectId(value));
        assert_eq!(format!("{}", VarId(value)), format!("Var({})", value));
        assert_eq!(ValueId(value).value(), value);
        true
    }

    #[quickcheck]
    fn var_value_packing(var: u16, value: u16) -> bool {
        let code = VarValue::new(var as usize, ValueId(value as usize)).unwrap();
        code.var() == var as usize && code.value() == ValueId(value as usize)
    }

    #[test]
    fn var_value_capacity() {
        assert!(VarValue::new(VarValue::CAPACITY, ValueId::TRUE).is_err());
        assert!(VarValue::new(0, ValueId(VarValue::CAPACITY)).is_err());
        let code = VarValue::new(3, ValueId::UNDEFINED).unwrap();
        assert_eq!(code.code(), (3 << 16) + 2);
        assert_eq!(format!("{}", code), "(3=2)");
    }

    #[test]
    fn constants() {
        assert!(ObjectId::FALSE.is_truth_value());
        assert!(ObjectId::TRUE.is_truth_value());
        assert!(!ObjectId(2).is_truth_value());
        assert_ne!(ValueId::TRUE, ValueId::FALSE);
    }
}
