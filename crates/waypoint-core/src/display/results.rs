//! Wrappers for the outcome of create and update operations.

use std::fmt;

use crate::models::{Phase, Plan, Task};

/// A freshly created resource, prefixed with its new id.
pub struct CreateResult<T> {
    pub resource: T,
}

impl<T> CreateResult<T> {
    pub fn new(resource: T) -> Self {
        Self { resource }
    }
}

/// A resource after a mutation, prefixed with what was done to it.
pub struct UpdateResult<T> {
    pub resource: T,
    pub action: String,
}

impl<T> UpdateResult<T> {
    pub fn new(resource: T, action: impl Into<String>) -> Self {
        Self {
            resource,
            action: action.into(),
        }
    }
}

macro_rules! impl_result_display {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for CreateResult<$ty> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                writeln!(f, concat!("Created ", $label, " with ID: {}"), self.resource.id)?;
                writeln!(f)?;
                write!(f, "{}", self.resource)
            }
        }

        impl fmt::Display for UpdateResult<$ty> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                writeln!(
                    f,
                    concat!("{} ", $label, " with ID: {}"),
                    self.action, self.resource.id
                )?;
                writeln!(f)?;
                write!(f, "{}", self.resource)
            }
        }
    };
}

impl_result_display!(Plan, "plan");
impl_result_display!(Phase, "phase");
impl_result_display!(Task, "task");
