//! Small shared utilities that do not belong to any single component.

pub mod hash;
