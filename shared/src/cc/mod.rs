//! Concrete command classes

pub mod basic;
pub mod color_switch;
