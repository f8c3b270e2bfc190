#![allow(dead_code)]

pub mod env;
pub mod stubs;
pub mod wav;
