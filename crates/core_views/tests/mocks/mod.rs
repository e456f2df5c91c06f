#![allow(dead_code)]

pub mod chat;
pub mod platform;
pub mod store;
