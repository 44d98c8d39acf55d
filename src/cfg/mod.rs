// src/cfg/mod.rs

pub mod antispam;
pub mod config;
pub mod secure;
