#![allow(dead_code)]

pub mod assertions;
pub mod config;
pub mod market;
