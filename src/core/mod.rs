// src/core/mod.rs

pub mod editor;
pub mod listener;
pub mod reactor;
pub mod relay;
