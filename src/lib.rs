//! Spoken words in, keystrokes out
//!
//! [`typing`] holds the interpreter; [`segmenter`] and [`terminal`] turn a
//! live character stream into fragments for it.

pub mod config;
pub mod segmenter;
pub mod terminal;
pub mod typing;
