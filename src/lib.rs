pub mod audio;
pub mod buffer;
pub mod config;
pub mod decoding;
pub mod error_codes;
pub mod frame;
pub mod geometry;
pub mod glyph;
pub mod producer;
pub mod scheduler;
pub mod session;
pub mod shutdown;
pub mod terminal;
