//! Telegraf configuration rendering for the TagForge pipeline admin.
//!
//! A single pure function maps the relational model — enabled devices with
//! their enabled tags, sampling classes, and resolved destinations — to
//! the exact configuration document the collector process parses. The
//! renderer performs no I/O and its output is byte-for-byte reproducible
//! over an unchanged model; the admin layer diffs consecutive renders to
//! decide whether the collector needs a reload.

pub mod render;

pub use render::{render_config, RenderContext};
