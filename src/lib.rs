//! Zaphod: keep a Canvas course in step with a plain-text course tree
//!
//! Content folders under `pages/` declare pages, assignments, files and links;
//! the sync engine places them into modules, builds rubrics for assignments and
//! prunes remote content that no longer has a local declaration.

pub mod cli;
pub mod core;
pub mod remote;
pub mod rubric;
pub mod yaml;
