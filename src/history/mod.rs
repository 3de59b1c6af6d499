//! Task history store
//!
//! Canonical record of every task the queue has seen, with bounded JSONL
//! persistence for cross-restart resume.

mod repository;

pub use repository::TaskRepository;
