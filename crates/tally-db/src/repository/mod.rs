//! # Repository Module
//!
//! Database repository implementations for Tally.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Session                                                                │
//! │       │  storage.save_entry_list(entries, next_id)                      │
//! │       ▼                                                                 │
//! │  StorageRepository                                                      │
//! │  ├── get_item / set_item / remove_item   (raw text values)              │
//! │  └── load_* / save_*                     (typed, JSON or plain text)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  local_storage table                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`storage::StorageRepository`] - Local key/value storage

pub mod storage;
