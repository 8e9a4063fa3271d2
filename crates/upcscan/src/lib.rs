//! `upcscan` - A terminal UPC/EAN barcode scanner
//!
//! This library provides barcode decoding and validation, product lookup
//! against a remote API, a persistent history of scanned items, and the
//! application controller tying them together.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod cli;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod error;
pub mod item;
pub mod logging;
pub mod lookup;
pub mod scanner;
pub mod storage;

pub use app::{App, AppEvent, AppState, LookupOutcome, SessionMode};
pub use config::Config;
pub use error::{Error, Result};
pub use item::{ScannedItem, Symbology};
pub use logging::init_logging;
pub use lookup::{HttpProductApi, ProductApi};
pub use scanner::{Decoder, DecoderConfig, Detection, KeyboardWedgeDecoder};
pub use storage::{ItemStore, Storage, StorageStats};
