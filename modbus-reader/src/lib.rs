//! Read Modbus holding registers described by a JSON register catalog and decode them
//! into scaled, human-readable values, based on [tokio-modbus](https://github.com/slowtec/tokio-modbus).

//! ## Pipeline
//!
//! - [`catalog::RegisterCatalog`] loads the ordered register descriptors,
//! - [`transport::RegisterSource`] supplies the raw bytes for each descriptor (a Modbus TCP/RTU
//!   connection or the in-memory [`transport::RegisterBank`]),
//! - [`decoder::decode`] turns the bytes into a [`decoder::DecodedValue`],
//! - [`scan::scan_with`] drives the loop, isolating per-register failures
//!   ([`scan::run_until`] repeats it until shutdown), and
//! - [`report`] renders the results as text lines or JSON records.
//!
//! ## Catalog format
//!
//! The catalog is a JSON array. Each entry **must** contain:
//! - `address` - holding register start address, a string with optional base prefix (`"0x891C"`) or an integer,
//! - `name` - non-empty display label,
//! - `type` - one of `"U16"`, `"S16"`, `"U32"`, `"S32"` or `"STR"`; other values are reported per register,
//! - `length` - number of registers to read (`1..=125`).
//!
//! Optional keys are `sf_gain` (divisor applied to numeric values; zero is reported as a fault),
//! `units`, `range`, `note` and `property`.
//!
//! ```
//! use modbus_reader::{catalog::RegisterCatalog, decoder::decode};
//!
//! let catalog = RegisterCatalog::from_json_str(
//!     r#"[{"address": "0x891C", "name": "Vgrid", "type": "U16", "length": 1, "sf_gain": 10, "units": "V"}]"#,
//! )?;
//! let vgrid = catalog.iter().next().unwrap();
//! assert_eq!(decode(vgrid, &[0x08, 0xFC])?.to_string(), "230.00 V");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Register catalog loading and validation
pub mod catalog;
/// Utilities for decoding values from Modbus registers
pub mod codec;
/// Conversion of raw register bytes into scaled values
pub mod decoder;
/// Text and JSON rendering of register reports
pub mod report;
/// Sequential read-and-decode pass over a catalog
pub mod scan;
/// Sources of raw register contents
pub mod transport;
