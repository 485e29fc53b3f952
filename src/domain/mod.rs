// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define the core
// concepts of the forecasting system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain data, errors and the traits other layers implement
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One seismic record as ingested from the catalogue
pub mod event;

// Feature schema and the chronologically ordered feature matrix
pub mod feature;

// Typed failure conditions the pipeline surfaces to callers
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
