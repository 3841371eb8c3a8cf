//! `vinrecon-recon`: VIN-keyed price reconciliation engine.
//!
//! Pure engine crate: receives decoded row-sets, returns discrepancies.
//! No CLI or network dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;

pub use config::ReconConfig;
pub use engine::{reconcile, run, run_rows};
pub use error::ReconError;
pub use model::{DiscrepancyRecord, PriceCell, ReconResult, VehicleRecord, VehicleType};
pub use normalize::{filter_dealer, normalize};
