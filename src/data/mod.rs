//! Data module - CSV loading and record extraction

mod incident;
mod loader;
mod processor;

#[cfg(test)]
pub use incident::Incident;
pub use incident::IncidentTable;
pub use loader::{DataLoader, LoaderError};
