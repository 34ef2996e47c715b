//! Async commands for a front end.
//!
//! Blocking device work runs on the tokio blocking pool; results and errors
//! come back as serializable values and display strings.

pub mod cim;
pub mod settings;

pub use cim::{
    erase_cim, list_ports, read_cim, view_image, write_cim, CimProgressEvent, ReadSummary,
};
pub use settings::{get_settings, save_settings};
