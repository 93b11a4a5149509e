//! Settings, persisted user flags, and the flag store used by the HUD.
#![warn(unsafe_op_in_unsafe_fn)]

pub mod defaults;
mod error;
mod flags;
mod loader;
mod settings;
mod store;

pub use error::{Error, excerpt_at};
pub use flags::{FlagUpdate, UserFlags};
pub use loader::{
    load_flags_from_path, load_ron_from_path, load_settings_from_path, load_settings_from_str,
    parse_ron, validate_settings,
};
pub use settings::{Role, Settings};
pub use store::FlagStore;
