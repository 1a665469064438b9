//! CLI commands module.

mod fingerprint;
mod profile;
mod util;

pub use fingerprint::{CollectCommand, QueryArgs};
pub use profile::ProfileCommand;

pub(crate) use util::*;
