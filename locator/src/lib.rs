//! BLE indoor localization facade.
//!
//! [`Locator`] wires the fingerprint store, the k-NN classifier and the
//! median profile store together and exposes the request-level operations:
//! collecting labeled samples, predicting regions, reloading, and building
//! and querying per-visit profiles. Two engines implement [`Locate`]; the
//! configured [`Strategy`] picks which one answers [`Locator::locate`].

mod error;
mod locator;
mod strategy;

pub use error::LocatorError;
pub use locator::{Health, Locator, LocatorConfig};
pub use strategy::{KnnStrategy, Locate, ProfileStrategy, RankedRegion, Ranking, Strategy};
