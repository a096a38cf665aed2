//! Market data acquisition.

pub mod krx;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use krx::KrxListingProvider;
pub use provider::{BarProvider, FetchError, ListingProvider};
pub use synthetic::SyntheticProvider;
pub use universe::UniverseFile;
pub use yahoo::YahooChartProvider;
