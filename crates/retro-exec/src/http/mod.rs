//! HTTP backends: hub job trigger, dataset metadata and champion inference.
mod client;

mod trigger;
pub use trigger::HubJobTrigger;

mod metadata;
pub use metadata::HttpMetadataSource;

mod champion;
pub use champion::{ChampionClientConfig, HttpChampionClient};
