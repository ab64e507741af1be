use commons_error::*;
use log::*;

use gnconfig::logging::init_logger;
use gnconfig::properties::get_prop_values;
use gnconfig::settings::E2eSettings;

pub mod harness;
pub mod scratch;

pub use harness::{FinalCheck, UploadHarness};

///
/// Publish the suite properties and the overrides in the global store,
/// start the logger and read the typed settings.
///
pub fn load_settings(overrides: &[(String, String)]) -> anyhow::Result<E2eSettings> {
    let settings = E2eSettings::load(overrides);
    init_logger(&get_prop_values());
    let settings = settings?;
    log_info!("Suite settings, geonode=[{}], geoserver=[{}]", &settings.geonode_url, &settings.geoserver_location);
    Ok(settings)
}

///
/// Once per suite run: wait for GeoNode, log in as the test user
/// and delete the datasets left by a previous run.
///
pub fn prepare_suite(settings: &E2eSettings) -> anyhow::Result<usize> {
    let harness = UploadHarness::set_up(settings.clone())?;
    harness.purge_user_datasets()
}
