//! Builds the tracker from its configuration.
use std::sync::Arc;

use crate::config::Configuration;
use crate::core::Tracker;

/// Loads the configuration, initializes logging and assembles the tracker
/// service.
///
/// # Errors
///
/// Will return `Err` if the configuration cannot be loaded.
pub fn setup() -> Result<(Configuration, Arc<Tracker>), crate::config::Error> {
    let configuration = Configuration::load_from_env_or_file()?;

    super::logging::setup(&configuration);

    let tracker = Arc::new(Tracker::new(&configuration));

    Ok((configuration, tracker))
}
