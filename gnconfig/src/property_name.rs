pub const LOG_CONFIG_FILE_PROPERTY: &str = "log4rs.config";
pub const LOG_LEVEL_PROPERTY: &str = "log.level";

pub const GEONODE_URL_PROPERTY: &str = "geonode.url";
pub const GEONODE_USER_PROPERTY: &str = "geonode.user";
pub const GEONODE_PASSWORD_PROPERTY: &str = "geonode.password";

pub const GEOSERVER_LOCATION_PROPERTY: &str = "geoserver.location";
pub const GEOSERVER_USER_PROPERTY: &str = "geoserver.user";
pub const GEOSERVER_PASSWORD_PROPERTY: &str = "geoserver.password";
pub const GEOSERVER_TIMEOUT_PROPERTY: &str = "geoserver.timeout";
pub const GEOSERVER_MAX_RETRIES_PROPERTY: &str = "geoserver.max_retries";
pub const GEOSERVER_BACKOFF_FACTOR_PROPERTY: &str = "geoserver.backoff_factor";
pub const GEOSERVER_DATASTORE_ENABLED_PROPERTY: &str = "geoserver.datastore_enabled";
pub const GEOSERVER_GEOFENCE_ENABLED_PROPERTY: &str = "geoserver.geofence_enabled";

pub const GISDATA_PATH_PROPERTY: &str = "gisdata.path";
pub const FIXTURES_PATH_PROPERTY: &str = "fixtures.path";

pub const PROGRESS_MAX_ATTEMPTS_PROPERTY: &str = "upload.progress_max_attempts";
pub const PROGRESS_INTERVAL_MS_PROPERTY: &str = "upload.progress_interval_ms";
// json permissions of the command line uploads, when --perms is not given
pub const UPLOAD_PERMISSIONS_PROPERTY: &str = "upload.permissions";
pub const STARTUP_ATTEMPTS_PROPERTY: &str = "startup.attempts";
pub const CAPS_ATTEMPTS_PROPERTY: &str = "caps.attempts";
