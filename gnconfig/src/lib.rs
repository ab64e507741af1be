pub mod conf_reader;
pub mod logging;
pub mod properties;
pub mod property_name;
pub mod settings;
