use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Once;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::property_name::{LOG_CONFIG_FILE_PROPERTY, LOG_LEVEL_PROPERTY};

static LOGGER_INIT: Once = Once::new();

const CONSOLE_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:5})} {t} - {m}{n}";

///
/// Init log4rs once for the process.
/// The "log4rs.config" property points to a yaml file, otherwise a console logger is built.
///
pub fn init_logger(props: &HashMap<String, String>) {
    LOGGER_INIT.call_once(|| {
        let r = match props.get(LOG_CONFIG_FILE_PROPERTY) {
            Some(log_config) => {
                let log_config_path = Path::new(log_config);
                println!("😎 Read log properties from {:?}", &log_config_path);
                log4rs::init_file(log_config_path, Default::default()).map_err(|e| e.to_string())
            }
            None => {
                let level = props
                    .get(LOG_LEVEL_PROPERTY)
                    .and_then(|l| LevelFilter::from_str(l).ok())
                    .unwrap_or(LevelFilter::Info);
                console_config(level)
                    .and_then(|config| log4rs::init_config(config).map(|_| ()).map_err(|e| e.to_string()))
            }
        };

        if let Err(e) = r {
            // Another logger may already be installed by the test runner
            eprintln!("🚫 Cannot init the logger, e=[{}]", e);
        }
    });
}

fn console_config(level: LevelFilter) -> Result<Config, String> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use log::LevelFilter;

    use super::{console_config, init_logger};

    #[test]
    fn console_config_is_valid() {
        assert!(console_config(LevelFilter::Debug).is_ok());
    }

    #[test]
    fn init_twice_does_not_panic() {
        let props: HashMap<String, String> = [("log.level".to_string(), "debug".to_string())].into_iter().collect();
        init_logger(&props);
        init_logger(&props);
        log::info!("logger ready");
    }
}
