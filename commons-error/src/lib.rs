use log::*;

//
// Logging helpers shared by the client and the upload suites.
// The macros expect `log::*` to be in scope at the call site.
//

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        info!("[{}:{}] {}", file!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        debug!("[{}:{}] {}", file!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        error!("{} [{}:{}]", format!($($arg)*), file!(), line!());
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        warn!("{} [{}:{}]", format!($($arg)*), file!(), line!());
    };
}

/// Forward an error with only the location, ex: `.map_err(tr_fwd!())?`
#[macro_export]
macro_rules! tr_fwd {
    () => {
        err_closure_fwd(format!("[{}:{}]", file!(), line!()).as_str())
    };
}

/// Forward an error with a context message, ex: `.map_err(err_fwd!("Cannot read, file=[{}]", f))?`
#[macro_export]
macro_rules! err_fwd {
    ($($arg:tt)*) => {
        err_closure_fwd(format!("{} [{}:{}]", format!($($arg)*).as_str(), file!(), line!()).as_str())
    };
}

/// Same as `err_fwd!` but to stderr, used before the logger is configured
#[macro_export]
macro_rules! eprint_fwd {
    ($($arg:tt)*) => {
        eprint_closure_fwd(format!("{} [{}:{}]", format!($($arg)*).as_str(), file!(), line!()).as_str())
    };
}

pub fn err_closure_fwd<'a, T: std::fmt::Display>(msg: &'a str) -> Box<dyn Fn(T) -> T + 'a> {
    let lambda = move |e: T| {
        log_error!("[{}] - {}", e, msg);
        e
    };
    Box::new(lambda)
}

pub fn eprint_closure_fwd<'a, T: std::fmt::Display>(msg: &'a str) -> Box<dyn Fn(T) -> T + 'a> {
    let lambda = move |e: T| {
        eprintln!("💣 [{}] - {}", e, msg);
        e
    };
    Box::new(lambda)
}

///
/// cargo test -p commons-error
///
#[cfg(test)]
mod tests {
    use std::fs::File;

    use crate::*;

    fn open_missing_shapefile() -> anyhow::Result<()> {
        let filename = "no_such_dataset.shp";
        let _f = File::open(filename).map_err(err_fwd!("Cannot open the base file, filename=[{}]", filename))?;
        Ok(())
    }

    fn forward_without_message() -> anyhow::Result<()> {
        open_missing_shapefile().map_err(tr_fwd!())?;
        Ok(())
    }

    #[test]
    fn forwarded_error_is_unchanged() {
        let e = open_missing_shapefile().unwrap_err();
        let forwarded = forward_without_message().unwrap_err();
        assert_eq!(e.to_string(), forwarded.to_string());
    }

    #[test]
    fn stderr_forwarding_keeps_the_value() {
        let r: Result<(), String> = Err("state=ERROR".to_string());
        let e = r.map_err(eprint_fwd!("Import failed, session=[{}]", 42)).unwrap_err();
        assert_eq!("state=ERROR", e);
    }
}
