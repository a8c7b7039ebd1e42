//! Log output: timestamped lines to stdout and to a file in the platform data directory.

use std::{fs, path::PathBuf};

use log::LevelFilter;

/// Environment variable overriding the log level (`error`, `warn`, `info`, `debug`, `trace`).
pub const LOG_ENV: &str = "SHADERBENCH_LOG";

/// Parses a level name, defaulting to `Info`.
pub fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// `<data_local_dir>/shaderbench/latest.log`.
pub fn log_file_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("shaderbench").join("latest.log"))
}

/// Installs the global logger. File logging is skipped, with a warning, if the file cannot be
/// opened.
pub fn init() -> Result<(), fern::InitError> {
    let level = level_from(std::env::var(LOG_ENV).ok().as_deref());

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    let mut file_error = None;
    if let Some(path) = log_file_path() {
        let opened = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fern::log_file(&path));
        match opened {
            Ok(file) => dispatch = dispatch.chain(file),
            Err(e) => file_error = Some((path, e)),
        }
    }

    dispatch.apply()?;

    if let Some((path, e)) = file_error {
        log::warn!("Not logging to \"{}\": {e}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_env_value() {
        assert_eq!(level_from(None), LevelFilter::Info);
        assert_eq!(level_from(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from(Some(" WARN ")), LevelFilter::Warn);
        assert_eq!(level_from(Some("loud")), LevelFilter::Info);
    }
}
