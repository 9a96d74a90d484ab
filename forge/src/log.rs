use std::env;
use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::error::Error;

/// Logs to stderr, honoring `RUST_LOG`.
pub fn config_default() -> Result<Config, Error> {
    Config::builder()
        .appender(appender_stderr("stderr"))
        .build(Root::builder().appender("stderr").build(log_level()))
        .map_err(|err| Error::Log(err.to_string()))
}

/// Logs to stderr and additionally records everything of the record layer into `path`.
///
/// Campaigns driving many targets keep the record-layer details (nonces, AAD, overrides) in the
/// file and only warnings on the console.
pub fn config_to_file<P>(path: P) -> Result<Config, Error>
where
    P: AsRef<Path>,
{
    let console_level = if log_level() > LevelFilter::Warn {
        LevelFilter::Warn
    } else {
        log_level()
    };

    Config::builder()
        .appender(appender_stderr("stderr"))
        .appender(appender_tofile("tofile", path)?)
        .logger(
            Logger::builder()
                .appender("tofile")
                .additive(false)
                .build("tlsforge", log_level()),
        )
        .build(Root::builder().appender("stderr").build(console_level))
        .map_err(|err| Error::Log(err.to_string()))
}

fn appender_stderr<S>(name: S) -> Appender
where
    S: AsRef<str>,
{
    Appender::builder().build(
        name.as_ref(),
        Box::new(
            ConsoleAppender::builder()
                .target(log4rs::append::console::Target::Stderr)
                .encoder(Box::new(PatternEncoder::new(
                    "{h({d(%Y-%m-%dT%H:%M:%S%Z)}\t{m}{n})}",
                )))
                .build(),
        ),
    )
}

fn appender_tofile<S, P>(name: S, log_path: P) -> Result<Appender, Error>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d}\t{l}\t{t}\t{m}{n}")))
        .build(log_path)
        .map_err(|err| Error::Log(err.to_string()))?;

    Ok(Appender::builder().build(name.as_ref(), Box::new(appender)))
}

fn log_level() -> LevelFilter {
    env::var("RUST_LOG")
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::Info)
}
