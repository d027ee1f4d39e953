use log4rs::{
    append::{
        console::ConsoleAppender,
        file::FileAppender,
    },
    config::{Appender, Config, Logger, Root},
    encode::pattern::PatternEncoder,
};
use log::LevelFilter;
use std::fs;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} | {({l}):5.5} | {f}:{L} - {m}{n}";

pub fn setup_logging(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all("logs")?;

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build("logs/palate.log")?;

    // Model download and HTTP internals are noisy at debug.
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("file", Box::new(file)))
        .logger(Logger::builder().build("hf_hub", LevelFilter::Warn))
        .logger(Logger::builder().build("tokenizers", LevelFilter::Warn))
        .logger(Logger::builder().build("reqwest", LevelFilter::Info))
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(level),
        )?;

    log4rs::init_config(config)?;

    Ok(())
}
