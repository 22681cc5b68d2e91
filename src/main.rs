use std::{env, io::Write, process::ExitCode};

mod args;
mod cmd;
mod easter;
mod expand;
mod ics;
mod logger;
mod rule;
mod style;
mod template;

/// Every year, right on schedule.
fn main() -> ExitCode {
    let err = match run() {
        Ok(code) => return code,
        Err(err) => err,
    };
    let root = err.root_cause();
    if root.is::<args::Help>() || root.is::<args::Version>() {
        writeln!(&mut std::io::stdout(), "{root}").unwrap();
        return ExitCode::SUCCESS;
    }
    // A closed stdout (e.g., piping into `head`) is not worth complaining
    // about. Rust ignores SIGPIPE, so it shows up as an I/O error instead.
    for cause in err.chain() {
        if let Some(err) = cause.downcast_ref::<std::io::Error>() {
            if err.kind() == std::io::ErrorKind::BrokenPipe {
                return ExitCode::SUCCESS;
            }
        }
        // `serde_json::to_writer` wraps I/O errors in its own type.
        if let Some(err) = cause.downcast_ref::<serde_json::Error>() {
            if err.io_error_kind() == Some(std::io::ErrorKind::BrokenPipe) {
                return ExitCode::SUCCESS;
            }
        }
    }
    if env::var("RUST_BACKTRACE").map_or(false, |v| v == "1")
        && env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        writeln!(&mut std::io::stderr(), "{:?}", err).unwrap();
    } else {
        writeln!(&mut std::io::stderr(), "{:#}", err).unwrap();
    }
    ExitCode::from(1)
}

fn run() -> anyhow::Result<ExitCode> {
    let level = match &*env::var("HOLICAL_LOG").unwrap_or_default() {
        "" | "off" => log::LevelFilter::Off,
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        unk => anyhow::bail!("unrecognized log level '{}'", unk),
    };
    log::set_max_level(level);
    logger::Logger::init()?;
    cmd::run(&mut lexopt::Parser::from_env())?;
    Ok(ExitCode::SUCCESS)
}
