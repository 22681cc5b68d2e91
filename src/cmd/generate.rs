use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    args::{
        self, Usage,
        flags::{MetadataOverrides, TemplatePath, YearBounds},
    },
    expand::expand,
    ics,
    template::Metadata,
};

const USAGE: &'static str = r#"
Write an iCalendar feed with every enabled event for a range of years.

Each event in the template becomes one all-day event per year. Within a year,
events are ordered by date and events on the same date keep the order they
have in the template. Generating the same years from the same template always
produces the same bytes.

If any event has no date in any of the requested years (for example, a fifth
Friday in a month that only has four), then nothing is written at all.

USAGE:
    holical generate -s <year> [-e <year>]

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Write a feed for 2025 through 2027 to stdout:

        $ holical generate -s 2025 -e 2027 -t luxembourg.json

    %snip-start%

    Write a feed to a file with a different calendar name:

        $ holical generate -s 2025 -o feed.ics --calname 'Days {start_year}'
        generated feed.ics with 13 events for 2025-2025

    %snip-end%
REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let mut config = Config::default();
    let mut bounds = YearBounds::default();
    let mut template = TemplatePath::default();
    let mut overrides = MetadataOverrides::default();
    args::configure(
        p,
        USAGE,
        &mut [&mut config, &mut bounds, &mut template, &mut overrides],
    )?;

    let range = bounds.range()?;
    let doc = template.load()?;
    let meta = Metadata::resolve(doc.calendar(), overrides.get(), range)
        .context("invalid calendar metadata")?;
    let occurrences = expand(&doc, range)?;
    let feed = ics::serialize(&meta, &occurrences);
    log::info!(
        "generated {} events for {range} from `{}`",
        occurrences.len(),
        template.path().display(),
    );

    match config.output {
        None => {
            std::io::stdout().lock().write_all(feed.as_bytes())?;
        }
        Some(ref path) => {
            write_feed(path, feed.as_bytes()).with_context(|| {
                format!("failed to write feed to `{}`", path.display())
            })?;
            writeln!(
                std::io::stdout(),
                "generated {} with {} events for {range}",
                path.display(),
                occurrences.len(),
            )?;
        }
    }
    Ok(())
}

/// Writes `data` to a temporary file in the same directory as `path` and
/// then renames it to `path`.
///
/// Either the complete feed ends up at `path` or `path` is left untouched.
fn write_feed(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).with_context(|| {
        format!("failed to create temporary file in `{}`", dir.display())
    })?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    log::debug!("renamed temporary file to `{}`", path.display());
    Ok(())
}

#[derive(Debug, Default)]
struct Config {
    output: Option<PathBuf>,
}

impl args::Configurable for Config {
    fn configure(
        &mut self,
        p: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        use lexopt::Arg::*;

        match *arg {
            Short('o') | Long("output") => {
                let path = PathBuf::from(p.value().context("-o/--output")?);
                // `-` is the conventional spelling of stdout.
                self.output =
                    if path.as_os_str() == "-" { None } else { Some(path) };
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[Usage::flag(
            "-o, --output <path>",
            "Write the feed to this file instead of stdout.",
            r#"
Write the feed to this file instead of stdout.

The file is only written once the entire feed has been generated. When a file
is written, a one line summary is printed to stdout. Passing `-` writes to
stdout.
"#,
        )];
        USAGES
    }
}
