use std::io::Write;

use crate::{
    args::{
        self, Usage,
        flags::{TemplatePath, YearBounds},
    },
    expand::expand,
    style::Theme,
};

const USAGE: &'static str = r#"
List the resolved date of every enabled event for a range of years.

The order is the same as the order of events in a generated feed. This is
useful for checking a template before publishing it.

The calendar's `calname`, `caldesc` and `prodid` are not needed for a listing,
so a template missing them is only rejected by `holical generate` (which can
also take them from flags).

USAGE:
    holical list -s <year> [-e <year>]

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    List the events of 2025:

        $ holical list -s 2025 -t luxembourg.json
        2025-01-01  new-year       New Year's Day
        2025-04-21  easter-monday  Easter Monday
        ...

    %snip-start%

    Get the dates as JSON lines:

        $ holical list -s 2025 --json
        {"date":"2025-01-01","uid_base":"new-year",...}
        ...

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
    args::configure(p, USAGE, &mut [&mut config, &mut bounds, &mut template])?;

    let range = bounds.range()?;
    let doc = template.load()?;
    let occurrences = expand(&doc, range)?;

    let mut wtr = std::io::stdout().lock();
    if config.json {
        for occ in occurrences.iter() {
            serde_json::to_writer(&mut wtr, occ)?;
            writeln!(wtr)?;
        }
        return Ok(());
    }
    let width =
        occurrences.iter().map(|occ| occ.uid_base.len()).max().unwrap_or(0);
    let theme = Theme::stdout();
    for occ in occurrences.iter() {
        writeln!(
            wtr,
            "{date}  {uid:<width$}  {summary}",
            date = theme.date(occ.date),
            uid = occ.uid_base,
            summary = occ.summary,
        )?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Config {
    json: bool,
}

impl args::Configurable for Config {
    fn configure(
        &mut self,
        _: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        use lexopt::Arg::*;

        match *arg {
            Long("json") => {
                self.json = true;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[Usage::flag(
            "--json",
            "Print each occurrence as a line of JSON.",
            r#"
Print each occurrence as a single line of JSON.

Each object has `date`, `uid_base`, `summary` and `description` fields, plus
`categories`, `url` and `location` when the event defines them. Placeholders
have already been substituted.
"#,
        )];
        USAGES
    }
}
