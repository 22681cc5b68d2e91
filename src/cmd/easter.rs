use std::io::Write;

use crate::{
    args::{self, Usage, flags::Year},
    easter::compute_easter,
};

const USAGE: &'static str = r#"
Print the date of Easter Sunday for one or more Gregorian years.

This is the date that `easter_offset` rules count from.

USAGE:
    holical easter <year>...

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Print Easter for this year and next year:

        $ holical easter 2025 2026
        2025-04-20
        2026-04-05

REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let mut config = Config::default();
    args::configure(p, USAGE, &mut [&mut config])?;
    anyhow::ensure!(!config.years.is_empty(), "missing required <year>");

    let mut wtr = std::io::stdout().lock();
    for year in config.years.iter() {
        writeln!(wtr, "{}", compute_easter(year.get()))?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Config {
    years: Vec<Year>,
}

impl args::Configurable for Config {
    fn configure(
        &mut self,
        _: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        let lexopt::Arg::Value(ref v) = *arg else { return Ok(false) };
        let Some(v) = v.to_str() else {
            anyhow::bail!("year {v:?} is not valid UTF-8")
        };
        self.years.push(v.parse()?);
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[Usage::arg(
            "<year>...",
            "One or more years, each 1583 or later.",
            r#"
One or more years to compute Easter for. Each must be 1583 or later.
"#,
        )];
        USAGES
    }
}
