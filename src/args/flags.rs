use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::{
    args::{self, Configurable, Usage},
    easter::{GREGORIAN_FLOOR, MAX_YEAR},
    expand::YearRange,
    template::{Overrides, TemplateDocument},
};

/// A Gregorian year given on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Year(i16);

impl Year {
    pub fn get(&self) -> i16 {
        self.0
    }
}

impl std::str::FromStr for Year {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Year> {
        let year = s
            .parse::<i16>()
            .with_context(|| format!("failed to parse `{s}` as a year"))?;
        anyhow::ensure!(
            year >= GREGORIAN_FLOOR,
            "year `{year}` precedes the Gregorian calendar \
             (years must be at least `{GREGORIAN_FLOOR}`)",
        );
        anyhow::ensure!(
            year <= MAX_YEAR,
            "year `{year}` is too big (years must be at most `{MAX_YEAR}`)",
        );
        Ok(Year(year))
    }
}

/// The `-s/--start-year` and `-e/--end-year` flags.
#[derive(Clone, Debug, Default)]
pub struct YearBounds {
    start: Option<Year>,
    end: Option<Year>,
}

impl YearBounds {
    /// Returns the requested range of years.
    ///
    /// The end year defaults to the start year.
    pub fn range(&self) -> anyhow::Result<YearRange> {
        let start = self
            .start
            .context("missing required flag -s/--start-year")?
            .get();
        let end = self.end.map_or(start, |year| year.get());
        YearRange::new(start, end)
    }
}

impl Configurable for YearBounds {
    fn configure(
        &mut self,
        p: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        use lexopt::Arg::*;

        match *arg {
            Short('s') | Long("start-year") => {
                self.start = Some(args::parse(p, "-s/--start-year")?);
            }
            Short('e') | Long("end-year") => {
                self.end = Some(args::parse(p, "-e/--end-year")?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[
            Usage::flag(
                "-s, --start-year <year>",
                "The first year to generate (required).",
                r#"
The first year to generate, inclusive.

This flag is required. Years before 1583 are rejected, since that is when the
Gregorian calendar, and therefore the Easter computation, begins.
"#,
            ),
            Usage::flag(
                "-e, --end-year <year>",
                "The last year to generate (defaults to the start year).",
                r#"
The last year to generate, inclusive.

When absent, only the start year is generated. It is an error for the end year
to precede the start year.
"#,
            ),
        ];
        USAGES
    }
}

/// The `-t/--template` flag.
#[derive(Clone, Debug)]
pub struct TemplatePath {
    path: PathBuf,
}

impl TemplatePath {
    const DEFAULT: &'static str = "activity_templates.json";

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and validates the template.
    pub fn load(&self) -> anyhow::Result<TemplateDocument> {
        log::debug!("loading template from `{}`", self.path.display());
        TemplateDocument::load(&self.path)
    }
}

impl Default for TemplatePath {
    fn default() -> TemplatePath {
        TemplatePath { path: PathBuf::from(TemplatePath::DEFAULT) }
    }
}

impl Configurable for TemplatePath {
    fn configure(
        &mut self,
        p: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        use lexopt::Arg::*;

        match *arg {
            Short('t') | Long("template") => {
                self.path = PathBuf::from(p.value().context("-t/--template")?);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[Usage::flag(
            "-t, --template <path>",
            "The JSON template file (default: activity_templates.json).",
            r#"
The JSON template file to read events from.

Defaults to `activity_templates.json` in the current directory.

A template is an object with a `calendar` object (`calname`, `caldesc`,
`prodid` and `published_ttl`) and a non-empty `events` list. Each event has a
`uid_base`, `summary`, `description` and `rule`, and optionally `categories`
(a string or a list of strings), `url`, `location` and `enabled`.

A rule has a `type` and the fields that type needs:

`fixed`: `month` and `day`.

`easter_offset`: `days` (may be negative).

`nth_weekday_of_month`: `month`, `weekday` and `occurrence`.

`last_weekday_of_month`: `month` and `weekday`.

Text fields may contain `{start_year}` and `{end_year}`, which are replaced
with the requested range of years.
"#,
        )];
        USAGES
    }
}

/// The `--calname`, `--caldesc` and `--prodid` flags.
#[derive(Clone, Debug, Default)]
pub struct MetadataOverrides(Overrides);

impl MetadataOverrides {
    pub fn get(&self) -> &Overrides {
        &self.0
    }
}

impl Configurable for MetadataOverrides {
    fn configure(
        &mut self,
        p: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        use lexopt::Arg::*;

        match *arg {
            Long("calname") => {
                self.0.calname = Some(args::parse(p, "--calname")?);
            }
            Long("caldesc") => {
                self.0.caldesc = Some(args::parse(p, "--caldesc")?);
            }
            Long("prodid") => {
                self.0.prodid = Some(args::parse(p, "--prodid")?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        const USAGES: &'static [Usage] = &[
            Usage::flag(
                "--calname <text>",
                "Override the calendar name from the template.",
                r#"
Override the calendar name (`calname`) from the template.

Placeholders like `{start_year}` are substituted as usual.
"#,
            ),
            Usage::flag(
                "--caldesc <text>",
                "Override the calendar description from the template.",
                r#"
Override the calendar description (`caldesc`) from the template.
"#,
            ),
            Usage::flag(
                "--prodid <text>",
                "Override the calendar PRODID from the template.",
                r#"
Override the product identifier (`prodid`) from the template.
"#,
            ),
        ];
        USAGES
    }
}
