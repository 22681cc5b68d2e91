use std::{
    fmt::{Debug, Display, Write},
    str::FromStr,
    sync::LazyLock,
};

use {
    anyhow::Context,
    lexopt::{Arg, Parser, ValueExt},
    regex::Regex,
};

pub mod flags;

/// A piece of command line configuration.
///
/// Each command builds a list of these and `configure` offers every argument
/// to each of them in turn. The first one to claim an argument wins.
pub trait Configurable: Debug {
    /// Returns `true` when `arg` was recognized and consumed.
    fn configure(
        &mut self,
        p: &mut Parser,
        arg: &mut Arg,
    ) -> anyhow::Result<bool>;

    /// Documentation for every flag and argument this target recognizes.
    fn usage(&self) -> &[Usage] {
        &[]
    }
}

/// Drive `p` to completion, handing each argument to `targets`.
///
/// `usage` may contain `%args%` and `%flags%`, which are replaced with the
/// documentation collected from `targets`. Content between `%snip-start%`
/// and `%snip-end%` only appears in the long `--help` output.
pub fn configure(
    p: &mut Parser,
    usage: &str,
    targets: &mut [&mut dyn Configurable],
) -> anyhow::Result<()> {
    static SNIPPED: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^\s*%snip-start%\p{any}*?%snip-end%\s*$").unwrap()
    });
    static SNIP_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^\s*%snip-(start|end)%\s*$").unwrap()
    });

    while let Some(arg) = p.next()? {
        let long = match arg {
            Arg::Short('h') => Some(false),
            Arg::Long("help") => Some(true),
            _ => None,
        };
        if let Some(long) = long {
            let (args, flags) = collect_usages(targets);
            let (text, args, flags) = if long {
                (
                    SNIP_MARKERS.replace_all(usage, "").into_owned(),
                    Usage::long(&args),
                    Usage::long(&flags),
                )
            } else {
                (
                    SNIPPED.replace_all(usage, "").into_owned(),
                    Usage::short(&args),
                    Usage::short(&flags),
                )
            };
            let text =
                text.replace("%args%", &args).replace("%flags%", &flags);
            return Err(anyhow::Error::from(Help(text.trim().to_string())));
        }
        if arg == Arg::Long("version") {
            return Err(anyhow::Error::from(Version));
        }
        // Long flag names borrow from `p`, which we also need to hand to the
        // targets. So give the name its own home first.
        let owned_long = match arg {
            Arg::Long(name) => Some(name.to_string()),
            _ => None,
        };
        let mut arg = match (owned_long.as_deref(), arg) {
            (Some(name), _) => Arg::Long(name),
            (None, Arg::Short(c)) => Arg::Short(c),
            (None, Arg::Value(v)) => Arg::Value(v),
            (None, Arg::Long(_)) => unreachable!(),
        };
        let mut claimed = false;
        for target in targets.iter_mut() {
            if target.configure(p, &mut arg)? {
                claimed = true;
                break;
            }
        }
        if !claimed {
            return Err(arg.unexpected().into());
        }
    }
    Ok(())
}

/// Splits the usage docs of all targets into positional arguments (in the
/// order given) and flags (sorted by their long name).
fn collect_usages(
    targets: &[&mut dyn Configurable],
) -> (Vec<Usage>, Vec<Usage>) {
    let mut args = vec![];
    let mut flags = vec![Help::USAGE, Version::USAGE];
    for target in targets.iter() {
        for &usage in target.usage().iter() {
            if usage.flag {
                flags.push(usage);
            } else {
                args.push(usage);
            }
        }
    }
    flags.sort_by_key(|u| {
        u.format.split_once(", ").map_or(u.format, |(_, long)| long)
    });
    (args, flags)
}

/// Reads the sub-command name that must come next.
///
/// With nothing left, or with `-h/--help`, the given usage is returned as
/// the error.
pub fn next_as_command(usage: &str, p: &mut Parser) -> anyhow::Result<String> {
    let usage = usage.trim();
    let Some(arg) = p.next()? else { anyhow::bail!("{usage}") };
    match arg {
        Arg::Value(cmd) => Ok(cmd.string()?),
        Arg::Short('h') | Arg::Long("help") => {
            Err(anyhow::Error::from(Help(usage.to_string())))
        }
        Arg::Long("version") => Err(anyhow::Error::from(Version)),
        arg => Err(arg.unexpected().into()),
    }
}

/// Parses the value of the flag just read by `p`.
///
/// Errors mention `flag_name`.
pub fn parse<T>(p: &mut Parser, flag_name: &'static str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Display + Debug + Send + Sync + 'static,
{
    let value = p.value().context(flag_name)?;
    let Some(value) = value.to_str() else {
        let err = lexopt::Error::NonUnicodeValue(value);
        return Err(anyhow::Error::from(err).context(flag_name));
    };
    value.parse().map_err(|err| anyhow::Error::msg(err).context(flag_name))
}

/// Documentation for a single flag or positional argument.
#[derive(Clone, Copy, Debug)]
pub struct Usage {
    /// `true` for optional flags, `false` for required arguments.
    pub flag: bool,
    /// How it is written, e.g., `-s, --start-year <year>`.
    pub format: &'static str,
    /// One line, shown by `-h`.
    pub short: &'static str,
    /// Any number of paragraphs, shown by `--help`.
    pub long: &'static str,
}

impl Usage {
    pub const fn flag(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { flag: true, format, short, long }
    }

    pub const fn arg(
        format: &'static str,
        short: &'static str,
        long: &'static str,
    ) -> Usage {
        Usage { flag: false, format, short, long }
    }

    /// Renders a two column table of formats and short descriptions.
    pub fn short(usages: &[Usage]) -> String {
        let width = usages.iter().map(|u| u.format.len()).max().unwrap_or(0);
        let mut out = String::new();
        for usage in usages.iter() {
            writeln!(
                out,
                "    {format:<width$}  {short}",
                format = usage.format,
                short = usage.short,
            )
            .unwrap();
        }
        out
    }

    /// Renders each format followed by its long description, indented and
    /// wrapped to fit in 79 columns.
    pub fn long(usages: &[Usage]) -> String {
        let opts = textwrap::Options::new(79)
            .initial_indent("        ")
            .subsequent_indent("        ");
        let mut out = String::new();
        for (i, usage) in usages.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            writeln!(out, "    {}", usage.format).unwrap();
            for (j, paragraph) in usage.long.trim().split("\n\n").enumerate() {
                if j > 0 {
                    out.push('\n');
                }
                let paragraph = paragraph.replace('\n', " ");
                for line in textwrap::wrap(&paragraph, &opts) {
                    writeln!(out, "{line}").unwrap();
                }
            }
        }
        out
    }
}

/// The output of `-h/--help`, carried as an error so that it unwinds out of
/// argument parsing. `main` prints it to stdout and exits successfully.
#[derive(Debug)]
pub struct Help(String);

impl Help {
    const USAGE: Usage = Usage::flag(
        "-h/--help",
        "Print help. -h is short, --help is long.",
        r#"
Print help output.

The short flag, -h, prints one line per flag. The long flag, --help, prints
complete documentation for every flag along with longer examples.
"#,
    );
}

impl std::fmt::Display for Help {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Help {}

/// The output of `--version`. Handled like `Help`.
#[derive(Debug)]
pub struct Version;

impl Version {
    const USAGE: Usage = Usage::flag(
        "--version",
        "Print the version of holical.",
        r#"
Print the version of holical.
"#,
    );
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let semver = option_env!("CARGO_PKG_VERSION").unwrap_or("N/A");
        write!(f, "holical {semver}")
    }
}

impl std::error::Error for Version {}
