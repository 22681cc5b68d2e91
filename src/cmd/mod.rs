mod easter;
mod generate;
mod list;

const USAGE: &'static str = "\
Turn templates of recurring holidays and festivities into a calendar feed.

USAGE:
    holical <command> ...

COMMANDS:
    easter    Print the date of Easter Sunday for some years
    generate  Write an iCalendar feed for a range of years
    list      List the resolved date of every event in a range of years
";

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let cmd = crate::args::next_as_command(USAGE, p)?;
    match &*cmd {
        "easter" => easter::run(p),
        "generate" => generate::run(p),
        "list" => list::run(p),
        unk => anyhow::bail!("unrecognized command '{}'", unk),
    }
}
