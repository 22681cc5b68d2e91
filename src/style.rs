use std::{
    fmt::Display,
    io::IsTerminal,
    sync::{Arc, LazyLock},
};

use anstyle::{AnsiColor, Style};

/// The styles used for terminal output.
///
/// A theme with no inner styles renders everything as plain text. That is
/// what you get when the stream isn't a terminal, `NO_COLOR` is set or
/// `TERM=dumb`.
#[derive(Clone, Debug)]
pub struct Theme {
    inner: Option<Arc<Styles>>,
}

impl Theme {
    pub fn stdout() -> &'static Theme {
        static THEME: LazyLock<Theme> =
            LazyLock::new(|| Theme::new(std::io::stdout().is_terminal()));
        &*THEME
    }

    pub fn stderr() -> &'static Theme {
        static THEME: LazyLock<Theme> =
            LazyLock::new(|| Theme::new(std::io::stderr().is_terminal()));
        &*THEME
    }

    fn new(tty: bool) -> Theme {
        if !tty || !colors_allowed() {
            return Theme { inner: None };
        }
        Theme { inner: Some(Arc::new(Styles::default())) }
    }

    /// Styles a resolved date in a listing.
    pub fn date<T: Display>(&self, data: T) -> Styled<'_, T> {
        Styled { data, style: self.inner.as_deref().map(|s| &s.date) }
    }

    /// Styles the level of a log message.
    pub fn level(&self, level: log::Level) -> Styled<'_, log::Level> {
        let style = self.inner.as_deref().map(|s| match level {
            log::Level::Error => &s.error,
            log::Level::Warn => &s.warn,
            _ => &s.quiet,
        });
        Styled { data: level, style }
    }
}

#[derive(Debug)]
struct Styles {
    date: Style,
    error: Style,
    warn: Style,
    quiet: Style,
}

impl Default for Styles {
    fn default() -> Styles {
        Styles {
            date: Style::new()
                .bold()
                .fg_color(Some(AnsiColor::Magenta.into())),
            error: Style::new().bold().fg_color(Some(AnsiColor::Red.into())),
            warn: Style::new().fg_color(Some(AnsiColor::Yellow.into())),
            quiet: Style::new().dimmed(),
        }
    }
}

/// Data that renders with a style, if it has one.
#[derive(Clone, Debug)]
pub struct Styled<'s, T> {
    data: T,
    style: Option<&'s Style>,
}

impl<'s, T: Display> Display for Styled<'s, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.style {
            None => self.data.fmt(f),
            Some(style) => write!(f, "{style}{}{style:#}", self.data),
        }
    }
}

fn colors_allowed() -> bool {
    if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        return false;
    }
    std::env::var_os("TERM").map_or(true, |term| term != "dumb")
}
