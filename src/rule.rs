use jiff::{
    Span, ToSpan,
    civil::{Date, Weekday},
};

/// A description of how to find an event's date in any given year.
///
/// This is a closed set. Adding a new kind of rule means adding a variant
/// here and teaching `resolve` about it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuleDescriptor {
    /// The same month and day every year.
    Fixed { month: i8, day: i8 },
    /// A number of days before (negative) or after Easter Sunday.
    EasterOffset { days: i32 },
    /// For example, the second Sunday of May.
    NthWeekdayOfMonth { month: i8, weekday: Weekday, occurrence: i32 },
    /// For example, the last Monday of May.
    LastWeekdayOfMonth { month: i8, weekday: Weekday },
}

impl RuleDescriptor {
    /// Create a fixed date rule.
    ///
    /// Only the ranges of `month` and `day` are checked here. Whether the
    /// combination exists (February 30, February 29) depends on the year and
    /// is checked by `resolve`.
    pub fn fixed(month: i64, day: i64) -> Result<RuleDescriptor, RuleError> {
        let month = month_in_range(month)?;
        let day = i8::try_from(day)
            .ok()
            .filter(|day| (1..=31).contains(day))
            .ok_or_else(|| {
                RuleError::new(
                    RuleErrorKind::InvalidDate,
                    format!(
                        "day `{day}` is not in the required range of `1..=31`"
                    ),
                )
            })?;
        Ok(RuleDescriptor::Fixed { month, day })
    }

    pub fn easter_offset(days: i64) -> Result<RuleDescriptor, RuleError> {
        let days = i32::try_from(days).map_err(|_| {
            RuleError::new(
                RuleErrorKind::InvalidDate,
                format!("Easter offset of `{days}` days is too big"),
            )
        })?;
        Ok(RuleDescriptor::EasterOffset { days })
    }

    /// Create a rule for the `occurrence`-th `weekday` of `month`.
    ///
    /// `occurrence` must be at least `1`. There is no upper bound: asking for
    /// a sixth Friday is allowed here and fails for every year in `resolve`.
    pub fn nth_weekday_of_month(
        month: i64,
        weekday: &str,
        occurrence: i64,
    ) -> Result<RuleDescriptor, RuleError> {
        let month = month_in_range(month)?;
        let weekday = parse_weekday(weekday)?;
        let occurrence = i32::try_from(occurrence)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| {
                RuleError::new(
                    RuleErrorKind::NoSuchOccurrence,
                    format!(
                        "occurrence `{occurrence}` is invalid \
                         (it must be at least `1`)"
                    ),
                )
            })?;
        Ok(RuleDescriptor::NthWeekdayOfMonth { month, weekday, occurrence })
    }

    pub fn last_weekday_of_month(
        month: i64,
        weekday: &str,
    ) -> Result<RuleDescriptor, RuleError> {
        let month = month_in_range(month)?;
        let weekday = parse_weekday(weekday)?;
        Ok(RuleDescriptor::LastWeekdayOfMonth { month, weekday })
    }
}

/// The `type` tag used for each rule variant in templates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuleKind {
    Fixed,
    EasterOffset,
    NthWeekdayOfMonth,
    LastWeekdayOfMonth,
}

impl std::str::FromStr for RuleKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<RuleKind, RuleError> {
        let kind = match s {
            "fixed" => RuleKind::Fixed,
            "easter_offset" => RuleKind::EasterOffset,
            "nth_weekday_of_month" => RuleKind::NthWeekdayOfMonth,
            "last_weekday_of_month" => RuleKind::LastWeekdayOfMonth,
            unk => {
                return Err(RuleError::new(
                    RuleErrorKind::UnknownRuleType,
                    format!(
                        "unrecognized rule type `{unk}` (expected one of \
                         `fixed`, `easter_offset`, `nth_weekday_of_month` \
                         or `last_weekday_of_month`)"
                    ),
                ));
            }
        };
        Ok(kind)
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match *self {
            RuleKind::Fixed => "fixed",
            RuleKind::EasterOffset => "easter_offset",
            RuleKind::NthWeekdayOfMonth => "nth_weekday_of_month",
            RuleKind::LastWeekdayOfMonth => "last_weekday_of_month",
        };
        f.write_str(label)
    }
}

/// Returns the concrete date that `rule` describes in `year`.
///
/// `easter` must be the Easter Sunday of `year`. It is passed in so that it
/// only needs to be computed once per year no matter how many rules there
/// are.
pub fn resolve(
    rule: &RuleDescriptor,
    year: i16,
    easter: Date,
) -> Result<Date, RuleError> {
    match *rule {
        RuleDescriptor::Fixed { month, day } => {
            Date::new(year, month, day).map_err(|_| {
                RuleError::new(
                    RuleErrorKind::InvalidDate,
                    format!(
                        "`{year:04}-{month:02}-{day:02}` is not a valid date"
                    ),
                )
            })
        }
        RuleDescriptor::EasterOffset { days } => Span::new()
            .try_days(i64::from(days))
            .and_then(|span| easter.checked_add(span))
            .map_err(|err| {
                RuleError::new(
                    RuleErrorKind::InvalidDate,
                    format!(
                        "adding `{days}` days to Easter `{easter}` \
                         failed: {err}"
                    ),
                )
            }),
        RuleDescriptor::NthWeekdayOfMonth { month, weekday, occurrence } => {
            let first = first_of_month(year, month)?;
            let first_match = 1 + i64::from(weekday.since(first.weekday()));
            let day = first_match + (i64::from(occurrence) - 1) * 7;
            let days_in_month = first.days_in_month();
            if day > i64::from(days_in_month) {
                return Err(RuleError::new(
                    RuleErrorKind::NoSuchOccurrence,
                    format!(
                        "there is no {occurrence}{suffix} {weekday:?} in \
                         `{year:04}-{month:02}` (day {day} is past the \
                         last day, {days_in_month})",
                        suffix = ordinal_suffix(occurrence),
                    ),
                ));
            }
            // OK because `day` is in `1..=days_in_month`.
            Date::new(year, month, day as i8).map_err(|err| {
                RuleError::new(RuleErrorKind::InvalidDate, err.to_string())
            })
        }
        RuleDescriptor::LastWeekdayOfMonth { month, weekday } => {
            let last = first_of_month(year, month)?.last_of_month();
            let back = last.weekday().since(weekday);
            last.checked_sub(back.days()).map_err(|err| {
                RuleError::new(RuleErrorKind::InvalidDate, err.to_string())
            })
        }
    }
}

/// Parses a weekday name, without regard for case.
///
/// Both full English names and their three letter abbreviations are
/// accepted.
pub fn parse_weekday(name: &str) -> Result<Weekday, RuleError> {
    use jiff::civil::Weekday::*;

    let weekday = match &*name.trim().to_ascii_lowercase() {
        "monday" | "mon" => Monday,
        "tuesday" | "tue" => Tuesday,
        "wednesday" | "wed" => Wednesday,
        "thursday" | "thu" => Thursday,
        "friday" | "fri" => Friday,
        "saturday" | "sat" => Saturday,
        "sunday" | "sun" => Sunday,
        _ => {
            return Err(RuleError::new(
                RuleErrorKind::UnknownWeekday,
                format!("unrecognized weekday `{name}`"),
            ));
        }
    };
    Ok(weekday)
}

/// An error that occurs when a rule is malformed or has no date in a
/// particular year.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleError {
    kind: RuleErrorKind,
    message: String,
}

/// The different ways a rule can fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuleErrorKind {
    UnknownRuleType,
    UnknownWeekday,
    InvalidDate,
    NoSuchOccurrence,
}

impl RuleError {
    fn new(kind: RuleErrorKind, message: String) -> RuleError {
        RuleError { kind, message }
    }

    pub fn kind(&self) -> RuleErrorKind {
        self.kind
    }
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuleError {}

fn month_in_range(month: i64) -> Result<i8, RuleError> {
    i8::try_from(month).ok().filter(|m| (1..=12).contains(m)).ok_or_else(
        || {
            RuleError::new(
                RuleErrorKind::InvalidDate,
                format!(
                    "month `{month}` is not in the required range of `1..=12`"
                ),
            )
        },
    )
}

fn first_of_month(year: i16, month: i8) -> Result<Date, RuleError> {
    Date::new(year, month, 1).map_err(|err| {
        RuleError::new(
            RuleErrorKind::InvalidDate,
            format!("`{year:04}-{month:02}` is not a valid month: {err}"),
        )
    })
}

fn ordinal_suffix(n: i32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use crate::easter::compute_easter;

    use super::*;

    fn resolve_in(rule: RuleDescriptor, year: i16) -> Result<Date, RuleError> {
        resolve(&rule, year, compute_easter(year))
    }

    #[test]
    fn fixed() {
        let rule = RuleDescriptor::fixed(6, 23).unwrap();
        assert_eq!(resolve_in(rule, 2025), Ok(date(2025, 6, 23)));

        let leap = RuleDescriptor::fixed(2, 29).unwrap();
        assert_eq!(resolve_in(leap, 2024), Ok(date(2024, 2, 29)));
        let err = resolve_in(leap, 2025).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::InvalidDate);
        insta::assert_snapshot!(err, @"`2025-02-29` is not a valid date");

        let never = RuleDescriptor::fixed(2, 30).unwrap();
        let err = resolve_in(never, 2024).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::InvalidDate);
    }

    #[test]
    fn fixed_ranges() {
        let err = RuleDescriptor::fixed(13, 1).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::InvalidDate);
        insta::assert_snapshot!(
            err,
            @"month `13` is not in the required range of `1..=12`",
        );

        let err = RuleDescriptor::fixed(1, 0).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::InvalidDate);
        insta::assert_snapshot!(
            err,
            @"day `0` is not in the required range of `1..=31`",
        );

        let err = RuleDescriptor::fixed(1, 300).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::InvalidDate);
    }

    #[test]
    fn easter_offset() {
        for year in [1583, 1818, 2000, 2025, 2285, 9999] {
            let rule = RuleDescriptor::easter_offset(0).unwrap();
            assert_eq!(resolve_in(rule, year), Ok(compute_easter(year)));
        }

        // Whit Monday.
        let rule = RuleDescriptor::easter_offset(50).unwrap();
        assert_eq!(resolve_in(rule, 2025), Ok(date(2025, 6, 9)));
        // Ash Wednesday.
        let rule = RuleDescriptor::easter_offset(-46).unwrap();
        assert_eq!(resolve_in(rule, 2025), Ok(date(2025, 3, 5)));
        // Crossing into the previous year is fine.
        let rule = RuleDescriptor::easter_offset(-120).unwrap();
        assert_eq!(resolve_in(rule, 2025), Ok(date(2024, 12, 21)));
    }

    #[test]
    fn easter_offset_out_of_range() {
        let rule = RuleDescriptor::easter_offset(365).unwrap();
        let err = resolve_in(rule, 9999).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::InvalidDate);

        let err = RuleDescriptor::easter_offset(i64::MAX).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::InvalidDate);
    }

    #[test]
    fn nth_weekday_of_month() {
        // Mother's Day in Luxembourg: second Sunday of May.
        let rule = RuleDescriptor::nth_weekday_of_month(5, "SUNDAY", 2)
            .unwrap();
        assert_eq!(resolve_in(rule, 2025), Ok(date(2025, 5, 11)));
        assert_eq!(resolve_in(rule, 2026), Ok(date(2026, 5, 10)));

        // The first of the month itself matches.
        let rule =
            RuleDescriptor::nth_weekday_of_month(2, "monday", 1).unwrap();
        assert_eq!(resolve_in(rule, 2021), Ok(date(2021, 2, 1)));

        // Fifth occurrences exist in some months.
        let rule = RuleDescriptor::nth_weekday_of_month(1, "Fri", 5).unwrap();
        assert_eq!(resolve_in(rule, 2021), Ok(date(2021, 1, 29)));
    }

    #[test]
    fn nth_weekday_of_month_missing() {
        let rule =
            RuleDescriptor::nth_weekday_of_month(2, "FRIDAY", 5).unwrap();
        let err = resolve_in(rule, 2021).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::NoSuchOccurrence);
        insta::assert_snapshot!(
            err,
            @"there is no 5th Friday in `2021-02` (day 33 is past the last day, 28)",
        );

        // There is no upper bound on the occurrence other than the length of
        // the month.
        let rule =
            RuleDescriptor::nth_weekday_of_month(3, "monday", 100).unwrap();
        let err = resolve_in(rule, 2025).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::NoSuchOccurrence);

        let err =
            RuleDescriptor::nth_weekday_of_month(3, "monday", 0).unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::NoSuchOccurrence);
        insta::assert_snapshot!(
            err,
            @"occurrence `0` is invalid (it must be at least `1`)",
        );
    }

    #[test]
    fn last_weekday_of_month() {
        let rule =
            RuleDescriptor::last_weekday_of_month(2, "MONDAY").unwrap();
        assert_eq!(resolve_in(rule, 2021), Ok(date(2021, 2, 22)));

        // The last day of the month itself matches.
        let rule = RuleDescriptor::last_weekday_of_month(8, "sun").unwrap();
        assert_eq!(resolve_in(rule, 2025), Ok(date(2025, 8, 31)));

        // Leap years change the last day of February.
        let rule =
            RuleDescriptor::last_weekday_of_month(2, "thursday").unwrap();
        assert_eq!(resolve_in(rule, 2024), Ok(date(2024, 2, 29)));
        assert_eq!(resolve_in(rule, 2023), Ok(date(2023, 2, 23)));
    }

    /// "Last" always exists for every weekday of every month.
    #[test]
    fn last_weekday_of_month_never_fails() {
        let names = [
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
        ];
        for year in [2021, 2024, 2100] {
            for month in 1..=12 {
                for name in names {
                    let rule =
                        RuleDescriptor::last_weekday_of_month(month, name)
                            .unwrap();
                    let got = resolve_in(rule, year).unwrap();
                    assert_eq!(got.month(), month as i8);
                    assert!(got.day() > got.days_in_month() - 7);
                }
            }
        }
    }

    #[test]
    fn weekdays() {
        assert_eq!(parse_weekday("MONDAY"), Ok(Weekday::Monday));
        assert_eq!(parse_weekday("Sun"), Ok(Weekday::Sunday));
        assert_eq!(parse_weekday("wEdNeSdAy"), Ok(Weekday::Wednesday));

        let err = parse_weekday("Caturday").unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::UnknownWeekday);
        insta::assert_snapshot!(err, @"unrecognized weekday `Caturday`");

        let err =
            RuleDescriptor::last_weekday_of_month(5, "mo").unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::UnknownWeekday);
    }

    #[test]
    fn kinds() {
        assert_eq!("fixed".parse::<RuleKind>(), Ok(RuleKind::Fixed));
        assert_eq!(
            "last_weekday_of_month".parse::<RuleKind>(),
            Ok(RuleKind::LastWeekdayOfMonth),
        );

        let err = "lunar".parse::<RuleKind>().unwrap_err();
        assert_eq!(err.kind(), RuleErrorKind::UnknownRuleType);
        insta::assert_snapshot!(
            err,
            @"unrecognized rule type `lunar` (expected one of `fixed`, `easter_offset`, `nth_weekday_of_month` or `last_weekday_of_month`)",
        );
    }
}
