use std::collections::HashMap;

use {anyhow::Context, jiff::civil::Date, serde::Serialize};

use crate::{
    easter::{GREGORIAN_FLOOR, MAX_YEAR, compute_easter},
    rule::resolve,
    template::{Categories, TemplateDocument},
};

/// An inclusive range of Gregorian years.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct YearRange {
    start: i16,
    end: i16,
}

impl YearRange {
    /// Create a new range of years from `start` to `end`, inclusive.
    ///
    /// This returns an error if either year precedes the Gregorian calendar,
    /// exceeds `9999` or if `end < start`.
    pub fn new(start: i16, end: i16) -> anyhow::Result<YearRange> {
        for (label, year) in [("start", start), ("end", end)] {
            anyhow::ensure!(
                GREGORIAN_FLOOR <= year && year <= MAX_YEAR,
                "{label} year `{year}` is not in the supported range of \
                 `{GREGORIAN_FLOOR}..={MAX_YEAR}`",
            );
        }
        anyhow::ensure!(
            start <= end,
            "end year `{end}` must not precede start year `{start}`",
        );
        Ok(YearRange { start, end })
    }

    /// Replaces the `{start_year}` and `{end_year}` placeholders in `text`.
    ///
    /// Nothing else in `text` is interpreted.
    pub fn substitute(&self, text: &str) -> String {
        text.replace("{start_year}", &self.start.to_string())
            .replace("{end_year}", &self.end.to_string())
    }

    fn years(&self) -> impl Iterator<Item = i16> {
        self.start..=self.end
    }
}

impl std::fmt::Display for YearRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A single event pinned to a concrete date.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedOccurrence {
    pub date: Date,
    /// The day after `date`. All-day events end here, exclusively.
    #[serde(skip)]
    pub end: Date,
    pub uid_base: String,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Categories>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip)]
    pub position: usize,
}

impl ResolvedOccurrence {
    /// Returns the iCalendar UID of this occurrence.
    ///
    /// The year is the year of `date`, which is not necessarily the year the
    /// occurrence was resolved for.
    pub fn uid(&self) -> String {
        format!("{}-{}@local", self.uid_base, self.date.year())
    }
}

/// Resolves every enabled event in `doc` for every year in `range`.
///
/// Occurrences are grouped by year in ascending order. Within a year they
/// are ordered by date, and events on the same date keep the order in which
/// they appear in the template.
///
/// If any event has no date in any year, then the entire expansion fails.
/// The error names the event and the year. Expansion also fails if two
/// occurrences would get the same UID, which happens when events share a
/// `uid_base` or when an Easter offset pushes two occurrences of one event
/// into the same year.
pub fn expand(
    doc: &TemplateDocument,
    range: YearRange,
) -> anyhow::Result<Vec<ResolvedOccurrence>> {
    let enabled: Vec<_> = doc.events().iter().filter(|e| e.enabled).collect();
    let mut occurrences = Vec::with_capacity(
        enabled.len() * usize::from(range.end.abs_diff(range.start) + 1),
    );
    let mut uids: HashMap<String, Date> = HashMap::new();
    for year in range.years() {
        let easter = compute_easter(year);
        log::debug!(
            "expanding {count} events for {year} (Easter is {easter})",
            count = enabled.len(),
        );
        let mut yearly = Vec::with_capacity(enabled.len());
        for event in enabled.iter() {
            let date =
                resolve(&event.rule, year, easter).with_context(|| {
                    format!(
                        "failed to resolve event `{}` for year {year}",
                        event.uid_base,
                    )
                })?;
            let end = date.tomorrow().with_context(|| {
                format!(
                    "event `{}` on {date} has no following day",
                    event.uid_base,
                )
            })?;
            log::trace!("resolved `{}` to {date}", event.uid_base);
            let occ = ResolvedOccurrence {
                date,
                end,
                uid_base: event.uid_base.clone(),
                summary: range.substitute(&event.summary),
                description: range.substitute(&event.description),
                categories: event.categories.clone(),
                url: event.url.clone(),
                location: event.location.clone(),
                position: event.position,
            };
            if let Some(first) = uids.insert(occ.uid(), date) {
                anyhow::bail!(
                    "duplicate UID `{}` for event `{}` on {date} \
                     (already used on {first})",
                    occ.uid(),
                    event.uid_base,
                );
            }
            yearly.push(occ);
        }
        // `sort_by_key` is stable, but including the position makes the
        // order independent of how `yearly` was filled.
        yearly.sort_by_key(|occ| (occ.date, occ.position));
        occurrences.extend(yearly);
    }
    log::debug!(
        "expanded {} occurrences for years {range}",
        occurrences.len(),
    );
    Ok(occurrences)
}
