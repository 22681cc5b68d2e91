use jiff::civil::Date;

use crate::{expand::ResolvedOccurrence, template::Metadata};

/// Renders a complete iCalendar feed.
///
/// Each occurrence becomes one all-day `VEVENT`. Output depends only on the
/// inputs (there is no "now" anywhere), so regenerating a feed from the same
/// template and years produces identical bytes.
///
/// Lines are separated by `\n` and the feed ends with exactly one trailing
/// newline.
pub fn serialize(
    meta: &Metadata,
    occurrences: &[ResolvedOccurrence],
) -> String {
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{}", meta.product_id),
        "CALSCALE:GREGORIAN".to_string(),
        format!("X-WR-CALNAME:{}", escape_text(&meta.name)),
        format!("X-WR-CALDESC:{}", escape_text(&meta.description)),
        format!("X-PUBLISHED-TTL:{}", meta.refresh_interval),
    ];
    for occ in occurrences.iter() {
        let start = compact(occ.date);
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", occ.uid()));
        lines.push(format!("DTSTAMP:{start}T000000Z"));
        lines.push(format!("DTSTART;VALUE=DATE:{start}"));
        lines.push(format!("DTEND;VALUE=DATE:{}", compact(occ.end)));
        lines.push(format!("SUMMARY:{}", escape_text(&occ.summary)));
        lines.push(format!("DESCRIPTION:{}", escape_text(&occ.description)));
        if let Some(ref location) = occ.location {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }
        if let Some(ref categories) = occ.categories {
            let joined = categories
                .labels()
                .iter()
                .map(|label| escape_text(label))
                .collect::<Vec<String>>()
                .join("\\;");
            lines.push(format!("CATEGORIES:{joined}"));
        }
        if let Some(ref url) = occ.url {
            lines.push(format!("URL:{url}"));
        }
        lines.push("TRANSP:TRANSPARENT".to_string());
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Escapes the characters that are structural in iCalendar text values.
///
/// Backslashes go first. Otherwise the backslashes introduced for the other
/// characters would be escaped a second time.
pub fn escape_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(';', "\\;")
        .replace(',', "\\,")
}

/// Formats a date as `YYYYMMDD`.
fn compact(date: Date) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}
