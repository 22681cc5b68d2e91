use std::path::Path;

use {
    anyhow::Context,
    serde::{Deserialize, Serialize},
};

use crate::{
    expand::YearRange,
    rule::{RuleDescriptor, RuleKind},
};

/// A parsed and validated template of recurring events.
///
/// Every enabled event in a template has a well formed rule and non-blank
/// text fields. Disabled events are kept only when they are also well
/// formed. Otherwise they are dropped while loading, since they can never
/// be emitted anyway.
#[derive(Clone, Debug)]
pub struct TemplateDocument {
    calendar: CalendarMeta,
    events: Vec<EventDefinition>,
}

impl TemplateDocument {
    /// Read and validate the template at the given file path.
    pub fn load(path: &Path) -> anyhow::Result<TemplateDocument> {
        let data = std::fs::read_to_string(path).with_context(|| {
            format!("failed to read template file `{}`", path.display())
        })?;
        TemplateDocument::from_json(&data).with_context(|| {
            format!("invalid template file `{}`", path.display())
        })
    }

    /// Parse and validate a template from its JSON representation.
    pub fn from_json(data: &str) -> anyhow::Result<TemplateDocument> {
        let raw: RawDocument = serde_json::from_str(data)
            .context("template is not a JSON object of the expected shape")?;
        let Some(calendar) = raw.calendar else {
            return Err(ValidationError::new(
                "template must include a `calendar` object",
            )
            .into());
        };
        // Every other calendar field can be given on the command line.
        let ttl = calendar.published_ttl.as_deref().unwrap_or("");
        if ttl.trim().is_empty() {
            return Err(ValidationError::new(
                "missing or blank `published_ttl` in calendar",
            )
            .into());
        }
        let Some(raw_events) = raw.events.filter(|events| !events.is_empty())
        else {
            return Err(ValidationError::new(
                "template must include a non-empty `events` list",
            )
            .into());
        };

        let mut events = Vec::with_capacity(raw_events.len());
        for (position, value) in raw_events.into_iter().enumerate() {
            let enabled = match value.get("enabled") {
                None => true,
                Some(enabled) => enabled.as_bool().ok_or_else(|| {
                    ValidationError::new(format!(
                        "`enabled` in events[{position}] must be a boolean",
                    ))
                })?,
            };
            match EventDefinition::from_value(position, value) {
                Ok(event) => events.push(event),
                Err(err) if !enabled => {
                    log::debug!(
                        "dropping malformed disabled event \
                         events[{position}]: {err:#}",
                    );
                }
                Err(err) => return Err(err),
            }
        }
        log::debug!(
            "loaded template with {} events ({} enabled)",
            events.len(),
            events.iter().filter(|e| e.enabled).count(),
        );
        Ok(TemplateDocument { calendar, events })
    }

    /// Returns the calendar-level metadata, exactly as written in the
    /// template.
    pub fn calendar(&self) -> &CalendarMeta {
        &self.calendar
    }

    /// Returns all event definitions in template order.
    pub fn events(&self) -> &[EventDefinition] {
        &self.events
    }
}

/// The calendar-level fields of a template.
///
/// Only `published_ttl` is required when loading. The rest may be absent,
/// since command line overrides can fill them in. See `Metadata::resolve`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CalendarMeta {
    pub calname: Option<String>,
    pub caldesc: Option<String>,
    pub prodid: Option<String>,
    pub published_ttl: Option<String>,
}

/// A single recurring event in a template.
#[derive(Clone, Debug)]
pub struct EventDefinition {
    /// Zero-based index into the template's `events` list.
    ///
    /// This is the tie breaker for events that fall on the same date.
    pub position: usize,
    pub uid_base: String,
    pub summary: String,
    pub description: String,
    pub categories: Option<Categories>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub enabled: bool,
    pub rule: RuleDescriptor,
}

impl EventDefinition {
    fn from_value(
        position: usize,
        value: serde_json::Value,
    ) -> anyhow::Result<EventDefinition> {
        let context = format!("events[{position}]");
        if !value.is_object() {
            return Err(ValidationError::new(format!(
                "{context} must be a JSON object"
            ))
            .into());
        }
        let raw: RawEvent = serde_json::from_value(value)
            .with_context(|| format!("{context} has an unexpected shape"))?;

        let uid_base = required(raw.uid_base, "uid_base", &context)?;
        let context = format!("{context} (`{uid_base}`)");
        let summary = required(raw.summary, "summary", &context)?;
        let description = required(raw.description, "description", &context)?;
        let categories = match raw.categories {
            None => None,
            Some(categories) => Some(categories.validate(&context)?),
        };
        let Some(rule) = raw.rule else {
            return Err(ValidationError::new(format!(
                "missing `rule` in {context}"
            ))
            .into());
        };
        let rule = rule
            .descriptor()
            .with_context(|| format!("invalid `rule` in {context}"))?;
        Ok(EventDefinition {
            position,
            uid_base,
            summary,
            description,
            categories,
            url: raw.url.filter(|url| !url.trim().is_empty()),
            location: raw.location.filter(|loc| !loc.trim().is_empty()),
            enabled: raw.enabled.unwrap_or(true),
            rule,
        })
    }
}

/// The category labels of an event.
///
/// Templates may give either a single label or a non-empty list of them.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Categories {
    One(String),
    Many(Vec<String>),
}

impl Categories {
    /// Returns each category label in order.
    pub fn labels(&self) -> &[String] {
        match *self {
            Categories::One(ref label) => std::slice::from_ref(label),
            Categories::Many(ref labels) => labels,
        }
    }

    fn validate(self, context: &str) -> Result<Categories, ValidationError> {
        let ok = match self {
            Categories::One(ref label) => !label.trim().is_empty(),
            Categories::Many(ref labels) => {
                !labels.is_empty()
                    && labels.iter().all(|label| !label.trim().is_empty())
            }
        };
        if !ok {
            return Err(ValidationError::new(format!(
                "`categories` in {context} must be a non-blank string \
                 or a non-empty list of non-blank strings",
            )));
        }
        Ok(self)
    }
}

/// Command line replacements for template metadata.
///
/// A blank override is the same as no override.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub calname: Option<String>,
    pub caldesc: Option<String>,
    pub prodid: Option<String>,
}

/// The calendar-level fields of a feed, after overrides have been applied
/// and placeholders substituted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub product_id: String,
    pub refresh_interval: String,
}

impl Metadata {
    pub fn resolve(
        calendar: &CalendarMeta,
        overrides: &Overrides,
        range: YearRange,
    ) -> Result<Metadata, ValidationError> {
        let pick = |over: &Option<String>, base: &Option<String>, field| {
            let over = over.clone().filter(|v| !v.trim().is_empty());
            required(over.or_else(|| base.clone()), field, "calendar")
                .map(|value| range.substitute(&value))
        };
        Ok(Metadata {
            name: pick(&overrides.calname, &calendar.calname, "calname")?,
            description: pick(
                &overrides.caldesc,
                &calendar.caldesc,
                "caldesc",
            )?,
            product_id: pick(&overrides.prodid, &calendar.prodid, "prodid")?,
            refresh_interval: pick(
                &None,
                &calendar.published_ttl,
                "published_ttl",
            )?,
        })
    }
}

/// An error for a template that doesn't have the required structure.
#[derive(Clone, Debug)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    fn new(message: impl Into<String>) -> ValidationError {
        ValidationError { message: message.into() }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Deserialize)]
struct RawDocument {
    calendar: Option<CalendarMeta>,
    events: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    uid_base: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    categories: Option<Categories>,
    url: Option<String>,
    location: Option<String>,
    enabled: Option<bool>,
    rule: Option<RawRule>,
}

/// A rule as it appears in JSON: a `type` tag plus whichever fields that
/// type needs. Fields that a type doesn't need are ignored.
#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(rename = "type")]
    kind: Option<String>,
    month: Option<i64>,
    day: Option<i64>,
    days: Option<i64>,
    weekday: Option<String>,
    occurrence: Option<i64>,
}

impl RawRule {
    fn descriptor(self) -> anyhow::Result<RuleDescriptor> {
        let kind: RuleKind =
            required(self.kind, "type", "rule")?.parse()?;
        let int = |value: Option<i64>, field: &str| {
            value.ok_or_else(|| {
                ValidationError::new(format!(
                    "rule `{kind}` requires integer `{field}`"
                ))
            })
        };
        let weekday = |value: Option<String>| {
            value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                ValidationError::new(format!(
                    "rule `{kind}` requires string `weekday`"
                ))
            })
        };
        let rule = match kind {
            RuleKind::Fixed => RuleDescriptor::fixed(
                int(self.month, "month")?,
                int(self.day, "day")?,
            )?,
            RuleKind::EasterOffset => {
                RuleDescriptor::easter_offset(int(self.days, "days")?)?
            }
            RuleKind::NthWeekdayOfMonth => {
                RuleDescriptor::nth_weekday_of_month(
                    int(self.month, "month")?,
                    &weekday(self.weekday)?,
                    int(self.occurrence, "occurrence")?,
                )?
            }
            RuleKind::LastWeekdayOfMonth => {
                RuleDescriptor::last_weekday_of_month(
                    int(self.month, "month")?,
                    &weekday(self.weekday)?,
                )?
            }
        };
        Ok(rule)
    }
}

/// Returns the value if it's present and not blank.
fn required(
    value: Option<String>,
    field: &str,
    context: &str,
) -> Result<String, ValidationError> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        ValidationError::new(format!(
            "missing or blank `{field}` in {context}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use jiff::civil::Weekday;

    use crate::rule::{RuleError, RuleErrorKind};

    use super::*;

    fn expect_err(json: &str) -> anyhow::Error {
        match TemplateDocument::from_json(json) {
            Err(err) => err,
            Ok(doc) => panic!("expected template error, but got:\n{doc:?}"),
        }
    }

    fn rule_error_kind(err: &anyhow::Error) -> Option<RuleErrorKind> {
        err.root_cause().downcast_ref::<RuleError>().map(|err| err.kind())
    }

    fn is_validation_error(err: &anyhow::Error) -> bool {
        err.root_cause().downcast_ref::<ValidationError>().is_some()
    }

    const CALENDAR: &str = r#"
        "calendar": {
            "calname": "Holidays {start_year}-{end_year}",
            "caldesc": "Public holidays",
            "prodid": "-//holical//EN",
            "published_ttl": "P1D"
        }
    "#;

    fn with_events(events: &str) -> String {
        format!(r#"{{ {CALENDAR}, "events": [{events}] }}"#)
    }

    #[test]
    fn loads_every_rule_kind() {
        let json = with_events(
            r#"
            {
                "uid_base": "new-year",
                "summary": "New Year's Day",
                "description": "First day of the year",
                "categories": ["Holiday", "Public"],
                "rule": {"type": "fixed", "month": 1, "day": 1}
            },
            {
                "uid_base": "easter-monday",
                "summary": "Easter Monday",
                "description": "Day after Easter",
                "categories": "Holiday",
                "url": "https://example.com/easter",
                "location": "Luxembourg",
                "rule": {"type": "easter_offset", "days": 1}
            },
            {
                "uid_base": "mothers-day",
                "summary": "Mother's Day",
                "description": "Second Sunday of May",
                "rule": {
                    "type": "nth_weekday_of_month",
                    "month": 5,
                    "weekday": "SUNDAY",
                    "occurrence": 2
                }
            },
            {
                "uid_base": "last-monday",
                "summary": "Last Monday of May",
                "description": "Something",
                "enabled": false,
                "rule": {
                    "type": "last_weekday_of_month",
                    "month": 5,
                    "weekday": "monday"
                }
            }
            "#,
        );
        let doc = TemplateDocument::from_json(&json).unwrap();
        let events = doc.events();
        assert_eq!(events.len(), 4);

        assert_eq!(events[0].position, 0);
        assert_eq!(events[0].rule, RuleDescriptor::Fixed { month: 1, day: 1 });
        assert_eq!(
            events[0].categories,
            Some(Categories::Many(vec![
                "Holiday".to_string(),
                "Public".to_string()
            ])),
        );

        assert_eq!(events[1].rule, RuleDescriptor::EasterOffset { days: 1 });
        assert_eq!(
            events[1].categories.as_ref().unwrap().labels().to_vec(),
            vec!["Holiday".to_string()],
        );
        assert_eq!(
            events[1].url.as_deref(),
            Some("https://example.com/easter"),
        );
        assert_eq!(events[1].location.as_deref(), Some("Luxembourg"));

        assert_eq!(
            events[2].rule,
            RuleDescriptor::NthWeekdayOfMonth {
                month: 5,
                weekday: Weekday::Sunday,
                occurrence: 2,
            },
        );
        assert_eq!(events[2].categories, None);
        assert!(events[2].enabled);

        assert_eq!(events[3].position, 3);
        assert!(!events[3].enabled);
        assert_eq!(
            events[3].rule,
            RuleDescriptor::LastWeekdayOfMonth {
                month: 5,
                weekday: Weekday::Monday,
            },
        );

        assert_eq!(
            doc.calendar().calname.as_deref(),
            Some("Holidays {start_year}-{end_year}"),
        );
    }

    #[test]
    fn structural_errors() {
        let err = expect_err("42");
        assert!(
            err.root_cause().downcast_ref::<serde_json::Error>().is_some()
        );
        insta::assert_snapshot!(
            err,
            @"template is not a JSON object of the expected shape",
        );

        let err = expect_err(r#"{"events": []}"#);
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(
            err,
            @"template must include a `calendar` object",
        );

        let err = expect_err(&format!(r#"{{ {CALENDAR}, "events": [] }}"#));
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(
            err,
            @"template must include a non-empty `events` list",
        );

        let err = expect_err(&format!(r#"{{ {CALENDAR} }}"#));
        assert!(is_validation_error(&err));

        let err = expect_err(r#"{"calendar": {}, "events": [{}]}"#);
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(
            err,
            @"missing or blank `published_ttl` in calendar",
        );

        // The other fields can come from overrides, so they aren't checked
        // until `Metadata::resolve`.
        let doc = TemplateDocument::from_json(&format!(
            r#"{{
                "calendar": {{"published_ttl": "P1D"}},
                "events": [{{
                    "uid_base": "x",
                    "summary": "s",
                    "description": "d",
                    "rule": {{"type": "fixed", "month": 1, "day": 1}}
                }}]
            }}"#
        ))
        .unwrap();
        assert_eq!(doc.calendar().calname, None);

        let err = expect_err(&with_events(r#""not an object""#));
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(err, @"events[0] must be a JSON object");
    }

    #[test]
    fn missing_fields() {
        let err = expect_err(&with_events(
            r#"{
                "uid_base": "x",
                "summary": "   ",
                "description": "d",
                "rule": {"type": "fixed", "month": 1, "day": 1}
            }"#,
        ));
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(
            err,
            @"missing or blank `summary` in events[0] (`x`)",
        );

        let err = expect_err(&with_events(
            r#"{
                "summary": "s",
                "description": "d",
                "rule": {"type": "fixed", "month": 1, "day": 1}
            }"#,
        ));
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(
            err,
            @"missing or blank `uid_base` in events[0]",
        );

        let err = expect_err(&with_events(
            r#"{"uid_base": "x", "summary": "s", "description": "d"}"#,
        ));
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(err, @"missing `rule` in events[0] (`x`)");

        let err = expect_err(&with_events(
            r#"{
                "uid_base": "x",
                "summary": "s",
                "description": "d",
                "rule": {"type": "fixed", "month": 1}
            }"#,
        ));
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(
            format!("{err:#}"),
            @"invalid `rule` in events[0] (`x`): rule `fixed` requires integer `day`",
        );

        let err = expect_err(&with_events(
            r#"{
                "uid_base": "x",
                "summary": "s",
                "description": "d",
                "categories": [],
                "rule": {"type": "fixed", "month": 1, "day": 1}
            }"#,
        ));
        assert!(is_validation_error(&err));

        let err = expect_err(&with_events(
            r#"{
                "uid_base": "x",
                "summary": "s",
                "description": "d",
                "categories": ["Holiday", " "],
                "rule": {"type": "fixed", "month": 1, "day": 1}
            }"#,
        ));
        assert!(is_validation_error(&err));
        insta::assert_snapshot!(
            err,
            @"`categories` in events[0] (`x`) must be a non-blank string or a non-empty list of non-blank strings",
        );
    }

    #[test]
    fn rule_errors_fail_at_load() {
        let event = |rule: &str| {
            with_events(&format!(
                r#"{{
                    "uid_base": "x",
                    "summary": "s",
                    "description": "d",
                    "rule": {rule}
                }}"#
            ))
        };

        let err = expect_err(&event(r#"{"type": "lunar"}"#));
        assert_eq!(
            rule_error_kind(&err),
            Some(RuleErrorKind::UnknownRuleType),
        );

        let err = expect_err(&event(
            r#"{"type": "last_weekday_of_month", "month": 1, "weekday": "X"}"#,
        ));
        assert_eq!(rule_error_kind(&err), Some(RuleErrorKind::UnknownWeekday));
        insta::assert_snapshot!(
            format!("{err:#}"),
            @"invalid `rule` in events[0] (`x`): unrecognized weekday `X`",
        );

        let err =
            expect_err(&event(r#"{"type": "fixed", "month": 0, "day": 1}"#));
        assert_eq!(rule_error_kind(&err), Some(RuleErrorKind::InvalidDate));

        let err = expect_err(&event(
            r#"{
                "type": "nth_weekday_of_month",
                "month": 1,
                "weekday": "friday",
                "occurrence": 0
            }"#,
        ));
        assert_eq!(
            rule_error_kind(&err),
            Some(RuleErrorKind::NoSuchOccurrence),
        );

        // Booleans are not integers.
        let err =
            expect_err(&event(r#"{"type": "easter_offset", "days": true}"#));
        assert_eq!(rule_error_kind(&err), None);
    }

    #[test]
    fn malformed_disabled_events_are_dropped() {
        let json = with_events(
            r#"
            {"uid_base": "broken", "enabled": false},
            {
                "uid_base": "ok",
                "summary": "s",
                "description": "d",
                "rule": {"type": "fixed", "month": 1, "day": 1}
            }
            "#,
        );
        let doc = TemplateDocument::from_json(&json).unwrap();
        assert_eq!(doc.events().len(), 1);
        assert_eq!(doc.events()[0].uid_base, "ok");
        assert_eq!(doc.events()[0].position, 1);

        let err = expect_err(&with_events(r#"{"enabled": "no"}"#));
        assert!(is_validation_error(&err));
    }

    #[test]
    fn metadata_overrides() {
        let doc = TemplateDocument::from_json(&with_events(
            r#"{
                "uid_base": "x",
                "summary": "s",
                "description": "d",
                "rule": {"type": "fixed", "month": 1, "day": 1}
            }"#,
        ))
        .unwrap();
        let range = YearRange::new(2025, 2027).unwrap();

        let meta =
            Metadata::resolve(doc.calendar(), &Overrides::default(), range)
                .unwrap();
        assert_eq!(meta.name, "Holidays 2025-2027");
        assert_eq!(meta.description, "Public holidays");
        assert_eq!(meta.product_id, "-//holical//EN");
        assert_eq!(meta.refresh_interval, "P1D");

        let overrides = Overrides {
            calname: Some("Mine {end_year}".to_string()),
            caldesc: Some("  ".to_string()),
            prodid: None,
        };
        let meta =
            Metadata::resolve(doc.calendar(), &overrides, range).unwrap();
        assert_eq!(meta.name, "Mine 2027");
        assert_eq!(meta.description, "Public holidays");
    }

    #[test]
    fn metadata_must_be_present() {
        let calendar = CalendarMeta {
            calname: Some("name".to_string()),
            caldesc: None,
            prodid: Some("prodid".to_string()),
            published_ttl: Some("PT12H".to_string()),
        };
        let range = YearRange::new(2025, 2025).unwrap();
        let err = Metadata::resolve(&calendar, &Overrides::default(), range)
            .unwrap_err();
        insta::assert_snapshot!(
            err,
            @"missing or blank `caldesc` in calendar",
        );

        let overrides = Overrides {
            caldesc: Some("from the command line".to_string()),
            ..Overrides::default()
        };
        let meta = Metadata::resolve(&calendar, &overrides, range).unwrap();
        assert_eq!(meta.description, "from the command line");
    }
}
