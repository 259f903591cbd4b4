//! Categorical and date-range filtering, plus the cascading option lists
//! offered to the user for each geographic field.

use crate::error::KpiError;
use crate::types::{JoinedRow, SiteMetadata};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Selector values that mean "no constraint".
pub const ALL_MARKERS: &[&str] = &["all", "全部"];

/// Filterable metadata fields, declared in cascade precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Band,
    Province,
    City,
    County,
    Town,
    Village,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::Band,
        FilterField::Province,
        FilterField::City,
        FilterField::County,
        FilterField::Town,
        FilterField::Village,
    ];

    pub fn value_of(self, site: &SiteMetadata) -> &str {
        match self {
            FilterField::Band => &site.band,
            FilterField::Province => &site.province,
            FilterField::City => &site.city,
            FilterField::County => &site.county,
            FilterField::Town => &site.town,
            FilterField::Village => &site.village,
        }
    }

    /// Fields whose selection restricts the options of `self`.
    pub fn higher_precedence(self) -> impl Iterator<Item = FilterField> {
        FilterField::ALL.into_iter().filter(move |f| *f < self)
    }
}

impl FromStr for FilterField {
    type Err = KpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "band" => Ok(FilterField::Band),
            "province" => Ok(FilterField::Province),
            "city" => Ok(FilterField::City),
            "county" => Ok(FilterField::County),
            "town" => Ok(FilterField::Town),
            "village" => Ok(FilterField::Village),
            _ => Err(KpiError::UnknownField(s.to_string())),
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterField::Band => "band",
            FilterField::Province => "province",
            FilterField::City => "city",
            FilterField::County => "county",
            FilterField::Town => "town",
            FilterField::Village => "village",
        };
        f.write_str(name)
    }
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// User-chosen constraints. Unset fields match everything; set ones are
/// combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub band: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub date_range: Option<DateRange>,
}

impl FilterSelection {
    pub fn get(&self, field: FilterField) -> Option<&str> {
        let slot = match field {
            FilterField::Band => &self.band,
            FilterField::Province => &self.province,
            FilterField::City => &self.city,
            FilterField::County => &self.county,
            FilterField::Town => &self.town,
            FilterField::Village => &self.village,
        };
        slot.as_deref()
    }

    /// Sets a field from a selector value; an "all" marker clears it.
    pub fn set(&mut self, field: FilterField, value: Option<&str>) {
        let value = value
            .map(str::trim)
            .filter(|v| !v.is_empty() && !ALL_MARKERS.iter().any(|m| v.eq_ignore_ascii_case(m)))
            .map(str::to_string);
        let slot = match field {
            FilterField::Band => &mut self.band,
            FilterField::Province => &mut self.province,
            FilterField::City => &mut self.city,
            FilterField::County => &mut self.county,
            FilterField::Town => &mut self.town,
            FilterField::Village => &mut self.village,
        };
        *slot = value;
    }

    pub fn with(mut self, field: FilterField, value: &str) -> Self {
        self.set(field, Some(value));
        self
    }

    pub fn with_dates(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some(DateRange { from, to });
        self
    }

    /// True when every categorical constraint accepts `site`.
    pub fn matches_site(&self, site: &SiteMetadata) -> bool {
        FilterField::ALL.iter().all(|field| self.field_matches(*field, Some(site)))
    }

    fn field_matches(&self, field: FilterField, site: Option<&SiteMetadata>) -> bool {
        match (self.get(field), site) {
            (None, _) => true,
            (Some(wanted), Some(site)) => field.value_of(site) == wanted,
            // Rows without metadata cannot satisfy an active constraint.
            (Some(_), None) => false,
        }
    }

    fn matches_row(&self, row: &JoinedRow<'_>) -> bool {
        let categorical = FilterField::ALL
            .iter()
            .all(|field| self.field_matches(*field, row.site));
        if !categorical {
            return false;
        }
        match self.date_range {
            None => true,
            Some(range) => row
                .record
                .interval_start
                .is_some_and(|ts| range.contains(ts.date())),
        }
    }
}

/// Rows satisfying every active predicate of `selection`, in input order.
pub fn filter<'a>(rows: &[JoinedRow<'a>], selection: &FilterSelection) -> Vec<JoinedRow<'a>> {
    rows.iter()
        .filter(|row| selection.matches_row(row))
        .copied()
        .collect()
}

/// Sites satisfying the categorical constraints of `selection`.
pub fn filter_sites<'a>(sites: &'a [SiteMetadata], selection: &FilterSelection) -> Vec<&'a SiteMetadata> {
    sites.iter().filter(|s| selection.matches_site(s)).collect()
}

/// Distinct non-empty values of `field` among sites that agree with every
/// higher-precedence field already fixed in `selection`. Lower-precedence
/// selections, and the field's own, are ignored. Values keep first-seen order.
pub fn candidate_values(field: FilterField, selection: &FilterSelection, sites: &[SiteMetadata]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for site in sites {
        let admitted = field
            .higher_precedence()
            .all(|f| selection.field_matches(f, Some(site)));
        if !admitted {
            continue;
        }
        let value = field.value_of(site);
        if !value.is_empty() && seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::CounterValues;
    use crate::types::CounterRecord;

    fn site(id: &str, band: &str, city: &str, county: &str) -> SiteMetadata {
        SiteMetadata {
            site_id: id.to_string(),
            band: band.to_string(),
            province: "P".to_string(),
            city: city.to_string(),
            county: county.to_string(),
            ..Default::default()
        }
    }

    fn record(id: &str, ts: Option<&str>) -> CounterRecord {
        CounterRecord {
            site_id: id.to_string(),
            interval_start: ts.and_then(|t| crate::util::parse_timestamp_safe(Some(t))),
            counters: CounterValues::default(),
        }
    }

    fn d(s: &str) -> NaiveDate {
        crate::util::parse_date(s).unwrap()
    }

    #[test]
    fn test_all_marker_clears_field() {
        let mut sel = FilterSelection::default().with(FilterField::City, "A");
        assert_eq!(sel.get(FilterField::City), Some("A"));
        sel.set(FilterField::City, Some("全部"));
        assert_eq!(sel.get(FilterField::City), None);
        sel.set(FilterField::City, Some("ALL"));
        assert_eq!(sel.get(FilterField::City), None);
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let sites = vec![site("1", "n28", "A", "x"), site("2", "n41", "A", "y")];
        let recs = vec![record("1", Some("2024-01-01")), record("2", Some("2024-01-01"))];
        let rows: Vec<JoinedRow> = recs
            .iter()
            .zip(sites.iter())
            .map(|(r, s)| JoinedRow { record: r, site: Some(s) })
            .collect();

        let sel = FilterSelection::default()
            .with(FilterField::City, "A")
            .with(FilterField::Band, "n41");
        let out = filter(&rows, &sel);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].record.site_id, "2");
    }

    #[test]
    fn test_date_range_is_inclusive_and_ignores_time_of_day() {
        let recs = vec![
            record("1", Some("2024-01-01 23:45:00")),
            record("1", Some("2024-01-03 00:00:00")),
            record("1", Some("2024-01-04 00:15:00")),
            record("1", Some("not a time")),
        ];
        let rows: Vec<JoinedRow> = recs.iter().map(|r| JoinedRow { record: r, site: None }).collect();

        let sel = FilterSelection::default().with_dates(d("2024-01-01"), d("2024-01-03"));
        let out = filter(&rows, &sel);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].record.interval_start.unwrap().format("%H:%M").to_string(),
            "23:45"
        );
    }

    #[test]
    fn test_rows_without_metadata_fail_active_constraints_only() {
        let recs = vec![record("9", Some("2024-01-01"))];
        let rows: Vec<JoinedRow> = recs.iter().map(|r| JoinedRow { record: r, site: None }).collect();

        assert_eq!(filter(&rows, &FilterSelection::default()).len(), 1);
        let sel = FilterSelection::default().with(FilterField::County, "x");
        assert!(filter(&rows, &sel).is_empty());
    }

    #[test]
    fn test_candidate_values_cascade() {
        let sites = vec![
            site("1", "n28", "A", "a1"),
            site("2", "n28", "B", "b1"),
            site("3", "n41", "A", "a2"),
            site("4", "n41", "A", "a1"),
        ];

        let none = FilterSelection::default();
        assert_eq!(candidate_values(FilterField::City, &none, &sites), vec!["A", "B"]);

        let n41 = FilterSelection::default().with(FilterField::Band, "n41");
        assert_eq!(candidate_values(FilterField::City, &n41, &sites), vec!["A"]);
        assert_eq!(candidate_values(FilterField::County, &n41, &sites), vec!["a2", "a1"]);

        // Selecting a county does not narrow the city list.
        let county = n41.clone().with(FilterField::County, "a2");
        assert_eq!(candidate_values(FilterField::City, &county, &sites), vec!["A"]);

        let n28_a = FilterSelection::default()
            .with(FilterField::Band, "n28")
            .with(FilterField::City, "A");
        assert_eq!(candidate_values(FilterField::County, &n28_a, &sites), vec!["a1"]);
    }

    #[test]
    fn test_candidate_values_skip_empty() {
        let mut blank = site("1", "n28", "A", "");
        blank.town = String::new();
        let sites = vec![blank];
        assert!(candidate_values(FilterField::Town, &FilterSelection::default(), &sites).is_empty());
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("County".parse::<FilterField>().unwrap(), FilterField::County);
        assert!("district".parse::<FilterField>().is_err());
    }
}
