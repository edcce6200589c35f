//! Turning a parsed sheet into leads.
//!
//! Parsing the file itself is IO and lives in outreach-infra; this module
//! only deals with rows that are already in memory.

use std::collections::HashSet;

use outreach_types::error::ImportError;
use outreach_types::import::{ColumnMapping, ParsedSheet, RowIssue};
use outreach_types::lead::{Lead, LeadField, normalize_email};

/// Result of mapping every row of a sheet.
#[derive(Debug, Clone, Default)]
pub struct MappedRows {
    /// Leads in file order, duplicates not yet removed.
    pub leads: Vec<Lead>,
    /// Rows that could not become a lead.
    pub issues: Vec<RowIssue>,
}

/// Column mapping for an import: header auto-detection (unless `detect` is
/// off) overlaid with explicit `field=column` assignments.
pub fn resolve_mapping(
    columns: &[String],
    assignments: &[String],
    detect: bool,
) -> Result<ColumnMapping, ImportError> {
    let mut mapping = if detect {
        ColumnMapping::auto_detect(columns)
    } else {
        ColumnMapping::new()
    };
    let mut overrides = ColumnMapping::new();
    for assignment in assignments {
        let (field, column) = ColumnMapping::parse_assignment(assignment)?;
        overrides.set(field, column);
    }
    mapping.merge(overrides);
    Ok(mapping)
}

/// Check that the mapping has an email column and only names columns that
/// exist in the sheet.
pub fn validate_mapping(sheet: &ParsedSheet, mapping: &ColumnMapping) -> Result<(), ImportError> {
    if mapping.column_for(LeadField::Email).is_none() {
        return Err(ImportError::MissingEmailMapping);
    }
    for column in mapping.fields.values() {
        if sheet.column_index(column).is_none() {
            return Err(ImportError::UnknownColumn(column.clone()));
        }
    }
    Ok(())
}

/// Build one lead per row using `mapping`.
///
/// Rows whose email is empty or lacks `@` are reported as issues. Values in
/// unmapped columns are kept as custom fields keyed by header.
pub fn map_rows(sheet: &ParsedSheet, mapping: &ColumnMapping) -> Result<MappedRows, ImportError> {
    validate_mapping(sheet, mapping)?;

    let indexed: Vec<(LeadField, usize)> = mapping
        .fields
        .iter()
        .filter_map(|(field, column)| sheet.column_index(column).map(|idx| (*field, idx)))
        .collect();
    let mapped_columns: HashSet<usize> = indexed.iter().map(|(_, idx)| *idx).collect();

    let mut out = MappedRows::default();
    for (i, row) in sheet.rows.iter().enumerate() {
        // Header is row 1.
        let row_number = i + 2;
        match lead_from_row(&sheet.columns, row, &indexed, &mapped_columns) {
            Some(lead) => out.leads.push(lead),
            None => out.issues.push(RowIssue {
                row: row_number,
                reason: "missing or invalid email".to_string(),
            }),
        }
    }
    Ok(out)
}

fn lead_from_row(
    columns: &[String],
    row: &[String],
    indexed: &[(LeadField, usize)],
    mapped_columns: &HashSet<usize>,
) -> Option<Lead> {
    let value = |field: LeadField| -> Option<String> {
        indexed
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, idx)| row.get(*idx))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let email = value(LeadField::Email)?;
    if !email.contains('@') {
        return None;
    }

    let mut lead = Lead::new(&email);
    if let Some(name) = value(LeadField::Name) {
        lead.set_full_name(&name);
    }
    // Explicit first/last columns take precedence over a split full name.
    if let Some(first) = value(LeadField::FirstName) {
        lead.first_name = Some(first);
    }
    if let Some(last) = value(LeadField::LastName) {
        lead.last_name = Some(last);
    }
    lead.company = value(LeadField::Company);
    lead.job_title = value(LeadField::JobTitle);
    lead.phone = value(LeadField::Phone);
    lead.industry = value(LeadField::Industry);
    lead.region = value(LeadField::Region);
    if let Some(tags) = value(LeadField::Tags) {
        lead.tags = split_tags(&tags);
    }

    for (idx, header) in columns.iter().enumerate() {
        if mapped_columns.contains(&idx) {
            continue;
        }
        if let Some(v) = row.get(idx).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            lead.custom_fields.insert(header.clone(), v.to_string());
        }
    }

    Some(lead)
}

/// Split a tag cell on commas or semicolons.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drop leads whose normalized email was already seen earlier in the list.
///
/// Returns the first occurrence of each email, in order, and how many were
/// dropped.
pub fn detect_duplicates(leads: Vec<Lead>) -> (Vec<Lead>, usize) {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mut unique = Vec::with_capacity(leads.len());
    for lead in leads {
        if seen.insert(normalize_email(&lead.email)) {
            unique.push(lead);
        } else {
            duplicates += 1;
        }
    }
    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(columns: &[&str], rows: &[&[&str]]) -> ParsedSheet {
        ParsedSheet {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mapping_overrides_win_over_detection() {
        let mapping = resolve_mapping(
            &columns(&["Email", "Work Email", "Company"]),
            &["email=Work Email".to_string()],
            true,
        )
        .unwrap();
        assert_eq!(mapping.column_for(LeadField::Email), Some("Work Email"));
        assert_eq!(mapping.column_for(LeadField::Company), Some("Company"));
    }

    #[test]
    fn test_mapping_without_detection_only_uses_assignments() {
        let mapping = resolve_mapping(
            &columns(&["Email", "Company"]),
            &["email=Email".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(mapping.fields.len(), 1);
    }

    #[test]
    fn test_mapping_rejects_unknown_field() {
        let err = resolve_mapping(&columns(&["Email"]), &["salary=Pay".to_string()], true)
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownField(f) if f == "salary"));
    }

    #[test]
    fn test_map_rows_builds_leads_and_custom_fields() {
        let sheet = sheet(
            &["Email", "Name", "Company", "City"],
            &[
                &["ada@example.com", "Ada Lovelace", "Analytical", "London"],
                &["grace@navy.mil", "Grace", "", ""],
            ],
        );
        let mapping = ColumnMapping::auto_detect(&sheet.columns);
        let mapped = map_rows(&sheet, &mapping).unwrap();

        assert!(mapped.issues.is_empty());
        assert_eq!(mapped.leads.len(), 2);

        let ada = &mapped.leads[0];
        assert_eq!(ada.first_name.as_deref(), Some("Ada"));
        assert_eq!(ada.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(ada.company.as_deref(), Some("Analytical"));
        assert_eq!(ada.custom_fields.get("City").map(String::as_str), Some("London"));

        let grace = &mapped.leads[1];
        assert_eq!(grace.company, None);
        assert!(grace.custom_fields.is_empty());
    }

    #[test]
    fn test_rows_without_valid_email_are_reported() {
        let sheet = sheet(
            &["email", "name"],
            &[&["", "Nobody"], &["not-an-email", "Bad"], &["ok@x.io", "Ok"]],
        );
        let mapping = ColumnMapping::new().with(LeadField::Email, "email");
        let mapped = map_rows(&sheet, &mapping).unwrap();

        assert_eq!(mapped.leads.len(), 1);
        assert_eq!(mapped.issues.len(), 2);
        assert_eq!(mapped.issues[0].row, 2);
        assert_eq!(mapped.issues[1].row, 3);
        // Unmapped name column is still carried along.
        assert_eq!(mapped.leads[0].custom_fields["name"], "Ok");
    }

    #[test]
    fn test_explicit_first_name_wins_over_full_name() {
        let sheet = sheet(
            &["Email", "Name", "First Name"],
            &[&["a@b.co", "Augusta Ada King", "Ada"]],
        );
        let mapping = ColumnMapping::auto_detect(&sheet.columns);
        let lead = &map_rows(&sheet, &mapping).unwrap().leads[0];
        assert_eq!(lead.first_name.as_deref(), Some("Ada"));
        assert_eq!(lead.last_name.as_deref(), Some("Ada King"));
    }

    #[test]
    fn test_mapping_requires_email() {
        let sheet = sheet(&["name"], &[&["x"]]);
        let mapping = ColumnMapping::new().with(LeadField::Name, "name");
        assert!(matches!(
            map_rows(&sheet, &mapping),
            Err(ImportError::MissingEmailMapping)
        ));
    }

    #[test]
    fn test_mapping_rejects_unknown_column() {
        let sheet = sheet(&["email"], &[&["a@b.co"]]);
        let mapping = ColumnMapping::new()
            .with(LeadField::Email, "email")
            .with(LeadField::Company, "Organisation");
        assert!(matches!(
            map_rows(&sheet, &mapping),
            Err(ImportError::UnknownColumn(c)) if c == "Organisation"
        ));
    }

    #[test]
    fn test_tags_split_on_comma_and_semicolon() {
        assert_eq!(split_tags("vip, beta;;  churn "), vec!["vip", "beta", "churn"]);
    }

    #[test]
    fn test_detect_duplicates_keeps_first_occurrence() {
        let leads = vec![
            Lead::new("a@x.io"),
            Lead::new("B@x.io"),
            Lead::new(" A@X.io"),
            Lead::new("b@x.io"),
            Lead::new("c@x.io"),
        ];
        let first_id = leads[0].id.clone();
        let (unique, dups) = detect_duplicates(leads);

        assert_eq!(dups, 2);
        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].id, first_id);
        let emails: Vec<_> = unique.iter().map(|l| l.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.io", "b@x.io", "c@x.io"]);
    }
}
