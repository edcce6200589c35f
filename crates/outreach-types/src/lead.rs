use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a lead, wrapping a UUID v7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub Uuid);

impl LeadId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LeadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A contact record, typically imported from CSV/XLSX.
///
/// `email` is stored normalized (see [`normalize_email`]) and is the only
/// deduplication key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Columns from the import file that did not map to a known field.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub engagement: Engagement,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Create a lead with just an email; everything else empty.
    pub fn new(email: &str) -> Self {
        Self {
            id: LeadId::new(),
            email: normalize_email(email),
            first_name: None,
            last_name: None,
            company: None,
            job_title: None,
            phone: None,
            industry: None,
            region: None,
            tags: Vec::new(),
            custom_fields: BTreeMap::new(),
            engagement: Engagement::default(),
            created_at: Utc::now(),
        }
    }

    /// "First Last", falling back to whichever part exists, then the email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }

    /// Set first/last name from a single full-name value.
    ///
    /// The first whitespace-separated word becomes the first name and the
    /// remainder the last name.
    pub fn set_full_name(&mut self, full_name: &str) {
        let trimmed = full_name.trim();
        if trimmed.is_empty() {
            return;
        }
        match trimmed.split_once(char::is_whitespace) {
            Some((first, rest)) => {
                self.first_name = Some(first.to_string());
                let rest = rest.trim();
                if !rest.is_empty() {
                    self.last_name = Some(rest.to_string());
                }
            }
            None => self.first_name = Some(trimmed.to_string()),
        }
    }

    /// Variables available to `{{...}}` placeholders in email templates.
    pub fn template_variables(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();

        // Custom fields first so built-in names win on collision.
        for (key, value) in &self.custom_fields {
            vars.insert(key.clone(), value.clone());
        }
        vars.insert("email".to_string(), self.email.clone());
        vars.insert("firstName".to_string(), opt(&self.first_name));
        vars.insert("lastName".to_string(), opt(&self.last_name));
        vars.insert("name".to_string(), self.display_name());
        vars.insert("company".to_string(), opt(&self.company));
        vars.insert("position".to_string(), opt(&self.job_title));
        vars.insert("jobTitle".to_string(), opt(&self.job_title));
        vars.insert("phone".to_string(), opt(&self.phone));
        vars
    }
}

/// Engagement counters for a lead across all campaigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub opens: i64,
    pub clicks: i64,
    pub replies: i64,
    pub last_engagement: Option<DateTime<Utc>>,
}

/// Request to add a single lead by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLeadRequest {
    pub email: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub phone: Option<String>,
    pub industry: Option<String>,
    pub region: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Normalize an email for storage and deduplication: trimmed and lowercased.
///
/// ```
/// use outreach_types::lead::normalize_email;
///
/// assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
/// ```
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: something before and after a single `@`, and a dot
/// in the domain part.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Lead fields an import column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Email,
    Name,
    FirstName,
    LastName,
    Company,
    JobTitle,
    Phone,
    Industry,
    Region,
    Tags,
}

impl LeadField {
    pub const ALL: [LeadField; 10] = [
        LeadField::Email,
        LeadField::Name,
        LeadField::FirstName,
        LeadField::LastName,
        LeadField::Company,
        LeadField::JobTitle,
        LeadField::Phone,
        LeadField::Industry,
        LeadField::Region,
        LeadField::Tags,
    ];
}

impl fmt::Display for LeadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeadField::Email => "email",
            LeadField::Name => "name",
            LeadField::FirstName => "first_name",
            LeadField::LastName => "last_name",
            LeadField::Company => "company",
            LeadField::JobTitle => "job_title",
            LeadField::Phone => "phone",
            LeadField::Industry => "industry",
            LeadField::Region => "region",
            LeadField::Tags => "tags",
        };
        write!(f, "{s}")
    }
}

impl FromStr for LeadField {
    type Err = String;

    /// Lenient: case, spaces, dashes and underscores are ignored, and common
    /// header synonyms are accepted ("E-mail", "Job Title", "position", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "email" | "emailaddress" | "mail" => Ok(LeadField::Email),
            "name" | "fullname" | "contactname" => Ok(LeadField::Name),
            "firstname" | "givenname" | "first" => Ok(LeadField::FirstName),
            "lastname" | "surname" | "familyname" | "last" => Ok(LeadField::LastName),
            "company" | "companyname" | "organization" | "organisation" => Ok(LeadField::Company),
            "jobtitle" | "title" | "position" | "role" => Ok(LeadField::JobTitle),
            "phone" | "phonenumber" | "telephone" | "mobile" => Ok(LeadField::Phone),
            "industry" => Ok(LeadField::Industry),
            "region" | "country" | "location" => Ok(LeadField::Region),
            "tags" | "tag" | "labels" => Ok(LeadField::Tags),
            _ => Err(format!("unknown lead field '{s}'")),
        }
    }
}
