use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix prepended to every signup notification body
pub const NOTIFICATION_PREFIX: &str = "New signup: ";

/// A single signup submission.
///
/// Holds every form field the client sent, verbatim. There is no fixed
/// schema: whatever arrives in the form becomes part of the record. Fields
/// are kept sorted so the JSON form is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignupRecord {
    fields: BTreeMap<String, String>,
}

impl SignupRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from an `application/x-www-form-urlencoded` body.
    ///
    /// Duplicate field names resolve to the last value sent.
    pub fn from_form(body: &[u8]) -> Self {
        form_urlencoded::parse(body).into_owned().collect()
    }

    /// Build a record from a `multipart/form-data` body.
    ///
    /// Text parts become fields, last value wins. File uploads and unnamed
    /// parts are not form fields and are skipped.
    pub async fn from_multipart(body: Bytes, boundary: String) -> Result<Self, multer::Error> {
        let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        let mut record = Self::new();
        while let Some(field) = multipart.next_field().await? {
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field.text().await?;
            record.insert(name, value);
        }

        Ok(record)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Serialize the record as a flat JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Body of the notification published for this record
    pub fn notification_message(&self) -> serde_json::Result<String> {
        Ok(format!("{}{}", NOTIFICATION_PREFIX, self.to_json()?))
    }
}

impl FromIterator<(String, String)> for SignupRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, String>> for SignupRecord {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}
