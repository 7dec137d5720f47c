//! Citizen record types and schema rules.
//!
//! A [`CitizenInput`] is a candidate record as it arrives from a client,
//! already reshaped by [`crate::normalize`]. Validation turns it into a
//! [`NewCitizen`] ready for insertion, or into a [`CitizenPatch`] for a
//! partial update. [`Citizen`] is the stored form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Required fields, in the order they are reported to clients.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "nationalId",
    "firstName",
    "lastName",
    "dateOfBirth",
    "email",
    "phone",
    "nationality",
    "bloodGroup",
];

/// A stored citizen record.
///
/// Serialized with the field names the browser form uses, so a record read
/// from the API can be posted back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    /// Storage-assigned record identifier.
    pub id: i64,
    /// National ID, the unique business key.
    #[serde(rename = "NDI_ID")]
    pub national_id: String,
    /// Given name.
    #[serde(rename = "FirstName")]
    pub first_name: String,
    /// Family name.
    #[serde(rename = "LastName")]
    pub last_name: String,
    /// Display name, derived from the given and family names unless supplied.
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// Date of birth, kept as the text the client sent.
    #[serde(rename = "DoB")]
    pub date_of_birth: String,
    /// Contact email.
    #[serde(rename = "Email")]
    pub email: String,
    /// Contact phone number.
    #[serde(rename = "Phone")]
    pub phone: String,
    /// Occupations, in the order supplied.
    #[serde(rename = "Occupation")]
    pub occupations: Vec<String>,
    /// Nationality.
    #[serde(rename = "Nationality")]
    pub nationality: String,
    /// Blood group.
    #[serde(rename = "Blood_Group")]
    pub blood_group: String,
    /// When the record was created.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A candidate record with every field optional.
///
/// String fields hold trimmed, non-empty values; `None` means the client
/// did not supply the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitizenInput {
    /// National ID.
    pub national_id: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Explicit display name.
    pub full_name: Option<String>,
    /// Date of birth.
    pub date_of_birth: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Occupations.
    pub occupations: Option<Vec<String>>,
    /// Nationality.
    pub nationality: Option<String>,
    /// Blood group.
    pub blood_group: Option<String>,
}

/// A validated record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCitizen {
    /// National ID.
    pub national_id: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Display name.
    pub full_name: String,
    /// Date of birth.
    pub date_of_birth: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
    /// Occupations.
    pub occupations: Vec<String>,
    /// Nationality.
    pub nationality: String,
    /// Blood group.
    pub blood_group: String,
}

/// Fields to merge onto an existing record.
///
/// There is no national ID field; a record's key never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitizenPatch {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New display name.
    pub full_name: Option<String>,
    /// New date of birth.
    pub date_of_birth: Option<String>,
    /// New email.
    pub email: Option<String>,
    /// New phone number.
    pub phone: Option<String>,
    /// Replacement occupation list.
    pub occupations: Option<Vec<String>>,
    /// New nationality.
    pub nationality: Option<String>,
    /// New blood group.
    pub blood_group: Option<String>,
}

/// Trim a value and drop it if nothing is left.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Join given and family names into a display name.
#[must_use]
pub fn derive_full_name(first_name: &str, last_name: &str) -> String {
    format!("{first_name} {last_name}").trim().to_string()
}

impl CitizenInput {
    /// Validate this candidate as a complete new record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming every required field that is
    /// missing or empty after trimming.
    pub fn into_new_citizen(self) -> Result<NewCitizen> {
        let fields = [
            present(self.national_id),
            present(self.first_name),
            present(self.last_name),
            present(self.date_of_birth),
            present(self.email),
            present(self.phone),
            present(self.nationality),
            present(self.blood_group),
        ];

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .zip(&fields)
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::validation(missing));
        }

        let [national_id, first_name, last_name, date_of_birth, email, phone, nationality, blood_group] =
            fields.map(Option::unwrap_or_default);

        let full_name = present(self.full_name)
            .unwrap_or_else(|| derive_full_name(&first_name, &last_name));

        Ok(NewCitizen {
            national_id,
            first_name,
            last_name,
            full_name,
            date_of_birth,
            email,
            phone,
            occupations: self.occupations.unwrap_or_default(),
            nationality,
            blood_group,
        })
    }

    /// Turn this candidate into a partial update, discarding the national ID.
    #[must_use]
    pub fn into_patch(self) -> CitizenPatch {
        CitizenPatch {
            first_name: present(self.first_name),
            last_name: present(self.last_name),
            full_name: present(self.full_name),
            date_of_birth: present(self.date_of_birth),
            email: present(self.email),
            phone: present(self.phone),
            occupations: self.occupations,
            nationality: present(self.nationality),
            blood_group: present(self.blood_group),
        }
    }
}

impl CitizenPatch {
    /// Check whether the patch carries no field changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Citizen {
    /// Build a stored record from a validated one.
    #[must_use]
    pub fn from_new(id: i64, new: NewCitizen, now: DateTime<Utc>) -> Self {
        Self {
            id,
            national_id: new.national_id,
            first_name: new.first_name,
            last_name: new.last_name,
            full_name: new.full_name,
            date_of_birth: new.date_of_birth,
            email: new.email,
            phone: new.phone,
            occupations: new.occupations,
            nationality: new.nationality,
            blood_group: new.blood_group,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a patch onto this record and stamp `updated_at`.
    ///
    /// Fields absent from the patch are left as they are. The display name
    /// follows name changes unless the patch sets it explicitly.
    pub fn apply(&mut self, patch: &CitizenPatch, now: DateTime<Utc>) {
        fn set<T: Clone>(slot: &mut T, value: Option<&T>) {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }

        let renamed = patch.first_name.is_some() || patch.last_name.is_some();

        set(&mut self.first_name, patch.first_name.as_ref());
        set(&mut self.last_name, patch.last_name.as_ref());
        set(&mut self.date_of_birth, patch.date_of_birth.as_ref());
        set(&mut self.email, patch.email.as_ref());
        set(&mut self.phone, patch.phone.as_ref());
        set(&mut self.occupations, patch.occupations.as_ref());
        set(&mut self.nationality, patch.nationality.as_ref());
        set(&mut self.blood_group, patch.blood_group.as_ref());

        if let Some(full_name) = &patch.full_name {
            self.full_name.clone_from(full_name);
        } else if renamed {
            self.full_name = derive_full_name(&self.first_name, &self.last_name);
        }

        self.updated_at = now;
    }
}
