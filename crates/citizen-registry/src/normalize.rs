//! Request normalization.
//!
//! Clients send citizen records under two naming conventions: the wire
//! names (`nic`, `firstName`, `dob`, ...) and the friendly names the browser
//! form uses (`NDI_ID`, `FirstName`, `DoB`, ...). Normalization collapses both
//! into one [`CitizenInput`]. It never fails; absent or unusable values come
//! out as `None` and validation decides what that means.

use serde_json::{Map, Value};

use crate::record::CitizenInput;

/// Key pair for one logical field: `(wire, friendly)`.
type FieldKeys = (&'static str, &'static str);

const NATIONAL_ID: FieldKeys = ("nic", "NDI_ID");
const FIRST_NAME: FieldKeys = ("firstName", "FirstName");
const LAST_NAME: FieldKeys = ("lastName", "LastName");
const DATE_OF_BIRTH: FieldKeys = ("dob", "DoB");
const EMAIL: FieldKeys = ("email", "Email");
const PHONE: FieldKeys = ("phone", "Phone");
const OCCUPATIONS: FieldKeys = ("occupation", "Occupation");
const NATIONALITY: FieldKeys = ("nationality", "Nationality");
const BLOOD_GROUP: FieldKeys = ("bloodGroup", "Blood_Group");
const FULL_NAME: &str = "fullName";

/// Normalize a JSON request body into a candidate record.
///
/// Anything other than a JSON object yields an empty input.
#[must_use]
pub fn normalize(body: &Value) -> CitizenInput {
    let Some(obj) = body.as_object() else {
        return CitizenInput::default();
    };

    CitizenInput {
        national_id: pick_text(obj, NATIONAL_ID),
        first_name: pick_text(obj, FIRST_NAME),
        last_name: pick_text(obj, LAST_NAME),
        full_name: obj.get(FULL_NAME).and_then(text),
        date_of_birth: pick_text(obj, DATE_OF_BIRTH),
        email: pick_text(obj, EMAIL),
        phone: pick_text(obj, PHONE),
        occupations: pick_occupations(obj),
        nationality: pick_text(obj, NATIONALITY),
        blood_group: pick_text(obj, BLOOD_GROUP),
    }
}

/// Read the national ID from a body under either convention.
#[must_use]
pub fn national_id(body: &Value) -> Option<String> {
    body.as_object().and_then(|obj| pick_text(obj, NATIONAL_ID))
}

/// Read the email from a body under either convention.
#[must_use]
pub fn email(body: &Value) -> Option<String> {
    body.as_object().and_then(|obj| pick_text(obj, EMAIL))
}

/// Split a comma-separated occupation list.
///
/// Pieces are trimmed and empty pieces dropped; order is preserved.
#[must_use]
pub fn split_occupations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(String::from)
        .collect()
}

fn pick_text(obj: &Map<String, Value>, (wire, friendly): FieldKeys) -> Option<String> {
    obj.get(wire)
        .and_then(text)
        .or_else(|| obj.get(friendly).and_then(text))
}

/// Trimmed text of a scalar value, or `None` if empty or not a scalar.
fn text(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!raw.is_empty()).then_some(raw)
}

fn pick_occupations(obj: &Map<String, Value>) -> Option<Vec<String>> {
    let (wire, friendly) = OCCUPATIONS;
    let wire = obj.get(wire).and_then(occupations);
    let friendly = obj.get(friendly).and_then(occupations);

    // A non-empty list under the wire name wins; an explicit empty list still
    // counts as supplied when nothing better is available.
    match (wire, friendly) {
        (Some(w), _) if !w.is_empty() => Some(w),
        (_, Some(f)) if !f.is_empty() => Some(f),
        (w, f) => w.or(f),
    }
}

fn occupations(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        Value::String(s) if !s.trim().is_empty() => Some(split_occupations(s)),
        _ => None,
    }
}
