//! Consumers — the root entity. Presences and consumptions hang off a
//! consumer and are removed with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, time::serde_timestamp};

/// A person who eats at the canteen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
  pub id:         String,
  pub name:       String,
  #[serde(default)]
  pub department: Option<String>,
  #[serde(with = "serde_timestamp")]
  pub created_at: DateTime<Utc>,
}

/// Input for creating a consumer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewConsumer {
  pub name:       String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub department: Option<String>,
}

impl NewConsumer {
  pub fn new(name: impl Into<String>, department: Option<&str>) -> Self {
    Self { name: name.into(), department: department.map(str::to_owned) }
  }

  /// Trim the name, reject it when empty, and drop a blank department.
  pub fn validate(self) -> Result<Self> {
    Ok(Self {
      name:       required_name(&self.name)?,
      department: normalize_department(self.department),
    })
  }

  /// Build the stored record. Call [`NewConsumer::validate`] first.
  pub fn into_consumer(self, id: String, created_at: DateTime<Utc>) -> Consumer {
    Consumer { id, name: self.name, department: self.department, created_at }
  }
}

/// Partial update of a consumer. `Some("")` for the department clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumerPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub department: Option<String>,
}

impl ConsumerPatch {
  pub fn apply(self, mut consumer: Consumer) -> Result<Consumer> {
    if let Some(name) = self.name {
      consumer.name = required_name(&name)?;
    }
    if let Some(department) = self.department {
      consumer.department = normalize_department(Some(department));
    }
    Ok(consumer)
  }
}

/// A consumer together with their presence flag for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerWithPresence {
  #[serde(flatten)]
  pub consumer:   Consumer,
  #[serde(default)]
  pub is_present: bool,
}

/// A record joined with the consumer it references.
///
/// `consumer` is `None` when the reference dangles. Backends with real
/// foreign keys never produce that, but the document store can.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithConsumer<T> {
  #[serde(flatten)]
  pub record:   T,
  #[serde(default)]
  pub consumer: Option<Consumer>,
}

pub fn normalize_department(department: Option<String>) -> Option<String> {
  department
    .map(|d| d.trim().to_owned())
    .filter(|d| !d.is_empty())
}

fn required_name(raw: &str) -> Result<String> {
  let name = raw.trim();
  if name.is_empty() {
    return Err(Error::Validation("consumer name is required".into()));
  }
  Ok(name.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn alice() -> Consumer {
    Consumer {
      id:         "c-1".into(),
      name:       "Alice".into(),
      department: Some("Production".into()),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn new_consumer_is_trimmed() {
    let input = NewConsumer::new("  Awa Kone ", Some("   ")).validate().unwrap();
    assert_eq!(input.name, "Awa Kone");
    assert_eq!(input.department, None);
  }

  #[test]
  fn blank_name_is_rejected() {
    let err = NewConsumer::new(" ", None).validate().unwrap_err();
    assert!(err.is_validation());
  }

  #[test]
  fn patch_updates_only_given_fields() {
    let patched = ConsumerPatch { name: Some("Alicia".into()), department: None }
      .apply(alice())
      .unwrap();
    assert_eq!(patched.name, "Alicia");
    assert_eq!(patched.department.as_deref(), Some("Production"));

    let cleared = ConsumerPatch { name: None, department: Some(String::new()) }
      .apply(alice())
      .unwrap();
    assert_eq!(cleared.department, None);
  }

  #[test]
  fn consumer_with_presence_is_flat_json() {
    let view = ConsumerWithPresence { consumer: alice(), is_present: true };
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["name"], "Alice");
    assert_eq!(json["isPresent"], true);
    assert!(json.get("consumer").is_none());
  }
}
