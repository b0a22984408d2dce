//! The community catalog: collection names, their default orderings, and
//! typed builders for the two collections users write to.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
  Error, Result,
  document::{CREATED_AT_FIELD, Comment, NewDocument},
  identity::Identity,
  query::CollectionQuery,
};

// ─── Collections ─────────────────────────────────────────────────────────────

pub const ADVENTURES: &str = "adventures";
pub const EVENTS: &str = "events";
pub const ROUTES: &str = "routes";
pub const PRODUCTS: &str = "products";
pub const SHOPS: &str = "shops";
pub const TIPS: &str = "tips";
pub const RIDERS: &str = "riders";

/// Counter field bumped by "like".
pub const LIKES_FIELD: &str = "likes";

/// Every catalog collection, in navigation order.
pub const COLLECTIONS: [&str; 7] = [ADVENTURES, EVENTS, ROUTES, PRODUCTS, SHOPS, TIPS, RIDERS];

/// The ordering each catalog collection is listed in.
pub fn default_query(collection: &str) -> Option<CollectionQuery> {
  let q = match collection {
    ADVENTURES => CollectionQuery::descending(ADVENTURES, CREATED_AT_FIELD),
    EVENTS => CollectionQuery::ascending(EVENTS, "date"),
    ROUTES => CollectionQuery::ascending(ROUTES, "position"),
    PRODUCTS => CollectionQuery::ascending(PRODUCTS, "position"),
    SHOPS => CollectionQuery::descending(SHOPS, "rating"),
    TIPS => CollectionQuery::ascending(TIPS, "position"),
    RIDERS => CollectionQuery::descending(RIDERS, "points"),
    _ => return None,
  };
  Some(q)
}

// ─── Categories ──────────────────────────────────────────────────────────────

/// Riding discipline shared by adventures, routes and the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RideCategory {
  Mountain,
  Commuter,
  Road,
  Gravel,
}

impl RideCategory {
  pub const ALL: [Self; 4] = [Self::Mountain, Self::Commuter, Self::Road, Self::Gravel];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Mountain => "Mountain",
      Self::Commuter => "Commuter",
      Self::Road => "Road",
      Self::Gravel => "Gravel",
    }
  }
}

impl fmt::Display for RideCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for RideCategory {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| Error::UnknownCategory(s.to_owned()))
  }
}

/// Kind of community event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
  Social,
  Race,
  Expedition,
  Training,
}

impl EventKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Social => "Social",
      Self::Race => "Race",
      Self::Expedition => "Expedition",
      Self::Training => "Training",
    }
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Adventures ──────────────────────────────────────────────────────────────

const ADVENTURE_IMAGE: &str = "linear-gradient(45deg, #FF5F1F, #121212)";
const EVENT_IMAGE: &str = "linear-gradient(135deg, #FF5F1F 0%, #121212 100%)";

fn required(value: &str, field: &'static str) -> Result<()> {
  if value.trim().is_empty() { Err(Error::MissingField(field)) } else { Ok(()) }
}

/// A ride story as submitted from the share form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdventure {
  pub title:       String,
  pub category:    RideCategory,
  pub description: String,
}

impl NewAdventure {
  pub fn validate(&self) -> Result<()> {
    required(&self.title, "title")?;
    required(&self.description, "description")
  }

  /// The stored shape: author from the identity, zero likes, no comments,
  /// creation instant from the store's clock.
  pub fn into_document(self, who: &Identity, today: NaiveDate) -> Result<NewDocument> {
    self.validate()?;
    Ok(
      NewDocument::new()
        .set("title", self.title.trim())
        .set("category", self.category.as_str())
        .set("author", who.author_label())
        .set("time", today.format("%-m/%-d/%Y").to_string())
        .set("image", ADVENTURE_IMAGE)
        .set("description", self.description.trim())
        .set(LIKES_FIELD, 0)
        .set(Comment::FIELD, json!([]))
        .server_timestamp(CREATED_AT_FIELD),
    )
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A community event as submitted from the event form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
  pub title:    String,
  /// Stored as `YYYY-MM-DD` so the store orders events chronologically.
  pub date:     NaiveDate,
  pub location: String,
  #[serde(rename = "type")]
  pub kind:     EventKind,
}

impl NewEvent {
  pub fn validate(&self) -> Result<()> {
    required(&self.title, "title")?;
    required(&self.location, "location")
  }

  /// The stored shape: the host counts as the first attendee.
  pub fn into_document(self, who: &Identity) -> Result<NewDocument> {
    self.validate()?;
    Ok(
      NewDocument::new()
        .set("title", self.title.trim())
        .set("date", self.date.format("%Y-%m-%d").to_string())
        .set("location", self.location.trim())
        .set("attendees", 1)
        .set("image", EVENT_IMAGE)
        .set("type", self.kind.as_str())
        .set("host", who.author_label())
        .server_timestamp(CREATED_AT_FIELD),
    )
  }
}
