//! Starter content for an empty community store.
//!
//! Each catalog collection is seeded only while it is empty, so running the
//! seeder twice is harmless.

use serde_json::{Value, json};
use tracing::info;

use crate::{
  catalog::{
    ADVENTURES, COLLECTIONS, EVENTS, PRODUCTS, RIDERS, ROUTES, SHOPS, TIPS, default_query,
  },
  document::{CREATED_AT_FIELD, NewDocument},
  store::DocumentStore,
};

/// Number of documents written per collection by [`seed_if_empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub written: Vec<(&'static str, usize)>,
}

impl SeedReport {
  pub fn total(&self) -> usize { self.written.iter().map(|(_, n)| n).sum() }
}

/// Starter documents for one catalog collection.
pub fn starter_documents(collection: &str) -> Vec<NewDocument> {
  let rows: Vec<Value> = match collection {
    ADVENTURES => vec![
      json!({
        "title": "Sunset Ridge Trail", "category": "Mountain", "author": "Dawit Abebe",
        "time": "2h ago", "image": "linear-gradient(45deg, #FF5F1F, #121212)",
        "description": "A breathtaking ride through the Simien Mountains. The sunset views were absolutely unmatched.",
        "likes": 24, "comments": [],
      }),
      json!({
        "title": "Addis Commute", "category": "Commuter", "author": "Sarah Jones",
        "time": "5h ago", "image": "linear-gradient(45deg, #00E5FF, #121212)",
        "description": "Navigating the busy streets of Addis Ababa. Found a new shortcut near Bole!",
        "likes": 15, "comments": [],
      }),
    ],
    EVENTS => vec![
      json!({
        "title": "Simien Mountains Trek", "date": "2024-10-15", "location": "Debark, Ethiopia",
        "attendees": 42, "image": "linear-gradient(135deg, #FF5F1F 0%, #121212 100%)",
        "type": "Expedition", "host": "Community",
      }),
      json!({
        "title": "Addis Night Ride", "date": "2024-10-20", "location": "Meskel Square, Addis Ababa",
        "attendees": 128, "image": "linear-gradient(135deg, #00E5FF 0%, #121212 100%)",
        "type": "Social", "host": "Community",
      }),
    ],
    ROUTES => vec![
      json!({
        "position": 1, "name": "Entoto Forest Loop", "category": "Mountain", "difficulty": "Hard",
        "distance": "25 km", "elevation": "500m", "location": "Addis Ababa",
        "description": "A challenging climb through the eucalyptus forests of Entoto. Technical descents and amazing city views.",
      }),
      json!({
        "position": 2, "name": "Bole to Piassa", "category": "Commuter", "difficulty": "Easy",
        "distance": "12 km", "elevation": "100m", "location": "Addis Ababa",
        "description": "The most direct route connecting the airport district to the old city center. Mostly flat with bike lanes.",
      }),
      json!({
        "position": 3, "name": "Wenchi Crater Rim", "category": "Gravel", "difficulty": "Medium",
        "distance": "35 km", "elevation": "400m", "location": "Wenchi",
        "description": "Scenic gravel roads around the crater lake. Perfect for endurance riding and nature lovers.",
      }),
      json!({
        "position": 4, "name": "Meskel Square Laps", "category": "Road", "difficulty": "Easy",
        "distance": "5 km", "elevation": "20m", "location": "Addis Ababa",
        "description": "Smooth tarmac perfect for speed training or casual evening rides.",
      }),
    ],
    PRODUCTS => vec![
      json!({
        "position": 1, "name": "Pro Mountain Helmet", "price": "3,500 ETB", "category": "Gear",
        "image": "linear-gradient(135deg, #333 0%, #000 100%)", "shop": "Addis Bike Center",
      }),
      json!({
        "position": 2, "name": "All-Terrain Tires", "price": "1,200 ETB", "category": "Parts",
        "image": "linear-gradient(135deg, #444 0%, #111 100%)", "shop": "Velocity Cycles",
      }),
      json!({
        "position": 3, "name": "Hydration Pack", "price": "2,800 ETB", "category": "Accessories",
        "image": "linear-gradient(135deg, #555 0%, #222 100%)", "shop": "Ethio Sports",
      }),
    ],
    SHOPS => vec![
      json!({
        "name": "Addis Bike Center", "location": "Bole, Addis Ababa", "rating": 4.8,
        "specialty": "Mountain & Road",
      }),
      json!({
        "name": "Velocity Cycles", "location": "Piassa, Addis Ababa", "rating": 4.5,
        "specialty": "Repairs & Parts",
      }),
    ],
    TIPS => vec![
      json!({
        "position": 1, "title": "High Altitude Training", "category": "Training", "author": "Coach Bekele",
        "content": "Training at altitude improves your aerobic capacity. Start slow and stay hydrated. The Entoto mountains are perfect for acclimation rides.",
      }),
      json!({
        "position": 2, "title": "Bike Maintenance 101", "category": "Maintenance", "author": "Addis Bike Center",
        "content": "Keep your chain clean and lubricated, especially after dusty rides. Check tire pressure before every ride to avoid pinch flats.",
      }),
      json!({
        "position": 3, "title": "Nutrition for Long Rides", "category": "Health", "author": "Dr. Sarah",
        "content": "Carb-load the night before. On the ride, aim for 60g of carbs per hour. Teff-based snacks are excellent for sustained energy.",
      }),
      json!({
        "position": 4, "title": "Safe City Commuting", "category": "Safety", "author": "Commuter Club",
        "content": "Always wear a helmet and high-vis gear. Use hand signals and make eye contact with drivers. Stick to designated bike lanes where available.",
      }),
    ],
    RIDERS => vec![
      json!({ "name": "Dawit Abebe", "points": 2450, "distance": "1,240 km", "category": "Mountain", "avatar": "linear-gradient(135deg, #FF5F1F, #000)" }),
      json!({ "name": "Sarah Jones", "points": 2100, "distance": "980 km", "category": "Road", "avatar": "linear-gradient(135deg, #00E5FF, #000)" }),
      json!({ "name": "Yonas Tadesse", "points": 1950, "distance": "850 km", "category": "Gravel", "avatar": "linear-gradient(135deg, #D4FF00, #000)" }),
      json!({ "name": "Helen Kassa", "points": 1800, "distance": "720 km", "category": "Commuter", "avatar": "linear-gradient(135deg, #FF9900, #000)" }),
      json!({ "name": "Robel Haile", "points": 1650, "distance": "690 km", "category": "Mountain", "avatar": "linear-gradient(135deg, #FF5F1F, #333)" }),
    ],
    _ => Vec::new(),
  };

  rows
    .into_iter()
    .filter_map(|row| NewDocument::from_json(row).ok())
    .map(|doc| doc.server_timestamp(CREATED_AT_FIELD))
    .collect()
}

/// Populate every empty catalog collection with its starter documents.
pub async fn seed_if_empty<S: DocumentStore>(store: &S) -> Result<SeedReport, S::Error> {
  let mut report = SeedReport::default();
  for collection in COLLECTIONS {
    let Some(query) = default_query(collection) else { continue };
    if !store.query(&query).await?.is_empty() {
      continue;
    }
    let docs = starter_documents(collection);
    let count = docs.len();
    for doc in docs {
      store.add_document(collection, doc).await?;
    }
    info!(collection, count, "seeded");
    report.written.push((collection, count));
  }
  Ok(report)
}
