//! Media items and their chapter markers.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server time unit: 100 ns ticks.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Opaque server-assigned item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates ItemId from the server's identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A playable library item as loaded by the caller.
///
/// The identifier is mandatory: an item without one cannot be negotiated and
/// fails to decode rather than surfacing later as a runtime condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaItem {
    pub id: ItemId,
    #[serde(default)]
    pub name: Option<String>,
    /// Entity tag used for cache/version matching of stream URLs
    #[serde(default)]
    pub etag: Option<String>,
    /// Total runtime in ticks
    #[serde(default)]
    pub run_time_ticks: Option<i64>,
    #[serde(default)]
    pub chapters: Option<Vec<ChapterInfo>>,
}

impl MediaItem {
    /// Creates an item with only its identifier set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(id),
            name: None,
            etag: None,
            run_time_ticks: None,
            chapters: None,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the entity tag.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Display name for logs, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// Resolves chapter markers into time ranges.
    ///
    /// Each chapter ends where the next one starts; the last chapter ends at the
    /// item's runtime, or is open-ended when the runtime is unknown.
    pub fn resolved_chapters(&self) -> Vec<Chapter> {
        let Some(chapters) = &self.chapters else {
            return Vec::new();
        };

        let runtime = self.run_time_ticks.map(ticks_to_duration);

        chapters
            .iter()
            .enumerate()
            .map(|(position, chapter)| {
                let end = chapters
                    .get(position + 1)
                    .map(|next| ticks_to_duration(next.start_position_ticks))
                    .or(runtime);

                Chapter {
                    name: chapter.name.clone(),
                    start: ticks_to_duration(chapter.start_position_ticks),
                    end,
                    image_tag: chapter.image_tag.clone(),
                }
            })
            .collect()
    }
}

/// Chapter marker as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChapterInfo {
    pub start_position_ticks: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_tag: Option<String>,
}

/// Chapter with a resolved time range, ready for a player's chapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: Option<String>,
    pub start: Duration,
    pub end: Option<Duration>,
    pub image_tag: Option<String>,
}

fn ticks_to_duration(ticks: i64) -> Duration {
    let ticks = ticks.max(0) as u64;
    Duration::from_nanos(ticks.saturating_mul(100))
}
