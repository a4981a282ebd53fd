//! Media domain types exchanged with the server and handed to the player.
//!
//! Wire-facing types use the server's PascalCase field names so the same
//! structs decode playback-info responses and describe caller requests.

pub mod item;
pub mod playback;
pub mod source;

pub use item::{Chapter, ChapterInfo, ItemId, MediaItem, TICKS_PER_SECOND};
pub use playback::{NO_STREAM_SELECTED, PlayMethod, PlaySessionId, PlaybackDescriptor};
pub use source::{MediaSourceCandidate, MediaStream, StreamKind};

/// Whether content is on-demand or a live broadcast.
///
/// Live sources are opened by the server on request, so their identities are
/// not known in advance and matching is more permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    OnDemand,
    Live,
}

impl ContentKind {
    /// Maps the player's `is_live` flag onto a content kind.
    pub fn from_is_live(is_live: bool) -> Self {
        if is_live { Self::Live } else { Self::OnDemand }
    }

    /// Check if this is live content.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnDemand => write!(f, "on-demand"),
            Self::Live => write!(f, "live"),
        }
    }
}
