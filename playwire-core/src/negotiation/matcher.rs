//! Reconciles the requested media source against the server's candidates.

use crate::media::{ContentKind, MediaSourceCandidate};
use crate::{NegotiationError, Result};

/// Selects the server-returned candidate corresponding to the requested source.
///
/// On-demand content requires an exact entity tag and identity match. Live
/// content matches by open token and otherwise falls back to the first
/// candidate, since live identities are assigned by the server.
#[derive(Debug, Clone, Copy)]
pub struct SourceMatcher {
    kind: ContentKind,
}

impl SourceMatcher {
    /// Creates a matcher applying the policy for `kind`.
    pub fn new(kind: ContentKind) -> Self {
        Self { kind }
    }

    /// Picks exactly one candidate.
    ///
    /// # Errors
    /// - `NegotiationError::SourceMismatch` - No candidate corresponds to `requested`
    pub fn select(
        &self,
        requested: &MediaSourceCandidate,
        candidates: Vec<MediaSourceCandidate>,
    ) -> Result<MediaSourceCandidate> {
        let matched = match self.kind {
            ContentKind::OnDemand => Self::match_on_demand(requested, candidates),
            ContentKind::Live => Self::match_live(requested, candidates),
        };

        matched.ok_or_else(|| {
            tracing::warn!(
                "No {} media source matches requested source {}",
                self.kind,
                requested.id
            );
            NegotiationError::SourceMismatch {
                media_source_id: requested.id.clone(),
            }
        })
    }

    fn match_on_demand(
        requested: &MediaSourceCandidate,
        candidates: Vec<MediaSourceCandidate>,
    ) -> Option<MediaSourceCandidate> {
        candidates
            .into_iter()
            .find(|candidate| candidate.etag == requested.etag && candidate.id == requested.id)
    }

    fn match_live(
        requested: &MediaSourceCandidate,
        candidates: Vec<MediaSourceCandidate>,
    ) -> Option<MediaSourceCandidate> {
        let by_token = (!requested.id.is_empty())
            .then(|| {
                candidates.iter().position(|candidate| {
                    candidate
                        .open_token
                        .as_deref()
                        .is_some_and(|token| !token.is_empty() && token.contains(&requested.id))
                })
            })
            .flatten();

        let position = match by_token {
            Some(position) => {
                tracing::debug!("Live source matched by open token at position {}", position);
                position
            }
            None if !candidates.is_empty() => {
                // Best effort: live identities are unreliable, prefer availability.
                tracing::warn!(
                    "No open token contains {}, using first of {} live sources",
                    requested.id,
                    candidates.len()
                );
                0
            }
            None => return None,
        };

        candidates.into_iter().nth(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_candidate(id: &str, token: Option<&str>) -> MediaSourceCandidate {
        MediaSourceCandidate {
            open_token: token.map(str::to_string),
            ..MediaSourceCandidate::new(id)
        }
    }

    #[test]
    fn test_on_demand_requires_etag_and_id() {
        let candidates = vec![
            MediaSourceCandidate::new("a").with_etag("x"),
            MediaSourceCandidate::new("b").with_etag("y"),
        ];
        let matcher = SourceMatcher::new(ContentKind::OnDemand);

        let matched = matcher
            .select(&MediaSourceCandidate::new("b").with_etag("y"), candidates.clone())
            .unwrap();
        assert_eq!(matched, candidates[1]);

        let result = matcher.select(&MediaSourceCandidate::new("b").with_etag("z"), candidates);
        assert!(matches!(
            result,
            Err(NegotiationError::SourceMismatch { media_source_id }) if media_source_id == "b"
        ));
    }

    #[test]
    fn test_on_demand_never_falls_back() {
        let matcher = SourceMatcher::new(ContentKind::OnDemand);

        let result = matcher.select(
            &MediaSourceCandidate::new("missing"),
            vec![MediaSourceCandidate::new("a")],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_live_matches_token_substring() {
        let matcher = SourceMatcher::new(ContentKind::Live);
        let candidates = vec![
            live_candidate("x", Some("sess-123-abc")),
            live_candidate("y", Some("other")),
        ];

        let matched = matcher
            .select(&MediaSourceCandidate::new("123"), candidates)
            .unwrap();
        assert_eq!(matched.id, "x");
    }

    #[test]
    fn test_live_first_token_match_wins() {
        let matcher = SourceMatcher::new(ContentKind::Live);
        let candidates = vec![
            live_candidate("x", None),
            live_candidate("y", Some("open-123")),
            live_candidate("z", Some("again-123")),
        ];

        let matched = matcher
            .select(&MediaSourceCandidate::new("123"), candidates)
            .unwrap();
        assert_eq!(matched.id, "y");
    }

    #[test]
    fn test_live_falls_back_to_first_candidate() {
        let matcher = SourceMatcher::new(ContentKind::Live);
        let candidates = vec![
            live_candidate("first", Some("nope")),
            live_candidate("second", None),
        ];

        let matched = matcher
            .select(&MediaSourceCandidate::new("123"), candidates)
            .unwrap();
        assert_eq!(matched.id, "first");
    }

    #[test]
    fn test_live_empty_requested_id_uses_fallback() {
        let matcher = SourceMatcher::new(ContentKind::Live);
        let candidates = vec![
            live_candidate("first", None),
            live_candidate("second", Some("token")),
        ];

        let matched = matcher
            .select(&MediaSourceCandidate::new(""), candidates)
            .unwrap();
        assert_eq!(matched.id, "first");
    }

    #[test]
    fn test_live_empty_candidates_is_mismatch() {
        let matcher = SourceMatcher::new(ContentKind::Live);

        let result = matcher.select(&MediaSourceCandidate::new("123"), Vec::new());
        assert!(matches!(
            result,
            Err(NegotiationError::SourceMismatch { .. })
        ));
    }
}
