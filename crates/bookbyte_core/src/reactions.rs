//! crates/bookbyte_core/src/reactions.rs
//!
//! Reaction flags, partial flag updates and the toggle rules the feed uses
//! when a reader presses one of the reaction buttons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// The four independent reaction flags stored per (user, paragraph) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReactionFlags {
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_disliked: bool,
    #[serde(default)]
    pub is_hearted: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
}

/// A partial flag update. Only the flags that are `Some` are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_disliked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hearted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_bookmarked: Option<bool>,
}

impl ReactionPatch {
    pub fn is_empty(&self) -> bool {
        self.is_liked.is_none()
            && self.is_disliked.is_none()
            && self.is_hearted.is_none()
            && self.is_bookmarked.is_none()
    }
}

/// A toggleable reaction button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Dislike,
    Heart,
    Bookmark,
}

impl ReactionFlags {
    /// Computes the patch that toggles `reaction`.
    ///
    /// Liking clears a dislike and disliking clears a like; hearts and
    /// bookmarks only flip themselves.
    pub fn toggle(&self, reaction: Reaction) -> ReactionPatch {
        match reaction {
            Reaction::Like => ReactionPatch {
                is_liked: Some(!self.is_liked),
                is_disliked: Some(false),
                ..ReactionPatch::default()
            },
            Reaction::Dislike => ReactionPatch {
                is_disliked: Some(!self.is_disliked),
                is_liked: Some(false),
                ..ReactionPatch::default()
            },
            Reaction::Heart => ReactionPatch {
                is_hearted: Some(!self.is_hearted),
                ..ReactionPatch::default()
            },
            Reaction::Bookmark => ReactionPatch {
                is_bookmarked: Some(!self.is_bookmarked),
                ..ReactionPatch::default()
            },
        }
    }

    /// Writes every flag present in `patch`.
    pub fn apply(&mut self, patch: &ReactionPatch) {
        if let Some(v) = patch.is_liked {
            self.is_liked = v;
        }
        if let Some(v) = patch.is_disliked {
            self.is_disliked = v;
        }
        if let Some(v) = patch.is_hearted {
            self.is_hearted = v;
        }
        if let Some(v) = patch.is_bookmarked {
            self.is_bookmarked = v;
        }
    }

    /// Whether `reaction` is currently on.
    pub fn is_set(&self, reaction: Reaction) -> bool {
        match reaction {
            Reaction::Like => self.is_liked,
            Reaction::Dislike => self.is_disliked,
            Reaction::Heart => self.is_hearted,
            Reaction::Bookmark => self.is_bookmarked,
        }
    }

    pub fn applied(mut self, patch: &ReactionPatch) -> Self {
        self.apply(patch);
        self
    }
}

/// Error returned when parsing an unknown reaction or event type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid event_type. Must be one of: heart, like, dislike, bookmark, copy")]
pub struct UnknownEventType(pub String);

/// The event kinds accepted by the track-event endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Heart,
    Like,
    Dislike,
    Bookmark,
    Copy,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::Heart,
        EventType::Like,
        EventType::Dislike,
        EventType::Bookmark,
        EventType::Copy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Heart => "heart",
            EventType::Like => "like",
            EventType::Dislike => "dislike",
            EventType::Bookmark => "bookmark",
            EventType::Copy => "copy",
        }
    }

    /// The toggleable reaction behind this event, if any. `Copy` has none.
    pub fn reaction(&self) -> Option<Reaction> {
        match self {
            EventType::Heart => Some(Reaction::Heart),
            EventType::Like => Some(Reaction::Like),
            EventType::Dislike => Some(Reaction::Dislike),
            EventType::Bookmark => Some(Reaction::Bookmark),
            EventType::Copy => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_clears_dislike() {
        let flags = ReactionFlags {
            is_disliked: true,
            ..ReactionFlags::default()
        };
        let patch = flags.toggle(Reaction::Like);
        let after = flags.applied(&patch);
        assert!(after.is_liked);
        assert!(!after.is_disliked);
    }

    #[test]
    fn dislike_clears_like() {
        let flags = ReactionFlags {
            is_liked: true,
            is_hearted: true,
            ..ReactionFlags::default()
        };
        let after = flags.applied(&flags.toggle(Reaction::Dislike));
        assert!(after.is_disliked);
        assert!(!after.is_liked);
        assert!(after.is_hearted, "heart is independent of like/dislike");
    }

    #[test]
    fn toggling_like_twice_unlikes() {
        let flags = ReactionFlags::default();
        let once = flags.applied(&flags.toggle(Reaction::Like));
        let twice = once.applied(&once.toggle(Reaction::Like));
        assert_eq!(twice, ReactionFlags::default());
    }

    #[test]
    fn heart_and_bookmark_only_touch_themselves() {
        let flags = ReactionFlags {
            is_liked: true,
            ..ReactionFlags::default()
        };
        let heart = flags.toggle(Reaction::Heart);
        assert_eq!(heart.is_liked, None);
        assert_eq!(heart.is_disliked, None);
        assert_eq!(heart.is_hearted, Some(true));

        let bookmark = flags.toggle(Reaction::Bookmark);
        assert_eq!(bookmark.is_bookmarked, Some(true));
        assert_eq!(bookmark.is_hearted, None);
    }

    #[test]
    fn is_set_reads_the_matching_flag() {
        let flags = ReactionFlags {
            is_hearted: true,
            ..ReactionFlags::default()
        };
        assert!(flags.is_set(Reaction::Heart));
        assert!(!flags.is_set(Reaction::Like));
        assert!(!flags.is_set(Reaction::Bookmark));
    }

    #[test]
    fn patch_serializes_only_present_flags() {
        let patch = ReactionPatch {
            is_hearted: Some(true),
            ..ReactionPatch::default()
        };
        let json = serde_json::to_value(patch).unwrap();
        assert_eq!(json, serde_json::json!({ "is_hearted": true }));
    }

    #[test]
    fn event_type_parses_known_names_only() {
        assert_eq!("heart".parse::<EventType>().unwrap(), EventType::Heart);
        assert_eq!("copy".parse::<EventType>().unwrap(), EventType::Copy);
        assert!("share".parse::<EventType>().is_err());
        assert!("Like".parse::<EventType>().is_err());
    }
}
