//! Object key scheme for event media.
//!
//! B2 has a flat namespace. Events and posts are simulated with key
//! prefixes of the form `events/{event_id}/media/{file_name}`, where a post
//! owns every file whose name starts with the post id followed by `/` or `.`.

/// Characters that may not appear in an event identifier.
pub const EVENT_RESERVED: &[char] = &['/', '.'];

/// Characters that may not appear in a post identifier.
///
/// A post id may name a single file (`photo.png`), so `.` is allowed.
pub const POST_RESERVED: &[char] = &['/'];

pub fn event_prefix(event_id: &str) -> String {
    format!("events/{}", event_id)
}

pub fn media_prefix(event_id: &str) -> String {
    format!("{}/media", event_prefix(event_id))
}

pub fn post_prefix(event_id: &str, post_id: &str) -> String {
    format!("{}/{}", media_prefix(event_id), post_id)
}

pub fn object_key(event_id: &str, file_name: &str) -> String {
    format!("{}/{}", media_prefix(event_id), file_name)
}

/// Check that an identifier is safe to embed in a key prefix
///
/// Returns the trimmed identifier, or `None` if it is blank or contains one
/// of the `reserved` delimiters.
pub fn delimiter_safe<'a>(id: &'a str, reserved: &[char]) -> Option<&'a str> {
    let id = id.trim();
    if id.is_empty() || id.contains(reserved) {
        None
    } else {
        Some(id)
    }
}

/// A key prefix together with the characters allowed to follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScope {
    prefix: String,
    boundaries: &'static [char],
}

impl KeyScope {
    /// Everything stored for an event
    pub fn event(event_id: &str) -> Self {
        Self {
            prefix: event_prefix(event_id),
            boundaries: &['/'],
        }
    }

    /// Everything stored for one post of an event
    pub fn post(event_id: &str, post_id: &str) -> Self {
        Self {
            prefix: post_prefix(event_id, post_id),
            boundaries: &['/', '.'],
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True if `key` lies inside this scope
    ///
    /// The key must start with the prefix and continue with a boundary
    /// character, or end right after it.
    pub fn contains(&self, key: &str) -> bool {
        match key.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest
                .chars()
                .next()
                .is_none_or(|c| self.boundaries.contains(&c)),
            None => false,
        }
    }
}
