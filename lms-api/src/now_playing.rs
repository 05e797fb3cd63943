//! Reconciled "now playing" view of a player.
//!
//! The server reports the current track through several partially
//! overlapping answers: the player status, the song info list, and a set of
//! single-field queries. This module folds them into one flat record with a
//! fixed key set, so callers only ever check for empty values, never for
//! missing keys.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::client::LmsClient;
use crate::value::{as_plain_string, coerce_f64, coerce_i64, is_falsy};

/// Sentinel stored in `album_id` when the track has no album, as remote
/// streams do. Distinguishes "no album" from "not resolved".
pub const NO_ALBUM_ID: &str = "no_album_id";

/// Cover ids starting with this marker mean the server has no artwork.
const NO_ARTWORK_MARKER: char = '-';

/// Every field a reconciled record carries, with the fallback query (if
/// any) that can fill it when the status and song info leave it empty.
///
/// Order matters: the fallback pass walks the table top to bottom.
const KNOWN_FIELDS: &[(&str, &[&str])] = &[
    ("remote", &["remote", "?"]),
    ("remote_title", &[]),
    ("current_title", &["current_title", "?"]),
    ("remoteMeta", &[]),
    ("artist", &["artist", "?"]),
    ("album_id", &[]),
    ("filesize", &[]),
    ("genre", &["genre", "?"]),
    ("disc", &[]),
    ("artwork_track_id", &[]),
    ("comment", &[]),
    ("album", &["album", "?"]),
    ("bpm", &[]),
    ("genre_id", &[]),
    ("disccount", &[]),
    ("artist_id", &[]),
    ("tracknum", &[]),
    ("tagversion", &[]),
    ("compilation", &[]),
    ("dlna_profile", &[]),
    ("channels", &[]),
    ("playcount", &[]),
    ("samplerate", &[]),
    ("can_seek", &[]),
    ("id", &[]),
    ("title", &["current_title", "?"]),
    ("coverid", &[]),
    ("duration", &["duration", "?"]),
    ("coverart", &[]),
    ("modificationTime", &[]),
    ("type", &[]),
    ("bitrate", &[]),
    ("year", &[]),
    ("addedTime", &[]),
    ("artwork_url", &[]),
    ("lastUpdated", &[]),
    ("playlist_loop", &[]),
    ("player_name", &[]),
    ("digital_volume_control", &[]),
    ("signalstrength", &[]),
    ("playlist_cur_index", &[]),
    ("mode", &["mode", "?"]),
    ("playlist_timestamp", &[]),
    ("power", &[]),
    ("playlist_tracks", &[]),
    ("rate", &[]),
    ("player_connected", &[]),
    ("time", &["time", "?"]),
    ("player_ip", &[]),
    ("seq_no", &[]),
    ("playlist mode", &[]),
    ("playlist shuffle", &[]),
    ("playlist repeat", &[]),
    ("mixer volume", &[]),
];

/// Fully reconciled now-playing record.
///
/// Every key of the known-field table is present. Fields the server never
/// reported hold the empty string, except `album_id`, which falls back to
/// [`NO_ALBUM_ID`].
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    fields: Map<String, Value>,
}

impl NowPlaying {
    /// Raw value of a field. Known fields are always present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field as text, coercing numbers, empty when unset.
    pub fn text(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(as_plain_string)
            .unwrap_or_default()
    }

    /// Track or stream title.
    pub fn title(&self) -> String {
        self.text("title")
    }

    /// Track artist.
    pub fn artist(&self) -> String {
        self.text("artist")
    }

    /// Track album.
    pub fn album(&self) -> String {
        self.text("album")
    }

    /// Album id, or [`NO_ALBUM_ID`] when the track has none.
    pub fn album_id(&self) -> String {
        self.text("album_id")
    }

    /// Genre of the track.
    pub fn genre(&self) -> String {
        self.text("genre")
    }

    /// Full URL of the cover art, empty when the server has none.
    pub fn artwork_url(&self) -> String {
        self.text("artwork_url")
    }

    /// Playback mode ("play", "pause", "stop"), empty when unknown.
    pub fn mode(&self) -> String {
        self.text("mode")
    }

    /// Track duration in seconds, 0 when unknown.
    pub fn duration(&self) -> f64 {
        self.fields
            .get("duration")
            .and_then(coerce_f64)
            .unwrap_or(0.0)
    }

    /// Whether the current track is a remote stream.
    pub fn is_remote(&self) -> bool {
        remote_flag(&self.fields) != 0
    }

    /// Borrow the underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consume the record, yielding the underlying field map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }

    /// Record with every field blank and the album sentinel applied.
    pub(crate) fn placeholder() -> Self {
        let mut fields = Map::new();
        blank_fill(&mut fields);
        ensure_album_id(&mut fields);
        Self { fields }
    }
}

impl LmsClient {
    /// Build the reconciled now-playing record for the associated player.
    ///
    /// Never fails: when the initial status query cannot be answered at
    /// all, the placeholder record is returned immediately; every later
    /// step degrades field-by-field instead.
    pub fn now_playing(&self) -> NowPlaying {
        let status = match self.player_query(&[json!("status"), json!("-")]) {
            Ok(status) => status,
            Err(e) => {
                warn!("status query failed: {}", e);
                return NowPlaying::placeholder();
            }
        };

        let playing_track = status
            .get("playlist_loop")
            .and_then(Value::as_array)
            .and_then(|playlist| playlist.first());
        if playing_track.is_none() {
            warn!("no valid playlist was returned");
        }
        let track_id = playing_track
            .and_then(|track| track.get("id"))
            .and_then(as_plain_string)
            .unwrap_or_else(|| "0".to_string());

        let track_info = self.player_query_or_empty(&[
            json!("songinfo"),
            json!("-"),
            json!(100),
            json!(format!("track_id:{}", track_id)),
        ]);

        let mut fields = Map::new();

        // Song info arrives as a list of one-entry objects; flatten it,
        // later entries winning on key collisions.
        if let Some(info_list) = track_info.get("songinfo_loop").and_then(Value::as_array) {
            for info in info_list {
                if let Some(obj) = info.as_object() {
                    for (key, value) in obj {
                        fields.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        let artwork = self.artwork_url_for(fields.get("coverid"));
        fields.insert("artwork_url".to_string(), Value::String(artwork));

        // Status fields win over song info on collision.
        if let Some(status_obj) = status.as_object() {
            for (key, value) in status_obj {
                fields.insert(key.clone(), value.clone());
            }
        }

        self.fill_missing(&mut fields);
        blank_fill(&mut fields);
        apply_remote_title(&mut fields);
        ensure_album_id(&mut fields);

        NowPlaying { fields }
    }

    /// Artwork URL for a cover id: base URL plus the fixed cover path, or
    /// empty when the id is absent or carries the no-artwork marker.
    fn artwork_url_for(&self, coverid: Option<&Value>) -> String {
        let coverid = match coverid {
            Some(value) if !is_falsy(value) => match as_plain_string(value) {
                Some(id) => id,
                None => return String::new(),
            },
            _ => return String::new(),
        };

        if coverid.starts_with(NO_ARTWORK_MARKER) {
            return String::new();
        }

        match self.server_base_url() {
            Some(base) => format!("{}music/{}/cover.jpg", base, coverid),
            None => String::new(),
        }
    }

    /// Fallback pass: one secondary query per still-empty field that has
    /// one. Answer keys are copied in after stripping the server's leading
    /// underscore convention, restricted to keys the table knows.
    fn fill_missing(&self, fields: &mut Map<String, Value>) {
        for (key, fallback) in KNOWN_FIELDS {
            let present = fields.get(*key).map(|v| !is_falsy(v)).unwrap_or(false);
            if present || fallback.is_empty() {
                continue;
            }

            debug!(field = *key, "querying fallback for missing field");
            let command: Vec<Value> = fallback.iter().map(|arg| json!(arg)).collect();
            let result = self.player_query_or_empty(&command);

            if let Some(obj) = result.as_object() {
                for (answer_key, value) in obj {
                    let stripped = answer_key.trim_start_matches('_');
                    if KNOWN_FIELDS.iter().any(|(known, _)| *known == stripped) {
                        fields.insert(stripped.to_string(), value.clone());
                    }
                }
            }
        }
    }
}

/// `remote` field coerced through integer parsing, 0 on any failure.
fn remote_flag(fields: &Map<String, Value>) -> i64 {
    fields.get("remote").and_then(coerce_i64).unwrap_or(0)
}

/// Set every still-empty known field to the empty string, guaranteeing
/// total key coverage.
fn blank_fill(fields: &mut Map<String, Value>) {
    for (key, _) in KNOWN_FIELDS {
        let falsy = fields.get(*key).map(is_falsy).unwrap_or(true);
        if falsy {
            fields.insert((*key).to_string(), Value::String(String::new()));
        }
    }
}

/// Remote streams carry their title inside `remoteMeta`; when the record
/// describes one, that title wins over whatever the merge produced.
fn apply_remote_title(fields: &mut Map<String, Value>) {
    if remote_flag(fields) == 0 {
        return;
    }

    let title = fields
        .get("remoteMeta")
        .and_then(|meta| meta.get("title"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| {
            fields
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_default();

    fields.insert("title".to_string(), Value::String(title));
}

/// Remote streams have no album id; the sentinel keeps that case
/// distinguishable from a field that was never resolved.
fn ensure_album_id(fields: &mut Map<String, Value>) {
    let falsy = fields.get("album_id").map(is_falsy).unwrap_or(true);
    if falsy {
        fields.insert(
            "album_id".to_string(),
            Value::String(NO_ALBUM_ID.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_covers_every_known_field() {
        let record = NowPlaying::placeholder();
        for (key, _) in KNOWN_FIELDS {
            assert!(
                record.get(key).is_some(),
                "placeholder record is missing {:?}",
                key
            );
        }
        assert_eq!(record.album_id(), NO_ALBUM_ID);
        assert_eq!(record.title(), "");
        assert!(!record.is_remote());
    }

    #[test]
    fn blank_fill_preserves_present_values() {
        let mut fields = Map::new();
        fields.insert("title".to_string(), json!("Song"));
        blank_fill(&mut fields);
        assert_eq!(fields["title"], json!("Song"));
        assert_eq!(fields["artist"], json!(""));
    }

    #[test]
    fn blank_fill_replaces_falsy_values() {
        let mut fields = Map::new();
        fields.insert("duration".to_string(), json!(0));
        blank_fill(&mut fields);
        assert_eq!(fields["duration"], json!(""));
    }

    #[test]
    fn remote_title_override_prefers_remote_meta() {
        let mut fields = Map::new();
        fields.insert("remote".to_string(), json!(1));
        fields.insert("title".to_string(), json!("Local Title"));
        fields.insert("remoteMeta".to_string(), json!({"title": "Stream X"}));
        apply_remote_title(&mut fields);
        assert_eq!(fields["title"], json!("Stream X"));
    }

    #[test]
    fn remote_title_override_keeps_existing_title_without_meta() {
        let mut fields = Map::new();
        fields.insert("remote".to_string(), json!("1"));
        fields.insert("title".to_string(), json!("Existing"));
        fields.insert("remoteMeta".to_string(), json!(""));
        apply_remote_title(&mut fields);
        assert_eq!(fields["title"], json!("Existing"));
    }

    #[test]
    fn remote_flag_ignores_unparseable_values() {
        let mut fields = Map::new();
        fields.insert("remote".to_string(), json!(""));
        fields.insert("title".to_string(), json!("Kept"));
        apply_remote_title(&mut fields);
        assert_eq!(fields["title"], json!("Kept"));
    }

    #[test]
    fn album_id_sentinel_only_applies_when_falsy() {
        let mut fields = Map::new();
        fields.insert("album_id".to_string(), json!(517));
        ensure_album_id(&mut fields);
        assert_eq!(fields["album_id"], json!(517));

        let mut fields = Map::new();
        fields.insert("album_id".to_string(), json!(""));
        ensure_album_id(&mut fields);
        assert_eq!(fields["album_id"], json!(NO_ALBUM_ID));
    }
}
