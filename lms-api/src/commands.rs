//! Convenience accessors and commands over the query funnel.
//!
//! Everything here is a thin wrapper: build the command arguments, run one
//! query, extract the interesting part of the answer defensively. Commands
//! that cannot be expressed server-level check for a configured player id
//! before any network I/O and fail loudly without one.

use chrono::{Datelike, Local, Timelike};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::LmsClient;
use crate::error::Result;
use crate::value::{as_plain_string, coerce_i64};

/// A player known to the server.
#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    /// Unique player id in hex (the player's MAC address)
    pub playerid: String,
    /// Human readable player name
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub connected: u8,
    #[serde(default)]
    pub power: u8,
}

/// The soonest alarm that still fires today on the associated player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextAlarm {
    /// Alarm time as seconds since midnight
    pub alarm_time: i64,
    /// Seconds between now and the alarm time (negative if already past)
    pub delta: i64,
}

impl LmsClient {
    // Server commands
    // ====================================

    /// Trigger a rescan of the server's library.
    pub fn rescan(&self) -> Result<Value> {
        self.query("", &[json!("rescan")])
    }

    /// Query full server status.
    pub fn server_status(&self) -> Result<Value> {
        self.query("", &[json!("serverstatus"), json!(0), json!(99)])
    }

    /// List the players connected to the server.
    pub fn players(&self) -> Result<Vec<Player>> {
        let status = self.server_status()?;
        let players = match status.get("players_loop") {
            Some(players) => serde_json::from_value(players.clone()).unwrap_or_default(),
            None => Vec::new(),
        };
        Ok(players)
    }

    /// List artist ids and names known to the server.
    pub fn artists(&self) -> Result<Vec<Value>> {
        let result = self.query("", &[json!("artists"), json!(0), json!(9999)])?;
        Ok(result
            .get("artists_loop")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Count of unique artists in the library.
    pub fn artist_count(&self) -> Result<usize> {
        Ok(self.artists()?.len())
    }

    /// Count of saved favorites/radio stations.
    pub fn radio_count(&self) -> Result<i64> {
        let result = self.query("", &[json!("favorites"), json!("items")])?;
        Ok(result.get("count").and_then(coerce_i64).unwrap_or(0))
    }

    /// Count of players connected to the server.
    pub fn player_count(&self) -> Result<i64> {
        let result = self.query("", &[json!("player"), json!("count"), json!("?")])?;
        Ok(result.get("_count").and_then(coerce_i64).unwrap_or(0))
    }

    /// Search every entity type for `term`, ignoring case.
    pub fn search(&self, term: &str, limit: u32) -> Result<Value> {
        self.query(
            "",
            &[
                json!("search"),
                json!(0),
                json!(limit),
                json!(format!("term:{}", term)),
            ],
        )
    }

    /// Search track names for `term`.
    pub fn search_tracks(&self, term: &str, limit: u32) -> Result<Value> {
        Ok(filter_search(&self.search(term, limit)?, "tracks"))
    }

    /// Search album names for `term`.
    pub fn search_albums(&self, term: &str, limit: u32) -> Result<Value> {
        Ok(filter_search(&self.search(term, limit)?, "albums"))
    }

    /// Search contributor names for `term`.
    pub fn search_contributors(&self, term: &str, limit: u32) -> Result<Value> {
        Ok(filter_search(&self.search(term, limit)?, "contributors"))
    }

    /// Search player names and attributes for `term`, ignoring case.
    pub fn search_players(&self, term: &str) -> Result<Value> {
        let needle = term.to_lowercase();
        let status = self.server_status()?;
        let mut matches = Vec::new();

        if let Some(players) = status.get("players_loop").and_then(Value::as_array) {
            for player in players {
                let hit = player
                    .as_object()
                    .map(|obj| {
                        obj.values().any(|v| {
                            as_plain_string(v)
                                .map(|s| s.to_lowercase().contains(&needle))
                                .unwrap_or(false)
                        })
                    })
                    .unwrap_or(false);
                if hit {
                    matches.push(player.clone());
                }
            }
        }

        let mut response = Map::new();
        response.insert("players_count".to_string(), json!(matches.len()));
        if !matches.is_empty() {
            response.insert("players_loop".to_string(), Value::Array(matches));
        }
        Ok(Value::Object(response))
    }

    // Player commands
    // ====================================

    /// Power the associated player on or off.
    pub fn set_power(&self, on: bool) -> Result<Value> {
        self.player_query(&[json!("power"), json!(u8::from(on))])
    }

    /// Power every connected player on or off.
    pub fn set_power_all(&self, on: bool) -> Result<()> {
        for player in self.players()? {
            self.query(&player.playerid, &[json!("power"), json!(u8::from(on))])?;
        }
        Ok(())
    }

    /// Load an album onto the associated player and start playing.
    ///
    /// Requires a configured player id.
    pub fn play_album(&self, album_id: u64) -> Result<Value> {
        let player_id = self.require_player_id()?;
        self.query(
            &player_id,
            &[
                json!("playlistcontrol"),
                json!("cmd:load"),
                json!(format!("album_id:{}", album_id)),
            ],
        )
    }

    /// Play a favorite (radio station) by its item id.
    pub fn play_radio(&self, item_id: &str) -> Result<Value> {
        self.player_query(&[
            json!("favorites"),
            json!("playlist"),
            json!("play"),
            json!(format!("item_id:{}", item_id)),
        ])
    }

    /// Play a stream URL on the associated player.
    pub fn play_stream(&self, url: &str) -> Result<Value> {
        self.player_query(&[json!("playlist"), json!("play"), json!(url)])
    }

    /// Pause the associated player.
    pub fn pause(&self) -> Result<Value> {
        self.player_query(&[json!("pause")])
    }

    /// Skip `amount` tracks forward (negative skips backwards).
    pub fn skip_songs(&self, amount: i32) -> Result<Value> {
        let index = if amount > 0 {
            format!("+{}", amount)
        } else {
            amount.to_string()
        };
        self.player_query(&[json!("playlist"), json!("index"), json!(index)])
    }

    /// Rewind one track.
    pub fn previous_song(&self) -> Result<Value> {
        self.skip_songs(-1)
    }

    /// Fast forward one track.
    pub fn next_song(&self) -> Result<Value> {
        self.skip_songs(1)
    }

    /// Current volume of the associated player (0 when unknown).
    pub fn volume(&self) -> Result<i64> {
        let result = self.player_query(&[json!("mixer"), json!("volume"), json!("?")])?;
        Ok(result.get("_volume").and_then(coerce_i64).unwrap_or(0))
    }

    /// Set the volume of the associated player (0-100).
    pub fn set_volume(&self, volume: u8) -> Result<Value> {
        self.player_query(&[json!("mixer"), json!("volume"), json!(volume)])
    }

    /// Title of the currently playing track, per the player's own notion.
    pub fn current_song_title(&self) -> Result<String> {
        let result = self.player_query(&[json!("current_title"), json!("?")])?;
        Ok(text_field(&result, "_current_title"))
    }

    /// Artist of the currently playing track.
    pub fn current_artist(&self) -> Result<String> {
        let result = self.player_query(&[json!("artist"), json!("?")])?;
        Ok(text_field(&result, "_artist"))
    }

    /// Album of the currently playing track.
    pub fn current_album(&self) -> Result<String> {
        let result = self.player_query(&[json!("album"), json!("?")])?;
        Ok(text_field(&result, "_album"))
    }

    /// Track title of the currently playing track.
    pub fn current_title(&self) -> Result<String> {
        let result = self.player_query(&[json!("title"), json!("?")])?;
        Ok(text_field(&result, "_title"))
    }

    /// Name of the favorite at `index`, empty when out of range.
    pub fn current_radio_title(&self, index: usize) -> Result<String> {
        let result =
            self.player_query(&[json!("favorites"), json!("items"), json!(0), json!(99)])?;
        let name = result
            .get("loop_loop")
            .and_then(Value::as_array)
            .and_then(|items| items.get(index))
            .map(|item| text_field(item, "name"))
            .unwrap_or_default();
        Ok(name)
    }

    /// Saved favorites (radio stations) of the associated player.
    pub fn favorite_radios(&self) -> Result<Vec<Value>> {
        let result =
            self.player_query(&[json!("favorites"), json!("items"), json!(0), json!(99)])?;
        Ok(result
            .get("loop_loop")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Whether the player is currently playing a remote stream.
    pub fn is_playing_remote_stream(&self) -> Result<bool> {
        let result = self.player_query(&[json!("remote"), json!("?")])?;
        Ok(result.get("_remote").and_then(coerce_i64).unwrap_or(0) != 0)
    }

    /// Albums by the given artist.
    pub fn artist_albums(&self, artist_id: u64) -> Result<Vec<Value>> {
        let result = self.player_query(&[
            json!("albums"),
            json!(0),
            json!(99),
            json!("tags:al"),
            json!(format!("artist_id:{}", artist_id)),
        ])?;
        Ok(result
            .get("albums_loop")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Alarms configured on the associated player.
    ///
    /// With `enabled_only` the server-side filter is applied, and the call
    /// short-circuits to an empty result when the player has alarms turned
    /// off entirely.
    pub fn alarms(&self, enabled_only: bool) -> Result<Value> {
        let filter = if enabled_only {
            if self.player_pref("alarmsEnabled")? == "0" {
                return Ok(Value::Object(Map::new()));
            }
            "enabled"
        } else {
            "all"
        };
        self.player_query(&[
            json!("alarms"),
            json!(0),
            json!(99),
            json!(format!("filter:{}", filter)),
        ])
    }

    /// The soonest enabled alarm that fires today, if any.
    ///
    /// Requires a configured player id.
    pub fn next_alarm(&self) -> Result<Option<NextAlarm>> {
        self.require_player_id()?;

        let alarms = self.alarms(true)?;
        if alarms.get("count").and_then(coerce_i64).unwrap_or(0) == 0 {
            return Ok(None);
        }

        let now = Local::now();
        // The server encodes days-of-week with 0 = Sunday.
        let today = now.weekday().num_days_from_sunday().to_string();
        let current_secs = i64::from(now.num_seconds_from_midnight());

        let mut next: Option<NextAlarm> = None;
        if let Some(items) = alarms.get("alarms_loop").and_then(Value::as_array) {
            for alarm in items {
                let dow = alarm.get("dow").and_then(Value::as_str).unwrap_or("");
                if !dow.split(',').any(|d| d.trim() == today) {
                    continue;
                }

                let alarm_time = alarm.get("time").and_then(coerce_i64).unwrap_or(0);
                let delta = alarm_time - current_secs;
                let closer = next.map(|n| delta < n.delta).unwrap_or(true);
                if closer {
                    next = Some(NextAlarm { alarm_time, delta });
                }
            }
        }

        Ok(next)
    }

    /// Read a player preference value.
    pub fn player_pref(&self, pref: &str) -> Result<String> {
        let result = self.player_query(&[json!("playerpref"), json!(pref), json!("?")])?;
        Ok(text_field(&result, "_p2"))
    }

    /// Write a player preference value.
    pub fn set_player_pref(&self, pref: &str, value: &str) -> Result<Value> {
        self.player_query(&[json!("playerpref"), json!(pref), json!(value)])
    }

    /// Show two lines of text on the associated player's display.
    pub fn display(&self, line1: &str, line2: &str, duration_secs: u32) -> Result<Value> {
        self.player_query(&[
            json!("display"),
            json!(line1),
            json!(line2),
            json!(duration_secs),
        ])
    }

    /// Show two lines of text on every connected player's display.
    pub fn display_all(&self, line1: &str, line2: &str, duration_secs: u32) -> Result<()> {
        for player in self.players()? {
            debug!(player = %player.name, "sending display text");
            self.query(
                &player.playerid,
                &[
                    json!("display"),
                    json!(line1),
                    json!(line2),
                    json!(duration_secs),
                ],
            )?;
        }
        Ok(())
    }
}

/// Extract a string-ish field, coercing numbers, defaulting to empty.
fn text_field(result: &Value, key: &str) -> String {
    result
        .get(key)
        .and_then(as_plain_string)
        .unwrap_or_default()
}

/// Reduce a full search result to one entity kind, the way callers expect:
/// the count plus the matching loop, or a zero count when the kind is absent.
fn filter_search(result: &Value, kind: &str) -> Value {
    let loop_key = format!("{}_loop", kind);
    let count_key = format!("{}_count", kind);

    let mut response = Map::new();
    match result.get(&loop_key) {
        Some(entries) => {
            let count = result.get(&count_key).cloned().unwrap_or(json!(0));
            response.insert(count_key, count);
            response.insert(loop_key, entries.clone());
        }
        None => {
            response.insert(count_key, json!(0));
        }
    }
    Value::Object(response)
}
