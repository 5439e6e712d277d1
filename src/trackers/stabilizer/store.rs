use crate::trackers::stabilizer::options::MatchingPolicy;
use crate::trackers::stabilizer::track::TrackedObject;
use crate::utils::bbox::EdgeBox;
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Tracks grouped by identity key.
///
/// A key maps to an ordered collection because several physical symbols may carry the same
/// value in one frame. The order inside a collection is the insertion order and is the
/// tie-break order for matching.
///
#[derive(Debug, Default, Clone)]
pub struct KeyedTracks {
    tracks: HashMap<String, Vec<TrackedObject>>,
}

impl KeyedTracks {
    pub fn insert(&mut self, track: TrackedObject) {
        self.tracks
            .entry(track.key().to_string())
            .or_default()
            .push(track);
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.tracks.get(key).map_or(false, |v| !v.is_empty())
    }

    /// Tracks for the key in insertion order
    ///
    pub fn get(&self, key: &str) -> &[TrackedObject] {
        self.tracks.get(key).map_or(&[], |v| v.as_slice())
    }

    /// Removes and returns the track of `key` selected for `bbox` by the policy.
    ///
    /// A removed track can not be selected again, so every track is claimed at most once.
    ///
    pub fn claim(
        &mut self,
        key: &str,
        bbox: &EdgeBox,
        threshold: f32,
        policy: MatchingPolicy,
    ) -> Option<TrackedObject> {
        let candidates = self.tracks.get_mut(key)?;
        let close = candidates
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_close_to(bbox, threshold));

        let pos = match policy {
            MatchingPolicy::FirstMatch => close.map(|(i, _)| i).next(),
            MatchingPolicy::Nearest => close
                .map(|(i, t)| (i, t.current_rect().manhattan_delta(bbox)))
                .min_by(|(_, l), (_, r)| l.partial_cmp(r).unwrap_or(Ordering::Equal))
                .map(|(i, _)| i),
        }?;

        let track = candidates.remove(pos);
        if candidates.is_empty() {
            self.tracks.remove(key);
        }
        Some(track)
    }

    pub fn len(&self) -> usize {
        self.tracks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All tracks ordered by track id, which is the creation order
    ///
    pub fn iter(&self) -> impl Iterator<Item = &TrackedObject> {
        self.tracks
            .values()
            .flatten()
            .sorted_by_key(|t| t.id())
    }

    /// Removes all tracks, ordered by track id
    ///
    pub fn drain(&mut self) -> impl Iterator<Item = TrackedObject> {
        let tracks = std::mem::take(&mut self.tracks);
        tracks.into_values().flatten().sorted_by_key(|t| t.id())
    }

    pub fn instance_counts(&self) -> HashMap<String, usize> {
        self.tracks
            .values()
            .flatten()
            .map(|t| t.key().to_string())
            .counts()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
