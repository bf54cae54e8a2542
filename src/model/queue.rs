//! Play queue and the "what plays next" policy.

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::config::ShuffleMode;
use super::content::Track;

/// Past this point "previous" restarts the current track instead.
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;

/// Index that follows `current`, wrapping only when `repeat` is on.
pub fn next_index(current: usize, len: usize, repeat: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    if current + 1 < len {
        Some(current + 1)
    } else if repeat {
        Some(0)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviousStep {
    /// Seek the current track back to 0, queue untouched.
    Restart,
    Move(usize),
}

/// What "previous" means given how far into the track playback is.
pub fn previous_step(current: usize, len: usize, elapsed_secs: f64) -> Option<PreviousStep> {
    if len == 0 {
        return None;
    }
    if elapsed_secs > RESTART_THRESHOLD_SECS {
        return Some(PreviousStep::Restart);
    }
    let index = if current == 0 { len - 1 } else { (current - 1).min(len - 1) };
    Some(PreviousStep::Move(index))
}

/// Ordered play queue with the current position and the shuffle/repeat modes.
///
/// `index` is `None` exactly when nothing is selected; otherwise it is a
/// valid position in `tracks`.
#[derive(Debug, Clone)]
pub struct QueueController {
    tracks: Vec<Track>,
    index: Option<usize>,
    shuffle: bool,
    repeat: bool,
    shuffle_mode: ShuffleMode,
    /// Order before a permuting shuffle, for restoring.
    original: Vec<Track>,
}

impl QueueController {
    pub fn new(shuffle_mode: ShuffleMode) -> Self {
        Self {
            tracks: Vec::new(),
            index: None,
            shuffle: false,
            repeat: false,
            shuffle_mode,
            original: Vec::new(),
        }
    }

    /// Replace the queue and select `start`. Returns the selected track.
    pub fn replace(&mut self, tracks: Vec<Track>, start: usize) -> Option<&Track> {
        self.original.clone_from(&tracks);
        self.tracks = tracks;
        self.index = (start < self.tracks.len()).then_some(start);

        if self.shuffle && self.shuffle_mode == ShuffleMode::Permute {
            self.permute();
        }
        self.current()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.original.clear();
        self.index = None;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<&Track> {
        self.index.and_then(|i| self.tracks.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Decide the next index without moving.
    pub fn peek_next(&self) -> Option<usize> {
        let current = self.index?;
        next_index(current, self.tracks.len(), self.repeat)
    }

    /// Decide what "previous" does without moving.
    pub fn peek_previous(&self, elapsed_secs: f64) -> Option<PreviousStep> {
        let current = self.index?;
        previous_step(current, self.tracks.len(), elapsed_secs)
    }

    /// Select `index`. Out of range indices are ignored.
    pub fn jump_to(&mut self, index: usize) -> Option<&Track> {
        if index < self.tracks.len() {
            self.index = Some(index);
        }
        self.current()
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn shuffle_mode(&self) -> ShuffleMode {
        self.shuffle_mode
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    /// Flip the shuffle flag. With [`ShuffleMode::Indicator`] the queue order
    /// is left alone.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;

        if self.shuffle_mode == ShuffleMode::Permute {
            if self.shuffle {
                self.original.clone_from(&self.tracks);
                self.permute();
            } else {
                self.restore_order();
            }
        }
        self.shuffle
    }

    /// Current track first, every other track in random order after it.
    fn permute(&mut self) {
        let mut rng = thread_rng();
        match self.index.filter(|&i| i < self.tracks.len()) {
            Some(current) => {
                let playing = self.tracks.remove(current);
                self.tracks.shuffle(&mut rng);
                self.tracks.insert(0, playing);
                self.index = Some(0);
            }
            None => self.tracks.shuffle(&mut rng),
        }
    }

    fn restore_order(&mut self) {
        let current_id = self.current().map(|t| t.id);
        self.tracks = std::mem::take(&mut self.original);
        self.original.clone_from(&self.tracks);
        self.index = match current_id {
            Some(id) => self.tracks.iter().position(|t| t.id == id),
            None => None,
        };
    }
}

impl Default for QueueController {
    fn default() -> Self {
        Self::new(ShuffleMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::TrackId;
    use proptest::prelude::*;

    fn track(id: i64) -> Track {
        Track {
            id: TrackId(id),
            title: Some(format!("Track {}", id)),
            artist: None,
            album: None,
            duration: Some(180.0),
            favorite: false,
            cover_art: None,
            play_count: None,
            date_added: None,
        }
    }

    fn ids(queue: &QueueController) -> Vec<i64> {
        queue.tracks().iter().map(|t| t.id.0).collect()
    }

    proptest! {
        #[test]
        fn next_without_repeat_stops_at_the_end(len in 1usize..200, seed in 0usize..200) {
            let i = seed % len;
            let expected = if i + 1 < len { Some(i + 1) } else { None };
            prop_assert_eq!(next_index(i, len, false), expected);
        }

        #[test]
        fn next_with_repeat_wraps_to_start(len in 1usize..200, seed in 0usize..200) {
            let i = seed % len;
            let expected = if i + 1 < len { i + 1 } else { 0 };
            prop_assert_eq!(next_index(i, len, true), Some(expected));
        }

        #[test]
        fn previous_within_threshold_moves_back(
            len in 1usize..200,
            seed in 0usize..200,
            elapsed in 0.0f64..=3.0,
        ) {
            let i = seed % len;
            prop_assert_eq!(
                previous_step(i, len, elapsed),
                Some(PreviousStep::Move((i + len - 1) % len))
            );
        }

        #[test]
        fn previous_past_threshold_restarts(
            len in 1usize..200,
            seed in 0usize..200,
            elapsed in 3.001f64..10_000.0,
        ) {
            prop_assert_eq!(previous_step(seed % len, len, elapsed), Some(PreviousStep::Restart));
        }

        #[test]
        fn permuting_shuffle_keeps_every_track(len in 1i64..40, start_seed in 0usize..40) {
            let tracks: Vec<Track> = (0..len).map(track).collect();
            let start = start_seed % tracks.len();
            let mut queue = QueueController::new(ShuffleMode::Permute);
            queue.replace(tracks, start);

            queue.toggle_shuffle();
            let mut shuffled = ids(&queue);
            prop_assert_eq!(queue.current().map(|t| t.id.0), Some(start as i64));
            prop_assert_eq!(queue.index(), Some(0));

            shuffled.sort();
            prop_assert_eq!(shuffled, (0..len).collect::<Vec<_>>());
        }
    }

    #[test]
    fn empty_queue_has_no_next_or_previous() {
        let queue = QueueController::default();
        assert_eq!(queue.peek_next(), None);
        assert_eq!(queue.peek_previous(0.0), None);
        assert_eq!(next_index(0, 0, true), None);
        assert_eq!(previous_step(0, 0, 10.0), None);
    }

    #[test]
    fn replace_selects_start_or_nothing() {
        let mut queue = QueueController::default();
        assert_eq!(queue.replace(vec![track(1), track(2)], 1).map(|t| t.id), Some(TrackId(2)));
        assert_eq!(queue.index(), Some(1));

        assert!(queue.replace(vec![track(1)], 5).is_none());
        assert_eq!(queue.index(), None);
    }

    #[test]
    fn indicator_shuffle_leaves_order_alone() {
        let mut queue = QueueController::new(ShuffleMode::Indicator);
        queue.replace((0..20).map(track).collect(), 4);

        assert!(queue.toggle_shuffle());
        assert_eq!(ids(&queue), (0..20).collect::<Vec<_>>());
        assert_eq!(queue.index(), Some(4));
    }

    #[test]
    fn turning_permute_shuffle_off_restores_order() {
        let mut queue = QueueController::new(ShuffleMode::Permute);
        queue.replace((0..20).map(track).collect(), 7);

        queue.toggle_shuffle();
        queue.jump_to(3);
        let playing = queue.current().map(|t| t.id).unwrap();

        assert!(!queue.toggle_shuffle());
        assert_eq!(ids(&queue), (0..20).collect::<Vec<_>>());
        assert_eq!(queue.current().map(|t| t.id), Some(playing));
    }

    #[test]
    fn repeat_toggles() {
        let mut queue = QueueController::default();
        assert!(queue.toggle_repeat());
        assert!(!queue.toggle_repeat());
    }
}
