use crate::error::{CoreError, Result};
use crate::types::*;
use uuid::Uuid;

/// An edit expressed against an immutable snapshot: `apply` never touches
/// the input, it returns the successor timeline. Commands therefore cannot
/// race with a compiler pass reading an older snapshot.
pub trait Command {
    fn apply(&self, timeline: &Timeline) -> Timeline;
    fn description(&self) -> String;
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Undo/redo stacks holding whole timeline snapshots. A command that
/// changes nothing (stale ids, locked tracks) is suppressed entirely so
/// undo never replays a no-op.
pub struct History {
    undo_stack: Vec<(Timeline, String)>,
    redo_stack: Vec<(Timeline, String)>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size,
        }
    }

    /// Apply a command to the timeline. Returns false when the command was
    /// a no-op; otherwise the prior snapshot is pushed for undo and the
    /// redo stack is cleared.
    pub fn execute(&mut self, timeline: &mut Timeline, command: &dyn Command) -> bool {
        let next = command.apply(timeline);
        if next == *timeline {
            return false;
        }

        self.undo_stack
            .push((timeline.clone(), command.description()));
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        *timeline = next;
        true
    }

    /// Restore the snapshot preceding the last command. Returns the undone
    /// command's description.
    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<String> {
        let (snapshot, description) = self.undo_stack.pop().ok_or(CoreError::NothingToUndo)?;
        self.redo_stack
            .push((timeline.clone(), description.clone()));
        *timeline = snapshot;
        Ok(description)
    }

    /// Reinstate the snapshot undone last. Returns the redone command's
    /// description.
    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<String> {
        let (snapshot, description) = self.redo_stack.pop().ok_or(CoreError::NothingToRedo)?;
        self.undo_stack
            .push((timeline.clone(), description.clone()));
        *timeline = snapshot;
        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|(_, d)| d.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|(_, d)| d.as_str())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub struct AddClip {
    pub track_id: Uuid,
    pub clip: Clip,
}

impl Command for AddClip {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.add_clip(self.track_id, self.clip.clone());
        next
    }

    fn description(&self) -> String {
        format!("Add clip '{}'", self.clip.name)
    }
}

pub struct RemoveClip {
    pub clip_id: Uuid,
}

impl Command for RemoveClip {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.remove_clip(self.clip_id);
        next
    }

    fn description(&self) -> String {
        "Remove clip".to_string()
    }
}

pub struct MoveClip {
    pub clip_id: Uuid,
    pub new_start_us: TimeUs,
}

impl Command for MoveClip {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.move_clip(self.clip_id, self.new_start_us);
        next
    }

    fn description(&self) -> String {
        "Move clip".to_string()
    }
}

pub struct TrimClipIn {
    pub clip_id: Uuid,
    pub trim_in_us: TimeUs,
}

impl Command for TrimClipIn {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.trim_clip_in(self.clip_id, self.trim_in_us);
        next
    }

    fn description(&self) -> String {
        "Trim clip start".to_string()
    }
}

pub struct TrimClipOut {
    pub clip_id: Uuid,
    pub trim_out_us: TimeUs,
}

impl Command for TrimClipOut {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.trim_clip_out(self.clip_id, self.trim_out_us);
        next
    }

    fn description(&self) -> String {
        "Trim clip end".to_string()
    }
}

pub struct ResizeClip {
    pub clip_id: Uuid,
    pub visible_us: TimeUs,
}

impl Command for ResizeClip {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.resize_clip(self.clip_id, self.visible_us);
        next
    }

    fn description(&self) -> String {
        "Resize clip".to_string()
    }
}

pub struct SplitClip {
    pub clip_id: Uuid,
    pub split_time_us: TimeUs,
}

impl Command for SplitClip {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.split_clip(self.clip_id, self.split_time_us);
        next
    }

    fn description(&self) -> String {
        "Split clip".to_string()
    }
}

pub struct DetachAudio {
    pub clip_id: Uuid,
}

impl Command for DetachAudio {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.detach_audio(self.clip_id);
        next
    }

    fn description(&self) -> String {
        "Detach audio".to_string()
    }
}

pub struct AddTrack {
    pub kind: TrackKind,
}

impl Command for AddTrack {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.add_track(self.kind);
        next
    }

    fn description(&self) -> String {
        format!("Add {:?} track", self.kind)
    }
}

pub struct RemoveTrack {
    pub track_id: Uuid,
}

impl Command for RemoveTrack {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.remove_track(self.track_id);
        next
    }

    fn description(&self) -> String {
        "Remove track".to_string()
    }
}

pub struct AddOverlay {
    pub overlay: TextOverlay,
}

impl Command for AddOverlay {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.add_overlay(self.overlay.clone());
        next
    }

    fn description(&self) -> String {
        "Add text".to_string()
    }
}

pub struct RemoveOverlay {
    pub overlay_id: Uuid,
}

impl Command for RemoveOverlay {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.remove_overlay(self.overlay_id);
        next
    }

    fn description(&self) -> String {
        "Remove text".to_string()
    }
}

pub struct MoveOverlay {
    pub overlay_id: Uuid,
    pub new_start_us: TimeUs,
}

impl Command for MoveOverlay {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.move_overlay(self.overlay_id, self.new_start_us);
        next
    }

    fn description(&self) -> String {
        "Move text".to_string()
    }
}

pub struct SetTransition {
    pub clip_id: Uuid,
    pub edge: TransitionEdge,
    pub kind: TransitionKind,
    pub duration_us: TimeUs,
}

impl Command for SetTransition {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.set_transition(self.clip_id, self.edge, self.kind, self.duration_us);
        next
    }

    fn description(&self) -> String {
        format!("Set {:?} transition", self.kind)
    }
}

pub struct RemoveTransition {
    pub clip_id: Uuid,
    pub edge: TransitionEdge,
}

impl Command for RemoveTransition {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.remove_transition(self.clip_id, self.edge);
        next
    }

    fn description(&self) -> String {
        "Remove transition".to_string()
    }
}

pub struct SetEffects {
    pub clip_id: Uuid,
    pub effects: ClipEffects,
}

impl Command for SetEffects {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.set_effects(self.clip_id, self.effects.clone());
        next
    }

    fn description(&self) -> String {
        "Adjust effects".to_string()
    }
}

pub struct ClearEffects {
    pub clip_id: Uuid,
}

impl Command for ClearEffects {
    fn apply(&self, timeline: &Timeline) -> Timeline {
        let mut next = timeline.clone();
        next.clear_effects(self.clip_id);
        next
    }

    fn description(&self) -> String {
        "Clear effects".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn empty_timeline() -> Timeline {
        Timeline {
            tracks: vec![],
            overlays: vec![],
            transitions: vec![],
            effects: HashMap::new(),
        }
    }

    fn make_clip(track_id: Uuid, start_us: i64, duration_us: i64) -> Clip {
        Clip::new(
            Uuid::new_v4(),
            track_id,
            "clip",
            TimeUs(start_us),
            TimeUs(duration_us),
        )
    }

    fn seeded() -> (Timeline, Uuid, Uuid) {
        let mut tl = empty_timeline();
        let track_id = tl.add_track(TrackKind::Video);
        let clip = make_clip(track_id, 0, 5_000_000);
        let clip_id = clip.id;
        tl.add_clip(track_id, clip).unwrap();
        (tl, track_id, clip_id)
    }

    // -----------------------------------------------------------------------
    // execute / undo / redo
    // -----------------------------------------------------------------------

    #[test]
    fn undo_restores_prior_snapshot() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::default();

        assert!(history.execute(&mut tl, &MoveClip { clip_id, new_start_us: TimeUs(8_000_000) }));
        assert_eq!(tl.find_clip(clip_id).unwrap().start_us, TimeUs(8_000_000));

        let description = history.undo(&mut tl).unwrap();
        assert_eq!(description, "Move clip");
        assert_eq!(tl.find_clip(clip_id).unwrap().start_us, TimeUs(0));
    }

    #[test]
    fn redo_reinstates_with_identical_ids() {
        let (mut tl, track_id, _) = seeded();
        let mut history = History::default();

        let clip = make_clip(track_id, 6_000_000, 2_000_000);
        let added_id = clip.id;
        history.execute(&mut tl, &AddClip { track_id, clip });
        history.undo(&mut tl).unwrap();
        assert!(tl.find_clip(added_id).is_none());

        history.redo(&mut tl).unwrap();
        assert!(tl.find_clip(added_id).is_some());
    }

    #[test]
    fn execute_clears_redo() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::default();

        history.execute(&mut tl, &MoveClip { clip_id, new_start_us: TimeUs(8_000_000) });
        history.undo(&mut tl).unwrap();
        assert!(history.can_redo());

        history.execute(&mut tl, &MoveClip { clip_id, new_start_us: TimeUs(3_000_000) });
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_on_empty_history_errors() {
        let (mut tl, _, _) = seeded();
        let mut history = History::default();

        assert!(matches!(history.undo(&mut tl), Err(CoreError::NothingToUndo)));
        assert!(matches!(history.redo(&mut tl), Err(CoreError::NothingToRedo)));
    }

    #[test]
    fn noop_commands_are_suppressed() {
        let (mut tl, _, _) = seeded();
        let mut history = History::default();

        // Stale id: the mutation does nothing, so nothing is recorded.
        assert!(!history.execute(&mut tl, &RemoveClip { clip_id: Uuid::new_v4() }));
        assert!(!history.can_undo());
    }

    #[test]
    fn noop_does_not_clear_redo() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::default();

        history.execute(&mut tl, &MoveClip { clip_id, new_start_us: TimeUs(8_000_000) });
        history.undo(&mut tl).unwrap();
        history.execute(&mut tl, &RemoveClip { clip_id: Uuid::new_v4() });
        assert!(history.can_redo());
    }

    #[test]
    fn history_is_bounded() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::new(3);

        for i in 1..=5 {
            history.execute(&mut tl, &MoveClip {
                clip_id,
                new_start_us: TimeUs(i * 1_000_000),
            });
        }

        let mut undone = 0;
        while history.can_undo() {
            history.undo(&mut tl).unwrap();
            undone += 1;
        }
        assert_eq!(undone, 3);
        // Oldest snapshots were evicted; we land on step 2, not the origin.
        assert_eq!(tl.find_clip(clip_id).unwrap().start_us, TimeUs(2_000_000));
    }

    #[test]
    fn descriptions_are_exposed() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::default();

        history.execute(&mut tl, &SplitClip { clip_id, split_time_us: TimeUs(2_000_000) });
        assert_eq!(history.undo_description(), Some("Split clip"));

        history.undo(&mut tl).unwrap();
        assert_eq!(history.redo_description(), Some("Split clip"));
    }

    #[test]
    fn split_undo_restores_single_clip() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::default();

        history.execute(&mut tl, &SplitClip { clip_id, split_time_us: TimeUs(2_000_000) });
        assert_eq!(tl.tracks[0].clips.len(), 2);

        history.undo(&mut tl).unwrap();
        assert_eq!(tl.tracks[0].clips.len(), 1);
        assert_eq!(tl.tracks[0].clips[0].visible_duration_us(), TimeUs(5_000_000));
    }

    #[test]
    fn detach_undo_removes_audio_track_and_link() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::default();

        history.execute(&mut tl, &DetachAudio { clip_id });
        assert_eq!(tl.tracks.len(), 2);

        history.undo(&mut tl).unwrap();
        assert_eq!(tl.tracks.len(), 1);
        assert_eq!(tl.find_clip(clip_id).unwrap().detached_audio_id, None);
    }

    #[test]
    fn clear_drops_both_stacks() {
        let (mut tl, _, clip_id) = seeded();
        let mut history = History::default();

        history.execute(&mut tl, &MoveClip { clip_id, new_start_us: TimeUs(1_000_000) });
        history.undo(&mut tl).unwrap();
        history.clear();

        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
