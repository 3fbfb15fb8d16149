use crate::overlap::{find_open_position, resolve_overlaps, OVERLAP_EPSILON_US};
use crate::types::*;
use uuid::Uuid;

/// Timeline mutators.
///
/// Every mutator is total: a missing clip, track or overlay makes the call a
/// no-op instead of an error, because the UI may race ahead of the model.
/// Return values (`Option`/`bool`) tell the caller whether anything changed.
/// After any geometry change the affected track is re-compacted so the
/// no-overlap invariant holds unconditionally.
impl Timeline {
    // -----------------------------------------------------------------------
    // Lookup helpers
    // -----------------------------------------------------------------------

    pub fn find_track(&self, track_id: Uuid) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn find_clip(&self, clip_id: Uuid) -> Option<&Clip> {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .find(|c| c.id == clip_id)
    }

    /// Find the (track_index, clip_index) for a given clip id.
    pub(crate) fn find_clip_location(&self, clip_id: Uuid) -> Option<(usize, usize)> {
        for (ti, track) in self.tracks.iter().enumerate() {
            for (ci, clip) in track.clips.iter().enumerate() {
                if clip.id == clip_id {
                    return Some((ti, ci));
                }
            }
        }
        None
    }

    /// End of the last clip or overlay on the timeline.
    pub fn total_duration_us(&self) -> TimeUs {
        let clip_end = self
            .tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(|c| c.end_us().0)
            .max()
            .unwrap_or(0);
        let overlay_end = self
            .overlays
            .iter()
            .map(|o| o.end_us().0)
            .max()
            .unwrap_or(0);
        TimeUs(clip_end.max(overlay_end))
    }

    // -----------------------------------------------------------------------
    // Track operations
    // -----------------------------------------------------------------------

    pub fn add_track(&mut self, kind: TrackKind) -> Uuid {
        let track = Track::new(kind);
        let id = track.id;
        self.tracks.push(track);
        id
    }

    /// Remove a track and everything on it. Each removed clip cascades: its
    /// effects entry and transitions go, and any linked counterpart on a
    /// surviving track is desynchronized (videos whose detached audio lived
    /// here are muted; audio clips whose video lived here are orphaned).
    pub fn remove_track(&mut self, track_id: Uuid) -> bool {
        let Some(pos) = self.tracks.iter().position(|t| t.id == track_id) else {
            return false;
        };
        let track = self.tracks.remove(pos);
        for clip in &track.clips {
            self.cascade_clip_removal(clip);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Clip operations
    // -----------------------------------------------------------------------

    /// Place a clip on a track. The clip lands at its own start time when
    /// that slot is free, otherwise at the nearest open position. Returns the
    /// placed start time, or None when the track is missing or locked.
    pub fn add_clip(&mut self, track_id: Uuid, mut clip: Clip) -> Option<TimeUs> {
        let track = self.tracks.iter_mut().find(|t| t.id == track_id)?;
        if track.locked {
            return None;
        }

        let placed = find_open_position(track, clip.start_us, clip.visible_duration_us(), None);
        clip.start_us = placed;
        clip.track_id = track_id;
        track.clips.push(clip);
        track.clips.sort_by_key(|c| c.start_us);
        Some(placed)
    }

    /// Remove a clip by id. Cascades to its effects entry, its transitions,
    /// and the linked counterpart: removing a detached-audio clip mutes its
    /// video; removing a video orphans its surviving detached audio.
    pub fn remove_clip(&mut self, clip_id: Uuid) -> Option<Clip> {
        let (ti, ci) = self.find_clip_location(clip_id)?;
        if self.tracks[ti].locked {
            return None;
        }
        let clip = self.tracks[ti].clips.remove(ci);
        self.cascade_clip_removal(&clip);
        Some(clip)
    }

    /// Move a clip to a new start time, settling at the nearest open
    /// position when the requested one collides. Returns the placed start.
    pub fn move_clip(&mut self, clip_id: Uuid, new_start_us: TimeUs) -> Option<TimeUs> {
        let (ti, ci) = self.find_clip_location(clip_id)?;
        let track = &mut self.tracks[ti];
        if track.locked {
            return None;
        }

        let duration = track.clips[ci].visible_duration_us();
        let placed = find_open_position(track, new_start_us, duration, Some(clip_id));
        track.clips[ci].start_us = placed;
        track.clips.sort_by_key(|c| c.start_us);
        Some(placed)
    }

    /// Set the trim-in offset. The clip's end stays fixed, so its start
    /// shifts by the trim delta. The offset is clamped so the visible
    /// duration never drops below the minimum floor.
    pub fn trim_clip_in(&mut self, clip_id: Uuid, new_trim_in_us: TimeUs) -> bool {
        let Some((ti, ci)) = self.find_clip_location(clip_id) else {
            return false;
        };
        if self.tracks[ti].locked {
            return false;
        }

        let clip = &mut self.tracks[ti].clips[ci];
        let end = clip.end_us();
        let max_in = clip.source_duration_us.0 - clip.trim_out_us.0 - MIN_CLIP_DURATION_US;
        let trim_in = new_trim_in_us.0.clamp(0, max_in.max(0));
        clip.trim_in_us = TimeUs(trim_in);
        clip.start_us = TimeUs(end.0 - clip.visible_duration_us().0);

        resolve_overlaps(&mut self.tracks[ti]);
        true
    }

    /// Set the trim-out offset. The clip's start stays fixed. Clamped like
    /// `trim_clip_in`.
    pub fn trim_clip_out(&mut self, clip_id: Uuid, new_trim_out_us: TimeUs) -> bool {
        let Some((ti, ci)) = self.find_clip_location(clip_id) else {
            return false;
        };
        if self.tracks[ti].locked {
            return false;
        }

        let clip = &mut self.tracks[ti].clips[ci];
        let max_out = clip.source_duration_us.0 - clip.trim_in_us.0 - MIN_CLIP_DURATION_US;
        clip.trim_out_us = TimeUs(new_trim_out_us.0.clamp(0, max_out.max(0)));

        resolve_overlaps(&mut self.tracks[ti]);
        true
    }

    /// Resize a clip by dragging its right edge: the visible duration is
    /// clamped to `[floor, remaining source]` and expressed as a trim-out.
    pub fn resize_clip(&mut self, clip_id: Uuid, new_visible_us: TimeUs) -> bool {
        let Some((ti, ci)) = self.find_clip_location(clip_id) else {
            return false;
        };
        if self.tracks[ti].locked {
            return false;
        }

        let clip = &mut self.tracks[ti].clips[ci];
        let max_visible = clip.source_duration_us.0 - clip.trim_in_us.0;
        let visible = new_visible_us.0.clamp(MIN_CLIP_DURATION_US, max_visible.max(MIN_CLIP_DURATION_US));
        clip.trim_out_us = TimeUs(clip.source_duration_us.0 - clip.trim_in_us.0 - visible);

        resolve_overlaps(&mut self.tracks[ti]);
        true
    }

    // -----------------------------------------------------------------------
    // Text overlay operations
    // -----------------------------------------------------------------------

    /// Add a text overlay. Overlays sharing a track are compacted with the
    /// same left-to-right contract as clips.
    pub fn add_overlay(&mut self, overlay: TextOverlay) -> Uuid {
        let id = overlay.id;
        let track_id = overlay.track_id;
        self.overlays.push(overlay);
        self.compact_overlays(track_id);
        id
    }

    pub fn remove_overlay(&mut self, overlay_id: Uuid) -> bool {
        let Some(pos) = self.overlays.iter().position(|o| o.id == overlay_id) else {
            return false;
        };
        self.overlays.remove(pos);
        true
    }

    pub fn move_overlay(&mut self, overlay_id: Uuid, new_start_us: TimeUs) -> bool {
        let Some(overlay) = self.overlays.iter_mut().find(|o| o.id == overlay_id) else {
            return false;
        };
        overlay.start_us = TimeUs(new_start_us.0.max(0));
        let track_id = overlay.track_id;
        self.compact_overlays(track_id);
        true
    }

    /// Greedy compaction of one text track's overlays, mirroring the clip
    /// resolver: sort by start, push overlapping overlays right.
    fn compact_overlays(&mut self, track_id: Uuid) {
        let mut idx: Vec<usize> = (0..self.overlays.len())
            .filter(|&i| self.overlays[i].track_id == track_id)
            .collect();
        idx.sort_by_key(|&i| self.overlays[i].start_us);

        let mut previous_end = 0i64;
        for i in idx {
            let overlay = &mut self.overlays[i];
            if overlay.start_us.0 < previous_end - OVERLAP_EPSILON_US {
                overlay.start_us = TimeUs(previous_end);
            }
            previous_end = overlay.end_us().0;
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Set the transition for a (clip, edge) pair. An existing entry for the
    /// pair is updated in place and keeps its id; otherwise a new entry is
    /// created. No-op when the clip does not exist. The duration is clamped
    /// to the minimum floor.
    pub fn set_transition(
        &mut self,
        clip_id: Uuid,
        edge: TransitionEdge,
        kind: TransitionKind,
        duration_us: TimeUs,
    ) -> Option<Uuid> {
        self.find_clip(clip_id)?;

        let duration = TimeUs(duration_us.0.max(MIN_CLIP_DURATION_US));
        if let Some(existing) = self
            .transitions
            .iter_mut()
            .find(|t| t.clip_id == clip_id && t.edge == edge)
        {
            existing.kind = kind;
            existing.duration_us = duration;
            return Some(existing.id);
        }

        let transition = Transition {
            id: Uuid::new_v4(),
            clip_id,
            edge,
            kind,
            duration_us: duration,
        };
        let id = transition.id;
        self.transitions.push(transition);
        Some(id)
    }

    pub fn remove_transition(&mut self, clip_id: Uuid, edge: TransitionEdge) -> bool {
        let before = self.transitions.len();
        self.transitions
            .retain(|t| !(t.clip_id == clip_id && t.edge == edge));
        self.transitions.len() != before
    }

    // -----------------------------------------------------------------------
    // Per-clip effects
    // -----------------------------------------------------------------------

    /// Attach color/effect parameters to a clip. No-op when the clip does
    /// not exist, so the side map cannot accumulate dangling entries.
    pub fn set_effects(&mut self, clip_id: Uuid, effects: ClipEffects) -> bool {
        if self.find_clip(clip_id).is_none() {
            return false;
        }
        self.effects.insert(clip_id, effects);
        true
    }

    pub fn clear_effects(&mut self, clip_id: Uuid) -> bool {
        self.effects.remove(&clip_id).is_some()
    }

    // -----------------------------------------------------------------------
    // Removal cascade
    // -----------------------------------------------------------------------

    /// Shared cleanup after a clip leaves the timeline: drop its effects
    /// entry and transitions, then desynchronize the linked counterpart. A
    /// counterpart that no longer exists is silently skipped; stale link
    /// fields never crash a removal.
    fn cascade_clip_removal(&mut self, removed: &Clip) {
        self.effects.remove(&removed.id);
        self.transitions.retain(|t| t.clip_id != removed.id);

        // Removed a video half: orphan its surviving detached audio.
        if let Some(audio_id) = removed.detached_audio_id {
            if let Some((ti, ci)) = self.find_clip_location(audio_id) {
                self.tracks[ti].clips[ci].linked_video_id = None;
            }
        }

        // Removed an audio half: mute the surviving video and clear its link.
        if let Some(video_id) = removed.linked_video_id {
            if let Some((ti, ci)) = self.find_clip_location(video_id) {
                let video = &mut self.tracks[ti].clips[ci];
                video.audio_muted = true;
                video.detached_audio_id = None;
            }
        }
    }
}
