use crate::overlap::resolve_overlaps;
use crate::types::*;
use uuid::Uuid;

/// Splitting and audio detach/link bookkeeping.
impl Timeline {
    /// Split a clip at `split_time_us`. The time must fall strictly inside
    /// the clip's visible interval; a boundary or out-of-range time is a
    /// no-op. The left part keeps the original id, the right part is new.
    /// Neither part inherits mute or link state from the parent. Returns the
    /// (left, right) clip ids.
    pub fn split_clip(&mut self, clip_id: Uuid, split_time_us: TimeUs) -> Option<(Uuid, Uuid)> {
        let (ti, ci) = self.find_clip_location(clip_id)?;
        if self.tracks[ti].locked {
            return None;
        }
        if !self.tracks[ti].clips[ci].contains_interior(split_time_us) {
            return None;
        }

        let original = self.tracks[ti].clips[ci].clone();
        // Offset into the source media where the cut lands.
        let split_point = split_time_us - original.start_us + original.trim_in_us;

        let mut left = original.clone();
        left.trim_out_us = original.source_duration_us - split_point;
        left.reset_audio_links();

        let mut right = original.clone();
        right.id = Uuid::new_v4();
        right.start_us = split_time_us;
        right.trim_in_us = split_point;
        right.trim_out_us = original.trim_out_us;
        right.reset_audio_links();

        let right_id = right.id;
        self.tracks[ti].clips[ci] = left;
        self.tracks[ti].clips.insert(ci + 1, right);
        resolve_overlaps(&mut self.tracks[ti]);

        // The cut point is the new boundary: an end-edge transition now
        // belongs to the right part, and the right part keeps the parent's
        // look by copying its effects entry.
        for transition in &mut self.transitions {
            if transition.clip_id == clip_id && transition.edge == TransitionEdge::End {
                transition.clip_id = right_id;
            }
        }
        if let Some(effects) = self.effects.get(&clip_id).cloned() {
            self.effects.insert(right_id, effects);
        }

        // The parent's link partner, if any, no longer has a valid target.
        if let Some(audio_id) = original.detached_audio_id {
            if let Some((ati, aci)) = self.find_clip_location(audio_id) {
                self.tracks[ati].clips[aci].linked_video_id = None;
            }
        }
        if let Some(video_id) = original.linked_video_id {
            if let Some((vti, vci)) = self.find_clip_location(video_id) {
                let video = &mut self.tracks[vti].clips[vci];
                video.audio_muted = true;
                video.detached_audio_id = None;
            }
        }

        Some((clip_id, right_id))
    }

    /// Detach the audio of a video clip into an independent audio clip on
    /// the first unlocked audio track (created when none exists). The copy
    /// shares the media reference, start time and trim bounds, and the two
    /// clips are linked both ways. The video keeps its own audio; the copy
    /// exists for separate volume and mute control.
    ///
    /// A stale `detached_audio_id` pointing at a clip that no longer exists
    /// is cleared and the detach proceeds; a live link makes this a no-op.
    pub fn detach_audio(&mut self, video_clip_id: Uuid) -> Option<Uuid> {
        let (ti, ci) = self.find_clip_location(video_clip_id)?;
        if self.tracks[ti].kind != TrackKind::Video || self.tracks[ti].locked {
            return None;
        }

        if let Some(existing) = self.tracks[ti].clips[ci].detached_audio_id {
            if self.find_clip(existing).is_some() {
                return None;
            }
            self.tracks[ti].clips[ci].detached_audio_id = None;
        }

        let video = self.tracks[ti].clips[ci].clone();
        let audio_track_id = match self
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Audio && !t.locked)
        {
            Some(track) => track.id,
            None => self.add_track(TrackKind::Audio),
        };

        let mut audio = Clip::new(
            video.asset_id,
            audio_track_id,
            format!("{} (audio)", video.name),
            video.start_us,
            video.source_duration_us,
        );
        audio.trim_in_us = video.trim_in_us;
        audio.trim_out_us = video.trim_out_us;
        audio.linked_video_id = Some(video_clip_id);
        let audio_id = audio.id;

        let ati = self.tracks.iter().position(|t| t.id == audio_track_id)?;
        self.tracks[ati].clips.push(audio);
        self.tracks[ati].clips.sort_by_key(|c| c.start_us);
        resolve_overlaps(&mut self.tracks[ati]);

        let video = &mut self.tracks[ti].clips[ci];
        video.detached_audio_id = Some(audio_id);
        video.audio_muted = false;

        Some(audio_id)
    }
}
