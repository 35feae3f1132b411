use anyhow::Result;
use log::warn;

use super::builder::Pose;
use crate::error::SpineshotError;
use crate::runtime::{AnimationState, Skeleton, SkeletonSummary};

/// What track 0 currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Track {
    /// No animation; the pose is whatever the skin left
    Cleared,
    /// Animation queued at time 0, not yet applied
    Set { name: String, duration: f32 },
    /// Pose reflects `name` sampled at `time`
    Applied { name: String, time: f32 },
}

/// Time in seconds of a 0-based frame index, clamped to the animation length.
///
/// Negative frames sample time 0.
#[allow(clippy::cast_precision_loss)]
pub fn frame_time(frame: i32, fps: f32, duration: f32) -> f32 {
    let time = frame.max(0) as f32 * (1.0 / fps);
    time.min(duration.max(0.0))
}

/// Samples named animations onto a pose at absolute times.
///
/// Every sample starts from a cleared track, so nothing mixes in from a
/// previously applied animation.
pub struct Animator<A: AnimationState> {
    state: A,
    track: Track,
}

impl<A: AnimationState> Animator<A> {
    pub fn new(state: A) -> Self {
        Self {
            state,
            track: Track::Cleared,
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn clear_tracks(&mut self) {
        self.state.clear_tracks();
        self.track = Track::Cleared;
    }

    /// Clear the track and queue `name` without looping.
    ///
    /// Unknown names are logged and leave the track cleared; returns whether
    /// the animation was set.
    pub fn set_animation(&mut self, name: &str, summary: &SkeletonSummary) -> Result<bool> {
        self.clear_tracks();

        let Some(animation) = summary.animation(name) else {
            warn!(
                "Animation '{}' not found. Available animations: {}",
                name,
                summary.animation_names().join(", ")
            );
            return Ok(false);
        };

        self.state.set_animation(name, false)?;
        self.track = Track::Set {
            name: name.to_string(),
            duration: animation.duration,
        };
        Ok(true)
    }

    /// Apply the queued animation at `frame` onto `pose`.
    ///
    /// The pose is reset to its setup pose first, then the track is advanced
    /// by the absolute frame time in a single step.
    pub fn apply_frame<S>(&mut self, frame: i32, fps: f32, pose: &mut Pose<S>) -> Result<f32>
    where
        S: Skeleton,
        A: AnimationState<Skeleton = S>,
    {
        let (name, duration) = match &self.track {
            Track::Set { name, duration } => (name.clone(), *duration),
            Track::Cleared => {
                return Err(SpineshotError::Rendering(
                    "no animation set on track 0".to_string(),
                )
                .into());
            }
            Track::Applied { name, .. } => {
                return Err(SpineshotError::Rendering(format!(
                    "animation '{name}' was already applied; set it again before sampling"
                ))
                .into());
            }
        };

        let time = frame_time(frame, fps, duration);
        self.state.update(time);
        pose.set_to_setup_pose();
        self.state.apply(pose.skeleton_mut());
        self.track = Track::Applied { name, time };
        Ok(time)
    }
}
