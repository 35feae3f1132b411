use anyhow::Result;
use log::warn;

use crate::runtime::{DrawBatch, Skeleton, SkeletonSummary};

/// A skeleton instance that tracks whether its world transform is current.
///
/// Every mutation marks the pose stale; the transform is recomputed before
/// the pose is drawn, so a stale transform never reaches the renderer.
pub struct Pose<S: Skeleton> {
    skeleton: S,
    stale: bool,
    skin: Option<String>,
}

impl<S: Skeleton> Pose<S> {
    /// Wrap a freshly created skeleton, which starts in the setup pose.
    pub fn new(skeleton: S) -> Self {
        Self {
            skeleton,
            stale: true,
            skin: None,
        }
    }

    /// Skin currently applied, `None` for the setup-pose skin.
    pub fn skin(&self) -> Option<&str> {
        self.skin.as_deref()
    }

    /// Apply `requested`, or go back to the setup-pose skin when it is empty
    /// or absent. Unknown names are logged and leave the setup-pose skin.
    ///
    /// Returns the skin that is active afterwards.
    pub fn apply_skin(
        &mut self,
        requested: Option<&str>,
        summary: &SkeletonSummary,
    ) -> Result<Option<&str>> {
        let requested = requested.filter(|name| !name.is_empty());

        let target = match requested {
            Some(name) if summary.skin(name).is_some() => Some(name),
            Some(name) => {
                warn!(
                    "Skin '{}' not found. Available skins: {}",
                    name,
                    summary.skin_names().join(", ")
                );
                None
            }
            None => None,
        };

        match target {
            Some(name) => {
                self.skeleton.set_skin(Some(name))?;
                self.skin = Some(name.to_string());
            }
            None if self.skin.is_some() => {
                self.skeleton.set_skin(None)?;
                self.skin = None;
            }
            None => {}
        }
        // Attachments of the previous skin stay in their slots otherwise
        self.skeleton.set_slots_to_setup_pose();
        self.stale = true;

        Ok(self.skin())
    }

    pub fn set_to_setup_pose(&mut self) {
        self.skeleton.set_to_setup_pose();
        self.stale = true;
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.skeleton.set_position(x, y);
        self.stale = true;
    }

    /// Mutable access to the skeleton; marks the pose stale.
    pub fn skeleton_mut(&mut self) -> &mut S {
        self.stale = true;
        &mut self.skeleton
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Recompute world transforms if anything changed since the last refresh.
    pub fn refresh(&mut self) {
        if self.stale {
            self.skeleton.update_world_transform();
            self.stale = false;
        }
    }

    /// Geometry for the current pose, refreshing first.
    pub fn draw_batches(&mut self) -> Result<Vec<DrawBatch>> {
        self.refresh();
        self.skeleton.draw_batches()
    }
}
