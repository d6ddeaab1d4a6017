//! [`ClimbLocomotion`] – hand-over-hand climbing.
//!
//! While a hand grips a climbable region, the body is moved by the inverse
//! of the hand's displacement each frame: pulling the hand down lifts the
//! body up, keeping the gripping hand fixed in space. One hand drives the
//! session at a time; a second hand entering a region is ignored until the
//! first lets go.
//!
//! Hand positions are read from a [`SpatialPoseSource`] in the configured
//! reference frame. When hands are tracked relative to the body (parented
//! under it), measure them in the body's frame so moving the body does not
//! feed back into the next delta.

use gripworks_hal::LocomotionBody;
use gripworks_perception::{SpatialPoseSource, Vec3};
use gripworks_types::{ActorId, BodyId, GripError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
struct ClimbSession {
    hand: ActorId,
    last_hand_position: Vec3,
}

pub struct ClimbLocomotion {
    body_id: BodyId,
    body: Box<dyn LocomotionBody>,
    reference_frame: String,
    session: Option<ClimbSession>,
}

impl std::fmt::Debug for ClimbLocomotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClimbLocomotion")
            .field("body", &self.body_id)
            .field("reference_frame", &self.reference_frame)
            .field("session", &self.session)
            .finish()
    }
}

impl ClimbLocomotion {
    pub fn new(body: Box<dyn LocomotionBody>, reference_frame: impl Into<String>) -> Self {
        Self {
            body_id: BodyId::from(body.id()),
            body,
            reference_frame: reference_frame.into(),
            session: None,
        }
    }

    pub fn body_id(&self) -> &BodyId {
        &self.body_id
    }

    pub fn body(&self) -> &dyn LocomotionBody {
        self.body.as_ref()
    }

    pub fn reference_frame(&self) -> &str {
        &self.reference_frame
    }

    /// The hand currently driving the climb.
    pub fn engaged_hand(&self) -> Option<&ActorId> {
        self.session.as_ref().map(|s| &s.hand)
    }

    pub fn is_climbing(&self) -> bool {
        self.session.is_some()
    }

    /// `hand`, owned by body `actor`, entered a climbable region.
    ///
    /// Starts a session when `actor` is this body, nothing is engaged yet and
    /// the hand's position is known. Returns whether a session started.
    pub fn on_region_enter(
        &mut self,
        actor: &BodyId,
        hand: &ActorId,
        poses: &dyn SpatialPoseSource,
    ) -> bool {
        if actor != &self.body_id {
            return false;
        }
        if let Some(session) = &self.session {
            debug!(body = %self.body_id, hand = %hand, engaged = %session.hand, "already climbing; grip ignored");
            return false;
        }
        let Some(position) = self.hand_position(hand, poses) else {
            warn!(body = %self.body_id, hand = %hand, frame = %self.reference_frame, "hand pose unavailable; climb not started");
            return false;
        };
        self.session = Some(ClimbSession {
            hand: hand.clone(),
            last_hand_position: position,
        });
        info!(body = %self.body_id, hand = %hand, "climb started");
        true
    }

    /// `hand` left a climbable region. Ends the session only when it is the
    /// engaged hand of this body. Returns whether a session ended.
    pub fn on_region_exit(&mut self, actor: &BodyId, hand: &ActorId) -> bool {
        if actor != &self.body_id || self.engaged_hand() != Some(hand) {
            return false;
        }
        self.session = None;
        info!(body = %self.body_id, hand = %hand, "climb ended");
        true
    }

    /// End the session regardless of which hand holds it.
    pub fn disengage(&mut self) -> Option<ActorId> {
        let hand = self.session.take()?.hand;
        info!(body = %self.body_id, hand = %hand, "climb ended");
        Some(hand)
    }

    /// Move the body opposite to the engaged hand's movement since the last
    /// frame. Returns the displacement applied (zero when idle or when the
    /// hand pose is unavailable this frame).
    pub fn on_frame(&mut self, poses: &dyn SpatialPoseSource) -> Result<Vec3, GripError> {
        let Some(session) = &self.session else {
            return Ok(Vec3::ZERO);
        };
        let Some(now) = self.hand_position(&session.hand, poses) else {
            debug!(body = %self.body_id, hand = %session.hand, "hand pose unavailable; frame skipped");
            return Ok(Vec3::ZERO);
        };
        let displacement = -(now - session.last_hand_position);
        if displacement != Vec3::ZERO {
            self.body.move_by(displacement)?;
        }
        if let Some(session) = &mut self.session {
            session.last_hand_position = now;
        }
        Ok(displacement)
    }

    fn hand_position(&self, hand: &ActorId, poses: &dyn SpatialPoseSource) -> Option<Vec3> {
        poses
            .position(&self.reference_frame, hand.as_str())
            .filter(|p| p.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gripworks_hal::sim::SimBody;
    use gripworks_perception::{PoseGraph, WORLD};

    fn climber() -> ClimbLocomotion {
        ClimbLocomotion::new(Box::new(SimBody::new("player", Vec3::ZERO)), WORLD)
    }

    fn hands_at(left: Vec3, right: Vec3) -> PoseGraph {
        let mut poses = PoseGraph::new();
        poses.set_translation(WORLD, "left_hand", left);
        poses.set_translation(WORLD, "right_hand", right);
        poses
    }

    #[test]
    fn body_moves_opposite_to_hand() {
        let mut climb = climber();
        let body = BodyId::from("player");
        let left = ActorId::from("left_hand");
        let mut poses = hands_at(Vec3::new(0.0, 1.5, 0.3), Vec3::ZERO);

        assert!(climb.on_region_enter(&body, &left, &poses));
        poses.set_translation(WORLD, "left_hand", Vec3::new(0.0, 1.2, 0.3));
        let moved = climb.on_frame(&poses).unwrap();

        assert!(moved.approx_eq(Vec3::new(0.0, 0.3, 0.0), 1e-5));
        assert!(climb.body().position().approx_eq(Vec3::new(0.0, 0.3, 0.0), 1e-5));

        // Holding still moves nothing.
        assert_eq!(climb.on_frame(&poses).unwrap(), Vec3::ZERO);
    }

    #[test]
    fn second_hand_is_ignored_while_engaged() {
        let mut climb = climber();
        let body = BodyId::from("player");
        let left = ActorId::from("left_hand");
        let right = ActorId::from("right_hand");
        let poses = hands_at(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.5, 1.0, 0.0));

        assert!(climb.on_region_enter(&body, &left, &poses));
        assert!(!climb.on_region_enter(&body, &right, &poses));
        assert_eq!(climb.engaged_hand(), Some(&left));

        assert!(!climb.on_region_exit(&body, &right));
        assert!(climb.on_region_exit(&body, &left));
        assert!(!climb.is_climbing());

        assert!(climb.on_region_enter(&body, &right, &poses));
        assert_eq!(climb.engaged_hand(), Some(&right));
    }

    #[test]
    fn other_bodies_are_ignored() {
        let mut climb = climber();
        let poses = hands_at(Vec3::ZERO, Vec3::ZERO);
        let stranger = BodyId::from("npc");
        assert!(!climb.on_region_enter(&stranger, &ActorId::from("left_hand"), &poses));
        assert!(!climb.is_climbing());
    }

    #[test]
    fn missing_pose_skips_frame_without_losing_session() {
        let mut climb = climber();
        let body = BodyId::from("player");
        let left = ActorId::from("left_hand");
        let mut poses = hands_at(Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO);
        climb.on_region_enter(&body, &left, &poses);

        poses.remove(WORLD, "left_hand");
        assert_eq!(climb.on_frame(&poses).unwrap(), Vec3::ZERO);
        assert!(climb.is_climbing());

        poses.set_translation(WORLD, "left_hand", Vec3::new(0.0, 1.0, 0.0));
        let moved = climb.on_frame(&poses).unwrap();
        assert!(moved.approx_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn unknown_hand_pose_refuses_to_start() {
        let mut climb = climber();
        let poses = PoseGraph::new();
        assert!(!climb.on_region_enter(&BodyId::from("player"), &ActorId::from("left_hand"), &poses));
    }

    #[test]
    fn disengage_clears_any_session() {
        let mut climb = climber();
        let poses = hands_at(Vec3::ZERO, Vec3::ZERO);
        climb.on_region_enter(&BodyId::from("player"), &ActorId::from("right_hand"), &poses);
        assert_eq!(climb.disengage(), Some(ActorId::from("right_hand")));
        assert_eq!(climb.disengage(), None);
    }
}
