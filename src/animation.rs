use glam::Vec3;

use crate::bodies::{phase, OrbitingBody};
use crate::camera::{CameraState, PointerOffset};
use crate::config::{MotionConfig, TimeStep};

/// Per-frame placement of one orbiting body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub position: Vec3,
    /// Accumulated rotation about the body's own vertical axis
    pub spin: f32,
}

/// What the renderer needs to draw one frame
#[derive(Debug)]
pub struct Frame<'a> {
    pub time: f64,
    pub galaxy_rotation: f32,
    pub bodies: &'a [OrbitingBody],
    pub poses: &'a [BodyPose],
    pub camera: &'a CameraState,
}

/// Animation state owned by the driver and updated in place every frame
pub struct AnimationState {
    /// Kept in `f64`: a fixed `0.01` step stops registering in `f32` after a few days.
    pub time: f64,
    pub galaxy_rotation: f32,
    pub bodies: Vec<OrbitingBody>,
    pub poses: Vec<BodyPose>,
    pub camera: CameraState,

    time_step: TimeStep,
    rotation_rate: f32,
    spin_factor: f32,
}

impl AnimationState {
    pub fn new(bodies: Vec<OrbitingBody>, camera: CameraState, motion: &MotionConfig) -> Self {
        let poses = bodies
            .iter()
            .map(|b| BodyPose {
                position: b.start_position,
                spin: 0.0,
            })
            .collect();

        Self {
            time: 0.0,
            galaxy_rotation: 0.0,
            bodies,
            poses,
            camera,
            time_step: motion.time_step,
            rotation_rate: motion.rotation_rate,
            spin_factor: motion.spin_factor,
        }
    }

    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    /// Move simulation time forward by one frame and update everything.
    pub fn advance(&mut self, dt: f32, pointer: PointerOffset) -> Frame<'_> {
        let time = self.time + self.time_step.increment(dt);
        self.apply(time, pointer)
    }

    /// Evaluate the frame update at an explicit simulation time.
    ///
    /// Rotation and orbit positions depend only on `time`; body spin and the
    /// camera carry over from the previous call.
    pub fn apply(&mut self, time: f64, pointer: PointerOffset) -> Frame<'_> {
        self.time = time;
        self.galaxy_rotation = phase(time, self.rotation_rate);

        for (body, pose) in self.bodies.iter().zip(self.poses.iter_mut()) {
            pose.position = body.position_at(time);
            pose.spin += body.speed * self.spin_factor;
        }

        self.camera.follow_pointer(pointer);

        self.frame()
    }

    /// Current state without advancing
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            time: self.time,
            galaxy_rotation: self.galaxy_rotation,
            bodies: &self.bodies,
            poses: &self.poses,
            camera: &self.camera,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bodies::generate_bodies;
    use crate::config::{default_bodies, CameraConfig};

    fn state(time_step: TimeStep) -> AnimationState {
        let motion = MotionConfig {
            time_step,
            ..MotionConfig::default()
        };
        AnimationState::new(
            generate_bodies(&default_bodies()),
            CameraState::new(&CameraConfig::default()),
            &motion,
        )
    }

    #[test]
    fn fixed_step_advances_by_constant() {
        let mut anim = state(TimeStep::Fixed(0.01));
        for _ in 0..100 {
            anim.advance(0.5, PointerOffset::default());
        }
        assert!((anim.time - 1.0).abs() < 1e-4);
        assert!((anim.galaxy_rotation - 0.1).abs() < 1e-5);
    }

    #[test]
    fn elapsed_step_follows_frame_duration() {
        let mut anim = state(TimeStep::Elapsed { rate: 0.6 });
        let frame = anim.advance(1.0 / 30.0, PointerOffset::default());
        assert!((frame.time - 0.02).abs() < 1e-6);
    }

    #[test]
    fn orbit_positions_are_periodic() {
        let mut anim = state(TimeStep::default());
        let pointer = PointerOffset::default();
        let t = 12.34;

        for i in 0..anim.bodies.len() {
            let speed = f64::from(anim.bodies[i].speed);
            let before = anim.apply(t, pointer).poses[i].position;
            let after = anim
                .apply(t + std::f64::consts::TAU / speed, pointer)
                .poses[i]
                .position;
            assert!(
                before.distance(after) < 1e-2,
                "body {}: {:?} vs {:?}",
                i,
                before,
                after
            );
        }
    }

    #[test]
    fn orbit_position_is_independent_of_history() {
        let mut stepped = state(TimeStep::Fixed(0.01));
        for _ in 0..500 {
            stepped.advance(0.0, PointerOffset::default());
        }

        let mut jumped = state(TimeStep::Fixed(0.01));
        let frame = jumped.apply(stepped.time, PointerOffset::default());
        for (a, b) in stepped.poses.iter().zip(frame.poses) {
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    fn spin_accumulates_per_frame() {
        let mut anim = state(TimeStep::default());
        for _ in 0..10 {
            anim.advance(0.0, PointerOffset::default());
        }
        for (body, pose) in anim.bodies.iter().zip(&anim.poses) {
            assert!((pose.spin - body.speed * 2.0 * 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn rotation_is_a_function_of_time() {
        let mut anim = state(TimeStep::default());
        let frame = anim.apply(50.0, PointerOffset::new(3.0, -2.0));
        assert!((frame.galaxy_rotation - 5.0).abs() < 1e-6);
        assert_eq!(frame.camera.target, Vec3::ZERO);
    }

    #[test]
    fn fixed_step_keeps_advancing_after_days_of_frames() {
        for start in [1_000.0, 51_840.0, 65_536.0, 262_144.0, 5_184_000.0] {
            let mut anim = state(TimeStep::Fixed(0.01));
            anim.time = start;
            let frame = anim.advance(0.0, PointerOffset::default());
            let step = frame.time - start;
            assert!((step - 0.01).abs() < 1e-8, "start={} step={}", start, step);
            assert!((0.0..std::f32::consts::TAU).contains(&frame.galaxy_rotation));
        }
    }

    #[test]
    fn advance_reuses_pose_storage() {
        let mut anim = state(TimeStep::default());
        let ptr = anim.poses.as_ptr();
        for _ in 0..5 {
            anim.advance(0.0, PointerOffset::new(1.0, 1.0));
        }
        assert_eq!(anim.poses.as_ptr(), ptr);
        assert_eq!(anim.poses.len(), anim.bodies.len());
    }
}
