//! The raycast collaborator contract (`SPEC_FULL.md` §4.A, §6).
//!
//! The core never implements its own broad/narrow-phase geometry query; it
//! only calls out to whatever the embedder wires up. Suspension ray sampling
//! issues up to 20 of these per fixed tick (5 samples × 4 corners).

use nalgebra::{Point3, Vector3};

/// A single raycast intersection result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space point of intersection.
    pub point: Point3<f32>,
    /// Unit surface normal, pointing away from the struck surface.
    pub normal: Vector3<f32>,
    /// Distance along the ray to the hit, in `[0, max_distance]`.
    pub distance: f32,
}

/// Answers single-ray intersections against static world geometry.
///
/// Implementations MUST be re-entrant and side-effect free: the core relies
/// on every query within a tick observing one coherent snapshot of the
/// static world. No algorithm is mandated by the contract.
pub trait RaycastBackend {
    /// Casts a ray from `origin` along unit direction `dir` for at most
    /// `max_distance`. Returns `None` on a query miss — which is not an
    /// error condition, just an empty result (`SPEC_FULL.md` §7).
    fn raycast(&self, origin: Point3<f32>, dir: Vector3<f32>, max_distance: f32) -> Option<RayHit>;
}

/// Deterministic stub backends used by the scenario tests in
/// `vehicle::tests` and by the tick benchmark. Not gated behind `cfg(test)`
/// so that `benches/tick_bench.rs`, which is its own compilation unit, can
/// use them too.
pub mod test_support {

    use super::*;

    /// An infinite flat plane at `z = height`, with normal `+z`.
    pub struct FlatGround {
        pub height: f32,
    }

    impl RaycastBackend for FlatGround {
        fn raycast(
            &self,
            origin: Point3<f32>,
            dir: Vector3<f32>,
            max_distance: f32,
        ) -> Option<RayHit> {
            if dir.z >= -1e-9 {
                return None;
            }
            let distance = (origin.z - self.height) / -dir.z;
            if distance < 0.0 || distance > max_distance {
                return None;
            }
            Some(RayHit {
                point: origin + dir * distance,
                normal: Vector3::z(),
                distance,
            })
        }
    }

    /// A flat plane with a rectangular step of `step_height` starting at
    /// `y >= step_distance`, used by the curb-strike scenario (S5). `y` is
    /// the forward axis in this crate's body frame (see
    /// [`crate::vehicle::suspension`]'s contact basis), so a car driving
    /// forward crosses the step rather than straddling it laterally.
    pub struct SteppedGround {
        pub base_height: f32,
        pub step_height: f32,
        pub step_distance: f32,
    }

    impl RaycastBackend for SteppedGround {
        fn raycast(
            &self,
            origin: Point3<f32>,
            dir: Vector3<f32>,
            max_distance: f32,
        ) -> Option<RayHit> {
            if dir.z >= -1e-9 {
                return None;
            }
            let height = if origin.y >= self.step_distance {
                self.base_height + self.step_height
            } else {
                self.base_height
            };
            let distance = (origin.z - height) / -dir.z;
            if distance < 0.0 || distance > max_distance {
                return None;
            }
            Some(RayHit {
                point: origin + dir * distance,
                normal: Vector3::z(),
                distance,
            })
        }
    }

    #[test]
    fn flat_ground_hits_straight_down() {
        let ground = FlatGround { height: 0.0 };
        let hit = ground
            .raycast(Point3::new(0.0, 0.0, 1.0), -Vector3::z(), 2.0)
            .expect("should hit");
        assert!((hit.distance - 1.0).abs() < 1e-6);
        assert!((hit.point.z).abs() < 1e-6);
    }

    #[test]
    fn flat_ground_misses_beyond_max_distance() {
        let ground = FlatGround { height: -5.0 };
        assert!(ground
            .raycast(Point3::new(0.0, 0.0, 1.0), -Vector3::z(), 2.0)
            .is_none());
    }

    #[test]
    fn stepped_ground_raises_past_step_distance() {
        let ground = SteppedGround {
            base_height: 0.0,
            step_height: 0.05,
            step_distance: 1.0,
        };
        let before = ground
            .raycast(Point3::new(0.0, 0.5, 1.0), -Vector3::z(), 2.0)
            .unwrap();
        let after = ground
            .raycast(Point3::new(0.0, 1.5, 1.0), -Vector3::z(), 2.0)
            .unwrap();
        assert!((before.distance - 1.0).abs() < 1e-6);
        assert!((after.distance - 0.95).abs() < 1e-6);
    }
}
