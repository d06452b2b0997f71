use std::time::{Duration, Instant};

use opencv::core::{Point2f, Vector};

/// The solver needs more than 3 corner correspondences per observation to
/// contribute anything to the intrinsics estimate.
pub const MIN_CHARUCO_CORNERS: usize = 4;

/// Decides which detected board observations are worth keeping. Two rules:
/// drop observations with too few corners, and enforce a minimum dwell time
/// between captures so a stationary board does not flood the accumulator with
/// near-identical samples. Pose diversity is left to the operator, who
/// watches the on-screen capture counter.
#[derive(Debug)]
pub struct SamplingGate {
    time_step: Duration,
    last_admission: Option<Instant>,
}

impl SamplingGate {
    pub fn new(time_step: Duration) -> Self {
        Self {
            time_step,
            last_admission: None,
        }
    }

    /// Returns true if an observation with `corner_count` corners seen at
    /// `now` should be admitted. Only admissions move the debounce timestamp;
    /// rejected attempts leave the gate untouched.
    pub fn evaluate(&mut self, corner_count: usize, now: Instant) -> bool {
        if corner_count < MIN_CHARUCO_CORNERS {
            return false;
        }
        if let Some(last) = self.last_admission {
            if now.duration_since(last) < self.time_step {
                return false;
            }
        }
        self.last_admission = Some(now);
        true
    }
}

/// Append-only set of admitted observations, index-aligned corner and id
/// sequences. Handed to the solver in full once the capture loop exits.
#[derive(Debug)]
pub struct Accumulator {
    corners: Vector<Vector<Point2f>>,
    ids: Vector<Vector<i32>>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            corners: Vector::new(),
            ids: Vector::new(),
        }
    }

    pub fn admit(&mut self, corners: Vector<Point2f>, ids: Vector<i32>) {
        self.corners.push(corners);
        self.ids.push(ids);
    }

    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    pub fn corners(&self) -> &Vector<Vector<Point2f>> {
        &self.corners
    }

    pub fn ids(&self) -> &Vector<Vector<i32>> {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SamplingGate {
        SamplingGate::new(Duration::from_secs(3))
    }

    #[test]
    fn too_few_corners_never_admitted() {
        let mut gate = gate();
        let start = Instant::now();
        assert!(!gate.evaluate(0, start));
        assert!(!gate.evaluate(3, start + Duration::from_secs(60)));
        assert!(!gate.evaluate(3, start + Duration::from_secs(3600)));
    }

    #[test]
    fn four_corners_is_the_admission_boundary() {
        let start = Instant::now();
        let mut gate = gate();
        assert!(!gate.evaluate(3, start));
        assert!(gate.evaluate(4, start));
    }

    #[test]
    fn debounce_scenario() {
        let start = Instant::now();
        let mut gate = gate();
        let mut accumulator = Accumulator::new();
        for millis in [0u64, 1500, 3100, 3200] {
            if gate.evaluate(12, start + Duration::from_millis(millis)) {
                accumulator.admit(Vector::new(), Vector::new());
            }
        }
        assert_eq!(accumulator.len(), 2);
    }

    #[test]
    fn admissions_never_closer_than_time_step() {
        let start = Instant::now();
        let mut gate = gate();
        let mut admitted = Vec::new();
        for tick in 0..20u64 {
            let at = Duration::from_millis(tick * 500);
            if gate.evaluate(8, start + at) {
                admitted.push(at);
            }
        }
        // attempts every 0.5s over 9.5s, 3s debounce
        assert_eq!(
            admitted,
            vec![
                Duration::from_millis(0),
                Duration::from_millis(3000),
                Duration::from_millis(6000),
                Duration::from_millis(9000),
            ]
        );
        for pair in admitted.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(3));
        }
    }

    #[test]
    fn rejections_do_not_move_the_debounce_timestamp() {
        let start = Instant::now();
        let mut gate = gate();
        assert!(gate.evaluate(8, start));
        // a low-corner frame and a too-early frame in between
        assert!(!gate.evaluate(2, start + Duration::from_millis(2900)));
        assert!(!gate.evaluate(8, start + Duration::from_millis(2950)));
        assert!(gate.evaluate(8, start + Duration::from_millis(3000)));
    }

    #[test]
    fn accumulator_keeps_sequences_aligned() {
        let mut accumulator = Accumulator::new();
        let mut corners = Vector::<Point2f>::new();
        corners.push(Point2f::new(1.0, 2.0));
        let mut ids = Vector::<i32>::new();
        ids.push(7);
        accumulator.admit(corners, ids);
        accumulator.admit(Vector::new(), Vector::new());

        assert_eq!(accumulator.len(), 2);
        assert_eq!(accumulator.corners().len(), accumulator.ids().len());
        assert_eq!(accumulator.corners().get(0).unwrap().len(), 1);
        assert_eq!(accumulator.ids().get(0).unwrap().get(0).unwrap(), 7);
    }
}
