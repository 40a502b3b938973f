//! Sector distance estimation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crossbeam_utils::atomic::AtomicCell;
use std::sync::Arc;

use super::{LidarParams, Packet, Sector, SectorBounds, SectorState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Folds decoded packets into a per-sector closest distance.
///
/// For every sector a packet sweeps, the estimate snaps down to the closest valid sample if it
/// is nearer than the current value, otherwise it relaxes upwards by the decay step, never
/// beyond the unknown distance. Sectors the packet does not sweep are left alone.
#[derive(Debug, Clone)]
pub struct SectorEstimator {
    state: SectorState,
    bounds: SectorBounds,
    mount_offset_deg: f64,
    max_valid_dist_cm: f64,
    unknown_dist_cm: f64,
    decay_step_cm: f64,
}

/// Shared handle to the latest published sector state.
///
/// Written by the scan thread, read by the control loop. A read always returns a triple that
/// was published as a whole.
#[derive(Debug, Clone)]
pub struct SharedSectors {
    cell: Arc<AtomicCell<SectorState>>,
}

/// Per-sector accumulator for a single packet.
#[derive(Debug, Clone, Copy, Default)]
struct Sweep {
    swept: bool,
    closest_cm: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SectorEstimator {
    pub fn new(params: &LidarParams) -> Self {
        Self {
            state: SectorState::unknown(params.unknown_dist_cm),
            bounds: params.sectors,
            mount_offset_deg: params.mount_offset_deg,
            max_valid_dist_cm: params.max_valid_dist_cm,
            unknown_dist_cm: params.unknown_dist_cm,
            decay_step_cm: params.decay_step_cm,
        }
    }

    /// The current estimate.
    pub fn state(&self) -> SectorState {
        self.state
    }

    /// Update the estimate with one packet and return the new state.
    pub fn apply_packet(&mut self, packet: &Packet) -> SectorState {
        // Front, left, right
        let mut sweeps = [Sweep::default(); 3];

        for sample in packet.samples(self.mount_offset_deg, &self.bounds) {
            let sweep = match sample.sector {
                Sector::Front => &mut sweeps[0],
                Sector::Left => &mut sweeps[1],
                Sector::Right => &mut sweeps[2],
                Sector::Ignored => continue,
            };

            sweep.swept = true;

            if sample.distance_cm > 0.0 && sample.distance_cm < self.max_valid_dist_cm {
                sweep.closest_cm = Some(match sweep.closest_cm {
                    Some(c) => c.min(sample.distance_cm),
                    None => sample.distance_cm,
                });
            }
        }

        let sectors = [Sector::Front, Sector::Left, Sector::Right];
        for (sector, sweep) in sectors.iter().zip(sweeps.iter()) {
            if !sweep.swept {
                continue;
            }

            if let Some(current) = self.state.get_mut(*sector) {
                *current = match sweep.closest_cm {
                    Some(c) if c < *current => c,
                    _ => (*current + self.decay_step_cm).min(self.unknown_dist_cm),
                };
            }
        }

        self.state
    }
}

impl SharedSectors {
    pub fn new(initial: SectorState) -> Self {
        Self {
            cell: Arc::new(AtomicCell::new(initial)),
        }
    }

    /// Replace the published state.
    pub fn publish(&self, state: SectorState) {
        self.cell.store(state);
    }

    /// Read the latest published state.
    pub fn snapshot(&self) -> SectorState {
        self.cell.load()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lidar::{packet::test::build_frame, HEADER_SIZE};

    fn packet(start_deg: f64, end_deg: f64, distances_mm: &[u16]) -> Packet {
        let frame = build_frame(start_deg, end_deg, distances_mm);
        Packet::parse(&frame[HEADER_SIZE..]).unwrap()
    }

    /// Packet entirely in the front sector (raw 270 to 281 plus 90 degree mount offset).
    fn front_packet(distances_mm: &[u16]) -> Packet {
        packet(270.0, 281.0, distances_mm)
    }

    #[test]
    fn test_snaps_to_closest_valid() {
        let mut est = SectorEstimator::new(&LidarParams::default());

        // Zero and out of range samples are ignored
        let s = est.apply_packet(&front_packet(&[0, 3000, 800, 650, 2600]));
        assert!((s.front_cm - 65.0).abs() < 1e-9);
        assert_eq!(s.left_cm, 999.0);
        assert_eq!(s.right_cm, 999.0);
    }

    #[test]
    fn test_decay_only_on_swept_sectors() {
        let mut params = LidarParams::default();
        params.decay_step_cm = 5.0;
        let mut est = SectorEstimator::new(&params);

        est.apply_packet(&front_packet(&[400; 12]));
        assert_eq!(est.state().front_cm, 40.0);

        // Further returns stay at the same minimum, so the estimate relaxes
        let s = est.apply_packet(&front_packet(&[500; 12]));
        assert_eq!(s.front_cm, 45.0);

        // A closer return snaps straight down
        let s = est.apply_packet(&front_packet(&[300; 12]));
        assert_eq!(s.front_cm, 30.0);

        // A packet behind the rover sweeps nothing we track
        let s = est.apply_packet(&packet(90.0, 101.0, &[100; 12]));
        assert_eq!(s.front_cm, 30.0);
    }

    #[test]
    fn test_decay_grows_by_step_per_packet() {
        let mut params = LidarParams::default();
        params.decay_step_cm = 2.5;
        let mut est = SectorEstimator::new(&params);

        est.apply_packet(&front_packet(&[400; 12]));
        let left_before = est.state().left_cm;

        // Empty and out of range returns both count as no valid sample
        for n in 1..=20 {
            let d = if n % 2 == 0 { 0 } else { 4000 };
            let s = est.apply_packet(&front_packet(&[d; 12]));
            assert!((s.front_cm - (40.0 + n as f64 * 2.5)).abs() < 1e-9);
            assert_eq!(s.left_cm, left_before);
        }
    }

    #[test]
    fn test_decay_capped_at_unknown() {
        let mut params = LidarParams::default();
        params.decay_step_cm = 500.0;
        let mut est = SectorEstimator::new(&params);

        est.apply_packet(&front_packet(&[400; 12]));
        let s = est.apply_packet(&front_packet(&[0; 12]));
        assert_eq!(s.front_cm, 540.0);

        // The next step would pass the unknown distance
        let s = est.apply_packet(&front_packet(&[0; 12]));
        assert_eq!(s.front_cm, 999.0);
        let s = est.apply_packet(&front_packet(&[0; 12]));
        assert_eq!(s.front_cm, 999.0);
    }

    #[test]
    fn test_packet_spanning_sectors() {
        let mut est = SectorEstimator::new(&LidarParams::default());

        // Raw 240 to 262 maps to headings 330 to 352, straddling the left/front boundary
        let mut d = [0u16; 12];
        d[0] = 1200;
        d[11] = 900;
        let s = est.apply_packet(&packet(240.0, 262.0, &d));

        assert_eq!(s.left_cm, 120.0);
        assert_eq!(s.front_cm, 90.0);
        assert_eq!(s.right_cm, 999.0);
    }

    #[test]
    fn test_shared_snapshot() {
        let shared = SharedSectors::new(SectorState::default());
        let reader = shared.clone();

        let s = SectorState {
            front_cm: 10.0,
            left_cm: 20.0,
            right_cm: 30.0,
        };
        shared.publish(s);
        assert_eq!(reader.snapshot(), s);
    }
}
