//! Helpers shared by the integration tests

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use std::thread;
use std::time::{Duration, Instant};

use rov_lib::lidar::{crc8, FRAME_SIZE, HEADER, POINTS_PER_PACKET};

/// Build a wire frame whose points all read `distance_cm`, between two raw sensor angles.
pub fn frame(start_deg: f64, end_deg: f64, distance_cm: f64) -> Vec<u8> {
    let mut f = vec![0u8; FRAME_SIZE];
    f[0] = HEADER[0];
    f[1] = HEADER[1];

    LittleEndian::write_u16(&mut f[4..6], (start_deg * 100.0).round() as u16);
    LittleEndian::write_u16(&mut f[42..44], (end_deg * 100.0).round() as u16);

    let mm = (distance_cm * 10.0).round() as u16;
    for i in 0..POINTS_PER_PACKET {
        let o = 6 + 3 * i;
        LittleEndian::write_u16(&mut f[o..o + 2], mm);
        f[o + 2] = 180;
    }

    f[FRAME_SIZE - 1] = crc8(&f[..FRAME_SIZE - 1]);
    f
}

/// A frame covering the rover's front sector (raw angles 270 to 281 with a 90 degree mount).
pub fn front_frame(distance_cm: f64) -> Vec<u8> {
    frame(270.0, 281.0, distance_cm)
}

/// A frame covering the rover's left sector.
pub fn left_frame(distance_cm: f64) -> Vec<u8> {
    frame(190.0, 212.0, distance_cm)
}

/// A frame covering the rover's right sector.
pub fn right_frame(distance_cm: f64) -> Vec<u8> {
    frame(300.0, 322.0, distance_cm)
}

/// Poll a condition until it holds or two seconds pass.
pub fn wait_for<F: FnMut() -> bool>(mut cond: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(2) {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}
