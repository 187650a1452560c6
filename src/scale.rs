/// Row pitches and nearest-pitch quantization - one pitch per grid row
pub const SCALE_LEN: usize = 10;

/// A minor pentatonic from A3 to G5, one pitch per grid row.
pub const SCALE_FREQUENCIES: [f32; SCALE_LEN] = [
    220.0, // A3
    261.63, // C4
    293.66, // D4
    329.63, // E4
    392.0, // G4
    440.0, // A4
    523.25, // C5
    587.33, // D5
    659.25, // E5
    784.0, // G5
];

/// Frequency for a grid row. Rows outside the table clamp to the last pitch.
pub fn row_frequency(row: usize) -> f32 {
    SCALE_FREQUENCIES[row.min(SCALE_LEN - 1)]
}

/// Snap `freq` to the closest scale pitch; ties go to the lower table entry.
pub fn quantize(freq: f32) -> f32 {
    let mut best = SCALE_FREQUENCIES[0];
    let mut best_distance = (best - freq).abs();
    for &candidate in &SCALE_FREQUENCIES[1..] {
        let distance = (candidate - freq).abs();
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    best
}
