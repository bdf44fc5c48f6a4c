//! Frame number to timecode conversion.

use cutsync_common::timecode::frames_to_timecode;

pub fn run(frame: i64, fps: f64, drop: bool) -> anyhow::Result<()> {
    if fps <= 0.0 {
        anyhow::bail!("fps must be positive, got {fps}");
    }
    println!("{}", frames_to_timecode(frame, fps, drop));
    Ok(())
}
