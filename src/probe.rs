use anyhow::{Context, Result};
use std::io::Cursor;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Returns the playable duration of an encoded audio file in seconds.
///
/// Uses the container's frame count when present and otherwise sums packet
/// durations without decoding. `Ok(None)` means the length could not be
/// determined (e.g. an empty stream).
pub fn probe_duration(data: &[u8]) -> Result<Option<f64>> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported format")?;

    let mut format = probed.format;
    let track = format.default_track().context("No track found")?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let to_seconds = |ts: u64| -> Option<f64> {
        match (params.time_base, params.sample_rate) {
            (Some(tb), _) => {
                let t = tb.calc_time(ts);
                Some(t.seconds as f64 + t.frac)
            }
            (None, Some(rate)) if rate > 0 => Some(ts as f64 / rate as f64),
            _ => None,
        }
    };

    if let Some(frames) = params.n_frames {
        return Ok(to_seconds(frames));
    }

    let mut total = 0u64;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() == track_id {
            total += packet.dur;
        }
    }

    if total == 0 {
        return Ok(None);
    }
    Ok(to_seconds(total))
}
