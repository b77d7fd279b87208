//! MP4 → animated GIF filter construction.
//!
//! Both quality tiers feed the same executor; the tier only changes the
//! filter chain handed to the engine. The high tier runs the classic
//! palette trick — generate an optimal 256-colour palette from the scaled
//! frames, then apply it — which avoids the banding the default quantiser
//! produces. The low tier is a straight single-pass scale.

use crate::config::GifQuality;
use crate::engine::FilterSpec;

/// Build the engine filter spec for a GIF transcode at the given tier.
pub fn filter_spec(quality: GifQuality) -> FilterSpec {
    let scale = format!(
        "fps={},scale={}:-1:flags=lanczos",
        quality.fps(),
        quality.width()
    );

    let args = if quality.two_pass() {
        vec![
            "-filter_complex".to_string(),
            format!("{scale}[x];[x]split[x1][x2];[x1]palettegen[p];[x2][p]paletteuse"),
            "-f".to_string(),
            "gif".to_string(),
        ]
    } else {
        vec![
            "-vf".to_string(),
            scale,
            "-f".to_string(),
            "gif".to_string(),
        ]
    };

    FilterSpec {
        input_ext: "mp4",
        output_ext: "gif",
        output_type: "image/gif",
        args,
    }
}
