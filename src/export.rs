//! Derived products of a flow field: magnitude and false-color rendering.
//!
//! The color coding maps direction to hue and magnitude to saturation, so
//! zero displacement renders white and a displacement of `scale` pixels or
//! more renders fully saturated. Non-finite vectors render black.

use crate::frame::FrameBuffer;
use crate::util::{CorrFlowError, CorrFlowResult};

fn check_pair(flow_x: &FrameBuffer, flow_y: &FrameBuffer) -> CorrFlowResult<()> {
    if flow_x.extent() == flow_y.extent() {
        return Ok(());
    }
    Err(CorrFlowError::ShapeMismatch {
        name: "flow_y",
        expected_width: flow_x.width(),
        expected_height: flow_x.height(),
        width: flow_y.width(),
        height: flow_y.height(),
    })
}

/// Per-pixel Euclidean length of the displacement.
pub fn flow_magnitude(
    flow_x: &FrameBuffer,
    flow_y: &FrameBuffer,
) -> CorrFlowResult<FrameBuffer> {
    check_pair(flow_x, flow_y)?;
    let data = flow_x
        .as_slice()
        .iter()
        .zip(flow_y.as_slice())
        .map(|(&u, &v)| u.hypot(v))
        .collect();
    FrameBuffer::from_vec(data, flow_x.width(), flow_x.height())
}

/// Converts HSV (`hue` in degrees, `sat` and `val` in `[0, 1]`) to RGB.
fn hsv_to_rgb(hue: f32, sat: f32, val: f32) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let sector = h.floor();
    let f = h - sector;
    let p = val * (1.0 - sat);
    let q = val * (1.0 - sat * f);
    let t = val * (1.0 - sat * (1.0 - f));
    let (r, g, b) = match sector as u32 {
        0 => (val, t, p),
        1 => (q, val, p),
        2 => (p, val, t),
        3 => (p, q, val),
        4 => (t, p, val),
        _ => (val, p, q),
    };
    let to_u8 = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r), to_u8(g), to_u8(b)]
}

/// Color of a single displacement vector.
pub fn flow_color(u: f32, v: f32, scale: f32) -> [u8; 3] {
    if !u.is_finite() || !v.is_finite() {
        return [0, 0, 0];
    }
    let magnitude = u.hypot(v);
    let hue = v.atan2(u).to_degrees();
    hsv_to_rgb(hue, (magnitude / scale).min(1.0), 1.0)
}

/// Renders the flow field as interleaved RGB bytes, row-major.
pub fn flow_to_rgb(
    flow_x: &FrameBuffer,
    flow_y: &FrameBuffer,
    scale: f32,
) -> CorrFlowResult<Vec<u8>> {
    check_pair(flow_x, flow_y)?;
    if !(scale.is_finite() && scale > 0.0) {
        return Err(CorrFlowError::invalid_parameter(
            "scale",
            format!("{scale} must be finite and positive"),
        ));
    }
    let mut rgb = Vec::with_capacity(flow_x.len() * 3);
    for (&u, &v) in flow_x.as_slice().iter().zip(flow_y.as_slice()) {
        rgb.extend_from_slice(&flow_color(u, v, scale));
    }
    Ok(rgb)
}

/// Writes the color-coded flow field; the format follows the extension.
#[cfg(feature = "image-io")]
pub fn write_flow_image<P: AsRef<std::path::Path>>(
    path: P,
    flow_x: &FrameBuffer,
    flow_y: &FrameBuffer,
    scale: f32,
) -> CorrFlowResult<()> {
    let path = path.as_ref();
    let rgb = flow_to_rgb(flow_x, flow_y, scale)?;
    let (width, height) = (flow_x.width(), flow_x.height());
    let too_large = || CorrFlowError::InvalidDimensions { width, height };
    let img = image::RgbImage::from_raw(
        u32::try_from(width).map_err(|_| too_large())?,
        u32::try_from(height).map_err(|_| too_large())?,
        rgb,
    )
    .ok_or_else(too_large)?;
    img.save(path).map_err(|err| CorrFlowError::Io {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{flow_color, flow_magnitude, flow_to_rgb};
    use crate::frame::FrameBuffer;
    use crate::util::ErrorKind;

    #[test]
    fn magnitude_is_euclidean() {
        let fx = FrameBuffer::from_vec(vec![3.0, 0.0], 2, 1).unwrap();
        let fy = FrameBuffer::from_vec(vec![4.0, -2.0], 2, 1).unwrap();
        let mag = flow_magnitude(&fx, &fy).unwrap();
        assert_eq!(mag.as_slice(), &[5.0, 2.0]);
    }

    #[test]
    fn colors_encode_direction_and_saturation() {
        assert_eq!(flow_color(0.0, 0.0, 3.0), [255, 255, 255]);
        assert_eq!(flow_color(3.0, 0.0, 3.0), [255, 0, 0]);
        assert_eq!(flow_color(-6.0, 0.0, 3.0), [0, 255, 255]);
        assert_eq!(flow_color(f32::NAN, 0.0, 3.0), [0, 0, 0]);
    }

    #[test]
    fn rgb_rejects_bad_inputs() {
        let fx = FrameBuffer::new(2, 2).unwrap();
        let fy = FrameBuffer::new(2, 2).unwrap();
        assert_eq!(flow_to_rgb(&fx, &fy, 3.0).unwrap().len(), 12);
        assert_eq!(
            flow_to_rgb(&fx, &fy, 0.0).unwrap_err().kind(),
            ErrorKind::Configuration
        );
        let small = FrameBuffer::new(1, 2).unwrap();
        assert!(flow_magnitude(&fx, &small).is_err());
    }
}
