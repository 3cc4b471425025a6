use crate::{
    foundation::error::{ClipError, ClipResult},
    foundation::frame::Frame,
};

/// How a source image combines with the pixels below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlendMode {
    /// `dst = a * src + (1 - a) * dst`, with `a` the per-pixel alpha times the opacity.
    Over,
    /// Mask union `dst = m + dst * (1 - m)`, with `m` the source value times the opacity.
    Union,
}

/// Paint `src` onto `dst` with its top-left corner at `(x, y)`, clipping to `dst`.
///
/// `alpha` must be a single-channel image with the dimensions of `src` and is only used by
/// [`BlendMode::Over`].
pub(crate) fn blit(
    dst: &mut Frame,
    src: &Frame,
    alpha: Option<&Frame>,
    opacity: f32,
    (x, y): (i64, i64),
    mode: BlendMode,
) -> ClipResult<()> {
    let (dh, dw, dc) = dst
        .image_dims()
        .ok_or_else(|| ClipError::shape("blit destination must be an image"))?;
    let (sh, sw, sc) = src
        .image_dims()
        .ok_or_else(|| ClipError::shape("blit source must be an image"))?;
    if sc != dc {
        return Err(ClipError::shape(format!(
            "cannot draw a {sc}-channel frame onto a {dc}-channel canvas"
        )));
    }
    if mode == BlendMode::Union && sc != 1 {
        return Err(ClipError::shape("mask union needs single-channel frames"));
    }
    if let Some(alpha) = alpha {
        let dims = alpha.image_dims();
        if dims != Some((sh, sw, 1)) {
            return Err(ClipError::shape(format!(
                "mask {dims:?} does not match frame {sh}x{sw}"
            )));
        }
    }

    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return Ok(());
    }

    // Visible source rows/columns after clipping to the destination.
    let x0 = (-x).clamp(0, sw as i64) as usize;
    let y0 = (-y).clamp(0, sh as i64) as usize;
    let x1 = (dw as i64 - x).clamp(0, sw as i64) as usize;
    let y1 = (dh as i64 - y).clamp(0, sh as i64) as usize;
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let src_data = src.data();
    let alpha_data = alpha.map(Frame::data);
    let dst_data = dst.data_mut();
    for sy in y0..y1 {
        let dy = (sy as i64 + y) as usize;
        for sx in x0..x1 {
            let dx = (sx as i64 + x) as usize;
            let s_off = (sy * sw + sx) * sc;
            let d_off = (dy * dw + dx) * dc;
            let px_alpha = alpha_data.map_or(1.0, |a| a[sy * sw + sx]);
            match mode {
                BlendMode::Over => {
                    let a = px_alpha * opacity;
                    if a <= 0.0 {
                        continue;
                    }
                    for c in 0..sc {
                        let d = &mut dst_data[d_off + c];
                        *d = a * src_data[s_off + c] + (1.0 - a) * *d;
                    }
                }
                BlendMode::Union => {
                    let m = src_data[s_off] * opacity;
                    let d = &mut dst_data[d_off];
                    *d = m + *d * (1.0 - m);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/compose/blit.rs"]
mod tests;
