use super::*;

#[test]
fn opaque_over_replaces_and_clips_at_edges() {
    let mut dst = Frame::filled_image(2, 2, &[0.0, 0.0, 0.0]);
    let src = Frame::filled_image(2, 2, &[9.0, 9.0, 9.0]);
    blit(&mut dst, &src, None, 1.0, (1, -1), BlendMode::Over).unwrap();

    assert_eq!(dst.pixel(0, 0), Some(&[0.0, 0.0, 0.0][..]));
    assert_eq!(dst.pixel(0, 1), Some(&[9.0, 9.0, 9.0][..]));
    assert_eq!(dst.pixel(1, 0), Some(&[0.0, 0.0, 0.0][..]));
    assert_eq!(dst.pixel(1, 1), Some(&[0.0, 0.0, 0.0][..]));
}

#[test]
fn alpha_and_opacity_multiply() {
    let mut dst = Frame::filled_image(1, 1, &[100.0, 100.0, 100.0]);
    let src = Frame::filled_image(1, 1, &[200.0, 0.0, 100.0]);
    let alpha = Frame::filled_image(1, 1, &[0.5]);
    blit(&mut dst, &src, Some(&alpha), 0.5, (0, 0), BlendMode::Over).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(&[125.0, 75.0, 100.0][..]));
}

#[test]
fn fully_off_canvas_is_a_noop() {
    let mut dst = Frame::filled_image(2, 2, &[1.0, 1.0, 1.0]);
    let before = dst.clone();
    let src = Frame::filled_image(2, 2, &[5.0, 5.0, 5.0]);
    blit(&mut dst, &src, None, 1.0, (10, 0), BlendMode::Over).unwrap();
    blit(&mut dst, &src, None, 1.0, (0, -2), BlendMode::Over).unwrap();
    assert_eq!(dst, before);
}

#[test]
fn mismatched_shapes_are_errors() {
    let mut dst = Frame::filled_image(2, 2, &[0.0, 0.0, 0.0]);
    let gray = Frame::filled_image(2, 2, &[1.0]);
    assert!(matches!(
        blit(&mut dst, &gray, None, 1.0, (0, 0), BlendMode::Over),
        Err(ClipError::Shape(_))
    ));

    let src = Frame::filled_image(2, 2, &[1.0, 1.0, 1.0]);
    let small_mask = Frame::filled_image(1, 1, &[1.0]);
    assert!(matches!(
        blit(&mut dst, &src, Some(&small_mask), 1.0, (0, 0), BlendMode::Over),
        Err(ClipError::Shape(_))
    ));
}

#[test]
fn union_accumulates_coverage() {
    let mut dst = Frame::filled_image(1, 2, &[0.5]);
    let src = Frame::filled_image(1, 1, &[0.5]);
    blit(&mut dst, &src, None, 1.0, (1, 0), BlendMode::Union).unwrap();
    assert_eq!(dst.data(), &[0.5, 0.75]);
}
