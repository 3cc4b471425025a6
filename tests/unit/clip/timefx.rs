use super::*;

use crate::foundation::frame::Frame;

fn clock() -> Clip {
    Clip::video(|t| Ok(Frame::filled_image(1, 1, &[t as f32, 0.0, 0.0])))
}

fn at(clip: &Clip, t: f64) -> f32 {
    clip.get_frame(t).unwrap().data()[0]
}

#[test]
fn looped_wraps_time() {
    let clip = clock().set_duration(2.0, true).unwrap();

    let three = clip.looped(Some(3), None).unwrap();
    assert_eq!(three.duration(), Some(6.0));
    assert_eq!(at(&three, 4.5), 0.5);

    let timed = clip.looped(None, Some(5.0)).unwrap();
    assert_eq!(timed.duration(), Some(5.0));

    let forever = clip.looped(None, None).unwrap();
    assert_eq!(forever.duration(), None);
    assert_eq!(at(&forever, 101.0), 1.0);

    assert!(matches!(
        clock().looped(Some(2), None),
        Err(ClipError::State(_))
    ));
}

#[test]
fn speedx_scales_time_and_duration() {
    let clip = clock().set_duration(4.0, true).unwrap();
    let fast = clip.speedx(2.0).unwrap();
    assert_eq!(fast.duration(), Some(2.0));
    assert_eq!(at(&fast, 1.5), 3.0);

    let slow = clip.speedx(0.5).unwrap();
    assert_eq!(slow.duration(), Some(8.0));

    assert!(matches!(clip.speedx(0.0), Err(ClipError::Range(_))));
    assert_eq!(clock().speedx(2.0).unwrap().duration(), None);
}

#[test]
fn time_mirror_plays_backwards() {
    let clip = clock().set_duration(3.0, true).unwrap();
    let back = clip.time_mirror().unwrap();
    assert_eq!(back.window(), clip.window());
    assert_eq!(at(&back, 1.0), 2.0);
    assert!(clock().time_mirror().is_err());
}

#[test]
fn to_still_freezes_frame_and_mask() {
    let clip = clock()
        .with_mask(Clip::mask_fn(|t| Ok(Frame::filled_image(1, 1, &[t as f32 / 10.0]))))
        .unwrap()
        .set_duration(5.0, true)
        .unwrap();
    let frozen = clip.to_still(2.0).unwrap();
    assert_eq!(frozen.window(), clip.window());
    assert_eq!(at(&frozen, 0.0), 2.0);
    assert_eq!(at(&frozen, 4.0), 2.0);
    assert_eq!(frozen.mask().unwrap().get_frame(3.0).unwrap().data(), &[0.2]);
}
