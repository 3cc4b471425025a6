use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};

fn clock() -> Clip {
    Clip::video(|t| Ok(Frame::filled_image(1, 1, &[t as f32, 0.0, 0.0])))
}

fn value(frame: &Frame) -> f32 {
    frame.data()[0]
}

fn tone(channels: u16) -> Clip {
    Clip::from_source(
        ClipKind::Audio { channels },
        ClipWindow::unbounded(),
        FrameSource::Sampled(Arc::new(move |ts: &[f64]| {
            let mut out = Frame::silence(ts.len(), usize::from(channels));
            for (i, &t) in ts.iter().enumerate() {
                for c in 0..usize::from(channels) {
                    out.data_mut()[i * usize::from(channels) + c] = t as f32;
                }
            }
            Ok(out)
        })),
    )
}

#[test]
fn fl_keeps_or_clears_window() {
    let clip = clock()
        .set_duration(4.0, true)
        .unwrap()
        .set_start(1.0, true)
        .unwrap();

    let kept = clip.fl(|gf, t| gf.frame(t), ApplyTo::NONE, true);
    assert_eq!(kept.window(), clip.window());

    let cleared = clip.fl(|gf, t| gf.frame(t), ApplyTo::NONE, false);
    assert_eq!(cleared.start(), 1.0);
    assert_eq!(cleared.end(), None);
    assert_eq!(cleared.duration(), None);
}

#[test]
fn fl_filter_can_sample_other_times() {
    let ahead = clock().fl(|gf, t| gf.frame(t + 1.0), ApplyTo::NONE, true);
    assert_eq!(value(&ahead.get_frame(0.5).unwrap()), 1.5);

    let doubled = clock().fl(
        |gf, t| {
            let mut f = gf.frame(t)?;
            f.scale(2.0);
            Ok(f)
        },
        ApplyTo::NONE,
        true,
    );
    assert_eq!(value(&doubled.get_frame(3.0).unwrap()), 6.0);
}

fn halve(gf: &FrameGetter<'_>, t: f64) -> ClipResult<Frame> {
    let mut f = gf.frame(t)?;
    f.scale(0.5);
    Ok(f)
}

#[test]
fn fl_cascades_to_mask_only_when_asked() {
    let mask = Clip::mask_fn(|_| Ok(Frame::filled_image(1, 1, &[0.5])));
    let clip = clock().with_mask(mask).unwrap();

    let plain = clip.fl(halve, ApplyTo::NONE, true);
    let m = plain.mask().unwrap().get_frame(0.0).unwrap();
    assert_eq!(m.data(), &[0.5]);

    let cascaded = clip.fl(halve, ApplyTo::MASK, true);
    let m = cascaded.mask().unwrap().get_frame(0.0).unwrap();
    assert_eq!(m.data(), &[0.25]);
}

#[test]
fn fl_time_remaps_single_and_batch_queries() {
    let slow = tone(1).fl_time(|t| t / 2.0, ApplyTo::NONE, false);
    assert_eq!(slow.get_frame(3.0).unwrap().data(), &[1.5]);
    assert_eq!(slow.get_frames(&[1.0, 2.0]).unwrap().data(), &[0.5, 1.0]);
}

#[test]
fn subclip_sets_duration_and_offsets_time() {
    let clip = clock().set_duration(10.0, true).unwrap();

    let sub = clip.subclip(2.0, Some(5.0)).unwrap();
    assert_eq!(sub.duration(), Some(3.0));
    assert_eq!(sub.end(), Some(3.0));
    assert_eq!(value(&sub.get_frame(0.0).unwrap()), 2.0);
    assert_eq!(value(&sub.get_frame(1.5).unwrap()), 3.5);

    assert_eq!(clip.subclip(4.0, None).unwrap().duration(), Some(6.0));

    let neg = clip.subclip(0.0, Some(-2.0)).unwrap();
    let pos = clip.subclip(0.0, Some(8.0)).unwrap();
    assert_eq!(neg.window(), pos.window());
}

#[test]
fn subclip_rejects_bad_ranges() {
    let clip = clock().set_duration(10.0, true).unwrap();
    assert!(matches!(clip.subclip(11.0, None), Err(ClipError::Range(_))));
    assert!(matches!(clip.subclip(-1.0, None), Err(ClipError::Range(_))));
    assert!(matches!(clip.subclip(2.0, Some(12.0)), Err(ClipError::Range(_))));
    assert!(matches!(clip.subclip(5.0, Some(3.0)), Err(ClipError::Range(_))));

    let open = clock();
    assert!(matches!(open.subclip(0.0, Some(-1.0)), Err(ClipError::Range(_))));
    let tail = open.subclip(3.0, None).unwrap();
    assert_eq!(tail.duration(), None);
}

#[test]
fn cutout_skips_interval() {
    let clip = clock().set_duration(10.0, true).unwrap();
    let cut = clip.cutout(2.0, 5.0).unwrap();
    assert_eq!(cut.duration(), Some(7.0));
    assert_eq!(value(&cut.get_frame(1.0).unwrap()), 1.0);
    assert_eq!(value(&cut.get_frame(2.0).unwrap()), 5.0);
    assert_eq!(value(&cut.get_frame(3.0).unwrap()), 6.0);

    assert!(clip.cutout(5.0, 2.0).is_err());
    assert!(clip.cutout(-1.0, 2.0).is_err());
}

#[test]
fn window_edits_cascade_to_sub_clips() {
    let clip = clock()
        .with_audio(tone(2))
        .unwrap()
        .add_mask()
        .set_duration(3.0, true)
        .unwrap()
        .set_start(2.0, true)
        .unwrap();

    assert_eq!(clip.end(), Some(5.0));
    assert_eq!(clip.audio().unwrap().window(), clip.window());
    assert_eq!(clip.mask().unwrap().window(), clip.window());

    let trimmed = clip.set_end(4.0).unwrap();
    assert_eq!(trimmed.duration(), Some(2.0));
    assert_eq!(trimmed.audio().unwrap().duration(), Some(2.0));
}

#[test]
fn is_playing_is_half_open() {
    let clip = clock()
        .set_duration(2.0, true)
        .unwrap()
        .set_start(1.0, true)
        .unwrap();
    assert!(clip.is_playing(clip.start()));
    assert!(!clip.is_playing(3.0));
    assert_eq!(clip.is_playing_many(&[0.5, 1.0, 2.9, 3.0]), vec![false, true, true, false]);
}

#[test]
fn memo_serves_only_the_repeated_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let clip = Clip::video(move |t| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::filled_image(1, 1, &[t as f32, 0.0, 0.0]))
    })
    .with_memoize(true);

    clip.get_frame(1.0).unwrap();
    clip.get_frame(1.0).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    clip.get_frame(2.0).unwrap();
    clip.get_frame(1.0).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Copies start with an empty cell.
    let copy = clip.clone();
    copy.get_frame(1.0).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let plain = clip.with_memoize(false);
    plain.get_frame(5.0).unwrap();
    plain.get_frame(5.0).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn sub_clip_kinds_are_checked() {
    assert!(matches!(clock().with_mask(clock()), Err(ClipError::Shape(_))));
    assert!(matches!(clock().with_audio(clock()), Err(ClipError::Shape(_))));

    let with_audio = clock().with_audio(tone(1)).unwrap();
    assert_eq!(with_audio.audio().unwrap().channels(), Some(1));
    assert!(with_audio.without_audio().audio().is_none());
}

#[test]
fn add_mask_is_opaque_and_sized_like_frames() {
    let clip = Clip::color(Canvas::new(3, 2).unwrap(), [10.0, 20.0, 30.0]).add_mask();
    let mask = clip.mask().unwrap();
    assert_eq!(mask.kind(), ClipKind::Mask);
    let m = mask.get_frame(0.0).unwrap();
    assert_eq!(m.image_dims(), Some((2, 3, 1)));
    assert!(m.data().iter().all(|&v| v == 1.0));

    let custom = Clip::mask_fn(|_| Ok(Frame::filled_image(2, 3, &[0.5])));
    let kept = clip.with_mask(custom).unwrap().add_mask();
    assert_eq!(kept.mask().unwrap().get_frame(0.0).unwrap().data()[0], 0.5);
    assert!(kept.without_mask().mask().is_none());
}

#[test]
fn still_picks_kind_from_channels() {
    let video = Clip::still(Frame::filled_image(2, 2, &[1.0, 2.0, 3.0])).unwrap();
    assert_eq!(video.kind(), ClipKind::Video);
    let mask = Clip::still(Frame::filled_image(2, 2, &[1.0])).unwrap();
    assert_eq!(mask.kind(), ClipKind::Mask);
    assert!(matches!(
        Clip::still(Frame::silence(4, 2)),
        Err(ClipError::Shape(_))
    ));
}

#[test]
fn graph_describes_the_evaluation_chain() {
    let clip = clock()
        .fl(|gf, t| gf.frame(t), ApplyTo::NONE, true)
        .fl_time(|t| t * 2.0, ApplyTo::NONE, true);
    let graph = clip.graph();
    assert_eq!(graph.node, "time_map");
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.inputs[0].inputs[0].node, "procedural");

    let json = serde_json::to_string(&graph).unwrap();
    assert!(json.contains("\"filter\""));
}

#[test]
fn fps_must_be_positive() {
    assert!(clock().with_fps(0.0).is_err());
    assert_eq!(clock().with_fps(24.0).unwrap().fps(), Some(24.0));
}
