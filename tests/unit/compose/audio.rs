use super::*;

fn constant(channels: u16, values: &'static [f32], duration: f64) -> Clip {
    Clip::audio_from_fn(channels, move |ts| {
        let mut out = Frame::silence(ts.len(), usize::from(channels));
        for row in out.data_mut().chunks_exact_mut(usize::from(channels)) {
            row.copy_from_slice(values);
        }
        Ok(out)
    })
    .unwrap()
    .set_duration(duration, true)
    .unwrap()
}

#[test]
fn playing_children_are_summed() {
    let a = constant(2, &[0.5, 0.25], 2.0);
    let b = constant(2, &[0.25, 0.25], 2.0).set_start(1.0, true).unwrap();
    let mix = composite_audio(vec![a, b]).unwrap();

    assert_eq!(mix.duration(), Some(3.0));
    assert_eq!(mix.channels(), Some(2));
    let out = mix.get_frames(&[0.5, 1.5, 2.5, 3.5]).unwrap();
    assert_eq!(
        out.data(),
        &[0.5, 0.25, 0.75, 0.5, 0.25, 0.25, 0.0, 0.0]
    );
}

#[test]
fn mono_children_broadcast_into_wider_mixes() {
    let mono = constant(1, &[0.5], 1.0);
    let stereo = constant(2, &[0.0, 0.25], 1.0);
    let mix = composite_audio(vec![mono, stereo]).unwrap();
    assert_eq!(mix.get_frame(0.0).unwrap().data(), &[0.5, 0.75]);
}

#[test]
fn incompatible_channel_counts_fail_on_read() {
    let mix = composite_audio(vec![
        constant(2, &[0.0, 0.0], 1.0),
        constant(3, &[0.0, 0.0, 0.0], 1.0),
    ])
    .unwrap();
    assert_eq!(mix.channels(), Some(3));
    assert!(matches!(mix.get_frame(0.5), Err(ClipError::Shape(_))));
}

#[test]
fn composite_audio_rejects_video_and_empty_input() {
    let video = Clip::color(
        crate::foundation::core::Canvas::new(1, 1).unwrap(),
        [0.0; 3],
    );
    assert!(matches!(
        composite_audio(vec![video]),
        Err(ClipError::Shape(_))
    ));
    assert!(composite_audio(Vec::new()).is_err());
}

#[test]
fn concatenation_places_clips_back_to_back() {
    let joined = concatenate_audio(vec![
        constant(1, &[0.1], 1.5),
        constant(1, &[0.2], 0.5),
        constant(1, &[0.3], 1.0),
    ])
    .unwrap();
    assert_eq!(joined.duration(), Some(3.0));
    let out = joined.get_frames(&[0.0, 1.6, 2.2]).unwrap();
    assert_eq!(out.data(), &[0.1, 0.2, 0.3]);

    let open = Clip::audio_from_fn(1, |ts| Ok(Frame::silence(ts.len(), 1))).unwrap();
    assert!(matches!(
        concatenate_audio(vec![open]),
        Err(ClipError::State(_))
    ));
}

#[test]
fn mix_graph_lists_children() {
    let mix = composite_audio(vec![constant(1, &[0.0], 1.0), constant(1, &[0.0], 1.0)]).unwrap();
    let graph = mix.graph();
    assert_eq!(graph.node, "mix");
    assert_eq!(graph.inputs.len(), 2);
}
