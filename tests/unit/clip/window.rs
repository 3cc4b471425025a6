use super::*;

#[test]
fn window_is_half_open() {
    let w = ClipWindow::with_length(2.0).unwrap();
    assert!(w.is_playing(0.0));
    assert!(w.is_playing(1.999));
    assert!(!w.is_playing(2.0));
    assert!(!w.is_playing(-0.1));

    let open = ClipWindow::unbounded();
    assert!(open.is_playing(1e9));
}

#[test]
fn start_edit_moves_end_or_recomputes_duration() {
    let w = ClipWindow::with_length(3.0).unwrap();

    let moved = w.with_start(1.0, true).unwrap();
    assert_eq!(moved.start(), 1.0);
    assert_eq!(moved.end(), Some(4.0));
    assert_eq!(moved.duration(), Some(3.0));

    let kept_end = w.with_start(1.0, false).unwrap();
    assert_eq!(kept_end.end(), Some(3.0));
    assert_eq!(kept_end.duration(), Some(2.0));

    assert!(matches!(
        w.with_start(5.0, false),
        Err(ClipError::Range(_))
    ));
}

#[test]
fn end_edit_derives_duration() {
    let w = ClipWindow::unbounded().with_start(1.0, true).unwrap();
    assert_eq!(w.duration(), None);

    let w = w.with_end(4.0).unwrap();
    assert_eq!(w.duration(), Some(3.0));
    assert!(w.with_end(0.5).is_err());
}

#[test]
fn duration_edit_keeps_end_when_asked() {
    let w = ClipWindow::with_length(10.0).unwrap();
    let w2 = w.with_duration(4.0, false).unwrap();
    assert_eq!(w2.start(), 6.0);
    assert_eq!(w2.end(), Some(10.0));

    assert!(matches!(
        ClipWindow::unbounded().with_duration(4.0, false),
        Err(ClipError::State(_))
    ));
    assert!(w.with_duration(-1.0, true).is_err());
}

#[test]
fn many_short_circuits_outside_window() {
    let w = ClipWindow::with_length(1.0)
        .unwrap()
        .with_start(2.0, true)
        .unwrap();
    assert_eq!(w.is_playing_many(&[0.0, 1.0]), vec![false, false]);
    assert_eq!(w.is_playing_many(&[3.0, 4.0]), vec![false, false]);
    assert_eq!(
        w.is_playing_many(&[1.5, 2.0, 2.5, 3.0]),
        vec![false, true, true, false]
    );
    assert!(w.is_playing_many(&[]).is_empty());
}
