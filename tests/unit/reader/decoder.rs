use super::*;

#[test]
fn decodes_each_width() {
    assert_eq!(
        decode_pcm_le(&[0x80, 0x00, 0x7f], SampleWidth::One).unwrap(),
        vec![-1.0, 0.0, 127.0 / 128.0]
    );
    assert_eq!(
        decode_pcm_le(&[0x00, 0x80, 0x00, 0x40], SampleWidth::Two).unwrap(),
        vec![-1.0, 0.5]
    );
    assert_eq!(
        decode_pcm_le(&[0x00, 0x00, 0x00, 0xc0], SampleWidth::Four).unwrap(),
        vec![-0.5]
    );
}

#[test]
fn misaligned_input_is_an_io_error() {
    let err = decode_pcm_le(&[0, 1, 2], SampleWidth::Two).unwrap_err();
    assert!(err.is_io());
}

#[test]
fn frame_bytes_counts_all_channels() {
    let fmt = PcmFormat {
        sample_rate: 8_000,
        channels: 2,
        sample_width: SampleWidth::Four,
    };
    assert_eq!(fmt.frame_bytes(), 8);
}
