use super::*;

#[test]
fn surface_desc_rejects_zero_dimensions() {
    assert!(SurfaceDesc::new(0, 4, Precision::F32).is_err());
    assert!(SurfaceDesc::new(4, 0, Precision::Unorm8).is_err());
    let d = SurfaceDesc::new(4, 3, Precision::F32).unwrap();
    assert_eq!(d.texel_count(), 12);
}

#[test]
fn f32_desc_clamps_to_one_texel() {
    let d = SurfaceDesc::f32(0, 0);
    assert_eq!((d.width, d.height), (1, 1));
    assert_eq!(d.precision, Precision::F32);
}

#[test]
fn frame_id_next_saturates() {
    assert_eq!(FrameId(3).next(), FrameId(4));
    assert_eq!(FrameId(u64::MAX).next(), FrameId(u64::MAX));
}

#[test]
fn same_size_ignores_precision() {
    let a = SurfaceDesc::f32(8, 8);
    let b = SurfaceDesc {
        precision: Precision::Unorm8,
        ..a
    };
    assert!(a.same_size(b));
    assert!(!a.same_size(SurfaceDesc::f32(8, 9)));
}
