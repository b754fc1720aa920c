use super::*;
use crate::foundation::core::Canvas;

#[test]
fn entry_names_are_zero_padded() {
    assert_eq!(frame_entry_name(0), "frame-00000.png");
    assert_eq!(frame_entry_name(42), "frame-00042.png");
}

#[test]
fn png_round_trips_pixels() {
    let frame = FrameRGBA::solid(Canvas::new(3, 2).unwrap(), [10, 20, 30, 255]);
    let png = encode_png(&frame).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (3, 2));
    assert_eq!(decoded.into_raw(), frame.data);
}

#[test]
fn premultiplied_frames_are_unpremultiplied() {
    let frame = FrameRGBA {
        width: 1,
        height: 1,
        data: vec![64, 0, 0, 128],
        premultiplied: true,
    };
    let png = encode_png(&frame).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.into_raw(), vec![128, 0, 0, 128]);
}

#[test]
fn malformed_frame_is_an_archive_failure() {
    let frame = FrameRGBA {
        width: 4,
        height: 4,
        data: vec![0; 3],
        premultiplied: false,
    };
    assert!(matches!(
        encode_png(&frame),
        Err(ReelError::ArchiveFailed(_))
    ));
}

#[test]
fn archive_lists_sequential_entries() {
    let size = Canvas::new(2, 2).unwrap();
    let mut archive = FrameArchive::new();
    assert!(archive.is_empty());
    for i in 0..3u8 {
        let name = archive
            .push_frame(&FrameRGBA::solid(size, [i, i, i, 255]))
            .unwrap();
        assert_eq!(name, frame_entry_name(i as usize));
    }
    assert_eq!(archive.len(), 3);

    let bytes = archive.finish().unwrap();
    let zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut names: Vec<&str> = zip.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["frame-00000.png", "frame-00001.png", "frame-00002.png"]
    );
}
