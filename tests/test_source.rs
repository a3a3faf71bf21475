//! Integration tests for directory enumeration and decoding.

mod common;

use carcolors::ImageSource;
use common::*;

#[test]
fn test_enumerates_images_in_lexical_order() -> anyhow::Result<()> {
    let fixture = BatchFixture::new();
    fixture.add("b.png", &solid(4, 4, GRAY));
    fixture.add("a.jpg", &solid(4, 4, GRAY));
    fixture.add("C.PNG", &solid(4, 4, GRAY));
    std::fs::write(fixture.input.join("notes.txt"), "not an image")?;
    std::fs::create_dir(fixture.input.join("nested.png"))?;

    let source = ImageSource::open(&fixture.input)?;

    assert_eq!(source.file_names(), &["C.PNG", "a.jpg", "b.png"]);
    Ok(())
}

#[test]
fn test_iteration_can_restart() -> anyhow::Result<()> {
    let fixture = BatchFixture::new();
    fixture.add("one.png", &solid(3, 2, RED));
    fixture.add("two.png", &solid(5, 7, BLUE));

    let source = ImageSource::open(&fixture.input)?;
    let first: Vec<String> = source.iter().map(|(name, _)| name).collect();
    let second: Vec<String> = source.iter().map(|(name, _)| name).collect();
    assert_eq!(first, second);

    let (_, decoded) = source.iter().nth(1).expect("two entries");
    let decoded = decoded?;
    assert_eq!((decoded.record.width, decoded.record.height), (5, 7));
    assert!(decoded.record.size_bytes > 0);
    assert_eq!(decoded.record.resolution(), "5x7");
    Ok(())
}

#[test]
fn test_undecodable_file_is_reported_per_entry() -> anyhow::Result<()> {
    let fixture = BatchFixture::new();
    fixture.add("good.png", &solid(4, 4, GRAY));
    std::fs::write(fixture.input.join("broken.jpg"), b"definitely not a jpeg")?;

    let source = ImageSource::open(&fixture.input)?;
    let results: Vec<_> = source.iter().collect();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "broken.jpg");
    assert!(results[0].1.is_err());
    assert!(results[1].1.is_ok());
    Ok(())
}

#[test]
fn test_missing_directory_is_an_error() {
    let fixture = BatchFixture::new();
    let result = ImageSource::open(&fixture.dir.path().join("missing"));
    assert!(matches!(result, Err(PipelineError::InputDir { .. })));
}
