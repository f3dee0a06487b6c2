use super::*;

fn checker(width: u32, height: u32) -> TextureData {
    TextureData {
        name: "checker".to_string(),
        width,
        height,
        pixels: vec![0u8; (width * height) as usize * TEXTURE_BYTES_PER_PIXEL],
    }
}

#[test]
fn test_valid_texture_passes() {
    assert!(checker(64, 32).validate().is_ok());
}

#[test]
fn test_one_by_one_texture_passes() {
    assert!(checker(1, 1).validate().is_ok());
}

#[test]
fn test_zero_extent_rejected() {
    let mut texture = checker(4, 4);
    texture.width = 0;
    assert!(texture.validate().is_err());

    let mut texture = checker(4, 4);
    texture.height = 0;
    assert!(texture.validate().is_err());
}

#[test]
fn test_wrong_pixel_length_rejected() {
    let mut texture = checker(4, 4);
    texture.pixels.pop();
    let err = texture.validate().unwrap_err();
    assert!(format!("{}", err).contains("expected"));
}

#[test]
fn test_byte_size() {
    let texture = checker(16, 8);
    assert_eq!(texture.byte_size(), 16 * 8 * 4);
}
