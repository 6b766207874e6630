//! Unit conversions shared by the formatters

/// Warmest supported color temperature (~2700K)
pub const COLOR_TEMP_MAX_MIREDS: u16 = 370;

/// Coolest supported color temperature (~6500K)
pub const COLOR_TEMP_MIN_MIREDS: u16 = 153;

/// Rescale `value` from `[0, old_max]` to `[0, new_max]`, rounding to nearest
pub fn rescale(value: u32, new_max: u32, old_max: u32) -> u32 {
    if old_max == 0 {
        return 0;
    }
    (value as f64 * (new_max as f64 / old_max as f64)).round() as u32
}

/// Convert mireds to a white value in `[0, max_value]`
pub fn mireds_to_white_val(mireds: u16, max_value: u8) -> u8 {
    let clamped = mireds.clamp(COLOR_TEMP_MIN_MIREDS, COLOR_TEMP_MAX_MIREDS) - COLOR_TEMP_MIN_MIREDS;
    rescale(
        clamped as u32,
        max_value as u32,
        (COLOR_TEMP_MAX_MIREDS - COLOR_TEMP_MIN_MIREDS) as u32,
    ) as u8
}

/// Convert a white value in `[0, max_value]` to mireds
pub fn white_val_to_mireds(value: u8, max_value: u8) -> u16 {
    let scaled = rescale(
        value.min(max_value) as u32,
        (COLOR_TEMP_MAX_MIREDS - COLOR_TEMP_MIN_MIREDS) as u32,
        max_value as u32,
    );
    COLOR_TEMP_MIN_MIREDS + scaled as u16
}

/// Degrees of hue to a full byte
pub fn hue_to_byte(hue: u16) -> u8 {
    rescale((hue % 360) as u32, 255, 360) as u8
}

/// Full byte to degrees of hue
pub fn byte_to_hue(value: u8) -> u16 {
    (rescale(value as u32, 360, 255) % 360) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_rounds() {
        assert_eq!(rescale(50, 255, 100), 128);
        assert_eq!(rescale(0, 255, 100), 0);
        assert_eq!(rescale(100, 255, 100), 255);
        assert_eq!(rescale(10, 10, 0), 0);
    }

    #[test]
    fn test_mireds_bounds() {
        assert_eq!(white_val_to_mireds(0, 100), 153);
        assert_eq!(white_val_to_mireds(100, 100), 370);
        assert_eq!(mireds_to_white_val(100, 100), 0);
        assert_eq!(mireds_to_white_val(500, 100), 100);
    }

    #[test]
    fn test_white_val_survives_mireds() {
        for v in 0..=100u8 {
            assert_eq!(mireds_to_white_val(white_val_to_mireds(v, 100), 100), v);
        }
    }

    #[test]
    fn test_hue_byte_wraps() {
        assert_eq!(hue_to_byte(0), 0);
        assert_eq!(hue_to_byte(360), 0);
        assert_eq!(byte_to_hue(255), 0);
        assert_eq!(byte_to_hue(128), 181);
    }
}
