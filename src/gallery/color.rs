/// Parses the subset of CSS colors the manifest generator emits: hex
/// notation and a handful of named colors. Returns RGBA.
pub fn parse_css_color(value: &str) -> Option<[u8; 4]> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }

    let rgb = match value.to_ascii_lowercase().as_str() {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "orange" => [255, 165, 0],
        "purple" => [128, 0, 128],
        "pink" => [255, 192, 203],
        "gray" | "grey" => [128, 128, 128],
        "brown" => [165, 42, 42],
        "gold" => [255, 215, 0],
        _ => return None,
    };
    Some([rgb[0], rgb[1], rgb[2], 255])
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |index: usize| u8::from_str_radix(&hex[index..index + 1], 16).ok();
    let byte = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok();

    match hex.len() {
        3 => Some([nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17, 255]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(parse_css_color("#fff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_css_color("#1a2B3c"), Some([0x1a, 0x2b, 0x3c, 255]));
        assert_eq!(parse_css_color(" #00000080 "), Some([0, 0, 0, 0x80]));
    }

    #[test]
    fn parses_named_colors_case_insensitively() {
        assert_eq!(parse_css_color("Orange"), Some([255, 165, 0, 255]));
    }

    #[test]
    fn rejects_unknown_values() {
        assert_eq!(parse_css_color(""), None);
        assert_eq!(parse_css_color("#12"), None);
        assert_eq!(parse_css_color("#gggggg"), None);
        assert_eq!(parse_css_color("rebeccapurple"), None);
    }
}
