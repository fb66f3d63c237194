//! Byte ⇄ text conversion for the serial link.

/// Returned for a frame that decodes to nothing but whitespace. An empty
/// line from the terminal is still a message and still gets a reply.
pub const EMPTY_MESSAGE: &str = "empty_message";

/// Decode a frame: UTF-8, then ASCII, then Latin-1, first non-empty wins.
///
/// Undecodable bytes become U+FFFD instead of failing.
pub fn decode_frame(raw: &[u8]) -> String {
    let utf8 = String::from_utf8_lossy(raw);
    let candidates = [utf8.trim().to_string(), decode_ascii(raw), decode_latin1(raw)];
    candidates
        .into_iter()
        .find(|text| !text.is_empty())
        .unwrap_or_else(|| EMPTY_MESSAGE.to_string())
}

fn decode_ascii(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
        .collect::<String>()
        .trim()
        .to_string()
}

fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect::<String>().trim().to_string()
}

/// Collapse a reply onto one line and append the terminator.
///
/// Line breaks inside the reply would be read by the terminal as separate
/// messages, so every run of CR/LF becomes a single space.
pub fn frame_reply(reply: &str) -> Vec<u8> {
    let mut line = reply
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line.into_bytes()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
