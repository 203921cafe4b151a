//! Statistical text and encoding sniffing.
//!
//! Answers "is this byte buffer text, and in what encoding?" without trusting
//! the declared MIME type. Detection runs over a bounded sample so arbitrarily
//! large uploads cost a fixed amount of work here.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// How much of the buffer the text/binary decision looks at.
const SAMPLE_BYTES: usize = 1024;

/// Minimum share of printable-or-whitespace characters for a buffer to
/// count as text.
const PRINTABLE_THRESHOLD: f64 = 0.8;

/// Decide whether a byte buffer is likely text.
///
/// Samples the first 1KB, asks chardetng for an encoding guess, and accepts
/// the guess only when the detector assesses it as high-confidence. The
/// decoded sample must then clear the printable-character threshold.
/// Empty input and low-confidence guesses are treated as binary.
pub fn is_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample = &bytes[..bytes.len().min(SAMPLE_BYTES)];

    // Pure ASCII needs no detection; the printable check alone decides.
    if sample.is_ascii() {
        let decoded = String::from_utf8_lossy(sample);
        return printable_ratio(&decoded) > PRINTABLE_THRESHOLD;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    let (encoding, high_confidence) = detector.guess_assess(None, true);
    if !high_confidence {
        return false;
    }

    let (decoded, _, _) = encoding.decode(sample);
    printable_ratio(&decoded) > PRINTABLE_THRESHOLD
}

/// Share of characters that are printable or whitespace.
///
/// Returns 0.0 for empty input so callers can treat "nothing decoded"
/// as binary.
pub fn printable_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total as f64
}

/// Decode a full buffer to a string, never failing.
///
/// Detects the encoding over the whole buffer and strict-decodes with it.
/// If that decode reported malformed sequences, the buffer is re-decoded as
/// UTF-8 with replacement characters instead.
pub fn decode_lossy(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding: &'static Encoding = detector.guess(None, true);

    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        decoded.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_text_is_text() {
        let text = b"The quick brown fox jumps over the lazy dog.\nSecond line here.\n";
        assert!(is_text(text));
    }

    #[test]
    fn utf8_text_is_text() {
        let text = "Grüße aus Köln — Encoding-Test mit Umlauten und Satzzeichen.".as_bytes();
        assert!(is_text(text));
    }

    #[test]
    fn control_heavy_bytes_are_binary() {
        // Cycle through C0 control bytes; only \t \n \r count as whitespace.
        let bytes: Vec<u8> = (0..1024u32).map(|i| (i * 7 % 32) as u8).collect();
        assert!(!is_text(&bytes));
    }

    #[test]
    fn empty_buffer_is_binary() {
        assert!(!is_text(b""));
    }

    #[test]
    fn decode_lossy_roundtrips_utf8() {
        let text = "plain utf-8 content with naïve accents";
        assert_eq!(decode_lossy(text.as_bytes()), text);
    }

    #[test]
    fn decode_lossy_never_panics_on_garbage() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        let decoded = decode_lossy(&bytes);
        assert!(!decoded.is_empty());
    }

    #[test]
    fn printable_ratio_bounds() {
        assert_eq!(printable_ratio(""), 0.0);
        assert!(printable_ratio("hello world") > 0.99);
        assert!(printable_ratio("\u{0000}\u{0001}\u{0002}\u{0003}") < 0.01);
    }
}
