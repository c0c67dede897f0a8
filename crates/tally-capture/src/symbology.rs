//! # Symbology Recognition
//!
//! Scanner hardware hands over payloads it has already decoded. This module
//! decides which engine claims a payload and under which symbology.
//!
//! ## AIM Symbology Identifiers (ISO/IEC 15424)
//! Many scanners can prefix each payload with `]` + code letter + modifier:
//!
//! ```text
//! ┌────────┬──────────────────────┬──────────┐
//! │ prefix │ symbology family     │ engine   │
//! ├────────┼──────────────────────┼──────────┤
//! │ ]C     │ Code 128             │ linear   │
//! │ ]E     │ EAN / UPC            │ linear   │
//! │ ]Q     │ QR Code              │ matrix   │
//! │ ]d     │ Data Matrix          │ matrix   │
//! │ ]z     │ Aztec                │ matrix   │
//! │ ]L     │ PDF417               │ matrix   │
//! └────────┴──────────────────────┴──────────┘
//! ```
//!
//! The prefix is stripped from the reported text. Without a prefix the
//! payload shape decides: digit strings of EAN/UPC length must carry a valid
//! check digit, other printable ASCII is taken as Code 128, and the matrix
//! engine accepts any non-empty payload.

use std::fmt;

/// Barcode symbology of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Code128,
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Qr,
    DataMatrix,
    Aztec,
    Pdf417,
    /// A 2D payload that carried no identifier.
    UnidentifiedMatrix,
}

impl Symbology {
    pub fn name(&self) -> &'static str {
        match self {
            Symbology::Code128 => "code_128",
            Symbology::Ean13 => "ean_13",
            Symbology::Ean8 => "ean_8",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Qr => "qr_code",
            Symbology::DataMatrix => "data_matrix",
            Symbology::Aztec => "aztec",
            Symbology::Pdf417 => "pdf417",
            Symbology::UnidentifiedMatrix => "matrix",
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(
            self,
            Symbology::Code128 | Symbology::Ean13 | Symbology::Ean8 | Symbology::UpcA | Symbology::UpcE
        )
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// AIM Prefix
// =============================================================================

/// Symbology family named by an AIM code letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AimFamily {
    Code128,
    EanUpc,
    Qr,
    DataMatrix,
    Aztec,
    Pdf417,
}

impl AimFamily {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            b'C' => Some(AimFamily::Code128),
            b'E' => Some(AimFamily::EanUpc),
            b'Q' => Some(AimFamily::Qr),
            b'd' => Some(AimFamily::DataMatrix),
            b'z' => Some(AimFamily::Aztec),
            b'L' => Some(AimFamily::Pdf417),
            _ => None,
        }
    }
}

/// Splits a recognized AIM prefix off `raw`.
///
/// Unknown code letters are left in place and treated as payload.
pub fn split_aim(raw: &str) -> (Option<AimFamily>, &str) {
    let bytes = raw.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b']' && bytes[2].is_ascii_alphanumeric() {
        if let Some(family) = AimFamily::from_code(bytes[1]) {
            return (Some(family), &raw[3..]);
        }
    }
    (None, raw)
}

// =============================================================================
// Check Digits
// =============================================================================

/// GS1 mod-10 check digit over `data` (digits without the check digit).
fn gs1_check_digit(data: &[u8]) -> u8 {
    let sum: u32 = data
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| u32::from(d - b'0') * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn has_valid_check_digit(digits: &[u8]) -> bool {
    match digits.split_last() {
        Some((check, data)) if !data.is_empty() => gs1_check_digit(data) == check - b'0',
        _ => false,
    }
}

/// Expands an 8-digit UPC-E to the 11 data digits of its UPC-A form.
fn expand_upc_e(digits: &[u8]) -> Option<Vec<u8>> {
    if digits.len() != 8 || !matches!(digits[0], b'0' | b'1') {
        return None;
    }
    let ns = digits[0];
    let x = &digits[1..7];

    let mut out = Vec::with_capacity(11);
    out.push(ns);
    match x[5] {
        b'0'..=b'2' => {
            out.extend_from_slice(&[x[0], x[1], x[5], b'0', b'0', b'0', b'0', x[2], x[3], x[4]]);
        }
        b'3' => {
            out.extend_from_slice(&[x[0], x[1], x[2], b'0', b'0', b'0', b'0', b'0', x[3], x[4]]);
        }
        b'4' => {
            out.extend_from_slice(&[x[0], x[1], x[2], x[3], b'0', b'0', b'0', b'0', b'0', x[4]]);
        }
        _ => {
            out.extend_from_slice(&[x[0], x[1], x[2], x[3], x[4], b'0', b'0', b'0', b'0', x[5]]);
        }
    }
    Some(out)
}

fn upc_e_is_valid(digits: &[u8]) -> bool {
    expand_upc_e(digits).is_some_and(|data| gs1_check_digit(&data) == digits[7] - b'0')
}

/// Classifies an all-digit EAN/UPC payload, verifying its check digit.
fn classify_ean_upc(text: &str) -> Option<Symbology> {
    let digits = text.as_bytes();
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    match digits.len() {
        13 if has_valid_check_digit(digits) => Some(Symbology::Ean13),
        12 if has_valid_check_digit(digits) => Some(Symbology::UpcA),
        8 if has_valid_check_digit(digits) => Some(Symbology::Ean8),
        8 if upc_e_is_valid(digits) => Some(Symbology::UpcE),
        _ => None,
    }
}

fn is_ean_upc_length(text: &str) -> bool {
    matches!(text.len(), 8 | 12 | 13) && text.bytes().all(|b| b.is_ascii_digit())
}

fn is_code128_text(text: &str) -> bool {
    !text.is_empty() && text.is_ascii() && !text.bytes().any(|b| b.is_ascii_control())
}

// =============================================================================
// Engines
// =============================================================================

/// What the linear engine makes of a raw payload.
pub fn recognize_linear(raw: &str) -> Option<(Symbology, &str)> {
    let (aim, text) = split_aim(raw);

    match aim {
        Some(AimFamily::Code128) => is_code128_text(text).then_some((Symbology::Code128, text)),
        Some(AimFamily::EanUpc) => classify_ean_upc(text).map(|s| (s, text)),
        Some(_) => None,
        None => {
            if is_ean_upc_length(text) {
                // A digit run of retail length with a bad check digit is a misread.
                classify_ean_upc(text).map(|s| (s, text))
            } else {
                is_code128_text(text).then_some((Symbology::Code128, text))
            }
        }
    }
}

/// What the matrix engine makes of a raw payload.
pub fn recognize_matrix(raw: &str) -> Option<(Symbology, &str)> {
    let (aim, text) = split_aim(raw);
    if text.is_empty() {
        return None;
    }

    match aim {
        Some(AimFamily::Qr) => Some((Symbology::Qr, text)),
        Some(AimFamily::DataMatrix) => Some((Symbology::DataMatrix, text)),
        Some(AimFamily::Aztec) => Some((Symbology::Aztec, text)),
        Some(AimFamily::Pdf417) => Some((Symbology::Pdf417, text)),
        Some(AimFamily::Code128) | Some(AimFamily::EanUpc) => None,
        None => Some((Symbology::UnidentifiedMatrix, text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_aim() {
        assert_eq!(split_aim("]E04006381333931"), (Some(AimFamily::EanUpc), "4006381333931"));
        assert_eq!(split_aim("]Q1hello"), (Some(AimFamily::Qr), "hello"));
        assert_eq!(split_aim("]X0abc"), (None, "]X0abc"));
        assert_eq!(split_aim("]C"), (None, "]C"));
        assert_eq!(split_aim("plain"), (None, "plain"));
    }

    #[test]
    fn test_retail_check_digits() {
        assert_eq!(classify_ean_upc("4006381333931"), Some(Symbology::Ean13));
        assert_eq!(classify_ean_upc("5901234123457"), Some(Symbology::Ean13));
        assert_eq!(classify_ean_upc("036000291452"), Some(Symbology::UpcA));
        assert_eq!(classify_ean_upc("96385074"), Some(Symbology::Ean8));
        assert_eq!(classify_ean_upc("04252614"), Some(Symbology::UpcE));

        assert_eq!(classify_ean_upc("4006381333932"), None);
        assert_eq!(classify_ean_upc("036000291453"), None);
        assert_eq!(classify_ean_upc("12345"), None);
    }

    #[test]
    fn test_upc_e_expansion() {
        assert_eq!(expand_upc_e(b"04252614").unwrap(), b"04210000526".to_vec());
        assert!(expand_upc_e(b"24252614").is_none());
    }

    #[test]
    fn test_linear_engine() {
        assert_eq!(
            recognize_linear("4006381333931"),
            Some((Symbology::Ean13, "4006381333931"))
        );
        assert_eq!(
            recognize_linear("]C1SKU-0042"),
            Some((Symbology::Code128, "SKU-0042"))
        );
        assert_eq!(recognize_linear("A1"), Some((Symbology::Code128, "A1")));

        // Misread retail code, matrix prefix, non-ASCII.
        assert_eq!(recognize_linear("4006381333932"), None);
        assert_eq!(recognize_linear("]Q1A1"), None);
        assert_eq!(recognize_linear("café"), None);
        assert_eq!(recognize_linear(""), None);
    }

    #[test]
    fn test_matrix_engine() {
        assert_eq!(
            recognize_matrix("]Q1https://example.com/p/1"),
            Some((Symbology::Qr, "https://example.com/p/1"))
        );
        assert_eq!(recognize_matrix("]d2LOT42"), Some((Symbology::DataMatrix, "LOT42")));
        assert_eq!(recognize_matrix("café"), Some((Symbology::UnidentifiedMatrix, "café")));

        assert_eq!(recognize_matrix("]E04006381333931"), None);
        assert_eq!(recognize_matrix("]Q1"), None);
        assert_eq!(recognize_matrix(""), None);
    }

    #[test]
    fn test_plain_payload_claimed_by_both() {
        assert!(recognize_linear("A1").is_some());
        assert!(recognize_matrix("A1").is_some());
    }
}
