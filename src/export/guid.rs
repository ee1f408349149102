//! IFC GlobalId generation.
//!
//! A GlobalId is a 128-bit GUID written as 22 characters of IFC's own base64
//! alphabet: one leading character for the top two bits, then 21 characters
//! of six bits each.

use uuid::Uuid;

pub const IFC_GUID_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Random (version 4) GUID in compressed IFC form.
#[must_use]
pub fn new_ifc_guid() -> String {
    compress_guid(Uuid::new_v4().as_u128())
}

#[must_use]
pub fn compress_guid(bits: u128) -> String {
    let mut out = String::with_capacity(22);
    out.push(IFC_GUID_ALPHABET[(bits >> 126) as usize] as char);
    for k in 1..22 {
        let shift = 126 - 6 * k;
        out.push(IFC_GUID_ALPHABET[((bits >> shift) & 0x3F) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn compresses_known_values() {
        assert_eq!(compress_guid(0), "0".repeat(22));
        assert_eq!(compress_guid(u128::MAX), format!("3{}", "$".repeat(21)));
        assert_eq!(compress_guid(1), format!("{}1", "0".repeat(21)));
    }

    fn expand(id: &str) -> u128 {
        id.bytes().fold(0u128, |acc, b| {
            let digit = IFC_GUID_ALPHABET.iter().position(|&c| c == b).unwrap();
            (acc << 6) | digit as u128
        })
    }

    #[test]
    fn random_ids_carry_a_v4_uuid() {
        let bits = expand(&new_ifc_guid());
        let uuid = Uuid::from_u128(bits);
        assert_eq!(uuid.get_version_num(), 4);
        assert_eq!(uuid.get_variant(), uuid::Variant::RFC4122);
        assert_eq!(compress_guid(bits).len(), 22);
    }

    #[test]
    fn random_ids_are_well_formed_and_distinct() {
        let ids: HashSet<String> = (0..256).map(|_| new_ifc_guid()).collect();
        assert_eq!(ids.len(), 256);
        for id in &ids {
            assert_eq!(id.len(), 22);
            assert!(id.bytes().all(|b| IFC_GUID_ALPHABET.contains(&b)));
            assert!(matches!(id.as_bytes()[0], b'0'..=b'3'));
        }
    }
}
