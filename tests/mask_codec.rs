//! Permission mask codec tests
//!
//! Bit layout, the "VCUD" string form and its lenient parser.

use menugate::mask::{is_valid, mask_to_names, names_to_mask};
use menugate::{decode, encode, parse_binary_string, to_binary_string, Perms, ALL, CREATE, DELETE, UPDATE, VIEW};

// ============================================================================
// Bits
// ============================================================================

#[test]
fn bit_values() {
    assert_eq!(VIEW, 8);
    assert_eq!(CREATE, 4);
    assert_eq!(UPDATE, 2);
    assert_eq!(DELETE, 1);
    assert_eq!(ALL, 15);
}

/// Verify decode and encode are inverses over the whole range
#[test]
fn decode_encode_inverse() {
    for m in 0..=ALL {
        let p = decode(m);
        assert_eq!(encode(p.view, p.create, p.update, p.delete), m);
        assert_eq!(p.mask(), m);
        assert_eq!(Perms::from(m), p);
    }
}

#[test]
fn decode_named_masks() {
    assert_eq!(decode(0), Perms::NONE);
    assert_eq!(decode(15), Perms::FULL);
    assert_eq!(decode(12), Perms { view: true, create: true, update: false, delete: false });
    assert_eq!(decode(1), Perms { view: false, create: false, update: false, delete: true });
}

// ============================================================================
// Binary string
// ============================================================================

#[test]
fn binary_string_is_msb_first() {
    assert_eq!(to_binary_string(0), "0000");
    assert_eq!(to_binary_string(8), "1000");
    assert_eq!(to_binary_string(12), "1100");
    assert_eq!(to_binary_string(14), "1110");
    assert_eq!(to_binary_string(15), "1111");
    assert_eq!(to_binary_string(1), "0001");
}

#[test]
fn binary_string_inverse() {
    for m in 0..=ALL {
        assert_eq!(parse_binary_string(&to_binary_string(m)), m);
    }
}

/// Verify malformed input parses to no permission instead of failing
#[test]
fn parse_is_lenient() {
    assert_eq!(parse_binary_string(""), 0);
    assert_eq!(parse_binary_string("11"), 0);
    assert_eq!(parse_binary_string("11111"), 0);
    assert_eq!(parse_binary_string("11x0"), 0);
    assert_eq!(parse_binary_string("abcd"), 0);
    assert_eq!(parse_binary_string("1010"), 10);
}

// ============================================================================
// Range and names
// ============================================================================

#[test]
fn valid_range() {
    assert!(is_valid(0));
    assert!(is_valid(15));
    assert!(!is_valid(-1));
    assert!(!is_valid(16));
    assert!(!is_valid(255));
}

#[test]
fn names_round_trip() {
    assert_eq!(mask_to_names(10), vec!["view", "update"]);
    assert_eq!(mask_to_names(0), Vec::<&str>::new());
    assert_eq!(names_to_mask(&["view", "delete"]), 9);
    assert_eq!(names_to_mask(&["view", "bogus"]), 8);
}
