//! Access permission flags, ISO 32000-1 Table 22.

use bitflags::bitflags;

bitflags! {
    /// User access permissions stored in the `/P` entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        const PRINT = 1 << 2;
        const MODIFY_CONTENTS = 1 << 3;
        const COPY = 1 << 4;
        const MODIFY_ANNOTATIONS = 1 << 5;
        const FILL_FORMS = 1 << 8;
        const ACCESSIBILITY = 1 << 9;
        const ASSEMBLE = 1 << 10;
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

/// Bits 7-8 and 13-32 must be set in `/P`.
const RESERVED_BITS: u32 = 0xFFFF_F0C0;

impl Permissions {
    /// Signed `/P` value as it appears in the encryption dictionary.
    pub fn p_value(&self) -> i32 {
        (self.bits() | RESERVED_BITS) as i32
    }

    pub fn from_p_value(p: i32) -> Self {
        Permissions::from_bits_truncate(p as u32)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p_value_sets_reserved_bits() {
        let p = Permissions::PRINT.p_value();
        assert!(p < 0);
        assert_eq!(p as u32 & RESERVED_BITS, RESERVED_BITS);
        assert_eq!(p as u32 & Permissions::PRINT.bits(), Permissions::PRINT.bits());
    }

    #[test]
    fn test_p_value_roundtrip() {
        let perms = Permissions::PRINT | Permissions::COPY | Permissions::ACCESSIBILITY;
        assert_eq!(Permissions::from_p_value(perms.p_value()), perms);
        assert_eq!(Permissions::all().p_value(), -4);
    }
}
