/// Generate a little-endian getter/setter pair for a fixed header field.
///
/// `name: u16, OFFSET` yields `name()` and `set_name(v)`.
/// `name: link, OFFSET` stores a page number where 0 means "no page" and
/// exposes it as `Option<PageNo>`.
#[macro_export]
macro_rules! page_header_field {
    ($name:ident: link, $off:expr) => {
        ::paste::paste! {
            #[inline]
            pub fn $name(&self) -> Option<$crate::types::PageNo> {
                let mut raw = [0u8; ::std::mem::size_of::<$crate::types::PageNo>()];
                raw.copy_from_slice(&self.buf[$off..$off + ::std::mem::size_of::<$crate::types::PageNo>()]);
                match $crate::types::PageNo::from_le_bytes(raw) {
                    0 => None,
                    page_no => Some(page_no),
                }
            }

            #[inline]
            pub fn [<set_ $name>](&mut self, value: Option<$crate::types::PageNo>) {
                let raw = value.unwrap_or(0).to_le_bytes();
                self.buf[$off..$off + ::std::mem::size_of::<$crate::types::PageNo>()].copy_from_slice(&raw);
            }
        }
    };
    ($name:ident: $ty:ty, $off:expr) => {
        ::paste::paste! {
            #[inline]
            pub fn $name(&self) -> $ty {
                let mut raw = [0u8; ::std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&self.buf[$off..$off + ::std::mem::size_of::<$ty>()]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            pub fn [<set_ $name>](&mut self, value: $ty) {
                self.buf[$off..$off + ::std::mem::size_of::<$ty>()].copy_from_slice(&value.to_le_bytes());
            }
        }
    };
}

/// Bit helpers over a byte slice used as a bitmap (bit i lives in byte i / 8)
#[macro_export]
macro_rules! bitmap_get {
    ($bits:expr, $i:expr) => {
        ($bits[($i) / 8] >> (($i) % 8)) & 1 == 1
    };
}

#[macro_export]
macro_rules! bitmap_set {
    ($bits:expr, $i:expr, $value:expr) => {
        if $value {
            $bits[($i) / 8] |= 1 << (($i) % 8);
        } else {
            $bits[($i) / 8] &= !(1 << (($i) % 8));
        }
    };
}
