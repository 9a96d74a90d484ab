use std::fmt;
use std::rc::Rc;

/// One step of an override chain.
///
/// Either a constant which ignores the natural value or a named transform of it. Transforms are
/// shared through `Rc`, so cloning a chain is cheap, and the name shows up in logs.
pub enum Modification<T> {
    Explicit(T),
    Transform {
        name: &'static str,
        apply: Rc<dyn Fn(T) -> T>,
    },
}

impl<T> Modification<T> {
    pub fn explicit(value: T) -> Self {
        Modification::Explicit(value)
    }

    pub fn transform<F>(name: &'static str, apply: F) -> Self
    where
        F: Fn(T) -> T + 'static,
    {
        Modification::Transform {
            name,
            apply: Rc::new(apply),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Modification::Explicit(_) => "explicit",
            Modification::Transform { name, .. } => *name,
        }
    }
}

impl<T: Clone> Modification<T> {
    pub fn apply(&self, value: T) -> T {
        match self {
            Modification::Explicit(explicit) => explicit.clone(),
            Modification::Transform { apply, .. } => apply(value),
        }
    }
}

impl<T: Clone> Clone for Modification<T> {
    fn clone(&self) -> Self {
        match self {
            Modification::Explicit(value) => Modification::Explicit(value.clone()),
            Modification::Transform { name, apply } => Modification::Transform {
                name: *name,
                apply: Rc::clone(apply),
            },
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Modification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modification::Explicit(value) => f.debug_tuple("Explicit").field(value).finish(),
            Modification::Transform { name, .. } => f.debug_tuple("Transform").field(name).finish(),
        }
    }
}

/// Modifications of byte arrays: nonces, tags, ciphertexts, padding.
///
/// Offsets past the end of the value are clamped, so a modification never panics on values
/// shorter than expected.
pub mod bytes {
    use super::Modification;

    pub fn explicit(value: Vec<u8>) -> Modification<Vec<u8>> {
        Modification::explicit(value)
    }

    /// XORs `mask` into the value starting at `offset`. Mask bytes beyond the value are dropped.
    pub fn xor(mask: Vec<u8>, offset: usize) -> Modification<Vec<u8>> {
        Modification::transform("xor", move |mut value: Vec<u8>| {
            value
                .iter_mut()
                .skip(offset)
                .zip(mask.iter())
                .for_each(|(byte, mask)| *byte ^= mask);
            value
        })
    }

    pub fn insert(inserted: Vec<u8>, offset: usize) -> Modification<Vec<u8>> {
        Modification::transform("insert", move |mut value: Vec<u8>| {
            let offset = offset.min(value.len());
            value.splice(offset..offset, inserted.iter().copied());
            value
        })
    }

    pub fn delete(offset: usize, count: usize) -> Modification<Vec<u8>> {
        Modification::transform("delete", move |mut value: Vec<u8>| {
            let start = offset.min(value.len());
            let end = start.saturating_add(count).min(value.len());
            value.drain(start..end);
            value
        })
    }

    pub fn append(appended: Vec<u8>) -> Modification<Vec<u8>> {
        Modification::transform("append", move |mut value: Vec<u8>| {
            value.extend_from_slice(&appended);
            value
        })
    }

    pub fn prepend(prepended: Vec<u8>) -> Modification<Vec<u8>> {
        Modification::transform("prepend", move |value: Vec<u8>| {
            let mut out = prepended.clone();
            out.extend_from_slice(&value);
            out
        })
    }

    pub fn duplicate() -> Modification<Vec<u8>> {
        Modification::transform("duplicate", |mut value: Vec<u8>| {
            value.extend_from_within(..);
            value
        })
    }

    pub fn truncate(len: usize) -> Modification<Vec<u8>> {
        Modification::transform("truncate", move |mut value: Vec<u8>| {
            value.truncate(len);
            value
        })
    }

    /// Swaps the bytes at each index pair, indices taken modulo the value length.
    pub fn shuffle(swaps: Vec<(usize, usize)>) -> Modification<Vec<u8>> {
        Modification::transform("shuffle", move |mut value: Vec<u8>| {
            if !value.is_empty() {
                let len = value.len();
                for (a, b) in &swaps {
                    value.swap(a % len, b % len);
                }
            }
            value
        })
    }
}

/// Integers which wrap around on arithmetic modifications instead of overflowing.
pub trait WrappingInteger: Copy + 'static {
    fn wrapping_add_signed64(self, delta: i64) -> Self;
    fn xor(self, mask: Self) -> Self;
    fn shift_left(self, bits: u32) -> Self;
    fn shift_right(self, bits: u32) -> Self;
}

macro_rules! impl_wrapping_integer {
    ($($t:ty),*) => {
        $(
            impl WrappingInteger for $t {
                fn wrapping_add_signed64(self, delta: i64) -> Self {
                    (self as i64).wrapping_add(delta) as $t
                }

                fn xor(self, mask: Self) -> Self {
                    self ^ mask
                }

                fn shift_left(self, bits: u32) -> Self {
                    self.checked_shl(bits).unwrap_or(0)
                }

                fn shift_right(self, bits: u32) -> Self {
                    self.checked_shr(bits).unwrap_or(0)
                }
            }
        )*
    };
}

impl_wrapping_integer!(u8, u16, u32, u64);

/// Modifications of lengths, sequence numbers and other integer fields.
pub mod integer {
    use super::{Modification, WrappingInteger};

    pub fn explicit<T: WrappingInteger>(value: T) -> Modification<T> {
        Modification::explicit(value)
    }

    pub fn add<T: WrappingInteger>(delta: i64) -> Modification<T> {
        Modification::transform("add", move |value: T| value.wrapping_add_signed64(delta))
    }

    pub fn subtract<T: WrappingInteger>(delta: i64) -> Modification<T> {
        Modification::transform("subtract", move |value: T| {
            value.wrapping_add_signed64(delta.wrapping_neg())
        })
    }

    pub fn xor<T: WrappingInteger>(mask: T) -> Modification<T> {
        Modification::transform("xor", move |value: T| value.xor(mask))
    }

    pub fn shift_left<T: WrappingInteger>(bits: u32) -> Modification<T> {
        Modification::transform("shift_left", move |value: T| value.shift_left(bits))
    }

    pub fn shift_right<T: WrappingInteger>(bits: u32) -> Modification<T> {
        Modification::transform("shift_right", move |value: T| value.shift_right(bits))
    }
}

pub mod boolean {
    use super::Modification;

    pub fn explicit(value: bool) -> Modification<bool> {
        Modification::explicit(value)
    }

    pub fn toggle() -> Modification<bool> {
        Modification::transform("toggle", |value: bool| !value)
    }
}
