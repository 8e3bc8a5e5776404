use core::mem;

/// A string slice that is statically guaranteed to hold at least one char
#[derive(Debug)]
#[repr(transparent)]
pub struct PopulatedStr(str);

impl PopulatedStr {
    /// SAFETY: the string must not be empty
    #[inline(always)]
    pub unsafe fn new_unchecked(s: &str) -> &Self {
        debug_assert!(!s.is_empty());

        unsafe { mem::transmute(s) }
    }

    #[inline]
    pub fn new(s: &str) -> Option<&Self> {
        match s.is_empty() {
            true => None,
            // Safety: we just confirmed that the string isn't empty
            false => Some(unsafe { Self::new_unchecked(s) }),
        }
    }

    /// The whole point: a static guarantee that there's a first char
    #[inline]
    pub fn split_first(&self) -> (char, &str) {
        debug_assert!(!self.0.is_empty());

        let mut chars = self.0.chars();

        // Safety: `self.0` is guaranteed to be non-empty, so there is always
        // a first char
        let first = unsafe { chars.next().unwrap_unchecked() };
        (first, chars.as_str())
    }

    #[inline(always)]
    pub fn get(&self) -> &str {
        &self.0
    }
}
