/*++

Licensed under the Apache-2.0 license.

File Name:

    secret.rs

Abstract:

    File contains a wrapper that zeroizes its contents when dropped.

--*/

use zeroize::Zeroize;

/// Owned secret material. The contents are zeroized on every exit path.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(val: T) -> Self {
        Self(val)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn expose_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct Probe<'a>(&'a Cell<bool>);

    impl Zeroize for Probe<'_> {
        fn zeroize(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn test_zeroized_on_drop() {
        let wiped = Cell::new(false);
        {
            let _secret = Secret::new(Probe(&wiped));
            assert!(!wiped.get());
        }
        assert!(wiped.get());
    }

    #[test]
    fn test_access() {
        let mut secret = Secret::new([0u8; 4]);
        secret.expose_mut()[1] = 7;
        assert_eq!(secret.expose(), &[0, 7, 0, 0]);
    }
}
