pub trait BitflagsExt: Sized {
    fn contains(self, other: Self) -> bool;
    fn intersects(self, other: Self) -> bool;
    /// Indices of the set bits, lowest first.
    fn set_bits(self) -> SetBits<Self>;
}

pub struct SetBits<T>(T);

macro_rules! num {
    ($ty:ident) => {
        impl BitflagsExt for $ty {
            fn contains(self, other: Self) -> bool {
                self & other == other
            }

            fn intersects(self, other: Self) -> bool {
                self & other != 0
            }

            fn set_bits(self) -> SetBits<Self> {
                SetBits(self)
            }
        }

        impl Iterator for SetBits<$ty> {
            type Item = u32;

            fn next(&mut self) -> Option<u32> {
                if self.0 == 0 {
                    return None;
                }
                let idx = self.0.trailing_zeros();
                self.0 &= self.0 - 1;
                Some(idx)
            }
        }
    };
}

num!(u32);
num!(u64);
