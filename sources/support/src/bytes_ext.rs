use anyhow::{anyhow, Result};
use bytes::Buf;
use paste::paste;

macro_rules! safe_get {
    ($($ty: ident),*) => {
        paste! {
            /// Checked reads over a [`Buf`]. Class files come from untrusted sources,
            /// so running off the end of the input is an error, never a panic.
            pub trait SafeBuf: Buf {
                $(
                    fn [<try_get_ $ty>](&mut self) -> Result<$ty> {
                        let width = std::mem::size_of::<$ty>();
                        if self.remaining() < width {
                            return Err(anyhow!(
                                "truncated input: wanted {} bytes for {}, {} left",
                                width,
                                stringify!($ty),
                                self.remaining()
                            ));
                        }

                        Ok(self.[<get_ $ty>]())
                    }
                )*

                fn try_get_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
                    if self.remaining() < len {
                        return Err(anyhow!(
                            "truncated input: wanted {} bytes, {} left",
                            len,
                            self.remaining()
                        ));
                    }

                    let mut out = vec![0; len];
                    self.copy_to_slice(&mut out);
                    Ok(out)
                }
            }
        }
    };
}

safe_get!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl<T: Buf> SafeBuf for T {}
