// SPDX-License-Identifier: MIT

/// Wires the `From` conversions between the error layers.
///
/// - `str_into`: `&'static str` -> `Other(msg)` for each listed type
/// - `sub`: lower-layer error -> `Target::Variant(e)`
/// - `std_error`: `std::error::Error` impls (std builds only)
#[macro_export]
macro_rules! fs_error_wiring {
    (
        str_into => [ $($str_tgt:ty),* $(,)? ],
        sub => {
            $($src_sub:ty => [ $($dst_sub:ident::$dst_variant:ident),+ ] ),* $(,)?
        },
        std_error => [ $($err:ty),* $(,)? ] $(,)?
    ) => {
        $crate::__impl_str_into_errors!{ $( $str_tgt ),* }
        $crate::__impl_sub_into_error!{ $( $src_sub => [ $( $dst_sub :: $dst_variant ),+ ] ),* }
        $crate::__impl_std_error!{ $( $err ),* }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __impl_str_into_errors {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<&'static str> for $t {
                #[inline]
                fn from(msg: &'static str) -> Self { <$t>::Other(msg) }
            }
        )*
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __impl_sub_into_error {
    ($($src:ty => [ $( $dst:ident::$variant:ident ),+ ] ),* $(,)?) => {
        $(
            $(
                impl From<$src> for $dst {
                    #[inline]
                    fn from(e: $src) -> Self { <$dst>::$variant(e) }
                }
            )+
        )*
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __impl_std_error {
    ($($t:ty),* $(,)?) => {
        $(
            #[cfg(feature = "std")]
            impl std::error::Error for $t {}
        )*
    }
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($err.into());
    };
}
