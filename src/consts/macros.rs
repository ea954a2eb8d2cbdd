// This is to facillitate passing per-variant attributes (doc comments
// or cfg gates) through `impl_var`: the enum definition emits them,
// the generated `From` impls drop them.
#[macro_export]
#[doc(hidden)]
macro_rules! impl_var_base {
    ($name:ident, $ty:ty, $( $( #[$vmeta:meta] )* $var:ident => $val:expr ),* ) => {
        impl From<$ty> for $name {
            fn from(v: $ty) -> Self {
                match v {
                    $(
                        i if i == $val => $name::$var,
                    )*
                    i => $name::UnrecognizedVariant(i),
                }
            }
        }

        impl From<$name> for $ty {
            fn from(v: $name) -> Self {
                match v {
                    $(
                        $name::$var => $val,
                    )*
                    $name::UnrecognizedVariant(i) => i,
                }
            }
        }

        impl<'a> From<&'a $name> for $ty {
            fn from(v: &'a $name) -> Self {
                match *v {
                    $(
                        $name::$var => $val,
                    )*
                    $name::UnrecognizedVariant(i) => i,
                }
            }
        }

        impl $crate::Nl for $name {
            fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), $crate::err::SerError> {
                let v: $ty = self.into();
                v.serialize(mem)
            }

            fn deserialize(
                mem: &mut ::std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::err::DeError> {
                let v = <$ty>::deserialize(mem)?;
                Ok(v.into())
            }

            fn size(&self) -> usize {
                ::std::mem::size_of::<$ty>()
            }
        }
    };
}

#[macro_export]
/// For naming a new enum, passing in what type it serializes to and
/// deserializes from, and providing a mapping from variants to
/// expressions (such as `libc` consts) that will ultimately be used in
/// the serialization/deserialization step when sending the netlink
/// message over the wire.
macro_rules! impl_var {
    (
        $( #[$outer:meta] )*
        $name:ident, $ty:ty, $( $( #[$vmeta:meta] )* $var:ident => $val:expr ),*
    ) => (
        $(#[$outer])*
        #[derive(Clone, Debug, Eq, PartialEq)]
        pub enum $name {
            $(
                $( #[$vmeta] )*
                #[allow(missing_docs)]
                $var,
            )*
            /// Variant that signifies an invalid value while deserializing
            UnrecognizedVariant($ty),
        }

        impl_var_base!($name, $ty, $( $( #[$vmeta] )* $var => $val ),* );
    );
}

#[macro_export]
/// For generating a marker trait that flags a new enum as usable in a
/// field that accepts a generic type. This way, the type can be
/// constrained when the impl is provided to only accept enums that
/// implement the marker trait that corresponds to the given marker
/// trait.
macro_rules! impl_trait {
    ( $(#[$outer:meta])* $trait_name:ident, $to_from_ty:ty ) => {
        $(#[$outer])*
        pub trait $trait_name:
            $crate::Nl + PartialEq + Clone + ::std::fmt::Debug + From<$to_from_ty> + Into<$to_from_ty>
        {
        }

        impl $trait_name for $to_from_ty {}
    };
}

#[macro_export]
/// For defining a new enum implementing the provided marker trait.
/// It accepts a name for the enum and the target type for
/// serialization and deserialization conversions, as well as value
/// conversions for serialization and deserialization.
macro_rules! impl_var_trait {
    ( $( #[$outer:meta] )* $name:ident, $ty:ty, $impl_name:ident,
      $( $( #[$vmeta:meta] )* $var:ident => $val:expr ),* ) => (
        impl_var!( $(#[$outer])*
            $name, $ty, $( $( #[$vmeta] )* $var => $val ),*
        );

        impl $impl_name for $name {}
    );
}

#[macro_export]
/// For defining a set of flags that is serialized as one integer on
/// the wire. Unknown bits coming from the kernel are retained so that
/// a status report echoes back exactly what was received.
macro_rules! impl_flags {
    ( $(#[$outer:meta])* $name:ident, $ty:ty, $( $(# $inner:tt)* $var:ident => $val:expr ),* $(,)? ) => {
        ::bitflags::bitflags! {
            $(#[$outer])*
            #[derive(Copy, Clone, Debug, PartialEq, Eq)]
            pub struct $name: $ty {
                $(
                    $(# $inner)*
                    const $var = $val;
                )*
            }
        }

        impl $crate::Nl for $name {
            fn serialize(&self, mem: &mut Vec<u8>) -> Result<(), $crate::err::SerError> {
                self.bits().serialize(mem)
            }

            fn deserialize(
                mem: &mut ::std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::err::DeError> {
                Ok(<$name>::from_bits_retain(<$ty>::deserialize(mem)?))
            }

            fn size(&self) -> usize {
                ::std::mem::size_of::<$ty>()
            }
        }
    };
}
