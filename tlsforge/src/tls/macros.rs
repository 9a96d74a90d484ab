/// A macro which defines an enum type with a catch-all `Unknown` variant, conversions from and to
/// the wire integer and a [`Codec`](forge::codec::Codec) implementation.
macro_rules! enum_builder {
    (
        $(#[$comment:meta])*
        @U8
        EnumName: $enum_name: ident;
        EnumVal { $( $enum_var: ident => $enum_val: literal ),* $(,)? }
    ) => {
        $(#[$comment])*
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $enum_name {
            $( $enum_var),*
            ,Unknown(u8)
        }
        impl $enum_name {
            pub fn get_u8(&self) -> u8 {
                let x = self.clone();
                match x {
                    $( $enum_name::$enum_var => $enum_val),*
                    ,$enum_name::Unknown(x) => x
                }
            }
        }
        impl forge::codec::Codec for $enum_name {
            fn encode(&self, bytes: &mut Vec<u8>) {
                forge::codec::Codec::encode(&self.get_u8(), bytes);
            }

            fn read(r: &mut forge::codec::Reader) -> Option<Self> {
                <u8 as forge::codec::Codec>::read(r).map($enum_name::from)
            }
        }
        impl From<u8> for $enum_name {
            fn from(x: u8) -> Self {
                match x {
                    $($enum_val => $enum_name::$enum_var),*
                    , x => $enum_name::Unknown(x),
                }
            }
        }
    };
    (
        $(#[$comment:meta])*
        @U16
        EnumName: $enum_name: ident;
        EnumVal { $( $enum_var: ident => $enum_val: literal ),* $(,)? }
    ) => {
        $(#[$comment])*
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $enum_name {
            $( $enum_var),*
            ,Unknown(u16)
        }
        impl $enum_name {
            pub fn get_u16(&self) -> u16 {
                let x = self.clone();
                match x {
                    $( $enum_name::$enum_var => $enum_val),*
                    ,$enum_name::Unknown(x) => x
                }
            }
        }
        impl forge::codec::Codec for $enum_name {
            fn encode(&self, bytes: &mut Vec<u8>) {
                forge::codec::Codec::encode(&self.get_u16(), bytes);
            }

            fn read(r: &mut forge::codec::Reader) -> Option<Self> {
                <u16 as forge::codec::Codec>::read(r).map($enum_name::from)
            }
        }
        impl From<u16> for $enum_name {
            fn from(x: u16) -> Self {
                match x {
                    $($enum_val => $enum_name::$enum_var),*
                    , x => $enum_name::Unknown(x),
                }
            }
        }
    };
}
