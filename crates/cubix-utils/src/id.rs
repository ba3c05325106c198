// Id { u32 }
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        pub struct $name {
            id: u32,
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.id)
            }
        }

        impl $name {
            #[inline]
            pub const fn from_raw(id: u32) -> Self {
                Self { id }
            }

            pub fn as_usize(&self) -> usize {
                self.id as usize
            }

            pub fn id(&self) -> u32 {
                self.id
            }
        }
    };
}

#[cfg(test)]
mod tests {
    define_id!(TestId);

    #[test]
    fn raw_roundtrip() {
        let id = TestId::from_raw(7);
        assert_eq!(id.id(), 7);
        assert_eq!(id.as_usize(), 7);
        assert_eq!(format!("{id:?}"), "TestId(7)");
        assert_eq!(id.to_string(), "#7");
    }
}
