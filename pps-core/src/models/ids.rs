use std::{borrow::Borrow, fmt};

macro_rules! string_id {
    ($struct:ident, $what:literal) => {
        #[doc = concat!("The unique key of a ", $what, ".")]
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
        #[cfg_attr(
            feature = "serde",
            derive(serde::Serialize, serde::Deserialize),
            serde(transparent)
        )]
        #[repr(transparent)]
        pub struct $struct(String);

        impl $struct {
            /// Borrow the underlying key
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $struct {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $struct {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $struct {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $struct {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(PlanId, "plan");
string_id!(SegmentId, "customer segment");
