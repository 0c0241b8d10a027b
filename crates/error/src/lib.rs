//! Painter error handling infrastructure.
//!
//! Provides the `define_painter_error!` macro so every painter subsystem reports
//! failures the same way: a `Copy` enum, a stable numeric code and a short
//! description that fits in a debug trace.
//!
//! ## Usage
//!
//! ### Simple errors (no inner data)
//! ```ignore
//! define_painter_error! {
//!     pub enum CommsError(0x01) {
//!         NotInitialized = 0x01 => "Transport not initialized",
//!         BusUnavailable = 0x02 => "Bus could not be acquired",
//!     }
//! }
//! ```
//!
//! ### Nested errors (with inner error type)
//! ```ignore
//! define_painter_error! {
//!     pub enum PainterError(0x03) {
//!         Comms(CommsError) = 0x03 => "Transport failure",
//!     }
//! }
//! ```
//!
//! Nested variants also get a `From<Inner>` impl, so `?` lifts the inner error,
//! and report the inner error through `Error::source`.

#![no_std]

/// Macro to define a painter error type with consistent handling.
///
/// Supports both simple variants and nested variants containing inner errors.
#[macro_export]
macro_rules! define_painter_error {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($subsystem:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(($inner:ty))? = $code:literal => $desc:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(($inner))?,
            )*
        }

        impl $name {
            /// Subsystem identifier for this error type.
            pub const SUBSYSTEM: u8 = $subsystem;

            /// Low byte of [`code`](Self::code), unique within the enum.
            pub const fn variant_code(&self) -> u8 {
                match self {
                    $(
                        $crate::define_painter_error!(
                            @pattern $variant $(($inner))? _unused
                        ) => $code,
                    )*
                }
            }

            /// Numeric error code: subsystem in the high byte, variant in the low byte.
            pub const fn code(&self) -> u16 {
                ((Self::SUBSYSTEM as u16) << 8) | self.variant_code() as u16
            }

            /// Short description for debug traces.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        $crate::define_painter_error!(@pattern $variant $(($inner))? _unused) => {
                            $desc
                        }
                    )*
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $crate::define_painter_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_painter_error!(
                                @display_body self f $desc $(($inner))? inner
                            )
                        }
                    )*
                }
            }
        }

        impl core::error::Error for $name {
            #[allow(clippy::match_same_arms)]
            fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
                match self {
                    $(
                        $crate::define_painter_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_painter_error!(@source $(($inner))? inner)
                        }
                    )*
                }
            }
        }

        $(
            $(
                impl From<$inner> for $name {
                    fn from(inner: $inner) -> Self {
                        Self::$variant(inner)
                    }
                }
            )?
        )*
    };

    // Helper to generate patterns
    (@pattern $variant:ident ($inner:ty) $bind:ident) => { Self::$variant($bind) };
    (@pattern $variant:ident $bind:ident) => { Self::$variant };

    // Nested variants expose the inner error as the source
    (@source ($inner:ty) $bind:ident) => { Some($bind as &(dyn core::error::Error + 'static)) };
    (@source $bind:ident) => { None };

    // Helper to generate display bodies
    (@display_body $self:ident $f:ident $desc:literal ($inner:ty) $bind:ident) => {
        write!($f, "E{:04X}: {} ({})", $self.code(), $desc, $bind)
    };
    (@display_body $self:ident $f:ident $desc:literal $bind:ident) => {
        write!($f, "E{:04X}: {}", $self.code(), $desc)
    };
}
