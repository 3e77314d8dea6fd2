//! Typed value acquirables.
//!
//! An [`Acquirable`] whose state is a single cell needs no machinery beyond
//! [`ReadAcquisition::get`] and [`WriteAcquisition::set`]; this module only
//! names the common instantiations.
//!
//! Reference cells come in two flavors that differ in whether the absence
//! of a value is representable:
//!
//! ```
//! use acquirable::Acquirable;
//!
//! // A cell that always contains a value.
//! let required: Acquirable<String> = Acquirable::new("x".to_string());
//! // A cell that can be empty.
//! let optional: Acquirable<Option<String>> = Acquirable::new(None);
//!
//! optional.acquire_write().unwrap().set(Some("y".to_string())).unwrap();
//! assert_eq!(required.acquire_read().get().unwrap(), "x");
//! assert_eq!(optional.acquire_read().get().unwrap().as_deref(), Some("y"));
//! ```
//!
//! Storing an empty value in the required flavor is not expressible, so no
//! runtime check for it exists.
//!
//! [`Acquirable`]: crate::Acquirable
//! [`ReadAcquisition::get`]: crate::ReadAcquisition::get
//! [`WriteAcquisition::set`]: crate::WriteAcquisition::set

use crate::Acquirable;

/// An acquirable guarding a boolean.
pub type BoolAcquirable = Acquirable<bool>;

/// An acquirable guarding a character.
pub type CharAcquirable = Acquirable<char>;

/// An acquirable guarding an 8-bit integer.
pub type I8Acquirable = Acquirable<i8>;

/// An acquirable guarding a 16-bit integer.
pub type I16Acquirable = Acquirable<i16>;

/// An acquirable guarding a 32-bit integer.
pub type I32Acquirable = Acquirable<i32>;

/// An acquirable guarding a 64-bit integer.
pub type I64Acquirable = Acquirable<i64>;

/// An acquirable guarding a 32-bit float.
pub type F32Acquirable = Acquirable<f32>;

/// An acquirable guarding a 64-bit float.
pub type F64Acquirable = Acquirable<f64>;

/// An acquirable guarding no state at all, useful when only the lock and
/// its conditions are of interest.
pub type UnitAcquirable = Acquirable<()>;
