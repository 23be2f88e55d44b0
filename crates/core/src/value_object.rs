//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are compared by their attribute values.
/// `EntityName` and `BankAccountDetails` are the value objects of this crate;
/// both are only constructible through their validating constructors.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
