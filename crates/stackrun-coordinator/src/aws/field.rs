//! Uniform access to SDK struct members
//!
//! SDK accessors return `&T` for members modeled as required and `Option<&T>`
//! otherwise. `SdkField::field` turns both into `Option<&T>` so conversions
//! read the same regardless of the model.

pub(crate) trait SdkField<'a, T: ?Sized> {
    fn field(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> SdkField<'a, T> for &'a T {
    fn field(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> SdkField<'a, T> for Option<&'a T> {
    fn field(self) -> Option<&'a T> {
        self
    }
}
