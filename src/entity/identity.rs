use crate::{Error, Result};

/// Types that may act as an entity's identity field.
///
/// Non-positive numbers and `None` mean "not persisted yet".
pub trait IdentityValue: Sized {
    /// The value a freshly reconstructed or constructed record starts with.
    fn unset() -> Self;

    fn get(&self) -> Option<i64>;

    /// # Errors
    ///
    /// If `id` does not fit into the field's type.
    fn set(&mut self, id: i64) -> Result<()>;
}

impl IdentityValue for i64 {
    fn unset() -> Self {
        0
    }

    fn get(&self) -> Option<i64> {
        (*self > 0).then_some(*self)
    }

    fn set(&mut self, id: i64) -> Result<()> {
        *self = id;
        Ok(())
    }
}

impl IdentityValue for i32 {
    fn unset() -> Self {
        0
    }

    fn get(&self) -> Option<i64> {
        (*self > 0).then_some(i64::from(*self))
    }

    fn set(&mut self, id: i64) -> Result<()> {
        *self = narrow(id)?;
        Ok(())
    }
}

impl IdentityValue for Option<i64> {
    fn unset() -> Self {
        None
    }

    fn get(&self) -> Option<i64> {
        self.filter(|id| *id > 0)
    }

    fn set(&mut self, id: i64) -> Result<()> {
        *self = Some(id);
        Ok(())
    }
}

impl IdentityValue for Option<i32> {
    fn unset() -> Self {
        None
    }

    fn get(&self) -> Option<i64> {
        self.filter(|id| *id > 0).map(i64::from)
    }

    fn set(&mut self, id: i64) -> Result<()> {
        *self = Some(narrow(id)?);
        Ok(())
    }
}

fn narrow(id: i64) -> Result<i32> {
    i32::try_from(id)
        .map_err(|_| Error::Reconstruction(format!("identity {id} does not fit into an i32 field")))
}
