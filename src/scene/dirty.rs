use serde::{Deserialize, Serialize};

/// Tracks mutable access to a value using a dirty flag.
///
/// The flag is raised whenever the value is mutably dereferenced and can be
/// lowered via `Dirty::clean` once the device has consumed the new value.
///
/// Values are initially dirty when created, cloned or deserialized.
#[derive(Copy, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Dirty<T> {
    #[serde(skip)]
    is_clean: bool,
    inner: T,
}

impl<T> Dirty<T> {
    pub fn new(inner: T) -> Self {
        Self {
            is_clean: false,
            inner,
        }
    }

    /// Forcibly dirties the value.
    pub fn dirty(this: &mut Self) {
        this.is_clean = false;
    }

    pub fn is_dirty(this: &Self) -> bool {
        !this.is_clean
    }

    /// Runs `update` if the value is dirty, then marks it clean.
    ///
    /// If `update` fails the value stays dirty so the update is retried on
    /// the next call. Returns whether `update` was invoked.
    pub fn clean<E>(
        this: &mut Self,
        update: impl FnOnce(&T) -> Result<(), E>,
    ) -> Result<bool, E> {
        if this.is_clean {
            return Ok(false);
        }

        update(&this.inner)?;
        this.is_clean = true;

        Ok(true)
    }
}

impl<T: PartialEq> Dirty<T> {
    /// Replaces the value, dirtying it only if it actually changed.
    pub fn patch(this: &mut Self, value: T) {
        if this.inner != value {
            this.inner = value;
            this.is_clean = false;
        }
    }
}

impl<T: Clone> Clone for Dirty<T> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<T> std::ops::Deref for Dirty<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> std::ops::DerefMut for Dirty<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.is_clean = false;

        &mut self.inner
    }
}

impl<T: PartialEq> PartialEq for Dirty<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.eq(&other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_start_dirty_and_clean_once() {
        let mut value = Dirty::new(3);

        assert_eq!(Dirty::clean(&mut value, |_| Ok::<_, ()>(())), Ok(true));
        assert_eq!(Dirty::clean(&mut value, |_| Ok::<_, ()>(())), Ok(false));

        *value += 1;

        assert!(Dirty::is_dirty(&value));
    }

    #[test]
    fn failed_update_keeps_value_dirty() {
        let mut value = Dirty::new("x");

        assert_eq!(Dirty::clean(&mut value, |_| Err(())), Err(()));
        assert!(Dirty::is_dirty(&value));
    }

    #[test]
    fn patch_only_dirties_on_change() {
        let mut value = Dirty::new(1.5f32);
        let _ = Dirty::clean(&mut value, |_| Ok::<_, ()>(()));

        Dirty::patch(&mut value, 1.5);
        assert!(!Dirty::is_dirty(&value));

        Dirty::patch(&mut value, 2.0);
        assert!(Dirty::is_dirty(&value));
    }

    #[test]
    fn serializes_transparently() {
        let value: Dirty<[u32; 2]> = serde_json::from_str("[1, 2]").unwrap();

        assert!(Dirty::is_dirty(&value));
        assert_eq!(serde_json::to_string(&value).unwrap(), "[1,2]");
    }
}
