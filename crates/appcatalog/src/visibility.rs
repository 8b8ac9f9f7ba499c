//! Application visibility transitions
//!
//! All tags of an application share one visibility. The index stores it per
//! tag, so the state is read back as `Option<bool>`: `None` when the
//! application has no tags yet.

use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Unset,
    Public,
    Private,
}

impl Visibility {
    pub fn from_private(private: bool) -> Self {
        if private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn is_private(self) -> bool {
        self == Visibility::Private
    }

    /// Visibility a newly added tag ends up with
    ///
    /// A public application cannot be made private by pushing a tag; a
    /// private application stays private whatever the request.
    pub fn on_add(self, requested_private: bool) -> Result<bool> {
        match self {
            Visibility::Unset => Ok(requested_private),
            Visibility::Public if requested_private => Err(CatalogError::internal(
                "cannot change public application to private",
            )),
            current => Ok(current.is_private()),
        }
    }

    /// Visibility after an explicit toggle request
    pub fn on_toggle(self, requested_private: bool) -> Result<bool> {
        match self {
            Visibility::Unset => Err(CatalogError::not_found("application has no tags")),
            current if current.is_private() == requested_private => {
                Err(CatalogError::permission_denied(format!(
                    "application is already {}",
                    if requested_private { "private" } else { "public" }
                )))
            }
            _ => Ok(requested_private),
        }
    }
}

impl From<Option<bool>> for Visibility {
    fn from(private: Option<bool>) -> Self {
        private.map_or(Visibility::Unset, Visibility::from_private)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_add_transitions() {
        assert!(!Visibility::Unset.on_add(false).unwrap());
        assert!(Visibility::Unset.on_add(true).unwrap());
        assert!(!Visibility::Public.on_add(false).unwrap());
        assert!(Visibility::Private.on_add(true).unwrap());
        assert!(Visibility::Private.on_add(false).unwrap());

        let err = Visibility::Public.on_add(true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
    }

    #[test]
    fn test_toggle_transitions() {
        assert!(Visibility::Public.on_toggle(true).unwrap());
        assert!(!Visibility::Private.on_toggle(false).unwrap());

        let err = Visibility::Unset.on_toggle(true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = Visibility::Private.on_toggle(true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
        let err = Visibility::Public.on_toggle(false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_from_stored_state() {
        assert_eq!(Visibility::from(None), Visibility::Unset);
        assert_eq!(Visibility::from(Some(true)), Visibility::Private);
        assert_eq!(Visibility::from(Some(false)), Visibility::Public);
    }
}
