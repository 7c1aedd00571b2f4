//! Nickname capture.
//!
//! The modal holds a draft that is validated on every change so the submit
//! affordance can be enabled or disabled. Closing the modal discards the draft.

use crate::error::{IshyError, ValidationError};

/// Shortest accepted nickname, in characters, after trimming.
pub const NICKNAME_MIN_LEN: usize = 2;

/// Longest accepted nickname, in characters, after trimming.
pub const NICKNAME_MAX_LEN: usize = 32;

/// Trim `raw` and check its length.
///
/// Length is counted in Unicode scalar values, not bytes.
///
/// ```
/// use ishy_client::nickname::validate_nickname;
///
/// assert_eq!(validate_nickname("  Sam ").unwrap(), "Sam");
/// assert!(validate_nickname(" x ").is_err());
/// ```
///
/// # Errors
///
/// Returns [`ValidationError::InvalidNicknameLength`] when the trimmed
/// nickname is shorter than 2 or longer than 32 characters.
pub fn validate_nickname(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(NICKNAME_MIN_LEN..=NICKNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::InvalidNicknameLength {
            len,
            min: NICKNAME_MIN_LEN,
            max: NICKNAME_MAX_LEN,
        });
    }
    Ok(trimmed.to_string())
}

/// State of the nickname modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NicknameModal {
    open: bool,
    draft: String,
}

impl NicknameModal {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The text currently typed into the modal.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Whether submitting the current draft would pass validation.
    pub fn can_submit(&self) -> bool {
        self.open && validate_nickname(&self.draft).is_ok()
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
    }

    /// Close and discard the draft. Returns whether the modal was open.
    pub(crate) fn close(&mut self) -> bool {
        self.draft.clear();
        std::mem::replace(&mut self.open, false)
    }

    pub(crate) fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// The trimmed draft, if the modal is open and the draft is valid.
    ///
    /// The draft itself is left in place; it is discarded only when the
    /// modal closes.
    pub(crate) fn submission(&self) -> Result<String, IshyError> {
        if !self.open {
            return Err(IshyError::NicknameModalClosed);
        }
        Ok(validate_nickname(&self.draft)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(validate_nickname("ab").is_ok());
        assert!(validate_nickname(&"x".repeat(32)).is_ok());
        assert!(validate_nickname("a").is_err());
        assert!(validate_nickname(&"x".repeat(33)).is_err());
        assert!(validate_nickname("").is_err());
    }

    #[test]
    fn whitespace_does_not_count() {
        let err = validate_nickname("   a   ").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidNicknameLength {
                len: 1,
                min: 2,
                max: 32
            }
        );
        let padded = format!("  {}  ", "y".repeat(32));
        assert_eq!(validate_nickname(&padded).unwrap(), "y".repeat(32));
    }

    #[test]
    fn multibyte_characters_count_once() {
        assert!(validate_nickname("éé").is_ok());
        assert!(validate_nickname(&"ü".repeat(32)).is_ok());
        assert!(validate_nickname("🦀").is_err());
    }

    #[test]
    fn can_submit_tracks_draft() {
        let mut modal = NicknameModal::default();
        modal.set_draft("Sam");
        assert!(!modal.can_submit(), "closed modal cannot submit");

        modal.open();
        assert!(modal.can_submit());
        modal.set_draft(" S ");
        assert!(!modal.can_submit());
    }

    #[test]
    fn close_discards_draft() {
        let mut modal = NicknameModal::default();
        modal.open();
        modal.set_draft("draft");
        assert!(modal.close());
        assert!(!modal.is_open());
        assert_eq!(modal.draft(), "");
        assert!(!modal.close());
    }

    #[test]
    fn submission_leaves_draft_in_place() {
        let mut modal = NicknameModal::default();
        modal.open();
        modal.set_draft("x");
        assert!(matches!(
            modal.submission(),
            Err(IshyError::Validation(_))
        ));
        assert_eq!(modal.draft(), "x");

        modal.set_draft("  Sam  ");
        assert_eq!(modal.submission().unwrap(), "Sam");
        assert_eq!(modal.draft(), "  Sam  ");
        assert!(modal.is_open(), "submission alone does not close the modal");
    }

    #[test]
    fn closed_modal_cannot_submit() {
        let mut modal = NicknameModal::default();
        modal.set_draft("Sam");
        assert!(!modal.can_submit());
        assert!(matches!(
            modal.submission(),
            Err(IshyError::NicknameModalClosed)
        ));
    }
}
