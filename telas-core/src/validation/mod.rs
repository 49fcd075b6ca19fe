//! Pure validators for caller input and cut leftovers.

mod validate;

pub use validate::{
    check_leftovers, ensure_new_roll, validate_client_name, validate_new_roll, validate_request,
    validate_selection, LeftoverIssue, ValidationResult,
};
