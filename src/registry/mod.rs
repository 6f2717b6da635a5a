//! Schema registries: the taxonomy, the custom field definitions and the
//! known-offender list. Together these determine what a report submission
//! form looks like.

pub mod categories;
pub mod fields;
pub mod offenders;

use crate::Error;

/// Trim and reject blank display names. All three registries key on names
/// the same way.
fn valid_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(["name must not be blank".to_owned()]));
    }
    Ok(name.to_owned())
}
