//! Identity correlation between remote person records and the roster.
//!
//! A person record created by this system stores the stringified member
//! number in its secondary-identification field.  Correlation parses that
//! field back and validates it against the current roster; anything that
//! does not resolve is foreign and is never mutated or deleted.  The
//! mapping is recomputed from current data on every run and never
//! persisted, so a membership change can not leave a stale link behind.

use std::collections::HashMap;

use keysync_directory::Member;

/// Resolve a secondary-identification value to a member number.
///
/// `members` is the full membership directory, so records of members who
/// merely lost key-holder status still correlate.  Returns `None` (foreign,
/// unmanaged) when the field is absent, does not parse as an integer, or
/// names nobody in the directory.  Parse failures are not errors: a record
/// someone created by hand simply is not ours.
pub fn correlate(
    secondary_identification: Option<&str>,
    members: &HashMap<i64, Member>,
) -> Option<i64> {
    let member_no: i64 = secondary_identification?.trim().parse().ok()?;
    members.contains_key(&member_no).then_some(member_no)
}
