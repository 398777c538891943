//! Access checks and masking for personal information.
//!
//! Decryption is unconditional in the codec; these helpers decide what a
//! presentation layer shows to a given principal.

/// Permission required to read decrypted personal information.
pub const VIEW_PERSONAL_INFO: &str = "sfd.view_personal_info";
/// Permission required to modify personal information.
pub const CHANGE_PERSONAL_INFO: &str = "sfd.change_personal_info";

const MASK_CHAR: char = '*';

/// The authenticated (or anonymous) caller of an operation.
#[cfg_attr(test, mockall::automock)]
pub trait Principal {
    fn is_authenticated(&self) -> bool;
    fn is_superuser(&self) -> bool;
    fn has_perm(&self, perm: &str) -> bool;
}

fn allowed<P: Principal + ?Sized>(principal: &P, perm: &str) -> bool {
    if !principal.is_authenticated() {
        return false;
    }
    principal.is_superuser() || principal.has_perm(perm)
}

/// Whether `principal` may see personal information unmasked.
pub fn can_view_personal_info<P: Principal + ?Sized>(principal: &P) -> bool {
    allowed(principal, VIEW_PERSONAL_INFO)
}

/// Whether `principal` may edit personal information.
pub fn can_edit_personal_info<P: Principal + ?Sized>(principal: &P) -> bool {
    allowed(principal, CHANGE_PERSONAL_INFO)
}

/// Keep the first `visible_chars` characters of `data` and mask the rest.
///
/// Lengths count Unicode scalar values, not bytes. Values no longer than
/// `visible_chars` are masked entirely.
pub fn mask_sensitive_data(data: &str, visible_chars: usize) -> String {
    let len = data.chars().count();
    if len <= visible_chars {
        return MASK_CHAR.to_string().repeat(len);
    }
    data.chars()
        .take(visible_chars)
        .chain(std::iter::repeat(MASK_CHAR).take(len - visible_chars))
        .collect()
}

/// `"{family} {name}"`, or each part masked to its first character.
pub fn masked_full_name<P: Principal + ?Sized>(family: &str, name: &str, principal: &P) -> String {
    if can_view_personal_info(principal) {
        return format!("{family} {name}");
    }
    format!(
        "{} {}",
        mask_sensitive_data(family, 1),
        mask_sensitive_data(name, 1)
    )
}

/// The phone number, or its first three characters followed by a mask.
pub fn masked_phone<P: Principal + ?Sized>(phone: &str, principal: &P) -> String {
    if can_view_personal_info(principal) {
        return phone.to_owned();
    }
    mask_sensitive_data(phone, 3)
}
