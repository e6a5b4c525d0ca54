///! Input validation for host and VM payloads

use vmfleet_common::{Error, Host, Vm};

/// Maximum allowed identifier length
pub const MAX_ID_LENGTH: usize = 255;

/// Validation result type
pub type ValidationResult<T> = Result<T, Error>;

/// Identifiers appear as URL path segments, so they must be non-empty and
/// free of '/'
pub fn validate_id(kind: &str, id: &str) -> ValidationResult<()> {
    if id.is_empty() {
        return Err(Error::Validation(format!("{} id cannot be empty", kind)));
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(Error::Validation(
            format!("{} id too long (max {} characters)", kind, MAX_ID_LENGTH)
        ));
    }

    if id.contains('/') {
        return Err(Error::Validation(format!("{} id cannot contain '/'", kind)));
    }

    Ok(())
}

pub fn validate_vm(vm: &Vm) -> ValidationResult<()> {
    validate_id("VM", &vm.id)
}

/// Validate a host and every VM it carries
pub fn validate_host(host: &Host) -> ValidationResult<()> {
    validate_id("Host", &host.id)?;
    host.vms.iter().try_for_each(validate_vm)
}
