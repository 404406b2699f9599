use std::sync::{Mutex, PoisonError};

use openssl::provider::Provider;
use tracing::{info, warn};

use super::types::{TlsError, TlsErrorKind};

struct Registration {
    name: Option<String>,
    _provider: Option<Provider>,
}

// Only a successful registration is kept; a failed load can be retried.
static REGISTRATION: Mutex<Option<Registration>> = Mutex::new(None);

/// Initializes OpenSSL and loads the named provider, once per process.
///
/// The first successful call decides which provider is registered. Later calls with the
/// same name are no-ops; a different name is refused rather than silently ignored.
pub fn ensure_provider(name: Option<&str>) -> Result<(), TlsError> {
    let mut slot = REGISTRATION.lock().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
        Some(registered) if registered.name.as_deref() == name || name.is_none() => Ok(()),
        Some(registered) => Err(TlsError::new(
            TlsErrorKind::ContextInit,
            format!(
                "crypto provider already registered as {}",
                registered.name.as_deref().unwrap_or("default")
            ),
        )),
        None => {
            *slot = Some(register(name)?);
            Ok(())
        }
    }
}

/// Name of the provider registered by the first successful `ensure_provider` call, if any.
pub fn registered_provider() -> Option<String> {
    REGISTRATION
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .and_then(|registered| registered.name.clone())
}

fn register(name: Option<&str>) -> Result<Registration, TlsError> {
    openssl::init();
    let provider = match name {
        Some(name) => Some(Provider::try_load(None, name, true).map_err(|err| {
            warn!(provider = name, "crypto provider failed to load");
            TlsError::new(
                TlsErrorKind::ContextInit,
                format!("unable to load crypto provider {name}: {err}"),
            )
        })?),
        None => None,
    };
    info!(
        provider = name.unwrap_or("built-in"),
        version = openssl::version::version(),
        "registered crypto provider"
    );
    Ok(Registration {
        name: name.map(str::to_string),
        _provider: provider,
    })
}
