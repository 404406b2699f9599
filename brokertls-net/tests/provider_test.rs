mod support;

use brokertls_net::{
    BuildOptions, Passphrase, TlsErrorKind, build_socket_factory_with, ensure_provider,
    registered_provider,
};

use support::{PASSPHRASE, write_fixture};

// Registration is process-wide, so the whole sequence lives in one test.
#[test]
fn provider_registers_once_per_process() {
    ensure_provider(Some("default")).unwrap();
    assert_eq!(registered_provider().as_deref(), Some("default"));

    ensure_provider(Some("default")).unwrap();
    ensure_provider(None).unwrap();

    let err = ensure_provider(Some("legacy")).unwrap_err();
    assert_eq!(err.kind, TlsErrorKind::ContextInit);

    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| ensure_provider(Some("default")).is_ok()))
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let fixture = write_fixture(Some(PASSPHRASE));
    let options = BuildOptions {
        provider: Some("default".to_string()),
        ..BuildOptions::default()
    };
    assert!(build_socket_factory_with(&fixture.paths, &Passphrase::from(PASSPHRASE), &options).is_ok());
}
