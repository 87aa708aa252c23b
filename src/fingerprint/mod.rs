//! TLS client profiles and the fingerprints they configure.

pub mod profiles;
pub mod tls;

pub use profiles::TlsProfile;
pub use tls::TlsFingerprint;
