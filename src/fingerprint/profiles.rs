//! Browser profiles a session can impersonate.

use std::fmt;

use super::tls::TlsFingerprint;

/// TLS client profile selector.
///
/// Chrome 110 and later permute TLS extension order on every handshake, so
/// those profiles enable permutation instead of pinning an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TlsProfile {
    #[default]
    Chrome112,
    Chrome111,
    Chrome110,
    Chrome109,
    Chrome108,
    Chrome107,
    Chrome106,
    Chrome105,
    SafariIos16,
    SafariIos15,
}

impl TlsProfile {
    pub const ALL: [TlsProfile; 10] = [
        Self::Chrome112,
        Self::Chrome111,
        Self::Chrome110,
        Self::Chrome109,
        Self::Chrome108,
        Self::Chrome107,
        Self::Chrome106,
        Self::Chrome105,
        Self::SafariIos16,
        Self::SafariIos15,
    ];

    /// Map a numeric selector (1-based, in `ALL` order) to a profile.
    ///
    /// Unknown selectors fall back to the default profile.
    pub fn from_id(id: i32) -> Self {
        id.checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chrome112 => "chrome_112",
            Self::Chrome111 => "chrome_111",
            Self::Chrome110 => "chrome_110",
            Self::Chrome109 => "chrome_109",
            Self::Chrome108 => "chrome_108",
            Self::Chrome107 => "chrome_107",
            Self::Chrome106 => "chrome_106",
            Self::Chrome105 => "chrome_105",
            Self::SafariIos16 => "safari_ios_16_0",
            Self::SafariIos15 => "safari_ios_15_5",
        }
    }

    /// Chrome major version, `None` for Safari profiles.
    pub fn chrome_major(&self) -> Option<u32> {
        match self {
            Self::Chrome112 => Some(112),
            Self::Chrome111 => Some(111),
            Self::Chrome110 => Some(110),
            Self::Chrome109 => Some(109),
            Self::Chrome108 => Some(108),
            Self::Chrome107 => Some(107),
            Self::Chrome106 => Some(106),
            Self::Chrome105 => Some(105),
            Self::SafariIos16 | Self::SafariIos15 => None,
        }
    }

    /// Get the User-Agent string for this profile.
    pub fn user_agent(&self) -> String {
        match self {
            Self::SafariIos16 => "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1".to_string(),
            Self::SafariIos15 => "Mozilla/5.0 (iPhone; CPU iPhone OS 15_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.5 Mobile/15E148 Safari/604.1".to_string(),
            chrome => format!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36",
                chrome.chrome_major().unwrap_or(112)
            ),
        }
    }

    /// Get the TLS fingerprint for this profile.
    pub fn tls_fingerprint(&self) -> TlsFingerprint {
        match self.chrome_major() {
            Some(major) => TlsFingerprint::chrome(major),
            None => TlsFingerprint::safari_ios(),
        }
    }
}

impl fmt::Display for TlsProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
