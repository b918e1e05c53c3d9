use serde::{Deserialize, Serialize};

/// Store platform a product, purchase or error belongs to.
///
/// The wire form is always the lower-case literal (`"ios"` / `"android"`),
/// even when a native layer reports mixed case; see
/// `normalize_platform_case`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IapPlatform {
    Ios,
    Android,
}

impl IapPlatform {
    /// The exact wire literal for this platform.
    pub fn as_str(&self) -> &'static str {
        match self {
            IapPlatform::Ios => "ios",
            IapPlatform::Android => "android",
        }
    }
}

impl std::fmt::Display for IapPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
