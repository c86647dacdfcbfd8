/// Handle to one published version that can be installed into an environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installable {
    pub library: String,
    pub version: String,
    /// Direct download URL of a pure-Python wheel, when one exists
    pub artifact_url: Option<String>,
}

impl Installable {
    pub fn new(library: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            version: version.into(),
            artifact_url: None,
        }
    }

    pub fn with_artifact_url(mut self, url: impl Into<String>) -> Self {
        self.artifact_url = Some(url.into());
        self
    }

    /// Pinned requirement, e.g. `requests==2.31.0`
    pub fn requirement(&self) -> String {
        format!("{}=={}", self.library, self.version)
    }

    /// What to hand to the installer: the artifact URL if known, else the requirement
    pub fn install_target(&self) -> String {
        self.artifact_url
            .clone()
            .unwrap_or_else(|| self.requirement())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_target_prefers_artifact_url() {
        let installable = Installable::new("requests", "2.31.0");
        assert_eq!(installable.install_target(), "requests==2.31.0");

        let installable = installable.with_artifact_url("https://files/requests-2.31.0-py3-none-any.whl");
        assert_eq!(
            installable.install_target(),
            "https://files/requests-2.31.0-py3-none-any.whl"
        );
        assert_eq!(installable.requirement(), "requests==2.31.0");
    }
}
