//! Precache manifest baked into the build.

/// Root-relative URLs fetched into the static store at install time, in order.
pub const PRECACHE_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/style.css",
    "/puzzle1/dist/js/script-optimized.js",
    "/puzzle1/dist/js/game-utils.js",
    "/puzzle1/dist/js/quiz.js",
    "/puzzle1/dist/css/styles.css",
    "/manifest.json",
    "/puzzle1/puzzle1.html",
    "/puzzle1/puzzle1a.html",
    "/puzzle1/puzzle1b.html",
    "/puzzle1/puzzle1c.html",
    "/puzzle1/puzzle1d.html",
    "/puzzle1/puzzle1e.html",
    "/puzzle1/puzzle1f.html",
    "/puzzle1/quiz.html",
    "/puzzle1/assets/img/CyberPuzzle.Fun.png",
    "/puzzle1/assets/img/bottle_img.jpg",
];

/// Ordered list of URLs to precache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    urls: Vec<String>,
}

impl PrecacheManifest {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { urls: urls.into_iter().map(Into::into).collect() }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl Default for PrecacheManifest {
    fn default() -> Self {
        Self::new(PRECACHE_ASSETS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_manifest_order() {
        let manifest = PrecacheManifest::default();
        assert_eq!(manifest.len(), PRECACHE_ASSETS.len());
        assert_eq!(manifest.urls()[0], "/");
        assert_eq!(manifest.urls()[1], "/index.html");
    }

    #[test]
    fn test_builtin_manifest_is_root_relative() {
        assert!(PRECACHE_ASSETS.iter().all(|u| u.starts_with('/')));
    }
}
