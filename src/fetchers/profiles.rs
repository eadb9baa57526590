/// A named set of request headers imitating a particular client.
#[derive(Debug, Clone, Copy)]
pub struct HeaderProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub extra: &'static [(&'static str, &'static str)],
}

impl HeaderProfile {
    pub fn headers(&self) -> Vec<(String, String)> {
        std::iter::once(("User-Agent", self.user_agent))
            .chain(self.extra.iter().copied())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}

pub const DESKTOP_CHROME: HeaderProfile = HeaderProfile {
    name: "desktop-chrome",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    extra: &[
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Cache-Control", "no-cache"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Upgrade-Insecure-Requests", "1"),
    ],
};

pub const MOBILE_SAFARI: HeaderProfile = HeaderProfile {
    name: "mobile-safari",
    user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    extra: &[
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
    ],
};

pub const FACEBOOK_CRAWLER: HeaderProfile = HeaderProfile {
    name: "facebook-crawler",
    user_agent: "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
    extra: &[("Accept", "*/*")],
};
